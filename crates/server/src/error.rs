//! Tool-level errors for the swcache server.
//!
//! Engine and storage failures arrive as `swcache_core::Error`; these cover
//! problems with the tool call itself.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A parameter could not be interpreted (bad method, destination, header).
    #[error("INVALID_PARAMS: {0}")]
    InvalidParams(String),

    /// Tool output could not be encoded.
    #[error("OUTPUT_FAILED: {0}")]
    OutputFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidParams(_) => (-32602, err.to_string()),
            ToolError::OutputFailed(_) => (-32000, err.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
