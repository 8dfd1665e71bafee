//! Client code for swcache.
//!
//! This crate provides the network fetch primitive and the offline caching
//! worker engine driven by the server.

pub mod fetch;
pub mod worker;

pub use reqwest::{Method, header};

pub use fetch::{Destination, FetchConfig, FetchRequest, FetchResponse, Fetcher, HttpFetcher};
pub use worker::{
    ActivateReport, FetchOutcome, InstallReport, MessageOutcome, ResponseSource, Route, ServiceWorker, SyncOutcome,
    WorkerConfig, WorkerMessage, WorkerState,
};
