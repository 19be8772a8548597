//! Backend client abstraction layer
//!
//! This module provides a trait-based abstraction over the remote resource
//! API, allowing the HTTP client and the scripted mock to be used
//! interchangeably by the intents.

mod client;
mod error;
mod http;
mod mock;
mod search;
mod types;

pub use client::ChrisBackend;
pub use error::BackendError;
pub use http::HttpBackend;
pub use mock::{MockBackend, MockCall, MockOperation};
pub use search::{newest_plugin, PluginSearch, PluginVersion, VersionedName};
pub use types::{
    FeedCreateRequest, FeedCreated, FeedRecord, FileRecord, FolderRecord, InstanceRef, ListQuery,
    PacsFileRecord, Page, PluginRecord, PluginRef, PluginRun,
};
