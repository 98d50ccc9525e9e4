//! Review tool client.
//!
//! [`ReviewApi`] is the seam the review uploader drives; [`ReviewClient`]
//! implements it over HTTP.

pub mod api;
pub mod client;
pub mod config;
pub mod error;

pub use api::ReviewApi;
pub use client::ReviewClient;
pub use config::ReviewToolConfig;
pub use error::{ReviewApiError, ReviewApiResult};
