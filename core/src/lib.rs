//! Async client core for the partner center sell (product lifecycle) API.
//!
//! # Overview
//! Every remote operation is a row in a declarative table (`operation`).
//! One generic routine validates the caller's `Params` against that row and
//! builds an `HttpRequest` descriptor; a `Transport` then executes it. The
//! default `HttpTransport` speaks JSON over HTTPS via `reqwest`, with
//! authentication, timeout and opt-in retries.
//!
//! # Design
//! - Building is pure and deterministic; missing required parameters fail
//!   before any I/O with `ApiError::MissingParameters`.
//! - The client holds no state besides its transport. Retry configuration is
//!   the transport's, toggled through the client's own methods.
//! - Transport failures reach the caller unchanged.
//! - Models in `types` are defined independently from the mock-server crate;
//!   integration tests catch schema drift.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod operation;
pub mod params;
pub mod transport;
pub mod types;

pub use auth::Authenticator;
pub use client::{build_request, PartnerCenterSell};
pub use config::{ServiceOptions, DEFAULT_SERVICE_NAME, DEFAULT_SERVICE_URL};
pub use error::{ApiError, ConfigError};
pub use http::{DetailedResponse, HttpMethod, HttpRequest};
pub use operation::{BodyField, Operation, OperationSpec};
pub use params::Params;
pub use transport::{HttpTransport, RetryPolicy, Transport};
