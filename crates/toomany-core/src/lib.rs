//! toomany-core: a rate-limited upstream stub
//!
//! Answers `GET /healthcheck` with `200 ok` and every `POST` to a non-empty
//! path with `429 You're making too many requests`. Gateways under test point
//! at it to exercise their handling of throttled upstreams.
//!
//! ```no_run
//! use toomany_core::{stub_routes, Server, ServerConfig};
//!
//! # async fn run() -> toomany_core::Result<()> {
//! let server = Server::bind(&ServerConfig::default(), stub_routes()?)?;
//! // Serve forever; pass a signal future for graceful shutdown.
//! server.serve(std::future::pending()).await
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod error;
pub mod method;
pub mod response;
pub mod routes;
pub mod server;

// Re-exports
pub use error::{Error, Result};
pub use method::Method;
pub use response::{Response, ResponseBuilder, StatusCode};
pub use routes::{
    stub_routes, RouteTable, RouteTableBuilder, CATCH_ALL_PATH, HEALTHCHECK_BODY,
    HEALTHCHECK_PATH, TOO_MANY_REQUESTS_BODY,
};
pub use server::{create_listener, ConnectionTracker, Server, ServerConfig};
