//! # Observability
//!
//! - **Structured logging**: pretty or JSON output through `tracing-subscriber`
//! - **Request tracing**: an `x-request-id` header propagated into every log
//!   line emitted while the request is handled
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gitway_http::observability::{init_logging, request_id_layer, LogFormat};
//!
//! init_logging("info", LogFormat::Json);
//! let app = engine.into_router().layer(request_id_layer());
//! ```

mod logging;
pub mod middleware;

pub use logging::{init_logging, LogFormat};
pub use middleware::{request_id_layer, RequestId, REQUEST_ID_HEADER};
