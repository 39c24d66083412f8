//! # Axum Helpers
//!
//! Shared building blocks for the HTTP services in this workspace.
//!
//! - **[`errors`]**: `AppError` and the JSON `ErrorResponse` envelope
//! - **[`extractors`]**: `QueryParams`, `UuidPath`, `ValidatedJson`
//! - **[`http`]**: CORS and security header middleware
//! - **[`server`]**: router assembly, `/health`, readiness helpers,
//!   graceful shutdown

pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use errors::{AppError, ErrorCode, ErrorResponse};
pub use extractors::{QueryParams, UuidPath, ValidatedJson};
pub use http::{cors_layer, security_headers};
pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app, create_router,
    health_router, normalize_paths, run_health_checks, shutdown_signal,
};
