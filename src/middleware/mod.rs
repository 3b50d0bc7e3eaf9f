pub mod cors;
pub mod logging;
pub mod metrics;

pub use cors::cors_policy;
pub use logging::RequestLogging;
pub use metrics::MetricsMiddleware;
