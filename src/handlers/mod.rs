pub mod status;
pub mod transcribe;

use actix_web::{http::Method, web};

use crate::health;

pub use status::index;
pub use transcribe::{method_not_allowed, preflight, transcribe};

/// Register every route of the service.
///
/// Shared by `main` and the handler tests so both see the same routing table.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/transcribe")
            .route(web::post().to(transcribe))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health::health_check))
            .route("/metrics", web::get().to(health::detailed_metrics)),
    )
    .route("/health", web::get().to(health::health_check))
    .route("/", web::get().to(index));
}
