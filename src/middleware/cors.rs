use actix_cors::Cors;
use actix_web::http::{header, Method};

use crate::config::ServerConfig;

/// CORS policy for browser clients.
///
/// Any origin may call the API; only `Content-Type` may be sent as a custom
/// header, matching what the recording page needs for its JSON upload.
///
/// Preflight requests are left to the route's own `OPTIONS` handler, which
/// answers 200 whether or not the browser sent `Access-Control-Request-Method`.
pub fn cors_policy(config: &ServerConfig) -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allowed_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allowed_header(header::CONTENT_TYPE)
        .max_age(config.cors_max_age_secs)
        .disable_preflight()
}
