use actix_web::HttpResponse;
use serde_json::json;

/// `GET /`: a liveness probe that needs no state.
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "OK",
        "message": "Transcription relay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    #[actix_web::test]
    async fn test_index() {
        let app = test::init_service(App::new().route("/", web::get().to(index))).await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "OK");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
