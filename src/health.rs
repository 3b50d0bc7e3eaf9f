use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = &state.config;

    // Without a key every transcription fails, so the service is up but degraded
    let status = if state.relay.has_api_key() {
        "healthy"
    } else {
        "degraded"
    };

    HttpResponse::Ok().json(json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.get_uptime_seconds(),
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port,
            "environment": config.server.environment
        },
        "upstream": {
            "endpoint": config.upstream.endpoint,
            "model": config.upstream.model,
            "language": config.upstream.language,
            "api_key_configured": state.relay.has_api_key()
        },
        "limits": {
            "min_audio_bytes": config.audio.min_bytes,
            "max_audio_bytes": config.audio.max_bytes
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": metrics.error_rate(),
            "transcriptions": metrics.transcription_count
        }
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats: Vec<_> = metrics
        .endpoint_metrics
        .iter()
        .map(|(endpoint, metric)| {
            json!({
                "endpoint": endpoint,
                "request_count": metric.request_count,
                "error_count": metric.error_count,
                "error_rate": metric.error_rate(),
                "average_duration_ms": metric.average_duration_ms(),
                "total_duration_ms": metric.total_duration_ms
            })
        })
        .collect();
    endpoint_stats.sort_by(|a, b| a["endpoint"].as_str().cmp(&b["endpoint"].as_str()));

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": metrics.error_rate(),
            "requests_per_second": if uptime_seconds > 0 {
                metrics.request_count as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "transcription": {
            "completed": metrics.transcription_count,
            "upstream_errors": metrics.upstream_error_count,
            "audio_bytes_relayed": metrics.audio_bytes_relayed
        },
        "endpoints": endpoint_stats
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::middleware::MetricsMiddleware;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_reports_missing_key() {
        let state = AppState::from_config(AppConfig::default()).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["upstream"]["api_key_configured"], false);
        assert_eq!(body["limits"]["min_audio_bytes"], 100);
    }

    #[actix_web::test]
    async fn test_metrics_track_endpoints() {
        let mut config = AppConfig::default();
        config.upstream.api_key = Some("test-key".to_string());
        let state = AppState::from_config(config).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .wrap(MetricsMiddleware)
                .route("/health", web::get().to(health_check))
                .route("/metrics", web::get().to(detailed_metrics)),
        )
        .await;

        test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        test::call_service(&app, test::TestRequest::get().uri("/missing").to_request()).await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
        let body: serde_json::Value = test::read_body_json(resp).await;

        // The /metrics request itself is counted before its response is built
        assert_eq!(body["overall"]["total_requests"], 3);
        assert_eq!(body["overall"]["total_errors"], 1);
        let endpoints: Vec<&str> = body["endpoints"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["endpoint"].as_str().unwrap())
            .collect();
        assert_eq!(endpoints, vec!["GET /health", "GET unmatched"]);
    }
}
