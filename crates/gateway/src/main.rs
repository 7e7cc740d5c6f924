//! Aqar API Gateway
//!
//! HTTP entry point for natural-language property search.
//! Handles:
//! - Request routing
//! - Rate limiting
//! - Observability (logging, metrics, request IDs)
//! - Graceful shutdown

mod handlers;
mod middleware;

use aqar_common::{
    config::{AppConfig, ObservabilityConfig, RateLimitConfig},
    db::{DbPool, InMemoryStore, PropertyStore, Repository},
    llm, metrics, SearchPipeline,
};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use middleware::rate_limit::{rate_limit_middleware, SearchRateLimiter};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SearchPipeline>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (reads .env first)
    let config = AppConfig::load()?;

    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting Aqar API Gateway v{}",
        aqar_common::VERSION
    );

    // Initialize metrics
    init_metrics_exporter(config.observability.metrics_port)?;
    metrics::register_metrics();

    // Property store
    let store: Arc<dyn PropertyStore> = if config.uses_memory_store() {
        match config.database.seed_path.as_deref() {
            Some(path) => Arc::new(InMemoryStore::from_seed_file(path)?),
            None => {
                warn!("Using in-memory property store without a seed catalogue");
                Arc::new(InMemoryStore::new())
            }
        }
    } else {
        info!("Connecting to database...");
        Arc::new(Repository::new(DbPool::new(&config.database).await?))
    };

    let completion = llm::create_completion_service(&config.llm)?;

    let state = AppState {
        pipeline: Arc::new(SearchPipeline::new(completion, store, &config.search)),
    };

    // Build the router
    let app = create_router(state, &config.rate_limit);

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .into_future();

    // In-flight requests get shutdown_timeout_secs to drain
    let grace = config.shutdown_timeout();
    tokio::select! {
        result = server => result?,
        _ = async {
            let _ = shutdown_rx.wait_for(|stopping| *stopping).await;
            tokio::time::sleep(grace).await;
        } => warn!(grace_secs = grace.as_secs(), "Graceful shutdown timed out, exiting"),
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn init_metrics_exporter(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    if port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(metrics::LATENCY_BUCKETS)?
        .install()?;

    info!("Prometheus metrics on {}", addr);
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState, rate_limit: &RateLimitConfig) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut search_routes = Router::new().route("/search", post(handlers::search::search));
    if rate_limit.enabled {
        let limiter = SearchRateLimiter::new(rate_limit.requests_per_second, rate_limit.burst);
        search_routes = search_routes.route_layer(axum_middleware::from_fn(move |req: axum::extract::Request, next: axum_middleware::Next| {
            rate_limit_middleware(req, next, limiter.clone())
        }));
    }

    // Health endpoints are never rate limited
    let api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .merge(search_routes)
        .route_layer(axum_middleware::from_fn(middleware::metrics::track_metrics));

    // Compose the app
    Router::new()
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqar_common::config::SearchConfig;
    use aqar_common::llm::MockCompletion;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    const NO_FILTERS: &str =
        r#"{"location":[],"minPrice":null,"maxPrice":null,"bedrooms":null,"propertyType":[]}"#;

    fn app(mock: MockCompletion, rate_limit: RateLimitConfig) -> Router {
        let pipeline = SearchPipeline::new(
            Arc::new(mock),
            Arc::new(InMemoryStore::new()),
            &SearchConfig::default(),
        );
        create_router(
            AppState {
                pipeline: Arc::new(pipeline),
            },
            &rate_limit,
        )
    }

    fn no_limit() -> RateLimitConfig {
        RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        }
    }

    fn search_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/search")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(MockCompletion::new(), no_limit())
            .oneshot(Request::builder().uri("/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ready_with_memory_store() {
        let response = app(MockCompletion::new(), no_limit())
            .oneshot(Request::builder().uri("/v1/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["checks"]["store"]["status"], "up");
    }

    #[tokio::test]
    async fn test_search_returns_result_shape() {
        let mock = MockCompletion::new()
            .with_response(NO_FILTERS)
            .with_response("No listings are available yet.");

        let response = app(mock, no_limit())
            .oneshot(search_request(r#"{"query":"3BR in New Cairo"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["answer"], "No listings are available yet.");
        assert_eq!(body["sources"], serde_json::json!([]));
        assert_eq!(body["mapPins"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let response = app(MockCompletion::new(), no_limit())
            .oneshot(search_request(r#"{"query":"","language":"ar"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_language_rejected() {
        let response = app(MockCompletion::new(), no_limit())
            .oneshot(search_request(r#"{"query":"villa","language":"fr"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_localized() {
        let mock = MockCompletion::new()
            .with_response(NO_FILTERS)
            .with_failure("invalid x-api-key sk-ant-123");

        let response = app(mock, no_limit())
            .oneshot(search_request(r#"{"query":"فيلا","language":"ar"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
        let message = body["error"]["message"].as_str().unwrap();
        assert!(message.contains("البحث"));
        assert!(!message.contains("sk-ant"));
    }

    #[tokio::test]
    async fn test_search_rate_limited() {
        let limited = RateLimitConfig {
            requests_per_second: 1,
            burst: 1,
            enabled: true,
        };
        let router = app(MockCompletion::new(), limited);

        let first = router.clone().oneshot(search_request(r#"{"query":"a"}"#)).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = router.clone().oneshot(search_request(r#"{"query":"b"}"#)).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        // health is exempt
        let health = router
            .oneshot(Request::builder().uri("/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }
}
