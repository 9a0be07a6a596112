//! HTTP server for the Prometheus metrics endpoint.

use crate::exporter::Exporter;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
struct AppState {
    exporter: Arc<Exporter>,
    metrics_path: Arc<str>,
}

/// HTTP server for metrics endpoint
pub struct MetricsServer {
    exporter: Arc<Exporter>,
    listen_addr: String,
    metrics_path: String,
}

impl MetricsServer {
    pub fn new(exporter: Arc<Exporter>, listen_addr: String, metrics_path: String) -> Self {
        Self {
            exporter,
            listen_addr,
            metrics_path,
        }
    }

    /// Routes served by the exporter.
    pub fn router(&self) -> Router {
        let state = AppState {
            exporter: self.exporter.clone(),
            metrics_path: Arc::from(self.metrics_path.as_str()),
        };

        Router::new()
            .route(&self.metrics_path, get(metrics_handler))
            .route("/", get(index_handler))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(state)
    }

    /// Run the HTTP server
    pub async fn run(self) -> std::io::Result<()> {
        let app = self.router();

        let listener = TcpListener::bind(&self.listen_addr).await?;
        info!(
            listen_addr = %self.listen_addr,
            metrics_path = %self.metrics_path,
            "Metrics server listening"
        );

        axum::serve(listener, app).await
    }
}

/// Handler for the metrics endpoint
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let metrics = state.exporter.scrape().await;

    match metrics.encode() {
        Ok(buffer) => (
            StatusCode::OK,
            [(
                "content-type",
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            buffer,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>
<head><title>Keepalived Exporter</title></head>
<body>
<h1>Keepalived Exporter</h1>
<p><a href='{}'>Metrics</a></p>
</body>
</html>
",
        state.metrics_path
    ))
}
