//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the landing page and the proxy handler
//! - Wire up middleware (tracing, request ID, CORS origin, optional timeout)
//! - Bind server to listener
//! - Swap in new runtime policy when configuration changes
//! - Record per-request metrics

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    response::Response,
    routing::any,
    Router,
};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::landing::landing_page;
use crate::http::request::{make_span, MakeRequestUuid};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::proxy::{self, Outcome, Runtime, RuntimeError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ArcSwap<Runtime>>,
}

/// HTTP server for the download proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    runtime: Arc<ArcSwap<Runtime>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, RuntimeError> {
        let runtime = Arc::new(ArcSwap::from_pointee(Runtime::from_config(&config)?));

        let state = AppState {
            runtime: runtime.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            runtime,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/", any(landing_handler))
            .fallback(proxy_handler)
            .with_state(state);

        if let Some(secs) = config.timeouts.request_secs {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(secs)));
        }

        router
            .layer(SetResponseHeaderLayer::if_not_present(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(make_span::<Body>))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configurations received on `config_updates` replace the proxy policy
    /// for subsequent requests. Returns after `shutdown` fires and in-flight
    /// requests have drained.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            variant = ?self.config.policy.variant,
            "HTTP server starting"
        );

        let runtime = self.runtime.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match Runtime::from_config(&config) {
                    Ok(next) => {
                        runtime.store(Arc::new(next));
                        tracing::info!(variant = ?config.policy.variant, "Proxy policy reloaded");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected configuration update, keeping current policy");
                    }
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for driving requests without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Serves the landing page for `/`, whatever the method.
async fn landing_handler(State(state): State<AppState>) -> Response {
    let start_time = Instant::now();
    let response = landing_page(&state.runtime.load().landing);
    metrics::record_request(Outcome::Landing, response.status().as_u16(), start_time);
    response
}

/// Main proxy handler for every other path.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let runtime = state.runtime.load_full();

    let (outcome, response) = proxy::handle(&runtime, request).await;

    tracing::debug!(
        outcome = outcome.as_str(),
        status = %response.status(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Request handled"
    );
    metrics::record_request(outcome, response.status().as_u16(), start_time);

    response
}
