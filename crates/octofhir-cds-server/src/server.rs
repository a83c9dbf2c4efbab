use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use octofhir_cds_core::{CdsError, Dispatcher, HookValidator, ServiceRegistry};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::{
    config::AppConfig,
    handlers,
    middleware as app_middleware,
    services,
};

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub base_url: Arc<str>,
}

pub struct OctofhirCdsServer {
    addr: SocketAddr,
    app: Router,
}

/// Routes of the CDS Hooks surface, relative to the mount path.
fn cds_routes(cfg: &AppConfig, state: AppState) -> Router {
    let mut router = Router::new()
        .route("/cds-services", get(handlers::discovery))
        .route("/cds-services/{id}", post(handlers::invoke_service))
        .route("/cds-services/{id}/feedback", post(handlers::feedback));

    if cfg.cds.cors {
        router = app_middleware::with_cds_cors(
            router
                .route("/cds-services", axum::routing::options(handlers::preflight))
                .route("/cds-services/{id}", axum::routing::options(handlers::preflight)),
        );
    }

    router.with_state(state)
}

pub fn build_app(cfg: &AppConfig, registry: ServiceRegistry) -> Result<Router, CdsError> {
    let validator = HookValidator::new(cfg.cds.context_options())?;
    let state = AppState {
        dispatcher: Dispatcher::new(registry, validator),
        base_url: Arc::from(cfg.base_url()),
    };
    let body_limit = cfg.server.body_limit_bytes;

    let cds = cds_routes(cfg, state.clone());
    let cds = if cfg.cds.mount_path.is_empty() {
        cds
    } else {
        Router::new().nest(&cfg.cds.mount_path, cds)
    };

    let app = Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .with_state(state)
        .merge(cds)
        // Middleware stack (inner to outer: body limit -> compression -> trace -> request id)
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id));

    Ok(app)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    registry: Option<ServiceRegistry>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            registry: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Serve `registry` instead of the one derived from the configuration.
    pub fn with_registry(mut self, registry: ServiceRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<OctofhirCdsServer, CdsError> {
        let registry = match self.registry {
            Some(registry) => registry,
            None => services::build_registry(&self.config.cds, Vec::new())?,
        };
        tracing::info!(
            services = registry.len(),
            cors = self.config.cds.cors,
            mount_path = %self.config.cds.mount_path,
            "CDS service registry ready"
        );
        let app = build_app(&self.config, registry)?;

        Ok(OctofhirCdsServer {
            addr: self.addr,
            app,
        })
    }
}

impl OctofhirCdsServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
