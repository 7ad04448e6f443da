//! HTTP host for the user management server.
//!
//! Owns the listening socket, the global middleware stack and the
//! service-level endpoints (`/health`, `/openapi.json`, `/docs`).
//! Feature modules contribute a plain `axum::Router` that is merged in.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{middleware::from_fn, routing::get, Router};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;

const HANDLER_TIMEOUT: Duration = Duration::from_secs(30);
const BODY_LIMIT_BYTES: usize = 16 * 1024 * 1024;

pub struct ApiIngress {
    config: ApiIngressConfig,
    openapi: Option<utoipa::openapi::OpenApi>,
    request_timeout: Duration,
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config,
            openapi: None,
            request_timeout: HANDLER_TIMEOUT,
        }
    }

    /// Override the per-request handler timeout (defaults to 30s).
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Attach the OpenAPI document served at `/openapi.json` when docs are enabled.
    pub fn with_openapi(mut self, doc: utoipa::openapi::OpenApi) -> Self {
        self.openapi = Some(doc);
        self
    }

    pub fn config(&self) -> &ApiIngressConfig {
        &self.config
    }

    /// Merge module routes with the host endpoints and wrap them in the middleware stack.
    pub fn build_router(&self, module_routes: Router) -> Result<Router> {
        tracing::debug!("Building HTTP router");
        let mut router = Router::new()
            .route("/health", get(web::health_check))
            .merge(module_routes);

        if self.config.enable_docs {
            let doc = self
                .openapi
                .as_ref()
                .map(serde_json::to_value)
                .transpose()
                .context("Failed to serialize OpenAPI document")?
                .unwrap_or_else(|| serde_json::json!({}));
            let doc = Arc::new(doc);

            router = router
                .route(
                    "/openapi.json",
                    get(move || {
                        let doc = doc.clone();
                        async move { axum::Json((*doc).clone()) }
                    }),
                )
                .route("/docs", get(web::serve_docs));
        }

        // Middleware order (outermost to innermost):
        // PropagateRequestId -> SetRequestId -> push_req_id_to_extensions -> Trace -> Timeout -> CORS -> BodyLimit
        // Router::layer wraps everything added so far, so the innermost layer goes first.
        let x_request_id = request_id::header();

        router = router.layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES));
        if self.config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }
        router = router
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(request_id::create_trace_layer())
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(SetRequestIdLayer::new(
                x_request_id.clone(),
                request_id::MakeReqId,
            ))
            .layer(PropagateRequestIdLayer::new(x_request_id));

        Ok(router)
    }

    /// Bind, serve until `cancel` fires, then drain in-flight requests.
    pub async fn serve(
        &self,
        router: Router,
        bind_addr: &str,
        cancel: CancellationToken,
    ) -> Result<()> {
        let addr: SocketAddr = bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address '{bind_addr}'"))?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        tracing::info!("HTTP server bound on {}", addr);

        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully");
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_is_always_mounted() {
        let ingress = ApiIngress::new(ApiIngressConfig::default());
        let router = ingress.build_router(Router::new()).unwrap();

        let resp = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn openapi_only_when_docs_enabled() {
        let router = ApiIngress::new(ApiIngressConfig::default())
            .build_router(Router::new())
            .unwrap();
        let resp = router
            .oneshot(Request::get("/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let config = ApiIngressConfig {
            enable_docs: true,
            ..Default::default()
        };
        let router = ApiIngress::new(config).build_router(Router::new()).unwrap();
        let resp = router
            .oneshot(Request::get("/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn serve_rejects_bad_bind_address() {
        let ingress = ApiIngress::new(ApiIngressConfig::default());
        let err = ingress
            .serve(Router::new(), "not-an-address", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid bind address"));
    }
}
