use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

#[cfg(not(test))]
use {
    std::net::IpAddr,
    std::sync::Arc,
    tower_governor::{governor::GovernorConfigBuilder, key_extractor::KeyExtractor, GovernorLayer},
};

use crate::api::handlers::{self, AppState};
use crate::config::Settings;

/// Create the router with all endpoints
#[cfg_attr(test, allow(unused_variables))]
pub fn create_router(state: AppState, settings: &Settings) -> Router {
    // The summarizer endpoint is public-facing and key-gated; CORS allows
    // any origin with the headers the key can arrive in
    let summarizer_cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ])
        .allow_origin(tower_http::cors::Any)
        .max_age(Duration::from_secs(3600));

    let summarizer_routes = Router::new()
        .route(
            "/github-summarizer",
            get(handlers::summarizer_status)
                .post(handlers::summarize_repo)
                .options(handlers::summarizer_preflight),
        )
        .layer(summarizer_cors)
        .with_state(state.clone());

    // Key management CRUD backing the dashboard
    let key_routes = Router::new()
        .route(
            "/api-keys",
            get(handlers::list_keys).post(handlers::create_key),
        )
        .route(
            "/api-keys/:id",
            get(handlers::get_key)
                .patch(handlers::rename_key)
                .delete(handlers::delete_key),
        )
        .route("/api-keys/:id/usage", get(handlers::key_usage))
        .with_state(state.clone());

    #[cfg_attr(test, allow(unused_mut))]
    let mut api_routes = summarizer_routes.merge(key_routes);

    // Apply IP-level rate limiting only in non-test builds. This is burst
    // protection per client address, independent of the per-key quota.
    // NOTE: The custom key extractor falls back to 127.0.0.1 when the peer
    // IP is unavailable; behind a reverse proxy, configure the proxy to set
    // X-Real-IP or X-Forwarded-For and use PeerIpKeyExtractor instead.
    #[cfg(not(test))]
    {
        #[derive(Clone, Copy, Debug)]
        struct FallbackIpKeyExtractor;

        impl KeyExtractor for FallbackIpKeyExtractor {
            type Key = IpAddr;

            fn extract<B>(
                &self,
                req: &axum::http::Request<B>,
            ) -> Result<Self::Key, tower_governor::GovernorError> {
                // Try to get peer IP from extensions (set by axum)
                if let Some(addr) = req.extensions().get::<std::net::SocketAddr>() {
                    return Ok(addr.ip());
                }

                // Fall back to localhost for local development/testing
                Ok(IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)))
            }
        }

        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .key_extractor(FallbackIpKeyExtractor)
                .per_second(settings.server.api_rate_limit)
                .burst_size(settings.server.api_rate_limit as u32 * 2)
                .finish()
                .unwrap(),
        );
        let governor_layer = GovernorLayer {
            config: governor_conf,
        };
        api_routes = api_routes.layer(governor_layer);
    }

    let api_routes = api_routes;

    // Health check routes
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    // Main router with middleware
    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            // Request body size limit - prevent memory exhaustion from large payloads
            RequestBodyLimitLayer::new(settings.server.max_request_body_size),
        )
        .layer(
            // Security headers
            SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(
            // Compression
            CompressionLayer::new(),
        )
        .layer(
            // Tracing
            TraceLayer::new_for_http(),
        )
}
