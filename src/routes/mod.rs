use crate::config::rate_limit::{RateLimitConfig, RateLimitRule};
use crate::handlers;
use crate::middleware::auth::{auth_middleware, optional_auth_middleware};
use axum::{middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes() -> Router {
    Router::new().nest("/api/v1", api_routes())
}

fn api_routes() -> Router {
    let rate_limit_config = RateLimitConfig::from_env();

    let public_read = public_read_routes(&rate_limit_config);
    // Stats is public but reports the caller's own vote when a valid
    // token is present.
    let stats = stats_routes(&rate_limit_config)
        .layer(middleware::from_fn(optional_auth_middleware));
    let write = write_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));

    public_read.merge(stats).merge(write)
}

/// Public reads: directory browsing and voter listings.
fn public_read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route(
            "/locations",
            routing::get(handlers::location::list_locations),
        )
        .route(
            "/locations/{id}",
            routing::get(handlers::location::get_location),
        )
        .route(
            "/votes/{target_id}/voters",
            routing::get(handlers::vote::list_voters),
        );

    with_optional_rate_limit(router, config.enabled, config.public_read)
}

fn stats_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new().route(
        "/votes/{target_id}/stats",
        routing::get(handlers::vote::get_vote_stats),
    );

    with_optional_rate_limit(router, config.enabled, config.public_read)
}

/// Authenticated writes: cast and remove votes.
fn write_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new().route(
        "/votes/{target_id}",
        routing::post(handlers::vote::cast_vote).delete(handlers::vote::remove_vote),
    );

    with_optional_rate_limit(router, config.enabled, config.write)
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
        .expect("Invalid rate limit configuration");

    router.layer(GovernorLayer::new(governor_conf))
}
