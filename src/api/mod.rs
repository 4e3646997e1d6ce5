use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::TokenKeys;
use crate::config::Config;
use crate::db::Store;

mod accounts;
mod catalog;
mod error;
mod guard;
mod photos;
mod system;
mod types;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    store: Store,
    token_keys: TokenKeys,
    config: Config,
}

impl AppState {
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub const fn token_keys(&self) -> &TokenKeys {
        &self.token_keys
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.database_url(),
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;

    let token_keys = TokenKeys::new(&config.auth.token_secret, config.auth.token_ttl_hours);

    Ok(Arc::new(AppState {
        store,
        token_keys,
        config,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let token_routes = Router::new()
        .route("/catalog/all", get(catalog::list_part_codes))
        .route("/search", get(photos::search_photos))
        .route("/photo/{part_code}/{filename}", get(photos::stream_photo))
        .route("/change-password", post(accounts::change_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_token,
        ));

    let admin_routes = Router::new()
        .route(
            "/admin/reset-password",
            post(accounts::admin_reset_password),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_admin_key,
        ));

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/health", get(system::health))
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
        .merge(token_routes)
        .merge(admin_routes)
        .with_state(state)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
