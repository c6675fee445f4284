use axum::extract::DefaultBodyLimit;
use axum::http::{self, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use crate::auth::TokenDecoder;
use crate::profile::{create_profile, get_profile};
use crate::router::{main_router, route_builder, Component};
use profile_database::ProfileStore;
use profile_storage::ObjectStorage;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Room for the text fields and multipart framing on top of the avatar.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Collaborators handed to every handler.
#[derive(Clone)]
pub struct AppState<T: ProfileStore> {
    pub database: T,
    pub storage: Arc<dyn ObjectStorage>,
    pub tokens: Arc<dyn TokenDecoder>,
    pub max_avatar_bytes: usize,
}

pub fn build_app<T: ProfileStore>(state: AppState<T>, cors_origins: &[String]) -> Router {
    let body_limit = state.max_avatar_bytes + FORM_OVERHEAD_BYTES;
    let components = collect_components::<T>();

    let allow_origin = if cors_origins.is_empty() || cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            cors_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS
        ])
        .allow_headers(Any)
        .allow_credentials(false);

    main_router(components, state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve<T: ProfileStore>(
    address: &str,
    state: AppState<T>,
    cors_origins: &[String],
) -> std::io::Result<()> {
    let app = build_app(state, cors_origins);

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!(address = %listener.local_addr()?, "Listening");
    axum::serve(listener, app).await
}

async fn health() -> &'static str {
    "ok"
}

fn collect_components<T: ProfileStore>() -> Vec<Component<AppState<T>>> {
    let router_profile = route_builder(
        "/users/{user_id}/profile/",
        post(create_profile::<T>).get(get_profile::<T>),
    );
    let router_health = route_builder("/health", get(health));

    vec![router_profile, router_health]
}
