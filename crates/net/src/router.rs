use axum::routing::MethodRouter;
use axum::Router;
use tracing::debug;

/// A path together with the router serving every method on it.
pub type Component<S> = (String, Router<S>);

/// Mounts all methods for `path` at once, so two components never claim the
/// same path.
pub fn route_builder<S>(path: impl Into<String>, methods: MethodRouter<S>) -> Component<S>
where
    S: Clone + Send + Sync + 'static,
{
    let path = path.into();
    let router = Router::new().route(&path, methods);
    (path, router)
}

pub fn main_router<S>(components: Vec<Component<S>>, state: S) -> Router
where
    S: Clone + Send + Sync + 'static,
{
    components
        .into_iter()
        .fold(Router::new(), |app, (path, router)| {
            debug!(path = %path, "Registering route");
            app.merge(router)
        })
        .with_state(state)
}
