//! # api-adapters
//!
//! The HTTP delivery layer of the forum service. With `web-axum` enabled this
//! crate builds the axum [`Router`](axum::Router) that serves `/api` and
//! `/metrics`.

pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;

pub use metrics::ApiMetrics;

#[cfg(feature = "web-axum")]
pub use router::{router, AppState};

#[cfg(feature = "web-axum")]
mod router {
    use axum::routing::{get, post};
    use axum::Router;
    use services::Services;
    use tower::ServiceBuilder;
    use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

    use crate::metrics::ApiMetrics;
    use crate::{handlers, middleware};

    /// State shared by every handler.
    #[derive(Clone)]
    pub struct AppState {
        pub services: Services,
        pub metrics: ApiMetrics,
    }

    impl AppState {
        pub fn new(services: Services) -> Self {
            Self { services, metrics: ApiMetrics::new() }
        }
    }

    pub fn router(state: AppState) -> Router {
        let api = Router::new()
            .route("/user/{nickname}/create", post(handlers::create_user))
            .route(
                "/user/{nickname}/profile",
                get(handlers::user_profile).post(handlers::update_user),
            )
            .route("/forum/create", post(handlers::create_forum))
            .route("/forum/{slug}/details", get(handlers::forum_details))
            .route("/forum/{slug}/create", post(handlers::create_thread))
            .route("/forum/{slug}/users", get(handlers::forum_users))
            .route("/forum/{slug}/threads", get(handlers::forum_threads))
            .route(
                "/thread/{slug_or_id}/details",
                get(handlers::thread_details).post(handlers::update_thread),
            )
            .route("/thread/{slug_or_id}/create", post(handlers::add_posts))
            .route("/thread/{slug_or_id}/posts", get(handlers::thread_posts))
            .route("/thread/{slug_or_id}/vote", post(handlers::vote))
            .route("/post/{id}/details", get(handlers::post_details).post(handlers::edit_post))
            .route("/service/status", get(handlers::status))
            .route("/service/clear", post(handlers::clear));

        Router::new()
            .nest("/api", api)
            .route("/metrics", get(handlers::metrics))
            .route_layer(axum::middleware::from_fn_with_state(
                state.metrics.clone(),
                middleware::track_metrics,
            ))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(middleware::trace_layer())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(middleware::cors_layer()),
            )
    }
}
