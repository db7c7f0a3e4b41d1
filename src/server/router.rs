use std::{net::SocketAddr, time::Duration};

use axum::{
    extract::{ConnectInfo, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, MethodRouter},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::{Level, Span};

use crate::app_state::AppState;
use crate::server::{handlers, middleware};

/// Construct the application's HTTP router with all routes and middleware configured.
///
/// Global stages, outermost first: panic recovery, request tracing, security headers, request
/// timeout, per-session serialization, session loading. CSRF validation, user resolution and
/// the login gate are attached to each route so that an unsupported method on a known path is
/// answered with 405 before any of them run.
pub fn build_router<Store>(state: AppState, session_layer: SessionManagerLayer<Store>) -> Router
where
    Store: SessionStore + Clone,
{
    let request_timeout = Duration::from_secs(state.config().server.request_timeout_secs);

    Router::new()
        .route("/", public(&state, get(handlers::home::home_handler)))
        .route("/about", public(&state, get(handlers::home::about_handler)))
        .route("/ping", public(&state, get(handlers::home::ping_handler)))
        .route(
            "/snippet/:id",
            public(&state, get(handlers::snippets::show_snippet_handler)),
        )
        .route(
            "/snippet/create",
            protected(
                &state,
                get(handlers::snippets::create_snippet_form_handler)
                    .post(handlers::snippets::create_snippet_handler),
            ),
        )
        .route(
            "/user/signup",
            public(
                &state,
                get(handlers::auth::signup_form_handler)
                    .post(handlers::auth::signup_submit_handler),
            ),
        )
        .route(
            "/user/login",
            public(
                &state,
                get(handlers::auth::login_form_handler).post(handlers::auth::login_submit_handler),
            ),
        )
        .route(
            "/user/logout",
            protected(&state, post(handlers::auth::logout_handler)),
        )
        .route(
            "/user/profile",
            protected(&state, get(handlers::account::profile_handler)),
        )
        .route(
            "/user/change-password",
            protected(
                &state,
                get(handlers::account::change_password_form_handler)
                    .post(handlers::account::change_password_handler),
            ),
        )
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(middleware::handle_panic))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(request_span)
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(from_fn(middleware::secure_headers))
                .layer(TimeoutLayer::new(request_timeout))
                .layer(from_fn_with_state(
                    state.clone(),
                    middleware::serialize_session_access,
                ))
                .layer(session_layer),
        )
        .with_state(state)
}

/// CSRF validation and user resolution for every session-aware route.
fn public(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route
        .route_layer(from_fn_with_state(state.clone(), middleware::authenticate))
        .route_layer(from_fn(middleware::verify_csrf))
}

/// As [`public`], plus the login gate.
fn protected(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    public(
        state,
        route.route_layer(from_fn(middleware::require_authentication)),
    )
}

fn request_span(req: &Request) -> Span {
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());

    tracing::info_span!(
        target: "http",
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        version = ?req.version(),
        remote_addr = %remote_addr,
    )
}
