//! Request pipeline stages. The global ones wrap the whole router; CSRF validation,
//! authentication resolution and the authorization gate are attached per route.

use std::any::Any;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::cookie::Cookie;
use tracing::{error, info, warn};

use crate::{
    app_state::AppState,
    csrf::{token_from_form, validate_csrf_token, CSRF_HEADER},
    models::ModelError,
    sessions::AppSession,
};

use super::{error::AppError, extract::Authentication, utils::server_error_response};

/// Upper bound on a form body buffered while looking for the CSRF field.
pub const CSRF_BODY_LIMIT: usize = 64 * 1024;

/// Response for a handler that panicked. The connection is not reused afterwards.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        message
    } else {
        "unknown panic payload"
    };
    error!(target: "http", panic = %detail, "request handler panicked");

    let mut response = server_error_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

pub async fn secure_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-xss-protection"),
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("deny"));
    response
}

/// Hold the lock for the request's session token until the session layer has written the
/// record back. Requests without a session cookie run unserialized.
pub async fn serialize_session_access(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(token) = session_token(req.headers(), &state.config().session.cookie_name) else {
        return next.run(req).await;
    };

    let _guard = state.session_locks().acquire(&token).await;
    next.run(req).await
}

fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == cookie_name)
        .map(|cookie| cookie.value().to_owned())
}

/// Reject state-changing requests whose token does not match the session's.
pub async fn verify_csrf(session: AppSession, req: Request, next: Next) -> Response {
    if req.method().is_safe() {
        return next.run(req).await;
    }

    let (parts, body) = req.into_parts();
    let header_token = parts
        .headers
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let (provided, body) = match header_token {
        Some(token) => (token, body),
        None => {
            let bytes = match to_bytes(body, CSRF_BODY_LIMIT).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(target: "csrf", %err, path = %parts.uri.path(), "unable to buffer request body");
                    return AppError::BadRequest.into_response();
                }
            };
            (token_from_form(&bytes).unwrap_or_default(), Body::from(bytes))
        }
    };

    match validate_csrf_token(&session, &provided).await {
        Ok(true) => next.run(Request::from_parts(parts, body)).await,
        Ok(false) => {
            warn!(
                target: "csrf",
                method = %parts.method,
                path = %parts.uri.path(),
                "missing or invalid CSRF token"
            );
            AppError::BadRequest.into_response()
        }
        Err(err) => AppError::Session(err).into_response(),
    }
}

/// Resolve the session's user and attach the [`Authentication`] result to the request. A user
/// that vanished or was deactivated is dropped from the session without failing the request.
pub async fn authenticate(
    State(state): State<AppState>,
    session: AppSession,
    mut req: Request,
    next: Next,
) -> Response {
    let user_id = match session.authenticated_user_id().await {
        Ok(user_id) => user_id,
        Err(err) => return AppError::Session(err).into_response(),
    };

    let authentication = match user_id {
        None => Authentication::Anonymous,
        Some(user_id) => match state.users().get(user_id).await {
            Ok(user) if user.active => Authentication::Authenticated(user),
            Ok(_) | Err(ModelError::NotFound) => {
                info!(target: "auth", user_id, "clearing session for missing or inactive user");
                if let Err(err) = session.clear_user().await {
                    return AppError::Session(err).into_response();
                }
                Authentication::Anonymous
            }
            Err(err) => {
                error!(target: "auth", user_id, %err, "failed to load session user");
                return server_error_response();
            }
        },
    };

    req.extensions_mut().insert(authentication);
    next.run(req).await
}

/// Send anonymous visitors to the login form. Page loads are remembered as the post-login
/// destination; form submissions are not, since the browser cannot replay them with a GET.
pub async fn require_authentication(session: AppSession, req: Request, next: Next) -> Response {
    let authenticated = req
        .extensions()
        .get::<Authentication>()
        .is_some_and(Authentication::is_authenticated);

    if !authenticated {
        let revisitable = req.method() == Method::GET || req.method() == Method::HEAD;
        if revisitable {
            if let Err(err) = session.remember_redirect(req.uri().path()).await {
                return AppError::Session(err).into_response();
            }
        }
        return Redirect::to("/user/login").into_response();
    }

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
