use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{error, warn};

use crate::{forms::Form, models::User};

use super::{error::AppError, utils::server_error_response};

/// Outcome of resolving the session's user, attached to every request that passes through the
/// authentication stage.
#[derive(Clone, Debug)]
pub enum Authentication {
    Anonymous,
    Authenticated(User),
}

impl Authentication {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Authentication::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Authentication::Authenticated(user) => Some(user),
            Authentication::Anonymous => None,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Authentication
where
    S: Send + Sync,
{
    type Rejection = Response;

    /// Handlers on routes without the authentication stage get a 500 instead of a silent
    /// anonymous identity.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Authentication>().cloned().ok_or_else(|| {
            error!(
                target: "auth",
                path = %parts.uri.path(),
                "route is missing the authentication stage"
            );
            server_error_response()
        })
    }
}

/// The authenticated user of a protected route.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Authentication>() {
            Some(Authentication::Authenticated(user)) => Ok(CurrentUser(user.clone())),
            _ => {
                warn!(target: "auth", path = %parts.uri.path(), "protected handler reached without a user");
                Err(Redirect::to("/user/login").into_response())
            }
        }
    }
}

/// An urlencoded form body decoded into a [`Form`]. Undecodable bodies are a client error.
pub struct SubmittedForm(pub Form);

#[async_trait]
impl<S> FromRequest<S> for SubmittedForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Form::<Vec<(String, String)>>::from_request(req, state).await {
            Ok(axum::Form(pairs)) => Ok(SubmittedForm(Form::from_pairs(pairs))),
            Err(rejection) => {
                warn!(target: "http", %rejection, "unable to decode form body");
                Err(AppError::BadRequest)
            }
        }
    }
}
