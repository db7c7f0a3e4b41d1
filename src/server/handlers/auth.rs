use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{error, info, warn};

use crate::{
    app_state::AppState,
    csrf,
    forms::{Form, EMAIL_RX, GENERIC_ERROR_KEY},
    models::ModelError,
    server::{
        error::AppError,
        extract::{Authentication, SubmittedForm},
    },
    sessions::AppSession,
    templates::{HtmlTemplate, LoginTemplate, SignupTemplate},
};

use super::shared::layout_from_session;

const NAME_MAX_LENGTH: usize = 255;
const EMAIL_MAX_LENGTH: usize = 255;
pub const PASSWORD_MIN_LENGTH: usize = 10;
const DEFAULT_LOGIN_REDIRECT: &str = "/snippet/create";
const INVALID_CREDENTIALS_MESSAGE: &str = "Email or Password is incorrect";

pub async fn signup_form_handler(
    State(state): State<AppState>,
    session: AppSession,
    auth: Authentication,
) -> Response {
    render_signup_form(&state, &session, &auth, Form::new()).await
}

pub async fn signup_submit_handler(
    State(state): State<AppState>,
    session: AppSession,
    auth: Authentication,
    SubmittedForm(mut form): SubmittedForm,
) -> Result<Response, AppError> {
    form.required(&["name", "email", "password"]);
    form.max_length("name", NAME_MAX_LENGTH);
    form.max_length("email", EMAIL_MAX_LENGTH);
    form.matches_pattern("email", &EMAIL_RX);
    form.min_length("password", PASSWORD_MIN_LENGTH);

    if !form.valid() {
        return Ok(render_signup_form(&state, &session, &auth, form).await);
    }

    let result = state
        .users()
        .insert(form.get("name"), form.get("email"), form.get("password"))
        .await;

    match result {
        Ok(()) => {}
        Err(ModelError::DuplicateEmail) => {
            info!(target: "auth", "signup rejected for an address already in use");
            form.errors.add("email", "Address is already in use");
            return Ok(render_signup_form(&state, &session, &auth, form).await);
        }
        Err(err) => return Err(err.into()),
    }

    session
        .put_flash("Your signup was successful. Please log in.")
        .await?;

    Ok(Redirect::to("/user/login").into_response())
}

pub async fn login_form_handler(
    State(state): State<AppState>,
    session: AppSession,
    auth: Authentication,
) -> Response {
    render_login_form(&state, &session, &auth, Form::new()).await
}

pub async fn login_submit_handler(
    State(state): State<AppState>,
    session: AppSession,
    auth: Authentication,
    SubmittedForm(mut form): SubmittedForm,
) -> Result<Response, AppError> {
    let result = state
        .users()
        .authenticate(form.get("email"), form.get("password"))
        .await;

    let user_id = match result {
        Ok(user_id) => user_id,
        Err(ModelError::InvalidCredentials) => {
            warn!(target: "auth", "failed login attempt");
            form.errors.add(GENERIC_ERROR_KEY, INVALID_CREDENTIALS_MESSAGE);
            return Ok(render_login_form(&state, &session, &auth, form).await);
        }
        Err(err) => return Err(err.into()),
    };

    session.cycle_id().await?;
    session.store_user_id(user_id).await?;

    if let Err(err) = csrf::rotate_csrf_token(&session).await {
        error!(target: "auth", %err, "failed to rotate CSRF token after login");
    }

    let target = session
        .take_redirect()
        .await?
        .unwrap_or_else(|| DEFAULT_LOGIN_REDIRECT.to_string());
    info!(target: "auth", user_id, "user logged in");

    Ok(Redirect::to(&target).into_response())
}

pub async fn logout_handler(session: AppSession) -> Result<Response, AppError> {
    session.clear_user().await?;
    session.cycle_id().await?;

    if let Err(err) = csrf::rotate_csrf_token(&session).await {
        error!(target: "auth", %err, "failed to rotate CSRF token during logout");
    }

    session.put_flash("You've been logged out").await?;

    Ok(Redirect::to("/").into_response())
}

async fn render_signup_form(
    state: &AppState,
    session: &AppSession,
    auth: &Authentication,
    form: Form,
) -> Response {
    let layout = layout_from_session(state, session, auth, "Signup").await;
    HtmlTemplate::new(SignupTemplate { layout, form }).into_response()
}

async fn render_login_form(
    state: &AppState,
    session: &AppSession,
    auth: &Authentication,
    form: Form,
) -> Response {
    let layout = layout_from_session(state, session, auth, "Login").await;
    HtmlTemplate::new(LoginTemplate { layout, form }).into_response()
}
