use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tracing::info;

use crate::{
    app_state::AppState,
    forms::Form,
    models::ModelError,
    server::{
        error::AppError,
        extract::{Authentication, CurrentUser, SubmittedForm},
    },
    sessions::AppSession,
    templates::{HtmlTemplate, PasswordTemplate, ProfileTemplate, UserView},
};

use super::{auth::PASSWORD_MIN_LENGTH, shared::layout_from_session};

pub async fn profile_handler(
    State(state): State<AppState>,
    session: AppSession,
    auth: Authentication,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    let layout = layout_from_session(&state, &session, &auth, "Profile").await;
    HtmlTemplate::new(ProfileTemplate {
        layout,
        user: UserView::from(user),
    })
}

pub async fn change_password_form_handler(
    State(state): State<AppState>,
    session: AppSession,
    auth: Authentication,
) -> Response {
    render_password_form(&state, &session, &auth, Form::new()).await
}

pub async fn change_password_handler(
    State(state): State<AppState>,
    session: AppSession,
    auth: Authentication,
    CurrentUser(user): CurrentUser,
    SubmittedForm(mut form): SubmittedForm,
) -> Result<Response, AppError> {
    form.required(&["currentPassword", "newPassword", "confirmPassword"]);
    form.min_length("newPassword", PASSWORD_MIN_LENGTH);
    if form.get("newPassword") != form.get("confirmPassword") {
        form.errors.add("confirmPassword", "Passwords do not match");
    }

    if !form.valid() {
        return Ok(render_password_form(&state, &session, &auth, form).await);
    }

    let result = state
        .users()
        .change_password(
            user.id,
            form.get("currentPassword"),
            form.get("newPassword"),
        )
        .await;

    match result {
        Ok(()) => {}
        Err(ModelError::InvalidCredentials) => {
            form.errors
                .add("currentPassword", "Current password is incorrect");
            return Ok(render_password_form(&state, &session, &auth, form).await);
        }
        Err(err) => return Err(err.into()),
    }

    info!(target: "auth", user_id = user.id, "password changed");
    session.put_flash("Your password has been updated!").await?;

    Ok(Redirect::to("/user/profile").into_response())
}

async fn render_password_form(
    state: &AppState,
    session: &AppSession,
    auth: &Authentication,
    form: Form,
) -> Response {
    let layout = layout_from_session(state, session, auth, "Change Password").await;
    HtmlTemplate::new(PasswordTemplate { layout, form }).into_response()
}
