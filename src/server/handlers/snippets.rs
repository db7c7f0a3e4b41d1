use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::info;

use crate::{
    app_state::AppState,
    forms::Form,
    server::{
        error::AppError,
        extract::{Authentication, SubmittedForm},
    },
    sessions::AppSession,
    templates::{CreateTemplate, HtmlTemplate, ShowTemplate, SnippetView},
};

use super::shared::layout_from_session;

const TITLE_MAX_LENGTH: usize = 100;
const EXPIRY_CHOICES: [&str; 3] = ["365", "7", "1"];

/// Snippet ids are positive integers; anything else names no snippet.
fn parse_snippet_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id >= 1)
}

pub async fn show_snippet_handler(
    State(state): State<AppState>,
    session: AppSession,
    auth: Authentication,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_snippet_id(&raw_id).ok_or(AppError::NotFound)?;
    let snippet = state.snippets().get(id).await?;

    let title = format!("Snippet #{}", snippet.id);
    let layout = layout_from_session(&state, &session, &auth, &title).await;
    let template = ShowTemplate {
        layout,
        snippet: SnippetView::from(snippet),
    };

    Ok(HtmlTemplate::new(template).into_response())
}

pub async fn create_snippet_form_handler(
    State(state): State<AppState>,
    session: AppSession,
    auth: Authentication,
) -> Response {
    render_create_form(&state, &session, &auth, Form::new()).await
}

pub async fn create_snippet_handler(
    State(state): State<AppState>,
    session: AppSession,
    auth: Authentication,
    SubmittedForm(mut form): SubmittedForm,
) -> Result<Response, AppError> {
    form.required(&["title", "content", "expires"]);
    form.max_length("title", TITLE_MAX_LENGTH);
    form.permitted_values("expires", &EXPIRY_CHOICES);

    if !form.valid() {
        return Ok(render_create_form(&state, &session, &auth, form).await);
    }

    let expires_in_days: i64 = form
        .get("expires")
        .parse()
        .map_err(|_| AppError::BadRequest)?;

    let id = state
        .snippets()
        .insert(form.get("title"), form.get("content"), expires_in_days)
        .await?;
    info!(target: "snippets", id, expires_in_days, "snippet created");

    session.put_flash("Snippet successfully created!").await?;

    Ok(Redirect::to(&format!("/snippet/{id}")).into_response())
}

async fn render_create_form(
    state: &AppState,
    session: &AppSession,
    auth: &Authentication,
    form: Form,
) -> Response {
    let layout = layout_from_session(state, session, auth, "Create a New Snippet").await;
    HtmlTemplate::new(CreateTemplate { layout, form }).into_response()
}

#[cfg(test)]
mod tests {
    use super::parse_snippet_id;

    #[test]
    fn only_positive_integers_are_ids() {
        assert_eq!(parse_snippet_id("1"), Some(1));
        assert_eq!(parse_snippet_id("42"), Some(42));
        for raw in ["0", "-1", "1.23", "foo", "", "1abc", "99999999999999999999"] {
            assert_eq!(parse_snippet_id(raw), None, "{raw:?}");
        }
    }
}
