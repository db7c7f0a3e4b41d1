use axum::{
    extract::State,
    response::{IntoResponse, Response},
};

use crate::{
    app_state::AppState,
    server::{error::AppError, extract::Authentication},
    sessions::AppSession,
    templates::{AboutTemplate, HomeTemplate, HtmlTemplate, SnippetView},
};

use super::shared::layout_from_session;

/// Render the latest unexpired snippets.
pub async fn home_handler(
    State(state): State<AppState>,
    session: AppSession,
    auth: Authentication,
) -> Result<Response, AppError> {
    let snippets = state.snippets().latest().await?;

    let layout = layout_from_session(&state, &session, &auth, "Home").await;
    let template = HomeTemplate {
        layout,
        snippets: snippets.into_iter().map(SnippetView::from).collect(),
    };

    Ok(HtmlTemplate::new(template).into_response())
}

pub async fn about_handler(
    State(state): State<AppState>,
    session: AppSession,
    auth: Authentication,
) -> impl IntoResponse {
    let layout = layout_from_session(&state, &session, &auth, "About").await;
    HtmlTemplate::new(AboutTemplate { layout })
}

/// Liveness probe.
pub async fn ping_handler() -> &'static str {
    "OK"
}
