use tracing::error;

use crate::{
    app_state::AppState, server::extract::Authentication, sessions::AppSession,
    templates::LayoutContext,
};

/// Build a [`LayoutContext`] from the current session, falling back to a state-only context when
/// the session lookup fails.
pub async fn layout_from_session(
    state: &AppState,
    session: &AppSession,
    auth: &Authentication,
    title: &str,
) -> LayoutContext {
    match LayoutContext::from_session(state, session, auth, title).await {
        Ok(layout) => layout,
        Err(err) => {
            error!(target: "templates", %err, "failed to build layout context from session");
            LayoutContext {
                is_authenticated: auth.is_authenticated(),
                ..LayoutContext::from_state(state, title)
            }
        }
    }
}
