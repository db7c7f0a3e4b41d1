use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use time::OffsetDateTime;
use tower_sessions::session::Error as SessionError;
use tracing::error;

use crate::{
    app_state::AppState,
    csrf,
    forms::Form,
    models::{Snippet, User},
    server::{extract::Authentication, utils::format_datetime_utc},
    sessions::AppSession,
};

/// Shared layout context injected into all templates
#[derive(Clone, Debug)]
pub struct LayoutContext {
    pub title: String,
    pub brand_name: String,
    pub csrf_token: String,
    pub flash: Option<String>,
    pub is_authenticated: bool,
    pub current_year: i32,
}

impl LayoutContext {
    /// Build a layout context using the configured brand name
    pub fn from_state(state: &AppState, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            brand_name: state.config().ui.brand_name.clone(),
            csrf_token: String::new(),
            flash: None,
            is_authenticated: false,
            current_year: OffsetDateTime::now_utc().year(),
        }
    }

    /// Full context for a page: consumes the pending flash message and makes sure the session
    /// carries a CSRF token for the page's forms.
    pub async fn from_session(
        state: &AppState,
        session: &AppSession,
        auth: &Authentication,
        title: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let flash = session.pop_flash().await?;
        let csrf_token = csrf::ensure_csrf_token(session).await?;

        Ok(Self {
            csrf_token,
            flash,
            is_authenticated: auth.is_authenticated(),
            ..Self::from_state(state, title)
        })
    }
}

/// Wrapper that converts Askama templates into Axum responses with logging
pub struct HtmlTemplate<T: Template> {
    template: T,
}

impl<T: Template> HtmlTemplate<T> {
    pub fn new(template: T) -> Self {
        Self { template }
    }
}

impl<T: Template> From<T> for HtmlTemplate<T> {
    fn from(template: T) -> Self {
        Self::new(template)
    }
}

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.template.render() {
            Ok(html) => (StatusCode::OK, Html(html)).into_response(),
            Err(err) => {
                error!(target: "templates", error = %err, "failed to render template");
                crate::server::utils::server_error_response()
            }
        }
    }
}

/// Display-ready snippet.
#[derive(Clone, Debug)]
pub struct SnippetView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created: String,
    pub expires: String,
}

impl From<Snippet> for SnippetView {
    fn from(snippet: Snippet) -> Self {
        Self {
            id: snippet.id,
            created: snippet.created().map(format_datetime_utc).unwrap_or_default(),
            expires: snippet.expires().map(format_datetime_utc).unwrap_or_default(),
            title: snippet.title,
            content: snippet.content,
        }
    }
}

#[derive(Clone, Debug)]
pub struct UserView {
    pub name: String,
    pub email: String,
    pub joined: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            joined: user.created().map(format_datetime_utc).unwrap_or_default(),
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Template)]
#[template(path = "home.html", escape = "html")]
pub struct HomeTemplate {
    pub layout: LayoutContext,
    pub snippets: Vec<SnippetView>,
}

#[derive(Template)]
#[template(path = "show.html", escape = "html")]
pub struct ShowTemplate {
    pub layout: LayoutContext,
    pub snippet: SnippetView,
}

#[derive(Template)]
#[template(path = "create.html", escape = "html")]
pub struct CreateTemplate {
    pub layout: LayoutContext,
    pub form: Form,
}

#[derive(Template)]
#[template(path = "signup.html", escape = "html")]
pub struct SignupTemplate {
    pub layout: LayoutContext,
    pub form: Form,
}

#[derive(Template)]
#[template(path = "login.html", escape = "html")]
pub struct LoginTemplate {
    pub layout: LayoutContext,
    pub form: Form,
}

#[derive(Template)]
#[template(path = "profile.html", escape = "html")]
pub struct ProfileTemplate {
    pub layout: LayoutContext,
    pub user: UserView,
}

#[derive(Template)]
#[template(path = "password.html", escape = "html")]
pub struct PasswordTemplate {
    pub layout: LayoutContext,
    pub form: Form,
}

#[derive(Template)]
#[template(path = "about.html", escape = "html")]
pub struct AboutTemplate {
    pub layout: LayoutContext,
}
