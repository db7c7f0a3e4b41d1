use subtle::ConstantTimeEq;
use tower_sessions::session::Error as SessionError;

use crate::sessions::{AppSession, SESSION_CSRF_KEY};

/// Form field carrying the token on state-changing submissions.
pub const CSRF_FORM_FIELD: &str = "csrf_token";
/// Header alternative to the form field.
pub const CSRF_HEADER: &str = "x-csrf-token";

const CSRF_TOKEN_LENGTH: usize = 64;

/// Retrieve the CSRF token for the current session or generate a new one.
pub async fn ensure_csrf_token(session: &AppSession) -> Result<String, SessionError> {
    let token = session.get::<String>(SESSION_CSRF_KEY).await?;
    if !token.is_empty() {
        return Ok(token);
    }

    let token = nanoid::nanoid!(CSRF_TOKEN_LENGTH);
    session.put(SESSION_CSRF_KEY, &token).await?;
    Ok(token)
}

/// Replace the session's token. Called whenever the privilege level of the session changes.
pub async fn rotate_csrf_token(session: &AppSession) -> Result<String, SessionError> {
    session.remove(SESSION_CSRF_KEY).await?;
    ensure_csrf_token(session).await
}

/// Validate a submitted token against the session-stored value. A session without a token never
/// validates.
pub async fn validate_csrf_token(
    session: &AppSession,
    provided: &str,
) -> Result<bool, SessionError> {
    let expected = session.get::<String>(SESSION_CSRF_KEY).await?;
    Ok(tokens_match(&expected, provided))
}

fn tokens_match(expected: &str, provided: &str) -> bool {
    if expected.is_empty() || provided.is_empty() {
        return false;
    }
    expected.as_bytes().ct_eq(provided.as_bytes()).unwrap_u8() == 1
}

/// Pull the token field out of an urlencoded form body.
pub fn token_from_form(body: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == CSRF_FORM_FIELD)
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::{MemoryStore, Session};

    fn session() -> AppSession {
        AppSession::new(Session::new(None, Arc::new(MemoryStore::default()), None))
    }

    #[tokio::test]
    async fn ensure_is_stable_until_rotated() {
        let session = session();
        let first = ensure_csrf_token(&session).await.unwrap();
        assert_eq!(first.len(), CSRF_TOKEN_LENGTH);
        assert_eq!(ensure_csrf_token(&session).await.unwrap(), first);

        let rotated = rotate_csrf_token(&session).await.unwrap();
        assert_ne!(rotated, first);
        assert!(!validate_csrf_token(&session, &first).await.unwrap());
        assert!(validate_csrf_token(&session, &rotated).await.unwrap());
    }

    #[tokio::test]
    async fn missing_session_token_never_validates() {
        let session = session();
        assert!(!validate_csrf_token(&session, "").await.unwrap());
        assert!(!validate_csrf_token(&session, "anything").await.unwrap());
    }

    #[test]
    fn extracts_token_from_form_body() {
        let body = b"title=Hi+there&csrf_token=abc%2Fdef&content=x";
        assert_eq!(token_from_form(body).as_deref(), Some("abc/def"));
        assert_eq!(token_from_form(b"title=x"), None);
    }

    #[test]
    fn comparison_rejects_prefixes() {
        assert!(tokens_match("abcdef", "abcdef"));
        assert!(!tokens_match("abcdef", "abc"));
        assert!(!tokens_match("", ""));
    }
}
