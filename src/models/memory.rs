//! In-process stores with the same contracts as the SQLite ones. Used by the router tests and
//! handy for running the application without a database file.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{
    now_unix,
    snippets::{snippet_lifetime, Snippet, SnippetStore},
    users::{User, UserStore},
    ModelError, LATEST_SNIPPETS_LIMIT,
};
use crate::auth::Credentials;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct MemorySnippetStore {
    rows: Mutex<Vec<Snippet>>,
}

impl MemorySnippetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a snippet with explicit timestamps and return its id.
    pub fn insert_record(
        &self,
        title: &str,
        content: &str,
        created_at: i64,
        expires_at: i64,
    ) -> i64 {
        let mut rows = lock(&self.rows);
        let id = rows.iter().map(|row| row.id).max().unwrap_or(0) + 1;
        rows.push(Snippet {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created_at,
            expires_at,
        });
        id
    }
}

#[async_trait]
impl SnippetStore for MemorySnippetStore {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_in_days: i64,
    ) -> Result<i64, ModelError> {
        let (created_at, expires_at) = snippet_lifetime(expires_in_days);
        Ok(self.insert_record(title, content, created_at, expires_at))
    }

    async fn get(&self, id: i64) -> Result<Snippet, ModelError> {
        let now = now_unix();
        lock(&self.rows)
            .iter()
            .find(|row| row.id == id && row.is_visible_at(now))
            .cloned()
            .ok_or(ModelError::NotFound)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, ModelError> {
        let now = now_unix();
        let mut visible: Vec<Snippet> = lock(&self.rows)
            .iter()
            .filter(|row| row.is_visible_at(now))
            .cloned()
            .collect();

        visible.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        visible.truncate(LATEST_SNIPPETS_LIMIT as usize);
        Ok(visible)
    }

    async fn purge_expired(&self, now: i64) -> Result<u64, ModelError> {
        let mut rows = lock(&self.rows);
        let before = rows.len();
        rows.retain(|row| row.is_visible_at(now));
        Ok((before - rows.len()) as u64)
    }
}

struct UserRow {
    user: User,
    hashed_password: String,
}

pub struct MemoryUserStore {
    rows: Mutex<Vec<UserRow>>,
    credentials: Arc<Credentials>,
}

impl MemoryUserStore {
    pub fn new(credentials: Arc<Credentials>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            credentials,
        }
    }

    /// Flip the active flag of a user. Returns `false` when the id is unknown.
    pub fn set_active(&self, id: i64, active: bool) -> bool {
        match lock(&self.rows).iter_mut().find(|row| row.user.id == id) {
            Some(row) => {
                row.user.active = active;
                true
            }
            None => false,
        }
    }

    /// Drop a user entirely, as if the row had been deleted out from under a live session.
    pub fn delete(&self, id: i64) -> bool {
        let mut rows = lock(&self.rows);
        let before = rows.len();
        rows.retain(|row| row.user.id != id);
        before != rows.len()
    }

    fn password_for_active(&self, email: &str) -> Option<(i64, String)> {
        lock(&self.rows)
            .iter()
            .find(|row| row.user.active && row.user.email == email)
            .map(|row| (row.user.id, row.hashed_password.clone()))
    }

    fn password_for_id(&self, id: i64) -> Option<String> {
        lock(&self.rows)
            .iter()
            .find(|row| row.user.id == id)
            .map(|row| row.hashed_password.clone())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), ModelError> {
        let hashed_password = self.credentials.hash(password).await?;

        let mut rows = lock(&self.rows);
        if rows.iter().any(|row| row.user.email == email) {
            return Err(ModelError::DuplicateEmail);
        }

        let id = rows.iter().map(|row| row.user.id).max().unwrap_or(0) + 1;
        rows.push(UserRow {
            user: User {
                id,
                name: name.to_string(),
                email: email.to_string(),
                created_at: now_unix(),
                active: true,
            },
            hashed_password,
        });
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, ModelError> {
        let Some((id, digest)) = self.password_for_active(email) else {
            self.credentials.verify_dummy(password).await?;
            return Err(ModelError::InvalidCredentials);
        };

        if self.credentials.verify(&digest, password).await? {
            Ok(id)
        } else {
            Err(ModelError::InvalidCredentials)
        }
    }

    async fn get(&self, id: i64) -> Result<User, ModelError> {
        lock(&self.rows)
            .iter()
            .find(|row| row.user.id == id)
            .map(|row| row.user.clone())
            .ok_or(ModelError::NotFound)
    }

    async fn change_password(
        &self,
        id: i64,
        current: &str,
        new_password: &str,
    ) -> Result<(), ModelError> {
        let digest = self.password_for_id(id).ok_or(ModelError::NotFound)?;
        if !self.credentials.verify(&digest, current).await? {
            return Err(ModelError::InvalidCredentials);
        }

        let new_hash = self.credentials.hash(new_password).await?;
        let mut rows = lock(&self.rows);
        let row = rows
            .iter_mut()
            .find(|row| row.user.id == id)
            .ok_or(ModelError::NotFound)?;
        row.hashed_password = new_hash;
        Ok(())
    }
}
