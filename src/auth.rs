use bcrypt::BcryptError;
use thiserror::Error;
use tokio::{sync::OnceCell, task};

/// Work factor applied when no explicit cost is configured.
pub const DEFAULT_BCRYPT_COST: u32 = 12;
/// Lowest cost accepted by bcrypt.
pub const MIN_BCRYPT_COST: u32 = 4;
/// Highest cost accepted by bcrypt.
pub const MAX_BCRYPT_COST: u32 = 31;

/// Password hashed once per process to give unknown-user logins a digest to verify against.
const DUMMY_PASSWORD: &str = "snippetbox-timing-equalizer";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Password hashing join error: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Password hashing error: {0}")]
    Hash(BcryptError),
    #[error("Stored password digest is malformed: {0}")]
    MalformedDigest(BcryptError),
}

/// Salted bcrypt hashing and verification at a fixed work factor.
#[derive(Debug)]
pub struct Credentials {
    cost: u32,
    dummy_digest: OnceCell<String>,
}

impl Credentials {
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_BCRYPT_COST, MAX_BCRYPT_COST),
            dummy_digest: OnceCell::new(),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password on the blocking pool.
    pub async fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let password = password.to_owned();
        let cost = self.cost;

        task::spawn_blocking(move || bcrypt::hash(password, cost).map_err(CredentialError::Hash))
            .await?
    }

    /// Verify a password against a stored digest. A mismatch is `Ok(false)`; only a digest that
    /// cannot be parsed is an error.
    pub async fn verify(&self, digest: &str, password: &str) -> Result<bool, CredentialError> {
        let password = password.to_owned();
        let digest = digest.to_owned();

        task::spawn_blocking(move || {
            bcrypt::verify(password, &digest).map_err(CredentialError::MalformedDigest)
        })
        .await?
    }

    /// Burn the same amount of work as a real verification so that a missing account cannot be
    /// told apart from a wrong password by response time.
    pub async fn verify_dummy(&self, password: &str) -> Result<(), CredentialError> {
        let digest = self
            .dummy_digest
            .get_or_try_init(|| self.hash(DUMMY_PASSWORD))
            .await?;
        self.verify(digest, password).await?;
        Ok(())
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}
