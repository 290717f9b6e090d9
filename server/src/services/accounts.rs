//! Users, plan tiers and login sessions.
//!
//! A user's identity is its [`UserId`]; the username is a separate unique
//! index that can change without touching the record's identity. The batch
//! pipeline never sees this module, only [`PlanLevel::max_batch_size`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Username must be 3-32 characters of letters, digits, '-' or '_'")]
    InvalidUsername,

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Unknown user")]
    UnknownUser,
}

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanLevel {
    Basic = 1,
    Pro = 2,
    Enterprise = 3,
}

impl PlanLevel {
    /// Largest accepted batch, or `None` when unbounded.
    pub fn max_batch_size(self) -> Option<usize> {
        match self {
            PlanLevel::Basic => Some(10),
            PlanLevel::Pro => Some(100),
            PlanLevel::Enterprise => None,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            PlanLevel::Basic => "Basic",
            PlanLevel::Pro => "Pro",
            PlanLevel::Enterprise => "Enterprise",
        }
    }

    /// Whether the tier may change barcode styling.
    pub fn allows_custom_style(self) -> bool {
        self == PlanLevel::Enterprise
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UserId(pub u32);

/// Salted SHA-256 password digest.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    salt: String,
    digest: String,
}

impl Credential {
    pub fn new(password: &str) -> Self {
        let salt = uuid::Uuid::new_v4().simple().to_string();
        let digest = Self::hash(&salt, password);
        Self { salt, digest }
    }

    pub fn verify(&self, password: &str) -> bool {
        Self::hash(&self.salt, password) == self.digest
    }

    fn hash(salt: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// Immutable user record.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub plan: PlanLevel,
    credential: Credential,
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub plan_level: u8,
    pub plan_name: &'static str,
    /// `null` when unbounded.
    pub max_batch_size: Option<usize>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            plan_level: user.plan.level(),
            plan_name: user.plan.name(),
            max_batch_size: user.plan.max_batch_size(),
        }
    }
}

pub trait UserRepository: Send + Sync {
    fn find(&self, id: UserId) -> Option<User>;
    fn find_by_username(&self, username: &str) -> Option<User>;
    fn update_credential(&self, id: UserId, credential: Credential) -> Result<(), AccountError>;
    fn rename(&self, id: UserId, new_username: &str) -> Result<(), AccountError>;
}

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    by_username: HashMap<String, UserId>,
}

/// In-memory repository. Records are replaced whole, never mutated in place.
#[derive(Default)]
pub struct InMemoryUserRepository {
    tables: RwLock<Tables>,
}

impl InMemoryUserRepository {
    /// Repository holding the three demo accounts, one per tier.
    pub fn seeded() -> Self {
        let repo = Self::default();
        for (id, username, password, plan) in [
            (1, "basic", "basic123", PlanLevel::Basic),
            (2, "pro", "pro123", PlanLevel::Pro),
            (3, "enterprise", "enterprise123", PlanLevel::Enterprise),
        ] {
            repo.insert(User {
                id: UserId(id),
                username: username.into(),
                email: format!("{username}@example.com"),
                plan,
                credential: Credential::new(password),
            });
        }
        repo
    }

    pub fn insert(&self, user: User) {
        let mut t = self.write();
        t.by_username.insert(user.username.clone(), user.id);
        t.users.insert(user.id, user);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|p| p.into_inner())
    }
}

impl UserRepository for InMemoryUserRepository {
    fn find(&self, id: UserId) -> Option<User> {
        self.read().users.get(&id).cloned()
    }

    fn find_by_username(&self, username: &str) -> Option<User> {
        let t = self.read();
        t.by_username.get(username).and_then(|id| t.users.get(id)).cloned()
    }

    fn update_credential(&self, id: UserId, credential: Credential) -> Result<(), AccountError> {
        let mut t = self.write();
        let current = t.users.get(&id).ok_or(AccountError::UnknownUser)?;
        let updated = User {
            credential,
            ..current.clone()
        };
        t.users.insert(id, updated);
        Ok(())
    }

    fn rename(&self, id: UserId, new_username: &str) -> Result<(), AccountError> {
        let mut t = self.write();
        if t.by_username.get(new_username).is_some_and(|owner| *owner != id) {
            return Err(AccountError::UsernameTaken(new_username.to_string()));
        }
        let current = t.users.get(&id).ok_or(AccountError::UnknownUser)?.clone();
        t.by_username.remove(&current.username);
        t.by_username.insert(new_username.to_string(), id);
        t.users.insert(
            id,
            User {
                username: new_username.to_string(),
                ..current
            },
        );
        Ok(())
    }
}

/// Login, logout and bearer-token sessions.
#[derive(Clone)]
pub struct AuthService {
    repo: Arc<dyn UserRepository>,
    sessions: Arc<tokio::sync::RwLock<HashMap<String, UserId>>>,
}

impl AuthService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self {
            repo,
            sessions: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
        }
    }

    /// Check credentials and open a session. Returns the session token.
    pub async fn login(&self, username: &str, password: &str) -> Result<(String, User), AccountError> {
        let user = self
            .repo
            .find_by_username(username)
            .filter(|u| u.credential.verify(password))
            .ok_or(AccountError::InvalidCredentials)?;

        let token = uuid::Uuid::new_v4().to_string();
        self.sessions.write().await.insert(token.clone(), user.id);
        tracing::info!(user = %user.username, "User logged in");
        Ok((token, user))
    }

    /// Drop a session. Returns whether it existed.
    pub async fn logout(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// The user behind a session token.
    pub async fn resolve(&self, token: &str) -> Option<User> {
        let id = *self.sessions.read().await.get(token)?;
        self.repo.find(id)
    }

    pub fn change_password(
        &self,
        id: UserId,
        current: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        let user = self.repo.find(id).ok_or(AccountError::UnknownUser)?;
        if !user.credential.verify(current) {
            return Err(AccountError::InvalidCredentials);
        }
        if new_password.is_empty() {
            return Err(AccountError::EmptyPassword);
        }
        self.repo.update_credential(id, Credential::new(new_password))
    }

    pub fn rename(&self, id: UserId, current_password: &str, new_username: &str) -> Result<(), AccountError> {
        let user = self.repo.find(id).ok_or(AccountError::UnknownUser)?;
        if !user.credential.verify(current_password) {
            return Err(AccountError::InvalidCredentials);
        }
        if !is_valid_username(new_username) {
            return Err(AccountError::InvalidUsername);
        }
        self.repo.rename(id, new_username)?;
        tracing::info!(from = %user.username, to = new_username, "User renamed");
        Ok(())
    }
}

fn is_valid_username(name: &str) -> bool {
    (3..=32).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
