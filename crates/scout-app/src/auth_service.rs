use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use scout_core::ids::UserId;
use scout_core::user::{normalize_email, Session, User, UserRole};
use scout_ports::outbound::{SessionRepository, UserRepository};

use crate::error::AppError;

/// Refuse destructive and ingestion operations to read-only roles.
pub fn ensure_can_administer(session: &Session) -> Result<(), AppError> {
    if session.role().can_administer() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Insufficient permissions"))
    }
}

/// Owner to filter listings by. SME accounts only ever see their own rows;
/// other roles narrow to theirs with `scope=me`.
pub fn owner_scope(session: &Session, scope: Option<&str>) -> Result<Option<UserId>, AppError> {
    let mine = match scope.map(str::trim).filter(|s| !s.is_empty()) {
        None => false,
        Some("me") => true,
        Some(other) => {
            return Err(AppError::validation(format!(
                "scope: expected `me`, got `{other}`"
            )))
        }
    };
    Ok((mine || session.role() == UserRole::Sme).then(|| session.user_id().clone()))
}

/// Owner stamped on records an account creates. Only SME rows are owned.
pub fn record_owner(session: &Session) -> Option<UserId> {
    (session.role() == UserRole::Sme).then(|| session.user_id().clone())
}

pub struct AuthService<U, S>
where
    U: UserRepository,
    S: SessionRepository,
{
    users: U,
    sessions: S,
    session_ttl_minutes: i64,
}

impl<U, S> AuthService<U, S>
where
    U: UserRepository,
    S: SessionRepository,
{
    pub fn new(users: U, sessions: S, session_ttl_minutes: i64) -> Self {
        Self {
            users,
            sessions,
            session_ttl_minutes,
        }
    }

    /// Create the account unless one already exists for the email.
    /// Returns whether a user was created.
    pub async fn seed(&self, email: &str, password: &str, role: UserRole) -> Result<bool, AppError> {
        if self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .is_some()
        {
            return Ok(false);
        }
        let user = User::new(email, password, role)?;
        self.users.save(&user).await?;
        info!(email = %user.email(), role = %user.role(), "user seeded");
        Ok(true)
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, AppError> {
        let email = normalize_email(email);
        let user = self.users.find_by_email(&email).await?;
        let Some(user) = user.filter(|u| u.verify_password(password)) else {
            warn!(email = %email, "login refused");
            return Err(AppError::Unauthorized("Incorrect email or password"));
        };
        let session = Session::issue(&user, self.session_ttl_minutes, now);
        self.sessions.save(&session).await?;
        debug!(email = %user.email(), expires_at = %session.expires_at(), "session issued");
        Ok(session)
    }

    pub async fn authenticate(&self, token: &str, now: DateTime<Utc>) -> Result<Session, AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized("Not authenticated"));
        }
        self.sessions
            .find(token)
            .await?
            .filter(|s| !s.is_expired(now))
            .ok_or(AppError::Unauthorized("Could not validate credentials"))
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        Ok(self.sessions.delete_expired(now).await?)
    }
}
