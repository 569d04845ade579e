use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::DomainError;
use crate::ids::UserId;
use crate::vocabulary::define_vocabulary;

define_vocabulary!(
    UserRole, "role" {
        Admin => "ADMIN",
        Analyst => "ANALYST",
        Sme => "SME",
    }
);

impl UserRole {
    /// Case-insensitive; anything unrecognised is an analyst.
    pub fn normalize(raw: Option<&str>) -> Self {
        raw.and_then(|r| r.trim().to_ascii_uppercase().parse().ok())
            .unwrap_or(Self::Analyst)
    }

    /// Roles allowed to delete records and push manual ingestions.
    pub fn can_administer(&self) -> bool {
        matches!(self, Self::Admin | Self::Analyst)
    }
}

/// Compare two secrets without leaking where they differ.
pub fn secrets_match(given: &str, expected: &str) -> bool {
    given.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Work factor for stored password hashes.
pub const PASSWORD_HASH_COST: u32 = bcrypt::DEFAULT_COST;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    email: String,
    /// Modular crypt string (`$2b$<cost>$<salt+digest>`).
    password_hash: String,
    role: UserRole,
}

impl User {
    pub fn new(email: &str, password: &str, role: UserRole) -> Result<Self, DomainError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(DomainError::invalid_field("email", "must not be empty"));
        }
        if password.is_empty() {
            return Err(DomainError::invalid_field("password", "must not be empty"));
        }
        let password_hash = bcrypt::hash(password, PASSWORD_HASH_COST)
            .map_err(|e| DomainError::invalid_field("password", e.to_string()))?;
        Ok(Self {
            id: UserId::new(),
            email,
            password_hash,
            role,
        })
    }

    /// A corrupt stored hash never verifies.
    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> UserRole {
        self.role
    }
}

/// Opaque bearer token issued at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    token: String,
    user_id: UserId,
    email: String,
    role: UserRole,
    expires_at: DateTime<Utc>,
}

impl Session {
    pub fn issue(user: &User, ttl_minutes: i64, now: DateTime<Utc>) -> Self {
        Self {
            token: format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
            user_id: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            expires_at: now + Duration::minutes(ttl_minutes),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}
