//! Token and password effects.
//!
//! Secrets carried by these effects ([`Password`], [`Token`]) never show up
//! in `Debug` output, so an effect can be logged without leaking them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EffectCategory, EffectTag, Operation};
use crate::program::Program;

const REDACTED: &str = "***";

macro_rules! secret {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a secret value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Exposes the secret. Callers must not log the result.
            #[must_use]
            pub fn expose(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.debug_tuple(stringify!($name)).field(&REDACTED).finish()
            }
        }
    };
}

secret! {
    /// A plaintext password.
    Password
}

secret! {
    /// A bearer or refresh token.
    Token
}

/// A password hash in the hasher's own encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wraps an encoded hash.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The encoded hash.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What a valid token asserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Who the token was issued to.
    pub subject: String,
    /// Granted roles.
    pub roles: Vec<String>,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
}

/// Outcome of validating a token. Rejection is a domain outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenValidation {
    /// The token is genuine and current.
    Valid(Claims),
    /// The token was genuine but has expired.
    Expired,
    /// The token is unknown, revoked or malformed.
    Invalid {
        /// Why it was rejected.
        reason: String,
    },
}

impl TokenValidation {
    /// The claims of a valid token.
    #[must_use]
    pub fn claims(&self) -> Option<&Claims> {
        match self {
            Self::Valid(claims) => Some(claims),
            Self::Expired | Self::Invalid { .. } => None,
        }
    }
}

/// An access token with the refresh token that renews it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived bearer token.
    pub access_token: Token,
    /// Long-lived token accepted by [`IdentityEffect::RefreshToken`].
    pub refresh_token: Token,
    /// Expiry of the access token.
    pub expires_at: DateTime<Utc>,
}

/// Operations against the token provider and the password hasher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEffect {
    /// Resumes with [`TokenValidation`].
    ValidateToken {
        /// Token to check.
        token: Token,
    },
    /// Resumes with [`TokenPair`].
    GenerateToken {
        /// Token subject.
        subject: String,
        /// Roles to grant.
        roles: Vec<String>,
    },
    /// Resumes with a fresh [`TokenPair`].
    RefreshToken {
        /// Refresh token from an earlier pair.
        refresh_token: Token,
    },
    /// Resumes with `()`.
    RevokeToken {
        /// Token to revoke.
        token: Token,
    },
    /// Resumes with [`PasswordHash`].
    HashPassword {
        /// Plaintext to hash.
        password: Password,
    },
    /// Resumes with `bool`; a mismatch is `false`, not an error.
    VerifyPassword {
        /// Candidate plaintext.
        password: Password,
        /// Stored hash.
        hash: PasswordHash,
    },
}

impl Operation for IdentityEffect {
    const CATEGORY: EffectCategory = EffectCategory::Identity;

    fn tag(&self) -> EffectTag {
        match self {
            Self::ValidateToken { .. } => EffectTag::ValidateToken,
            Self::GenerateToken { .. } => EffectTag::GenerateToken,
            Self::RefreshToken { .. } => EffectTag::RefreshToken,
            Self::RevokeToken { .. } => EffectTag::RevokeToken,
            Self::HashPassword { .. } => EffectTag::HashPassword,
            Self::VerifyPassword { .. } => EffectTag::VerifyPassword,
        }
    }

    fn resource_id(&self) -> Option<String> {
        match self {
            Self::GenerateToken { subject, .. } => Some(subject.clone()),
            _ => None,
        }
    }
}

/// Yields [`IdentityEffect::ValidateToken`].
#[must_use]
pub fn validate_token(token: Token) -> Program<TokenValidation> {
    Program::perform(IdentityEffect::ValidateToken { token })
}

/// Yields [`IdentityEffect::GenerateToken`].
#[must_use]
pub fn generate_token(subject: impl Into<String>, roles: Vec<String>) -> Program<TokenPair> {
    Program::perform(IdentityEffect::GenerateToken {
        subject: subject.into(),
        roles,
    })
}

/// Yields [`IdentityEffect::RefreshToken`].
#[must_use]
pub fn refresh_token(refresh_token: Token) -> Program<TokenPair> {
    Program::perform(IdentityEffect::RefreshToken { refresh_token })
}

/// Yields [`IdentityEffect::RevokeToken`].
#[must_use]
pub fn revoke_token(token: Token) -> Program<()> {
    Program::perform(IdentityEffect::RevokeToken { token })
}

/// Yields [`IdentityEffect::HashPassword`].
#[must_use]
pub fn hash_password(password: Password) -> Program<PasswordHash> {
    Program::perform(IdentityEffect::HashPassword { password })
}

/// Yields [`IdentityEffect::VerifyPassword`].
#[must_use]
pub fn verify_password(password: Password, hash: PasswordHash) -> Program<bool> {
    Program::perform(IdentityEffect::VerifyPassword { password, hash })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn password_debug_is_redacted() {
        let effect = IdentityEffect::HashPassword {
            password: Password::new("hunter2"),
        };
        let rendered = format!("{effect:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }

    #[rstest]
    fn token_debug_is_redacted() {
        let token = Token::new("eyJhbGciOi");
        assert_eq!(format!("{token:?}"), "Token(\"***\")");
        assert_eq!(token.expose(), "eyJhbGciOi");
    }

    #[rstest]
    fn only_generate_token_names_a_resource() {
        let generate = IdentityEffect::GenerateToken {
            subject: "dr-house".into(),
            roles: vec![],
        };
        let revoke = IdentityEffect::RevokeToken {
            token: Token::new("t"),
        };
        assert_eq!(generate.resource_id().as_deref(), Some("dr-house"));
        assert_eq!(revoke.resource_id(), None);
    }
}
