//! Organization token generation and validation.
//!
//! A token is the payload encoded into an organization's optical code and
//! doubles as the organization's unique key. Tokens are drawn uniformly from
//! the 62-symbol alphanumeric alphabet.

use std::collections::HashSet;
use std::fmt;

use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of every organization token issued by this system.
pub const TOKEN_LENGTH: usize = 10;

/// The 62 symbols a token may contain.
pub const TOKEN_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Re-roll budget for [`generate_unique`] before giving up.
pub const MAX_GENERATION_ATTEMPTS: usize = 8;

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// An organization token.
///
/// Deserialization is transparent so records already held by the backend
/// always load; use [`Token::parse`] to validate untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Validate an externally supplied token (fixed length, alphabet only).
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if raw.len() != TOKEN_LENGTH {
            return Err(CoreError::Validation(format!(
                "Token must be exactly {TOKEN_LENGTH} characters, got {}",
                raw.len()
            )));
        }
        if let Some(bad) = raw.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(CoreError::Validation(format!(
                "Token contains invalid character '{bad}'"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generate a token of `length` symbols from the thread-local random source.
///
/// No collision check is performed; see [`generate_unique`].
pub fn generate(length: usize) -> Result<Token, CoreError> {
    generate_with(&mut rand::rng(), length)
}

/// Generate a token from an explicit random source.
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, length: usize) -> Result<Token, CoreError> {
    if length == 0 {
        return Err(CoreError::Validation(
            "Token length must be a positive integer".into(),
        ));
    }
    let token = (0..length)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect();
    Ok(Token(token))
}

/// Generate a token that does not collide with any of `existing`.
///
/// Re-rolls up to [`MAX_GENERATION_ATTEMPTS`] times and returns
/// [`CoreError::Conflict`] if every draw was already taken.
pub fn generate_unique<'a, I>(length: usize, existing: I) -> Result<Token, CoreError>
where
    I: IntoIterator<Item = &'a Token>,
{
    let taken: HashSet<&str> = existing.into_iter().map(Token::as_str).collect();
    generate_unique_with(&mut rand::rng(), length, |candidate| {
        taken.contains(candidate.as_str())
    })
}

/// Re-roll loop behind [`generate_unique`], with an explicit random source
/// and collision predicate.
pub fn generate_unique_with<R, F>(rng: &mut R, length: usize, is_taken: F) -> Result<Token, CoreError>
where
    R: Rng + ?Sized,
    F: Fn(&Token) -> bool,
{
    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let candidate = generate_with(rng, length)?;
        if !is_taken(&candidate) {
            return Ok(candidate);
        }
    }
    Err(CoreError::Conflict(format!(
        "Could not generate an unused token after {MAX_GENERATION_ATTEMPTS} attempts"
    )))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
