/*!
 * # Password Policy Module
 *
 * Password complexity checks plus Argon2id hashing and verification.
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use std::collections::HashSet;
use thiserror::Error;

use crate::errors::ServiceError;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password too short: minimum {min_length} characters required")]
    TooShort { min_length: usize },

    #[error("Password too long: maximum {max_length} characters allowed")]
    TooLong { max_length: usize },

    #[error("Password must contain at least one letter")]
    MissingLetter,

    #[error("Password must contain at least one number")]
    MissingNumber,

    #[error("Password is in the list of commonly used passwords")]
    CommonPassword,

    #[error("Password must not contain the account email")]
    SimilarToUsername,
}

impl From<PasswordPolicyError> for ServiceError {
    fn from(err: PasswordPolicyError) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub require_letter: bool,
    pub require_number: bool,
    pub prevent_common_passwords: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_letter: true,
            require_number: true,
            prevent_common_passwords: true,
        }
    }
}

lazy_static! {
    static ref COMMON_PASSWORDS: HashSet<&'static str> = [
        "password1", "password123", "abc12345", "qwerty123", "admin123",
        "welcome1", "letmein1", "iloveyou1", "12345678a", "a1234567",
        "passw0rd", "test1234", "changeme1",
    ]
    .into_iter()
    .collect();
}

impl PasswordPolicy {
    /// Validate a password against the policy
    pub fn validate(&self, password: &str, username: Option<&str>) -> Result<(), PasswordPolicyError> {
        let length = password.chars().count();
        if length < self.min_length {
            return Err(PasswordPolicyError::TooShort {
                min_length: self.min_length,
            });
        }
        if length > self.max_length {
            return Err(PasswordPolicyError::TooLong {
                max_length: self.max_length,
            });
        }

        if self.require_letter && !password.chars().any(|c| c.is_alphabetic()) {
            return Err(PasswordPolicyError::MissingLetter);
        }
        if self.require_number && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(PasswordPolicyError::MissingNumber);
        }

        let lowered = password.to_lowercase();
        if self.prevent_common_passwords && COMMON_PASSWORDS.contains(lowered.as_str()) {
            return Err(PasswordPolicyError::CommonPassword);
        }

        if let Some(name) = username {
            let local = name.split('@').next().unwrap_or(name).to_lowercase();
            if local.len() >= 4 && lowered.contains(&local) {
                return Err(PasswordPolicyError::SimilarToUsername);
            }
        }

        Ok(())
    }
}

/// Hash a password with Argon2id and a random salt
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

/// Verify a password against a stored PHC hash string
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("short1", Some(PasswordPolicyError::TooShort { min_length: 8 }))]
    #[case("12345678", Some(PasswordPolicyError::MissingLetter))]
    #[case("onlyletters", Some(PasswordPolicyError::MissingNumber))]
    #[case("Password123", Some(PasswordPolicyError::CommonPassword))]
    #[case("ring-frame-42", None)]
    fn default_policy(#[case] password: &str, #[case] expected: Option<PasswordPolicyError>) {
        let result = PasswordPolicy::default().validate(password, None);
        assert_eq!(result.err(), expected);
    }

    #[test]
    fn rejects_password_containing_email_local_part() {
        let result = PasswordPolicy::default().validate("ravi.kumar2024", Some("ravi.kumar@mill.test"));
        assert_eq!(result, Err(PasswordPolicyError::SimilarToUsername));
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("winding-7b").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("winding-7b", &hash).unwrap());
        assert!(!verify_password("winding-7c", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("whatever1", "not-a-phc-string").is_err());
    }
}
