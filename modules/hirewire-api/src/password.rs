//! Argon2id password hashing. The PHC string carries its own salt and
//! parameters, so verification needs nothing beyond the stored hash.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use hirewire_common::error::Result;
use hirewire_common::Error;

const MIN_PASSWORD_CHARS: usize = 8;

pub fn validate_strength(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(Error::validation(
            "password must be at least 8 characters",
        ));
    }
    Ok(())
}

pub fn hash(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| Error::validation("failed to hash password"))
}

pub fn verify(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let h = hash("correct horse battery staple").unwrap();
        assert!(verify("correct horse battery staple", &h));
        assert!(!verify("wrong password", &h));
    }

    #[test]
    fn hashes_are_salted() {
        let h1 = hash("same password").unwrap();
        let h2 = hash("same password").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify("anything", "not-a-phc-string"));
    }

    #[test]
    fn strength_floor() {
        assert!(validate_strength("short").is_err());
        assert!(validate_strength("long enough").is_ok());
    }
}
