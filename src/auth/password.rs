use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::{error, warn};

lazy_static! {
    /// Argon2id v0x13 with the library's default cost. Fixed for every stored credential.
    static ref HASHER: Argon2<'static> = Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default());
}

/// Salted hash of `plain` in PHC string form, ready for the `password_hash` column.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    HASHER
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "password hashing failed");
            anyhow::anyhow!("password hashing failed: {e}")
        })
}

/// True only when `plain` matches `stored`. A stored value that is not a readable PHC
/// string never matches, so callers cannot tell it apart from a wrong password.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "stored password hash unreadable");
            return false;
        }
    };
    HASHER.verify_password(plain.as_bytes(), &parsed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_argon2id_phc() {
        let hash = hash_password("pw1234").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(verify_password("pw1234", &hash));
    }

    #[test]
    fn wrong_password_does_not_match() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();
        assert!(!verify_password("wrong-password", &hash));
        assert!(!verify_password("", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("pw1234").unwrap();
        let b = hash_password("pw1234").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("pw1234", &a) && verify_password("pw1234", &b));
    }

    #[test]
    fn unreadable_stored_hash_never_matches() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
        assert!(!verify_password("", ""));
    }
}
