use anyhow::Result;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};

/// Argon2id hashing with configurable work factors.
///
/// Hashes carry their own salt and parameters in PHC string format, so
/// verification works for rows hashed under older cost settings.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(memory_cost_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_cost_kib, time_cost, parallelism, None)
            .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        Ok(Self { params })
    }

    /// Hash a password with a freshly generated random salt.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

        Ok(hash.to_string())
    }

    /// Check a password against a stored PHC hash.
    ///
    /// A stored value that does not parse as a PHC hash simply never
    /// matches; it is not an error the caller has to handle.
    #[must_use]
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(stored_hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(8192, 1, 1).unwrap()
    }

    #[test]
    fn hash_then_verify_succeeds() {
        let hasher = hasher();
        let hash = hasher.hash("hunter2").unwrap();
        assert!(hasher.verify("hunter2", &hash));
    }

    #[test]
    fn wrong_password_fails() {
        let hasher = hasher();
        let hash = hasher.hash("hunter2").unwrap();
        assert!(!hasher.verify("hunter3", &hash));
    }

    #[test]
    fn same_password_hashes_to_distinct_strings() {
        let hasher = hasher();
        let first = hasher.hash("hunter2").unwrap();
        let second = hasher.hash("hunter2").unwrap();
        assert_ne!(first, second);

        // Both still verify despite the differing salts.
        assert!(hasher.verify("hunter2", &first));
        assert!(hasher.verify("hunter2", &second));
    }

    #[test]
    fn malformed_stored_hash_never_matches() {
        let hasher = hasher();
        assert!(!hasher.verify("hunter2", ""));
        assert!(!hasher.verify("hunter2", "plaintext-from-a-legacy-row"));
        assert!(!hasher.verify("hunter2", "$argon2id$truncated"));
    }

    #[test]
    fn hash_records_algorithm_and_params() {
        let hasher = hasher();
        let hash = hasher.hash("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("m=8192"));
    }

    #[test]
    fn rejects_unusable_params() {
        assert!(PasswordHasher::new(0, 0, 0).is_err());
    }
}
