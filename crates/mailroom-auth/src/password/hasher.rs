//! Argon2id password hashing and verification.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use mailroom_core::config::AppConfig;
use mailroom_core::error::AppError;

/// Handles password hashing and verification using Argon2id.
///
/// Cost parameters are embedded in the produced digest, so verification
/// keeps working across parameter changes.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    time_cost: u32,
    memory_cost_kib: u32,
    parallelism: u32,
}

impl PasswordHasher {
    /// Creates a hasher with the configured cost parameters.
    pub fn new(config: &AppConfig) -> Self {
        Self::with_params(
            config.argon2_time_cost,
            config.argon2_memory_cost,
            config.argon2_parallelism,
        )
    }

    /// Creates a hasher with explicit cost parameters.
    pub fn with_params(time_cost: u32, memory_cost_kib: u32, parallelism: u32) -> Self {
        Self {
            time_cost,
            memory_cost_kib,
            parallelism,
        }
    }

    /// Hashes a plaintext password with a random salt.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let params = Params::new(self.memory_cost_kib, self.time_cost, self.parallelism, None)
            .map_err(|e| AppError::configuration(format!("Invalid Argon2 parameters: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

        Ok(hash.to_string())
    }

    /// Verifies a plaintext password against a stored digest.
    ///
    /// Returns `Ok(true)` if the password matches, `Ok(false)` if not.
    /// The digest's own embedded parameters drive verification.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::internal(format!("Invalid password hash format: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::internal(format!(
                "Password verification failed: {e}"
            ))),
        }
    }
}
