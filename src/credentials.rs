//! Argon2id credential hashing

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;

use crate::config::HashingConfig;
use crate::traits::CredentialHasher;
use crate::types::{LedgerError, LedgerResult};

/// `CredentialHasher` producing PHC-format argon2id strings
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(config: &HashingConfig) -> LedgerResult<Self> {
        let params = Params::new(
            config.memory_cost_kib,
            config.time_cost,
            config.parallelism,
            None,
        )
        .map_err(|e| LedgerError::CredentialHashing(format!("invalid argon2 params: {}", e)))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> LedgerResult<String> {
        let salt: [u8; 16] = rand::thread_rng().gen();
        let salt = SaltString::encode_b64(&salt)
            .map_err(|e| LedgerError::CredentialHashing(e.to_string()))?;

        let hash = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| LedgerError::CredentialHashing(e.to_string()))?;

        Ok(hash.to_string())
    }

    fn verify(&self, secret: &str, credential_hash: &str) -> bool {
        let parsed = match PasswordHash::new(credential_hash) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(error = %err, "stored credential hash is unreadable");
                return false;
            }
        };

        self.argon2()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}
