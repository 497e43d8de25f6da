//! Ledger configuration
//!
//! Loaded from a JSON document; every field is optional:
//! ```json
//! {
//!   "hashing": { "memoryCostKib": 19456, "timeCost": 2, "parallelism": 1 },
//!   "bootstrapSecret": "LesPassword",
//!   "seedAccounts": [
//!     { "id": "dbd70daa-356c-4bde-be27-a13c3c47d44d", "name": "Boris Fausto", "taxId": 12355567812, "balance": 100000 }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{LedgerError, LedgerResult};

/// Argon2id cost parameters for credential hashing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HashingConfig {
    pub memory_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_cost_kib: argon2::Params::DEFAULT_M_COST,
            time_cost: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

impl HashingConfig {
    /// Lowest cost argon2 accepts. Only for tests.
    pub fn fast() -> Self {
        Self {
            memory_cost_kib: argon2::Params::MIN_M_COST,
            time_cost: argon2::Params::MIN_T_COST,
            parallelism: argon2::Params::MIN_P_COST,
        }
    }
}

/// Account created at startup with a fixed id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAccount {
    pub id: String,
    pub name: String,
    pub tax_id: u64,
    #[serde(default)]
    pub balance: i64,
}

/// Top-level ledger configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerConfig {
    pub hashing: HashingConfig,
    /// Administrative secret shared by all seed accounts
    pub bootstrap_secret: Option<String>,
    pub seed_accounts: Vec<SeedAccount>,
}

impl LedgerConfig {
    /// Parse a configuration document
    pub fn from_json_str(json: &str) -> LedgerResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| LedgerError::Validation(format!("Invalid ledger config: {}", e)))
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> LedgerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Storage(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// The two well-known demo accounts and their shared admin secret
    pub fn demo() -> Self {
        Self {
            hashing: HashingConfig::default(),
            bootstrap_secret: Some("LesPassword".to_string()),
            seed_accounts: vec![
                SeedAccount {
                    id: "dbd70daa-356c-4bde-be27-a13c3c47d44d".to_string(),
                    name: "Boris Fausto".to_string(),
                    tax_id: 12355567812,
                    balance: 100000,
                },
                SeedAccount {
                    id: "dbd74daa-356c-4bde-be27-a13c3c47d49d".to_string(),
                    name: "Doriana Yates".to_string(),
                    tax_id: 11111111506,
                    balance: 5000,
                },
            ],
        }
    }

    pub fn with_hashing(mut self, hashing: HashingConfig) -> Self {
        self.hashing = hashing;
        self
    }
}
