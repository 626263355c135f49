// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration for parlor: compiled defaults, an optional TOML
//! file, and `PARLOR_`-prefixed environment variables, in that order of
//! precedence (lowest to highest).

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    AgentConfig, CacheConfig, GatewayConfig, ParlorConfig, ProviderConfig, RateLimitConfig,
    RetrievalConfig, StorageConfig,
};
pub use validation::validate_config;

use parlor_core::ParlorError;

/// Load configuration and run post-deserialization validation.
pub fn load_and_validate() -> Result<ParlorConfig, ParlorError> {
    let config = load_config().map_err(|e| ParlorError::Config(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}
