//! Role and personality catalog assembly.
//!
//! The catalog is built once at startup from the stock definitions in
//! [`builtin`] plus any extra `[[personalities]]` and `[[roles]]` entries in
//! the config file. It is then shared by `Arc` with every session.

use std::sync::Arc;

use tracing::info;

use crate::config::ChatConfig;
use crate::personality::PersonalityRegistry;
use crate::roles::{CatalogError, RoleRegistry};

pub mod builtin;

pub use builtin::{DEFAULT_ROLE_ID, TTS_CONSTRAINTS, TTS_RESPONSE_FORMAT, UNIVERSAL_DISCLAIMER};

/// Both registries, owned together.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Personality registry.
    pub personalities: Arc<PersonalityRegistry>,
    /// Role registry (validates against `personalities`).
    pub roles: Arc<RoleRegistry>,
}

impl Catalog {
    /// The stock catalog: six roles and five personalities.
    pub fn builtin() -> Self {
        let personalities = Arc::new(PersonalityRegistry::with_personalities(
            builtin::builtin_personalities(),
        ));
        let roles = RoleRegistry::new(Arc::clone(&personalities));
        for role in builtin::builtin_roles() {
            // Stock roles only reference stock personalities.
            if let Err(e) = roles.register(role) {
                tracing::error!(error = %e, "built-in role rejected");
            }
        }
        Self {
            personalities,
            roles: Arc::new(roles),
        }
    }

    /// The stock catalog extended with config-defined entries.
    ///
    /// Personalities are registered before roles so that a custom role may
    /// reference a custom personality. Entries reusing a stock id replace it.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::PersonalityNotFound`] if a configured role
    /// references a personality that does not exist.
    pub fn from_config(config: &ChatConfig) -> Result<Self, CatalogError> {
        let catalog = Self::builtin();
        for personality in &config.personalities {
            catalog.personalities.insert(personality.clone());
        }
        for role in &config.roles {
            catalog.roles.register(role.clone())?;
        }
        info!(
            personalities = catalog.personalities.len(),
            roles = catalog.roles.list_ids().len(),
            "catalog loaded"
        );
        Ok(catalog)
    }
}
