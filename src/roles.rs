//! Role registry: task-oriented assistant profiles.
//!
//! A [`Role`] says *what* the assistant is for: a description, an ordered
//! list of responsibilities, and a reference to the [`Personality`] it
//! speaks with by default. That reference is the only mutable part of the
//! catalog. [`RoleRegistry::rebind_personality`] validates both ids and
//! commits under the same write lock, so a failed rebind never leaves a
//! partial change visible to other sessions.
//!
//! [`Personality`]: crate::personality::Personality

use std::fmt::Write as _;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::personality::PersonalityRegistry;

/// A task-oriented assistant profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique key (e.g. `travel`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Human-readable description, spliced into the preamble.
    pub description: String,
    /// Responsibilities, rendered as a bulleted list in this order.
    pub responsibilities: Vec<String>,
    /// Default personality id.
    pub personality_id: String,
}

/// Listing entry used by role pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleSummary {
    /// Role id.
    pub id: String,
    /// Role display name.
    pub name: String,
    /// Role description.
    pub description: String,
    /// Currently bound personality id.
    pub personality_id: String,
    /// Display name of the bound personality, if it resolves.
    pub personality_name: Option<String>,
    /// Whether this is the caller's active role.
    pub is_current: bool,
}

/// Lookup and mutation failures against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// The role id is not registered.
    #[error("unknown role '{role_id}', available roles: {}", available.join(", "))]
    RoleNotFound {
        /// Requested id.
        role_id: String,
        /// Every registered role id.
        available: Vec<String>,
    },
    /// The personality id is not registered.
    #[error(
        "unknown personality '{personality_id}', available personalities: {}",
        available.join(", ")
    )]
    PersonalityNotFound {
        /// Requested id.
        personality_id: String,
        /// Every registered personality id.
        available: Vec<String>,
    },
}

/// Catalog of roles in registration order.
#[derive(Debug)]
pub struct RoleRegistry {
    personalities: Arc<PersonalityRegistry>,
    roles: RwLock<Vec<Role>>,
}

impl RoleRegistry {
    /// Create an empty registry validating against `personalities`.
    pub fn new(personalities: Arc<PersonalityRegistry>) -> Self {
        Self {
            personalities,
            roles: RwLock::new(Vec::new()),
        }
    }

    /// The personality registry references are validated against.
    pub fn personalities(&self) -> &Arc<PersonalityRegistry> {
        &self.personalities
    }

    /// Snapshot of a role, including its current personality binding.
    pub fn get(&self, id: &str) -> Option<Role> {
        self.read().iter().find(|r| r.id == id).cloned()
    }

    /// Whether `id` resolves.
    pub fn contains(&self, id: &str) -> bool {
        self.read().iter().any(|r| r.id == id)
    }

    /// Registered role ids in registration order.
    pub fn list_ids(&self) -> Vec<String> {
        self.read().iter().map(|r| r.id.clone()).collect()
    }

    /// The personality id currently bound to `role_id`.
    pub fn personality_id(&self, role_id: &str) -> Option<String> {
        self.read()
            .iter()
            .find(|r| r.id == role_id)
            .map(|r| r.personality_id.clone())
    }

    /// Register a role, overwriting any existing role with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::PersonalityNotFound`] if the role's
    /// personality reference does not resolve.
    pub fn register(&self, role: Role) -> Result<(), CatalogError> {
        let mut roles = self.write();
        if !self.personalities.contains(&role.personality_id) {
            return Err(self.personality_not_found(&role.personality_id));
        }
        debug!(role = %role.id, personality = %role.personality_id, "role registered");
        match roles.iter_mut().find(|r| r.id == role.id) {
            Some(slot) => *slot = role,
            None => roles.push(role),
        }
        Ok(())
    }

    /// Rebind a role to a different personality.
    ///
    /// Both ids are validated before anything changes. Returns the
    /// previously bound personality id so the caller can roll back.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::RoleNotFound`] or
    /// [`CatalogError::PersonalityNotFound`]; the registry is untouched.
    pub fn rebind_personality(
        &self,
        role_id: &str,
        personality_id: &str,
    ) -> Result<String, CatalogError> {
        let mut roles = self.write();
        let available = roles.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
        let role = roles
            .iter_mut()
            .find(|r| r.id == role_id)
            .ok_or_else(|| CatalogError::RoleNotFound {
                role_id: role_id.to_owned(),
                available,
            })?;
        if !self.personalities.contains(personality_id) {
            return Err(self.personality_not_found(personality_id));
        }

        let previous = std::mem::replace(&mut role.personality_id, personality_id.to_owned());
        info!(role = %role_id, from = %previous, to = %personality_id, "role personality rebound");
        Ok(previous)
    }

    /// Undo a rebind, but only if the binding still equals `expected_current`.
    ///
    /// Returns `true` when the binding was restored. A `false` result means
    /// another caller rebound the role in the meantime and their change wins.
    pub fn restore_personality(&self, role_id: &str, expected_current: &str, previous: &str) -> bool {
        let mut roles = self.write();
        match roles
            .iter_mut()
            .find(|r| r.id == role_id && r.personality_id == expected_current)
        {
            Some(role) => {
                role.personality_id = previous.to_owned();
                info!(role = %role_id, personality = %previous, "role personality restored");
                true
            }
            None => false,
        }
    }

    /// Summaries of every role, with `is_current` set for `current_role`.
    pub fn summaries(&self, current_role: Option<&str>) -> Vec<RoleSummary> {
        self.read()
            .iter()
            .map(|role| RoleSummary {
                id: role.id.clone(),
                name: role.name.clone(),
                description: role.description.clone(),
                personality_id: role.personality_id.clone(),
                personality_name: self
                    .personalities
                    .get(&role.personality_id)
                    .map(|p| p.name.clone()),
                is_current: current_role == Some(role.id.as_str()),
            })
            .collect()
    }

    /// Numbered, human-readable role list.
    pub fn render_listing(&self) -> String {
        let mut out = String::from("Available roles:\n");
        for (index, role) in self.read().iter().enumerate() {
            let _ = writeln!(out, "{}. {} - {}", index.saturating_add(1), role.id, role.name);
        }
        out.push_str("\nUse '/role <id>' to switch roles.");
        out
    }

    /// Build a [`CatalogError::RoleNotFound`] listing the registered ids.
    pub fn role_not_found(&self, role_id: &str) -> CatalogError {
        CatalogError::RoleNotFound {
            role_id: role_id.to_owned(),
            available: self.list_ids(),
        }
    }

    /// Build a [`CatalogError::PersonalityNotFound`] listing the registered ids.
    pub fn personality_not_found(&self, personality_id: &str) -> CatalogError {
        CatalogError::PersonalityNotFound {
            personality_id: personality_id.to_owned(),
            available: self.personalities.ids(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Role>> {
        self.roles.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Role>> {
        self.roles.write().unwrap_or_else(PoisonError::into_inner)
    }
}
