//! Personality registry: named tone and style profiles shared across roles.
//!
//! A [`Personality`] describes *how* the assistant talks. It carries three
//! prompt fragments that the composer splices into the instruction text in
//! a fixed order. Personalities are registered at startup and read-only
//! afterwards; re-registering an id overwrites it in place.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// The three prompt fragments that make up a personality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalityFragments {
    /// Framing paragraph describing who the assistant is.
    pub system_prompt: String,
    /// Behavioural rules.
    pub behavior_guide: String,
    /// Vocabulary and tone guidance.
    pub response_style: String,
}

/// A named behavioural style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
    /// Unique key (e.g. `warm_caring`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Prompt fragments.
    #[serde(flatten)]
    pub fragments: PersonalityFragments,
}

impl Personality {
    /// Create a personality from its parts.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        fragments: PersonalityFragments,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fragments,
        }
    }

    /// All three fragments joined by blank lines, in composition order.
    pub fn full_prompt(&self) -> String {
        [
            self.fragments.system_prompt.as_str(),
            self.fragments.behavior_guide.as_str(),
            self.fragments.response_style.as_str(),
        ]
        .join("\n\n")
    }
}

/// Catalog of personalities keyed by id, in registration order.
#[derive(Debug, Default)]
pub struct PersonalityRegistry {
    entries: RwLock<Vec<Arc<Personality>>>,
}

impl PersonalityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with `personalities`.
    pub fn with_personalities(personalities: impl IntoIterator<Item = Personality>) -> Self {
        let registry = Self::new();
        for personality in personalities {
            registry.insert(personality);
        }
        registry
    }

    /// Look up a personality. Absence is not an error here.
    pub fn get(&self, id: &str) -> Option<Arc<Personality>> {
        self.read().iter().find(|p| p.id == id).cloned()
    }

    /// Whether `id` resolves.
    pub fn contains(&self, id: &str) -> bool {
        self.read().iter().any(|p| p.id == id)
    }

    /// Map of id to display name.
    pub fn list(&self) -> BTreeMap<String, String> {
        self.read()
            .iter()
            .map(|p| (p.id.clone(), p.name.clone()))
            .collect()
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.read().iter().map(|p| p.id.clone()).collect()
    }

    /// Snapshot of every personality in registration order.
    pub fn all(&self) -> Vec<Arc<Personality>> {
        self.read().clone()
    }

    /// Number of registered personalities.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Register a personality, overwriting any existing entry with the same id.
    pub fn register(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        fragments: PersonalityFragments,
    ) {
        self.insert(Personality::new(id, name, fragments));
    }

    /// Register a fully built personality (same overwrite semantics as [`register`](Self::register)).
    pub fn insert(&self, personality: Personality) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let personality = Arc::new(personality);
        match entries.iter_mut().find(|p| p.id == personality.id) {
            Some(slot) => *slot = personality,
            None => entries.push(personality),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<Personality>>> {
        // Writers never leave a half-applied entry behind, so a poisoned
        // lock still guards consistent data.
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }
}
