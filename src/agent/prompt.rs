//! Instruction text composition from a role, a personality, and the fixed
//! constraint blocks.
//!
//! Section order is fixed:
//! 1. Preamble (from a [`PreambleTemplate`])
//! 2. Responsibilities as `- item` lines
//! 3. Personality system prompt, behaviour guide, response style
//! 4. Universal disclaimer, TTS constraints, TTS response format
//!
//! Sections are joined by a blank line. Composition reads the registries but
//! never mutates them, so identical inputs always yield identical text.

use std::sync::Arc;

use crate::catalog::{TTS_CONSTRAINTS, TTS_RESPONSE_FORMAT, UNIVERSAL_DISCLAIMER};
use crate::personality::Personality;
use crate::roles::{CatalogError, Role, RoleRegistry};

/// Heading placed above the responsibility list.
const RESPONSIBILITIES_HEADING: &str = "你的职责是：";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an instruction text could not be composed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    /// The role id is not registered.
    #[error("unknown role '{role_id}', available roles: {}", available.join(", "))]
    RoleNotFound {
        /// Requested id.
        role_id: String,
        /// Every registered role id.
        available: Vec<String>,
    },
    /// The personality (override or role binding) is not registered.
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
    /// The preamble template is malformed.
    #[error("invalid preamble template: {0}")]
    Template(String),
}

impl From<CatalogError> for ComposeError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::RoleNotFound { role_id, available } => {
                Self::RoleNotFound { role_id, available }
            }
            CatalogError::PersonalityNotFound {
                personality_id,
                available,
            } => Self::PersonalityNotFound {
                personality_id,
                available,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Preamble template
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    AssistantName,
    RoleName,
    RoleDescription,
}

/// Opening sentence of the instruction text with named placeholders.
///
/// Recognised placeholders are `{assistant_name}`, `{role_name}` and
/// `{role_description}`; `{{` and `}}` produce literal braces.
/// `{assistant_name}` is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreambleTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PreambleTemplate {
    /// Template used when none is configured.
    pub const DEFAULT: &'static str = "你是{assistant_name}，一个{role_description}。";

    /// Parse a template string.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Template`] for an unknown placeholder, an
    /// unbalanced brace, or a missing `{assistant_name}`.
    pub fn parse(source: &str) -> Result<Self, ComposeError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for next in chars.by_ref() {
                        if next == '}' {
                            closed = true;
                            break;
                        }
                        name.push(next);
                    }
                    if !closed {
                        return Err(ComposeError::Template(format!(
                            "unclosed placeholder '{{{name}'"
                        )));
                    }
                    let segment = match name.trim() {
                        "assistant_name" => Segment::AssistantName,
                        "role_name" => Segment::RoleName,
                        "role_description" => Segment::RoleDescription,
                        other => {
                            return Err(ComposeError::Template(format!(
                                "unknown placeholder '{{{other}}}'"
                            )))
                        }
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                }
                '}' => {
                    return Err(ComposeError::Template(
                        "unmatched '}' (use '}}' for a literal brace)".to_owned(),
                    ))
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if !segments.contains(&Segment::AssistantName) {
            return Err(ComposeError::Template(
                "template must contain {assistant_name}".to_owned(),
            ));
        }
        Ok(Self {
            source: source.to_owned(),
            segments,
        })
    }

    /// The string the template was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Substitute the placeholders for `role`.
    pub fn render(&self, assistant_name: &str, role: &Role) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::AssistantName => assistant_name,
                Segment::RoleName => role.name.as_str(),
                Segment::RoleDescription => role.description.as_str(),
            })
            .collect()
    }
}

impl Default for PreambleTemplate {
    fn default() -> Self {
        Self {
            source: Self::DEFAULT.to_owned(),
            segments: vec![
                Segment::Literal("你是".to_owned()),
                Segment::AssistantName,
                Segment::Literal("，一个".to_owned()),
                Segment::RoleDescription,
                Segment::Literal("。".to_owned()),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// A composed instruction text plus the entries it was built from.
#[derive(Debug, Clone)]
pub struct Composition {
    /// Resolved role (snapshot at composition time).
    pub role: Role,
    /// Resolved personality.
    pub personality: Arc<Personality>,
    /// The instruction text.
    pub text: String,
}

/// Builds instruction texts against a shared role registry.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    roles: Arc<RoleRegistry>,
    template: PreambleTemplate,
}

impl PromptComposer {
    /// Composer using the default preamble.
    pub fn new(roles: Arc<RoleRegistry>) -> Self {
        Self::with_template(roles, PreambleTemplate::default())
    }

    /// Composer using a custom preamble.
    pub fn with_template(roles: Arc<RoleRegistry>, template: PreambleTemplate) -> Self {
        Self { roles, template }
    }

    /// The role registry this composer reads.
    pub fn roles(&self) -> &Arc<RoleRegistry> {
        &self.roles
    }

    /// The preamble template in use.
    pub fn template(&self) -> &PreambleTemplate {
        &self.template
    }

    /// Compose the instruction text for `role_id`.
    ///
    /// `personality_override` replaces the role's bound personality for this
    /// call only.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::RoleNotFound`] or
    /// [`ComposeError::PersonalityNotFound`].
    pub fn compose(
        &self,
        role_id: &str,
        personality_override: Option<&str>,
        assistant_name: &str,
    ) -> Result<String, ComposeError> {
        self.compose_detailed(role_id, personality_override, assistant_name)
            .map(|composition| composition.text)
    }

    /// Like [`compose`](Self::compose), also returning the resolved entries.
    ///
    /// # Errors
    ///
    /// Same as [`compose`](Self::compose).
    pub fn compose_detailed(
        &self,
        role_id: &str,
        personality_override: Option<&str>,
        assistant_name: &str,
    ) -> Result<Composition, ComposeError> {
        let role = self
            .roles
            .get(role_id)
            .ok_or_else(|| self.roles.role_not_found(role_id))?;
        let personality_id = personality_override.unwrap_or(&role.personality_id);
        let personality = self
            .roles
            .personalities()
            .get(personality_id)
            .ok_or_else(|| self.roles.personality_not_found(personality_id))?;

        let text = render_prompt(&role, &personality, &self.template, assistant_name);
        Ok(Composition {
            role,
            personality,
            text,
        })
    }
}

/// Render an instruction text from already resolved parts.
pub fn render_prompt(
    role: &Role,
    personality: &Personality,
    template: &PreambleTemplate,
    assistant_name: &str,
) -> String {
    let mut sections: Vec<String> = Vec::with_capacity(8);

    sections.push(template.render(assistant_name, role));

    if !role.responsibilities.is_empty() {
        let mut block = String::from(RESPONSIBILITIES_HEADING);
        for item in &role.responsibilities {
            block.push_str("\n- ");
            block.push_str(item);
        }
        sections.push(block);
    }

    for fragment in [
        &personality.fragments.system_prompt,
        &personality.fragments.behavior_guide,
        &personality.fragments.response_style,
    ] {
        if !fragment.trim().is_empty() {
            sections.push(fragment.clone());
        }
    }

    sections.extend(
        [UNIVERSAL_DISCLAIMER, TTS_CONSTRAINTS, TTS_RESPONSE_FORMAT]
            .into_iter()
            .map(str::to_owned),
    );

    sections.join("\n\n")
}
