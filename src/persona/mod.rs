//! Domain behaviour plugged into the chat orchestrator.
//!
//! A persona decides what facts to pull out of a message, when to refuse,
//! what side-offers it makes, and how it summarizes a profile. The active
//! persona is picked once at startup from `ACTIVE_APP`.

pub mod concierge;
pub mod pension;

pub use concierge::{Concierge, ConciergeKnowledge};
pub use pension::PensionGuru;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ConfigError;
use crate::flow::FlowDefinition;
use crate::llm::LlmProvider;
use crate::profile::{PendingAction, ProfileField, ProfileUpdate, UserProfile};
use crate::store::{ChatLogEntry, MessageRole};

/// Replies that accept a side-offer.
pub const AFFIRMATIVE_RESPONSES: &[&str] =
    &["sure", "yes", "ok", "okay", "fine", "yep", "please", "yes please"];

/// Phrases that mark an assistant reply as a tips offer.
const OFFER_PHRASES: &[&str] = &[
    "would you like some tips",
    "would you like a few tips",
    "would you like tips",
    "want some tips",
    "shall i share some tips",
];

/// Placeholder in persona prompts replaced by the tone instruction.
pub const TONE_PLACEHOLDER: &str = "{{tone_instruction}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaKind {
    PensionGuru,
    Concierge,
}

impl PersonaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PensionGuru => "pension_guru",
            Self::Concierge => "concierge",
        }
    }
}

impl FromStr for PersonaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pension_guru" | "pension" => Ok(Self::PensionGuru),
            "concierge" => Ok(Self::Concierge),
            other => Err(format!("unknown app: {other}")),
        }
    }
}

impl std::fmt::Display for PersonaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a message is a plain "yes".
pub fn is_affirmative(message: &str) -> bool {
    let normalized = message
        .trim()
        .trim_end_matches(['.', '!'])
        .trim()
        .to_lowercase();
    AFFIRMATIVE_RESPONSES.contains(&normalized.as_str())
}

#[async_trait]
pub trait Persona: Send + Sync {
    fn kind(&self) -> PersonaKind;

    /// Name shown to users and in the API banner.
    fn display_name(&self) -> &str;

    /// System prompt with a `{{tone_instruction}}` placeholder.
    fn system_prompt(&self) -> &str;

    /// First message for a user we have never seen.
    fn init_message(&self) -> &str;

    /// Fields listed in the context summary, in display order.
    fn profile_fields(&self) -> &[ProfileField];

    /// The flow this persona runs when none is configured. `None` means the
    /// persona has no scripted flow.
    fn default_flow(&self) -> Option<Result<FlowDefinition, crate::error::FlowError>> {
        None
    }

    /// Pull facts out of a message. `expected` is the field the flow is
    /// asking for; `profile` is what we know so far.
    fn extract(
        &self,
        message: &str,
        expected: Option<ProfileField>,
        profile: &UserProfile,
    ) -> ProfileUpdate;

    /// A refusal that ends the turn, e.g. for a country we cannot serve.
    fn block_response(&self, profile: &UserProfile) -> Option<String>;

    /// Tips payload, for personas that offer tips.
    fn tips_reply(&self) -> Option<&str> {
        None
    }

    /// Does an assistant reply offer tips?
    fn should_offer_tips(&self, reply: &str) -> bool {
        if self.tips_reply().is_none() {
            return false;
        }
        let lower = reply.to_lowercase();
        OFFER_PHRASES.iter().any(|p| lower.contains(p))
    }

    /// Is this message accepting a pending tips offer?
    fn wants_tips(&self, profile: &UserProfile, message: &str, history: &[ChatLogEntry]) -> bool {
        if self.tips_reply().is_none() || !is_affirmative(message) {
            return false;
        }
        if profile.pending_action == Some(PendingAction::OfferTips) {
            return true;
        }
        history
            .iter()
            .rev()
            .take(2)
            .any(|e| e.role == MessageRole::Assistant && self.should_offer_tips(&e.content))
    }

    /// One field formatted for display.
    fn render_profile_field(&self, field: ProfileField, profile: &UserProfile) -> String;

    /// Short summary of the profile for prompts and greetings.
    fn format_user_context(&self, profile: &UserProfile) -> String {
        let parts: Vec<String> = self
            .profile_fields()
            .iter()
            .filter(|f| f.is_set(profile))
            .map(|f| format!("{}: {}", f.label(), self.render_profile_field(*f, profile)))
            .collect();
        if parts.is_empty() {
            "No details shared yet".to_string()
        } else {
            parts.join(", ")
        }
    }

    /// A deterministic result once the profile is complete.
    fn calculation_reply(&self, _profile: &UserProfile) -> Option<String> {
        None
    }

    /// A direct answer that bypasses the flow and the generative fallback.
    async fn resolve_intent(&self, _message: &str) -> Option<String> {
        None
    }
}

/// Build the configured persona.
pub fn build_persona(
    kind: PersonaKind,
    knowledge_path: Option<&Path>,
    provider: Arc<dyn LlmProvider>,
) -> Result<Arc<dyn Persona>, ConfigError> {
    match kind {
        PersonaKind::PensionGuru => Ok(Arc::new(PensionGuru::new())),
        PersonaKind::Concierge => {
            let knowledge = match knowledge_path {
                Some(path) => ConciergeKnowledge::load(path)?,
                None => ConciergeKnowledge::bundled()?,
            };
            Ok(Arc::new(Concierge::new(knowledge, Some(provider))))
        }
    }
}
