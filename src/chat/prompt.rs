//! Prompt and greeting composition.

use crate::persona::{Persona, TONE_PLACEHOLDER};
use crate::profile::UserProfile;
use crate::tone::Tone;

/// Persona prompt with the tone filled in, followed by the profile summary.
pub fn build_system_prompt(persona: &dyn Persona, tone: Option<Tone>, profile: &UserProfile) -> String {
    let instruction = tone.map(|t| t.instruction()).unwrap_or_default();
    let prompt = persona.system_prompt().replace(TONE_PLACEHOLDER, instruction);
    format!(
        "{}\n\nWhat you know about this user: {}",
        prompt.trim_end(),
        persona.format_user_context(profile)
    )
}

pub fn welcome_back(name: Option<&str>, summary: &str) -> String {
    let name = name.filter(|n| !n.trim().is_empty()).unwrap_or("there");
    format!(
        "Welcome back, {name}! Here's what I remember: {summary}. What would you like to explore today?"
    )
}
