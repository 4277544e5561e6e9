//! Hotel concierge. Answers from a fixed knowledge document first and
//! only asks the LLM when the question is open-ended.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::extract::extract_booking_facts;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::persona::{Persona, PersonaKind};
use crate::profile::{ProfileField, ProfileUpdate, UserProfile};

const SYSTEM_PROMPT: &str = include_str!("../../config/prompts/concierge.md");
pub const KNOWLEDGE_YAML: &str = include_str!("../../config/concierge_knowledge.yaml");

const INTENT_PROMPT: &str = "You are an intent classifier for a hotel concierge assistant. \
    Respond with only one word from the following list of supported intents:\n\
    - wifi\n- menu\n- checkin\n- checkout\n- dining\n- golf\n- activities\n- transport\n\
    - events\n- website\n- facebook\n\
    If you are unsure, respond with: unknown";

const FIELDS: &[ProfileField] = &[
    ProfileField::PartySize,
    ProfileField::BookingDate,
    ProfileField::BookingTime,
    ProfileField::Cuisine,
];

#[derive(Debug, Clone, Deserialize)]
pub struct HotelInfo {
    pub name: String,
    pub checkin: String,
    pub checkout: String,
    pub wifi: String,
    pub website: String,
    pub facebook: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AreaInfo {
    pub name: String,
    #[serde(default)]
    pub dining: Vec<String>,
    #[serde(default)]
    pub activities: Vec<String>,
}

/// Facts the concierge can state without asking the LLM.
#[derive(Debug, Clone, Deserialize)]
pub struct ConciergeKnowledge {
    pub hotel: HotelInfo,
    pub area: AreaInfo,
}

impl ConciergeKnowledge {
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(source).map_err(|e| ConfigError::ParseError {
            document: "concierge knowledge".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    pub fn bundled() -> Result<Self, ConfigError> {
        Self::from_yaml(KNOWLEDGE_YAML)
    }
}

/// Topics the concierge can answer directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    CheckIn,
    CheckOut,
    Wifi,
    Dining,
    Activities,
    Website,
    Facebook,
}

impl Intent {
    /// Map a classifier label. Labels without a canned answer map to `None`.
    fn from_label(label: &str) -> Option<Self> {
        let word = label
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        match word.as_str() {
            "checkin" => Some(Self::CheckIn),
            "checkout" => Some(Self::CheckOut),
            "wifi" => Some(Self::Wifi),
            "dining" | "menu" => Some(Self::Dining),
            "activities" => Some(Self::Activities),
            "website" => Some(Self::Website),
            "facebook" => Some(Self::Facebook),
            _ => None,
        }
    }
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keyword match on the guest's message.
fn keyword_intent(message: &str) -> Option<Intent> {
    let lower = message.to_lowercase();
    let words = words(message);
    let has = |w: &str| words.iter().any(|x| x == w);

    if lower.contains("wifi") || lower.contains("wi-fi") || has("internet") {
        Some(Intent::Wifi)
    } else if lower.contains("check-out") || lower.contains("check out") || has("checkout") {
        Some(Intent::CheckOut)
    } else if lower.contains("check-in") || lower.contains("check in") || has("checkin") {
        Some(Intent::CheckIn)
    } else if has("facebook") {
        Some(Intent::Facebook)
    } else if has("website") {
        Some(Intent::Website)
    } else if has("restaurant") || has("restaurants") || has("eat") || has("dine") || has("dinner") {
        Some(Intent::Dining)
    } else if lower.contains("things to do")
        || lower.contains("what to do")
        || has("activities")
        || has("activity")
        || has("attractions")
    {
        Some(Intent::Activities)
    } else {
        None
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct Concierge {
    knowledge: ConciergeKnowledge,
    classifier: Option<Arc<dyn LlmProvider>>,
    init_message: String,
}

impl Concierge {
    pub fn new(knowledge: ConciergeKnowledge, classifier: Option<Arc<dyn LlmProvider>>) -> Self {
        let init_message = format!(
            "Welcome to the {}! I can help with check-in times, Wi-Fi, dining and things to do \
             around {}. What can I do for you?",
            knowledge.hotel.name, knowledge.area.name
        );
        Self {
            knowledge,
            classifier,
            init_message,
        }
    }

    pub fn answer(&self, intent: Intent) -> String {
        let hotel = &self.knowledge.hotel;
        let area = &self.knowledge.area;
        match intent {
            Intent::CheckIn | Intent::CheckOut => format!(
                "Check-in is from **{}**, and checkout is by **{}**.",
                hotel.checkin, hotel.checkout
            ),
            Intent::Wifi => format!("The Wi-Fi details are:\n\n{}", hotel.wifi),
            Intent::Website => format!("The official website is {}", hotel.website),
            Intent::Facebook => format!(
                "You can view the hotel's Facebook page here: [Facebook]({})",
                hotel.facebook
            ),
            Intent::Dining => format!(
                "Recommended places to eat near {}:\n\n{}",
                area.name,
                bullet_list(&area.dining)
            ),
            Intent::Activities => format!(
                "Things to do in {}:\n\n{}",
                area.name,
                bullet_list(&area.activities)
            ),
        }
    }

    /// One-word intent from the LLM. Failures count as "unknown".
    async fn classify(&self, message: &str) -> Option<Intent> {
        let provider = self.classifier.as_ref()?;
        let request = CompletionRequest::new(vec![
            ChatMessage::system(INTENT_PROMPT),
            ChatMessage::user(message),
        ])
        .with_temperature(0.0)
        .with_max_tokens(10);

        match provider.complete(request).await {
            Ok(response) => {
                let intent = Intent::from_label(&response.content);
                debug!(label = %response.content.trim(), ?intent, "Concierge intent classified");
                intent
            }
            Err(e) => {
                warn!(error = %e, "Intent classification failed");
                None
            }
        }
    }
}

#[async_trait]
impl Persona for Concierge {
    fn kind(&self) -> PersonaKind {
        PersonaKind::Concierge
    }

    fn display_name(&self) -> &str {
        &self.knowledge.hotel.name
    }

    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
    }

    fn init_message(&self) -> &str {
        &self.init_message
    }

    fn profile_fields(&self) -> &[ProfileField] {
        FIELDS
    }

    fn extract(
        &self,
        message: &str,
        _expected: Option<ProfileField>,
        _profile: &UserProfile,
    ) -> ProfileUpdate {
        extract_booking_facts(message)
    }

    fn block_response(&self, _profile: &UserProfile) -> Option<String> {
        None
    }

    fn render_profile_field(&self, field: ProfileField, profile: &UserProfile) -> String {
        let rendered = match field {
            ProfileField::PartySize => profile.party_size.map(|n| n.to_string()),
            ProfileField::BookingDate => profile.booking_date.clone(),
            ProfileField::BookingTime => profile.booking_time.clone(),
            ProfileField::Cuisine => profile.cuisine.clone(),
            _ => None,
        };
        rendered.unwrap_or_else(|| "unknown".to_string())
    }

    async fn resolve_intent(&self, message: &str) -> Option<String> {
        let intent = match keyword_intent(message) {
            Some(intent) => Some(intent),
            None => self.classify(message).await,
        };
        intent.map(|i| self.answer(i))
    }
}
