//! User profile — the per-user record that extractors fill in and the flow
//! engine reads and advances.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix marking an anonymous (ephemeral, in-memory) user.
pub const ANONYMOUS_PREFIX: &str = "anon_";

/// Whether a user id belongs to an anonymous session.
pub fn is_anonymous(user_id: &str) -> bool {
    user_id.starts_with(ANONYMOUS_PREFIX)
}

/// Country the user's pension entitlement is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "Ireland")]
    Ireland,
    #[serde(rename = "UK")]
    Uk,
    /// Recognized, but not a country we can advise on.
    #[serde(rename = "unsupported")]
    Unsupported,
}

impl Region {
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ireland => "Ireland",
            Self::Uk => "UK",
            Self::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Investment risk appetite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskProfile {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// A side-offer the assistant is waiting on a yes/no answer for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    OfferTips,
}

/// Named, updatable profile fields.
///
/// Flow definitions reference these by their snake_case names in
/// `expect_field`, and `ProfileUpdate` keys are matched against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Age,
    Income,
    Region,
    RetirementAge,
    #[serde(alias = "prsi_years")]
    ContributionYears,
    RiskProfile,
    PartySize,
    BookingDate,
    BookingTime,
    Cuisine,
    PendingStep,
    PendingAction,
    FlowStarted,
    CalculationDelivered,
}

impl ProfileField {
    pub const ALL: [ProfileField; 14] = [
        Self::Age,
        Self::Income,
        Self::Region,
        Self::RetirementAge,
        Self::ContributionYears,
        Self::RiskProfile,
        Self::PartySize,
        Self::BookingDate,
        Self::BookingTime,
        Self::Cuisine,
        Self::PendingStep,
        Self::PendingAction,
        Self::FlowStarted,
        Self::CalculationDelivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Income => "income",
            Self::Region => "region",
            Self::RetirementAge => "retirement_age",
            Self::ContributionYears => "contribution_years",
            Self::RiskProfile => "risk_profile",
            Self::PartySize => "party_size",
            Self::BookingDate => "booking_date",
            Self::BookingTime => "booking_time",
            Self::Cuisine => "cuisine",
            Self::PendingStep => "pending_step",
            Self::PendingAction => "pending_action",
            Self::FlowStarted => "flow_started",
            Self::CalculationDelivered => "calculation_delivered",
        }
    }

    /// Human label, e.g. "Retirement Age".
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether the profile holds a value for this field.
    pub fn is_set(&self, profile: &UserProfile) -> bool {
        match self {
            Self::Age => profile.age.is_some(),
            Self::Income => profile.income.is_some(),
            Self::Region => profile.region.is_some(),
            Self::RetirementAge => profile.retirement_age.is_some(),
            Self::ContributionYears => profile.contribution_years.is_some(),
            Self::RiskProfile => profile.risk_profile.is_some(),
            Self::PartySize => profile.party_size.is_some(),
            Self::BookingDate => profile.booking_date.is_some(),
            Self::BookingTime => profile.booking_time.is_some(),
            Self::Cuisine => profile.cuisine.is_some(),
            Self::PendingStep => profile.pending_step.is_some(),
            Self::PendingAction => profile.pending_action.is_some(),
            Self::FlowStarted => profile.flow_started,
            Self::CalculationDelivered => profile.calculation_delivered,
        }
    }
}

impl FromStr for ProfileField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "prsi_years" {
            return Ok(Self::ContributionYears);
        }
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown profile field: {s}"))
    }
}

impl std::fmt::Display for ProfileField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user's profile.
///
/// Stored as a JSON document keyed by `user_id`. Unknown keys in a stored
/// document are ignored and missing keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retirement_age: Option<u32>,
    #[serde(alias = "prsi_years", skip_serializing_if = "Option::is_none")]
    pub contribution_years: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_profile: Option<RiskProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    /// Next flow node to evaluate. `None` means idle or finished.
    pub pending_step: Option<String>,
    pub pending_action: Option<PendingAction>,
    /// Set once the user has been placed on the flow's start node.
    pub flow_started: bool,
    /// Set after the calculation reply was shown; cleared when its inputs change.
    pub calculation_delivered: bool,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Apply a single named update. Returns false (and changes nothing) when
    /// the name is unknown or the value has the wrong shape.
    pub fn apply(&mut self, name: &str, value: &Value) -> bool {
        let Ok(field) = name.parse::<ProfileField>() else {
            return false;
        };
        match field {
            ProfileField::Age => assign(&mut self.age, value),
            ProfileField::Income => assign(&mut self.income, value),
            ProfileField::Region => assign(&mut self.region, value),
            ProfileField::RetirementAge => assign(&mut self.retirement_age, value),
            ProfileField::ContributionYears => assign(&mut self.contribution_years, value),
            ProfileField::RiskProfile => assign(&mut self.risk_profile, value),
            ProfileField::PartySize => assign(&mut self.party_size, value),
            ProfileField::BookingDate => assign(&mut self.booking_date, value),
            ProfileField::BookingTime => assign(&mut self.booking_time, value),
            ProfileField::Cuisine => assign(&mut self.cuisine, value),
            ProfileField::PendingStep => assign(&mut self.pending_step, value),
            ProfileField::PendingAction => assign(&mut self.pending_action, value),
            ProfileField::FlowStarted => assign_flag(&mut self.flow_started, value),
            ProfileField::CalculationDelivered => {
                assign_flag(&mut self.calculation_delivered, value)
            }
        }
    }

    /// Apply every entry of an update. Returns the number of entries applied.
    pub fn apply_update(&mut self, update: &ProfileUpdate) -> usize {
        update
            .iter()
            .filter(|(name, value)| self.apply(name, value))
            .count()
    }
}

fn assign<T: DeserializeOwned>(slot: &mut Option<T>, value: &Value) -> bool {
    match serde_json::from_value::<Option<T>>(value.clone()) {
        Ok(parsed) => {
            *slot = parsed;
            true
        }
        Err(_) => false,
    }
}

fn assign_flag(slot: &mut bool, value: &Value) -> bool {
    match value {
        Value::Bool(b) => {
            *slot = *b;
            true
        }
        Value::Null => {
            *slot = false;
            true
        }
        _ => false,
    }
}

/// A set of field writes destined for `upsert_profile`.
///
/// Keys are plain field names so callers (and stored documents written by
/// newer versions) can carry names this build does not know; those are
/// ignored on apply. A `Null` value clears the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    fields: BTreeMap<String, Value>,
}

impl ProfileUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: ProfileField, value: impl Serialize) -> Self {
        self.insert(field, value);
        self
    }

    pub fn clear(mut self, field: ProfileField) -> Self {
        self.fields.insert(field.as_str().to_string(), Value::Null);
        self
    }

    pub fn insert(&mut self, field: ProfileField, value: impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.fields.insert(field.as_str().to_string(), value);
    }

    /// Insert under an arbitrary name.
    pub fn insert_raw(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: ProfileField) -> Option<&Value> {
        self.fields.get(field.as_str())
    }

    pub fn touches(&self, field: ProfileField) -> bool {
        self.fields.contains_key(field.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn anonymous_prefix() {
        assert!(is_anonymous("anon_1234"));
        assert!(!is_anonymous("google-oauth2|1234"));
        assert!(!is_anonymous("anonymous"));
    }

    #[test]
    fn apply_known_fields() {
        let mut profile = UserProfile::new("u1");
        assert!(profile.apply("age", &json!(42)));
        assert!(profile.apply("region", &json!("Ireland")));
        assert!(profile.apply("pending_step", &json!("step_ie_ask_age")));
        assert!(profile.apply("pending_action", &json!("offer_tips")));
        assert_eq!(profile.age, Some(42));
        assert_eq!(profile.region, Some(Region::Ireland));
        assert_eq!(profile.pending_step.as_deref(), Some("step_ie_ask_age"));
        assert_eq!(profile.pending_action, Some(PendingAction::OfferTips));
    }

    #[test]
    fn apply_ignores_unknown_and_malformed() {
        let mut profile = UserProfile::new("u1");
        assert!(!profile.apply("shoe_size", &json!(44)));
        assert!(!profile.apply("age", &json!("forty")));
        assert_eq!(profile, UserProfile::new("u1"));
    }

    #[test]
    fn apply_null_clears() {
        let mut profile = UserProfile::new("u1");
        profile.pending_step = Some("welcome".into());
        profile.flow_started = true;
        assert!(profile.apply("pending_step", &Value::Null));
        assert!(profile.apply("flow_started", &Value::Null));
        assert!(profile.pending_step.is_none());
        assert!(!profile.flow_started);
    }

    #[test]
    fn prsi_years_is_an_alias() {
        let mut profile = UserProfile::new("u1");
        assert!(profile.apply("prsi_years", &json!(30)));
        assert_eq!(profile.contribution_years, Some(30));

        let parsed: UserProfile =
            serde_json::from_value(json!({"user_id": "u2", "prsi_years": 12})).unwrap();
        assert_eq!(parsed.contribution_years, Some(12));
    }

    #[test]
    fn apply_update_counts_applied_entries() {
        let mut update = ProfileUpdate::new()
            .set(ProfileField::Age, 30)
            .set(ProfileField::RetirementAge, 65);
        update.insert_raw("favourite_colour", json!("green"));

        let mut profile = UserProfile::new("u1");
        assert_eq!(profile.apply_update(&update), 2);
        assert_eq!(profile.retirement_age, Some(65));
    }

    #[test]
    fn region_serde_names() {
        assert_eq!(serde_json::to_string(&Region::Uk).unwrap(), "\"UK\"");
        assert_eq!(
            serde_json::to_string(&Region::Unsupported).unwrap(),
            "\"unsupported\""
        );
        for region in [Region::Ireland, Region::Uk, Region::Unsupported] {
            assert_eq!(
                serde_json::to_string(&region).unwrap(),
                format!("\"{region}\"")
            );
        }
    }

    #[test]
    fn field_names_roundtrip_through_from_str() {
        for field in ProfileField::ALL {
            assert_eq!(field.as_str().parse::<ProfileField>().unwrap(), field);
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
        assert!("nope".parse::<ProfileField>().is_err());
    }

    #[test]
    fn field_label() {
        assert_eq!(ProfileField::RetirementAge.label(), "Retirement Age");
        assert_eq!(ProfileField::Age.label(), "Age");
    }

    #[test]
    fn stored_document_tolerates_unknown_keys() {
        let parsed: UserProfile = serde_json::from_value(json!({
            "user_id": "u1",
            "age": 50,
            "legacy_column": "whatever"
        }))
        .unwrap();
        assert_eq!(parsed.age, Some(50));
        assert!(!parsed.flow_started);
    }
}
