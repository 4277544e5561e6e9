//! Pension Guru — State Pension estimates for Ireland and the UK.

use async_trait::async_trait;

use crate::calculator::{self, PensionCalculation};
use crate::error::FlowError;
use crate::extract::extract_pension_facts;
use crate::flow::FlowDefinition;
use crate::persona::{Persona, PersonaKind};
use crate::profile::{ProfileField, ProfileUpdate, Region, UserProfile};

const SYSTEM_PROMPT: &str = include_str!("../../config/prompts/pension_guru.md");

const INIT_MESSAGE: &str = "Hi, I'm Pension Guru. Tell me a little about yourself, like your age \
                            and whether you live in Ireland or the UK, and I'll estimate your \
                            State Pension.";

const UNSUPPORTED_REGION_REPLY: &str = "Sorry, I can only help with State Pensions in Ireland \
                                        and the UK at the moment. If you live in one of those, \
                                        just tell me which and we can carry on.";

const TIPS: &str = "Here are a few ways to boost your pension:\n\
                    - Check your contribution record for gaps and ask about voluntary contributions.\n\
                    - Claim credits for years spent caring, unemployed or ill.\n\
                    - Start or top up a private or workplace pension; tax relief makes each euro or pound go further.\n\
                    - Review your risk level as retirement gets closer.\n\
                    - Get a personal forecast from the pension authority before you decide when to retire.";

const OFFER_TIPS: &str = "Would you like some tips on how to boost your pension?";

const FIELDS: &[ProfileField] = &[
    ProfileField::Region,
    ProfileField::Age,
    ProfileField::Income,
    ProfileField::ContributionYears,
    ProfileField::RetirementAge,
    ProfileField::RiskProfile,
];

#[derive(Debug, Default)]
pub struct PensionGuru;

impl PensionGuru {
    pub fn new() -> Self {
        Self
    }
}

fn currency(profile: &UserProfile) -> &'static str {
    match profile.region {
        Some(Region::Uk) => "£",
        _ => "€",
    }
}

/// 52000 -> "52,000"
fn thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn format_calculation(calc: &PensionCalculation) -> String {
    let symbol = calc.currency;
    let mut reply = match calc.region {
        Region::Uk => format!(
            "With {} qualifying years of National Insurance, your estimated new State Pension \
             is {symbol}{:.2} per week.",
            calc.contribution_years, calc.weekly_now
        ),
        _ => format!(
            "Based on {} years of PRSI contributions, your estimated State Pension today is \
             {symbol}{:.2} per week.",
            calc.contribution_years, calc.weekly_now
        ),
    };
    if let Some(projection) = &calc.projection {
        reply.push_str(&format!(
            " If you keep contributing until you retire at {}, that rises to about \
             {symbol}{:.2} per week ({} years of contributions).",
            projection.retirement_age, projection.weekly, projection.contribution_years
        ));
    }
    reply.push_str("\n\n");
    reply.push_str(OFFER_TIPS);
    reply
}

#[async_trait]
impl Persona for PensionGuru {
    fn kind(&self) -> PersonaKind {
        PersonaKind::PensionGuru
    }

    fn display_name(&self) -> &str {
        "Pension Guru"
    }

    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
    }

    fn init_message(&self) -> &str {
        INIT_MESSAGE
    }

    fn profile_fields(&self) -> &[ProfileField] {
        FIELDS
    }

    fn default_flow(&self) -> Option<Result<FlowDefinition, FlowError>> {
        Some(FlowDefinition::pension_default())
    }

    fn extract(
        &self,
        message: &str,
        expected: Option<ProfileField>,
        profile: &UserProfile,
    ) -> ProfileUpdate {
        let mut update = extract_pension_facts(message, expected);

        // A supported region only changes when we ask for it; passing
        // mentions of other countries ("I worked in Spain") must not flip it.
        let region_settled = profile.region.is_some_and(|r| r.is_supported());
        if region_settled && expected != Some(ProfileField::Region) {
            let mut kept = ProfileUpdate::new();
            for (name, value) in update.iter() {
                if name != ProfileField::Region.as_str() {
                    kept.insert_raw(name, value.clone());
                }
            }
            update = kept;
        }
        update
    }

    fn block_response(&self, profile: &UserProfile) -> Option<String> {
        (profile.region == Some(Region::Unsupported)).then(|| UNSUPPORTED_REGION_REPLY.to_string())
    }

    fn tips_reply(&self) -> Option<&str> {
        Some(TIPS)
    }

    fn render_profile_field(&self, field: ProfileField, profile: &UserProfile) -> String {
        let rendered = match field {
            ProfileField::Region => profile.region.map(|r| r.to_string()),
            ProfileField::Age => profile.age.map(|a| a.to_string()),
            ProfileField::Income => profile
                .income
                .map(|i| format!("{}{}", currency(profile), thousands(i))),
            ProfileField::ContributionYears => profile.contribution_years.map(|y| format!("{y} years")),
            ProfileField::RetirementAge => profile.retirement_age.map(|a| a.to_string()),
            ProfileField::RiskProfile => profile.risk_profile.map(|r| r.to_string()),
            _ => None,
        };
        rendered.unwrap_or_else(|| "unknown".to_string())
    }

    fn calculation_reply(&self, profile: &UserProfile) -> Option<String> {
        let region = profile.region?;
        let years = profile.contribution_years?;
        calculator::calculate(region, years, profile.age, profile.retirement_age)
            .map(|calc| format_calculation(&calc))
    }
}
