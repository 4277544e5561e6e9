//! Pension facts: age, income, region, retirement age, contribution years,
//! risk appetite.

use std::sync::LazyLock;

use regex::Regex;

use super::{bare_numeral, first_number};
use crate::profile::{ProfileField, ProfileUpdate, Region, RiskProfile};

const AGE_RANGE: std::ops::RangeInclusive<u32> = 18..=100;
const INCOME_RANGE: std::ops::RangeInclusive<u32> = 5_000..=500_000;
const RETIREMENT_AGE_RANGE: std::ops::RangeInclusive<u32> = 50..=80;
const CONTRIBUTION_YEARS_RANGE: std::ops::RangeInclusive<u32> = 0..=60;

/// Countries we recognize but cannot advise on.
pub const UNSUPPORTED_REGIONS: &[&str] = &[
    "usa",
    "united states",
    "america",
    "germany",
    "france",
    "canada",
    "india",
    "australia",
    "spain",
    "italy",
    "netherlands",
    "poland",
    "new zealand",
];

static AGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(\d{1,3})\s*(?:years?|yrs?)[\s-]*old\b",
        r"\b(?:i['’]?m|i\s+am)\s+(\d{1,3})\b",
        r"\baged?\s*(?:is\s*)?:?\s*(\d{1,3})\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid age regex"))
    .collect()
});

static CLAUSE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[,.;:!?]|\b(?:and|but)\b").expect("invalid clause regex")
});

static INCOME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[€£]\s?)?\b(\d{2,6})(k?)\b").expect("invalid income regex")
});

static RETIREMENT_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bretir(?:e|ed|ement|ing)\b.{0,20}?\b(\d{2,3})\b")
        .expect("invalid retirement regex")
});

static CONTRIBUTION_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d{1,3})\s+(?:years?|yrs?)\s+(?:of\s+)?(?:prsi|contributions?|ni\b|national insurance)",
    )
    .expect("invalid contribution regex")
});

static NORTHERN_IRELAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bnorthern ireland\b").expect("invalid region regex"));

static IRELAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:ireland|eire|éire|ie|roi)\b").expect("invalid region regex")
});

static UK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:uk|united kingdom|britain|great britain|england|scotland|wales|gb)\b|\bu\.k\b\.?")
        .expect("invalid region regex")
});

static UNSUPPORTED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    UNSUPPORTED_REGIONS
        .iter()
        .map(|kw| Regex::new(&format!(r"\b{}\b", regex::escape(kw))).expect("invalid region regex"))
        .collect()
});

/// Age from "I'm 42", "42 years old", "age 42". A lone number only counts
/// when the flow is asking for the age.
pub fn extract_age(text: &str, expected: Option<ProfileField>) -> Option<u32> {
    let text = text.to_lowercase();
    for pattern in AGE_PATTERNS.iter() {
        for caps in pattern.captures_iter(&text) {
            let Some(whole) = caps.get(0) else { continue };
            // "retire at age 65" is not the user's age
            if clause_before(&text, whole.start()).contains("retir") {
                continue;
            }
            if let Some(age) = caps[1].parse().ok().filter(|a| AGE_RANGE.contains(a)) {
                return Some(age);
            }
        }
    }
    numeral_fallback(&text, expected, ProfileField::Age, AGE_RANGE)
}

/// The part of `text[..end]` after the last clause break.
fn clause_before(text: &str, end: usize) -> &str {
    let head = &text[..end];
    let start = CLAUSE_BREAK.find_iter(head).last().map_or(0, |m| m.end());
    &head[start..]
}

/// Annual income: optional currency symbol, 2–6 digits, optional "k".
pub fn extract_income(text: &str) -> Option<u32> {
    let text = text.to_lowercase().replace(',', "");
    INCOME.captures_iter(&text).find_map(|caps| {
        let base: u32 = caps[1].parse().ok()?;
        let value = if &caps[2] == "k" {
            base.checked_mul(1000)?
        } else {
            base
        };
        INCOME_RANGE.contains(&value).then_some(value)
    })
}

/// Retirement age from "retire at 65" / "retirement age 67", else a lone
/// number while the flow is asking for it.
pub fn extract_retirement_age(text: &str, expected: Option<ProfileField>) -> Option<u32> {
    let text = text.to_lowercase();
    if let Some(age) = first_number(&RETIREMENT_KEYWORD, &text) {
        if RETIREMENT_AGE_RANGE.contains(&age) {
            return Some(age);
        }
    }
    numeral_fallback(
        &text,
        expected,
        ProfileField::RetirementAge,
        RETIREMENT_AGE_RANGE,
    )
}

/// Country classification. Supported countries win over unsupported ones
/// mentioned in the same message.
pub fn extract_region(text: &str) -> Option<Region> {
    let text = text.to_lowercase();
    if NORTHERN_IRELAND.is_match(&text) {
        return Some(Region::Uk);
    }
    if IRELAND.is_match(&text) {
        return Some(Region::Ireland);
    }
    if UK.is_match(&text) {
        return Some(Region::Uk);
    }
    if UNSUPPORTED.iter().any(|re| re.is_match(&text)) {
        return Some(Region::Unsupported);
    }
    None
}

/// Years of social insurance contributions (PRSI in Ireland, NI in the UK).
pub fn extract_contribution_years(text: &str, expected: Option<ProfileField>) -> Option<u32> {
    let text = text.to_lowercase();
    if let Some(years) = first_number(&CONTRIBUTION_KEYWORD, &text) {
        if CONTRIBUTION_YEARS_RANGE.contains(&years) {
            return Some(years);
        }
    }
    numeral_fallback(
        &text,
        expected,
        ProfileField::ContributionYears,
        CONTRIBUTION_YEARS_RANGE,
    )
}

pub fn extract_risk_profile(text: &str) -> Option<RiskProfile> {
    let text = text.to_lowercase();
    if text.contains("low risk") {
        Some(RiskProfile::Low)
    } else if text.contains("high risk") {
        Some(RiskProfile::High)
    } else if text.contains("medium risk") || text.contains("moderate") {
        Some(RiskProfile::Medium)
    } else {
        None
    }
}

/// Run every pension extractor and collect the matches.
pub fn extract_pension_facts(text: &str, expected: Option<ProfileField>) -> ProfileUpdate {
    let mut update = ProfileUpdate::new();
    if let Some(region) = extract_region(text) {
        update.insert(ProfileField::Region, region);
    }
    if let Some(years) = extract_contribution_years(text, expected) {
        update.insert(ProfileField::ContributionYears, years);
    }
    if let Some(age) = extract_age(text, expected) {
        update.insert(ProfileField::Age, age);
    }
    if let Some(age) = extract_retirement_age(text, expected) {
        update.insert(ProfileField::RetirementAge, age);
    }
    if let Some(income) = extract_income(text) {
        update.insert(ProfileField::Income, income);
    }
    if let Some(risk) = extract_risk_profile(text) {
        update.insert(ProfileField::RiskProfile, risk);
    }
    update
}

fn numeral_fallback(
    text: &str,
    expected: Option<ProfileField>,
    field: ProfileField,
    range: std::ops::RangeInclusive<u32>,
) -> Option<u32> {
    if expected != Some(field) {
        return None;
    }
    bare_numeral(text).filter(|n| range.contains(n))
}
