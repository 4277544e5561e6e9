//! Pure regex heuristics mapping free text to typed profile values.
//!
//! Extractors never touch storage. Callers collect their results into a
//! `ProfileUpdate` and decide what to persist. Keyword-anchored patterns are
//! always tried before the bare-numeral fallback, and the fallback only fires
//! for the field the conversation flow is currently asking for.

pub mod booking;
pub mod pension;

use std::sync::LazyLock;

use regex::Regex;

pub use booking::{
    extract_booking_date, extract_booking_facts, extract_booking_time, extract_cuisine,
    extract_party_size,
};
pub use pension::{
    UNSUPPORTED_REGIONS, extract_age, extract_contribution_years, extract_income,
    extract_pension_facts, extract_region, extract_retirement_age, extract_risk_profile,
};

static BARE_NUMERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[.!]?$").expect("invalid bare numeral regex"));

/// A message consisting of nothing but a one- or two-digit number.
pub(crate) fn bare_numeral(text: &str) -> Option<u32> {
    BARE_NUMERAL
        .captures(text.trim())
        .and_then(|caps| caps[1].parse().ok())
}

/// First capture group of the first match, parsed as a number.
pub(crate) fn first_number(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text).and_then(|caps| caps[1].parse().ok())
}
