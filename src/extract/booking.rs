//! Restaurant booking facts: party size, date, time, cuisine.

use std::sync::LazyLock;

use regex::Regex;

use super::first_number;
use crate::profile::{ProfileField, ProfileUpdate};

const PARTY_SIZE_RANGE: std::ops::RangeInclusive<u32> = 1..=50;

const CUISINES: &[&str] = &[
    "seafood", "italian", "indian", "chinese", "thai", "french", "irish", "steak", "pizza",
    "vegetarian", "vegan", "japanese", "sushi", "mexican",
];

static PARTY_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:table|party|for)\s+(?:of\s+)?(\d{1,2})\b").expect("invalid party size regex")
});

static PEOPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\s+(?:people|persons|guests|adults)\b").expect("invalid party size regex")
});

static TIME_MERIDIEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}(?::\d{2})?)\s?(am|pm)\b").expect("invalid time regex")
});

static TIME_CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}:\d{2})\b").expect("invalid time regex"));

static TIME_AT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bat\s+(\d{1,2})\b").expect("invalid time regex"));

static TODAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:tonight|today|this evening)\b").expect("invalid date regex")
});

static TOMORROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\btomorrow\b").expect("invalid date regex"));

pub fn extract_party_size(text: &str) -> Option<u32> {
    let text = text.to_lowercase();
    first_number(&PARTY_SIZE, &text)
        .or_else(|| first_number(&PEOPLE, &text))
        .filter(|n| PARTY_SIZE_RANGE.contains(n))
}

/// Booking time as the user wrote it ("7pm", "19:30"). A bare "at 7" is
/// read as an evening time.
pub fn extract_booking_time(text: &str) -> Option<String> {
    let text = text.to_lowercase();
    if let Some(caps) = TIME_MERIDIEM.captures(&text) {
        return Some(format!("{}{}", &caps[1], &caps[2]));
    }
    if let Some(caps) = TIME_CLOCK.captures(&text) {
        return Some(caps[1].to_string());
    }
    let hour = first_number(&TIME_AT, &text)?;
    match hour {
        1..=11 => Some(format!("{hour}pm")),
        12..=23 => Some(format!("{hour}:00")),
        _ => None,
    }
}

/// Relative booking date: "today" or "tomorrow".
pub fn extract_booking_date(text: &str) -> Option<String> {
    let text = text.to_lowercase();
    if TODAY.is_match(&text) {
        Some("today".to_string())
    } else if TOMORROW.is_match(&text) {
        Some("tomorrow".to_string())
    } else {
        None
    }
}

pub fn extract_cuisine(text: &str) -> Option<String> {
    let text = text.to_lowercase();
    CUISINES
        .iter()
        .find(|c| text.split(|ch: char| !ch.is_alphanumeric()).any(|w| w == **c))
        .map(|c| c.to_string())
}

/// Run every booking extractor and collect the matches.
pub fn extract_booking_facts(text: &str) -> ProfileUpdate {
    let mut update = ProfileUpdate::new();
    if let Some(size) = extract_party_size(text) {
        update.insert(ProfileField::PartySize, size);
    }
    if let Some(date) = extract_booking_date(text) {
        update.insert(ProfileField::BookingDate, date);
    }
    if let Some(time) = extract_booking_time(text) {
        update.insert(ProfileField::BookingTime, time);
    }
    if let Some(cuisine) = extract_cuisine(text) {
        update.insert(ProfileField::Cuisine, cuisine);
    }
    update
}
