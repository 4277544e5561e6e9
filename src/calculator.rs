//! State pension estimate for Ireland (PRSI weeks) and the UK (NI years).
//!
//! Amounts are weekly, rounded to cents and clamped to the regional floor
//! and full rate.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::profile::Region;

/// Full Irish State Pension (Contributory), weekly, 2025.
pub const IE_FULL_RATE: Decimal = dec!(289.30);
const IE_FLOOR: Decimal = dec!(70.00);
const WEEKS_PER_YEAR: Decimal = dec!(52);
/// 40 years of weekly contributions.
const IE_MAX_CONTRIBUTIONS: Decimal = dec!(2080);

/// Full UK new State Pension, weekly, 2025.
pub const UK_FULL_RATE: Decimal = dec!(221.20);
const UK_FLOOR: Decimal = dec!(50.00);
const UK_MAX_YEARS: Decimal = dec!(35);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PensionCalculation {
    pub region: Region,
    pub currency: &'static str,
    pub contribution_years: u32,
    pub weekly_now: Decimal,
    /// Present only when both ages are known and retirement is still ahead.
    pub projection: Option<Projection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub retirement_age: u32,
    pub contribution_years: u32,
    pub weekly: Decimal,
}

/// Estimate the weekly pension. `None` for an unsupported region.
pub fn calculate(
    region: Region,
    contribution_years: u32,
    age: Option<u32>,
    retirement_age: Option<u32>,
) -> Option<PensionCalculation> {
    match region {
        Region::Ireland => {
            let projection = match (age, retirement_age) {
                (Some(age), Some(retire)) if retire > age => {
                    let years = contribution_years + (retire - age);
                    Some(Projection {
                        retirement_age: retire,
                        contribution_years: years,
                        weekly: ireland_weekly(years),
                    })
                }
                _ => None,
            };
            Some(PensionCalculation {
                region,
                currency: "€",
                contribution_years,
                weekly_now: ireland_weekly(contribution_years),
                projection,
            })
        }
        Region::Uk => Some(PensionCalculation {
            region,
            currency: "£",
            contribution_years,
            weekly_now: uk_weekly(contribution_years),
            projection: None,
        }),
        Region::Unsupported => None,
    }
}

fn ireland_weekly(prsi_years: u32) -> Decimal {
    let fraction = Decimal::from(prsi_years) * WEEKS_PER_YEAR / IE_MAX_CONTRIBUTIONS;
    (fraction * IE_FULL_RATE)
        .round_dp(2)
        .clamp(IE_FLOOR, IE_FULL_RATE)
}

fn uk_weekly(ni_years: u32) -> Decimal {
    let fraction = Decimal::from(ni_years) / UK_MAX_YEARS;
    (fraction * UK_FULL_RATE)
        .round_dp(2)
        .clamp(UK_FLOOR, UK_FULL_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ireland_twenty_years_is_half_rate() {
        let calc = calculate(Region::Ireland, 20, None, None).unwrap();
        assert_eq!(calc.weekly_now, dec!(144.65));
        assert_eq!(calc.currency, "€");
        assert!(calc.projection.is_none());
    }

    #[test]
    fn ireland_projection_adds_remaining_years() {
        let calc = calculate(Region::Ireland, 20, Some(50), Some(66)).unwrap();
        let projection = calc.projection.unwrap();
        assert_eq!(projection.contribution_years, 36);
        assert_eq!(projection.retirement_age, 66);
        assert_eq!(projection.weekly, dec!(260.37));
    }

    #[test]
    fn projection_is_all_or_nothing() {
        assert!(calculate(Region::Ireland, 20, Some(50), None).unwrap().projection.is_none());
        assert!(calculate(Region::Ireland, 20, None, Some(66)).unwrap().projection.is_none());
        assert!(calculate(Region::Ireland, 20, Some(66), Some(66)).unwrap().projection.is_none());
        assert!(calculate(Region::Ireland, 20, Some(70), Some(66)).unwrap().projection.is_none());
        assert!(calculate(Region::Uk, 20, Some(50), Some(66)).unwrap().projection.is_none());
    }

    #[test]
    fn weekly_amounts_are_clamped() {
        for years in [0, 1, 5, 10, 35, 40, 45, 60] {
            let ie = calculate(Region::Ireland, years, None, None).unwrap().weekly_now;
            assert!(ie >= IE_FLOOR && ie <= IE_FULL_RATE, "ie {years}: {ie}");
            let uk = calculate(Region::Uk, years, None, None).unwrap().weekly_now;
            assert!(uk >= UK_FLOOR && uk <= UK_FULL_RATE, "uk {years}: {uk}");
        }
        assert_eq!(calculate(Region::Ireland, 0, None, None).unwrap().weekly_now, IE_FLOOR);
        assert_eq!(calculate(Region::Ireland, 45, None, None).unwrap().weekly_now, IE_FULL_RATE);
        assert_eq!(calculate(Region::Uk, 40, None, None).unwrap().weekly_now, UK_FULL_RATE);
    }

    #[test]
    fn uk_partial_record() {
        let calc = calculate(Region::Uk, 20, None, None).unwrap();
        assert_eq!(calc.weekly_now, dec!(126.40));
        assert_eq!(calc.currency, "£");
    }

    #[test]
    fn unsupported_region_has_no_result() {
        assert!(calculate(Region::Unsupported, 30, Some(40), Some(66)).is_none());
    }
}
