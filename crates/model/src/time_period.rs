use serde::{Deserialize, Serialize};
use std::ops::Range;

/// First year with a bundled corpus file.
pub const FIRST_CORPUS_YEAR: i32 = 1880;
/// Last year with a bundled corpus file.
pub const LAST_CORPUS_YEAR: i32 = 2022;

/// Year-range filter presets. Each resolves to a half-open range of corpus
/// years; `CurrentYear` is the default selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "year")]
pub enum TimePeriod {
    CurrentYear,
    EighteenHundreds,
    PreviousCentury,
    CurrentCentury,
    SpecificYear(i32),
}

impl TimePeriod {
    /// Half-open range of years covered by this preset.
    pub fn range(self) -> Range<i32> {
        match self {
            TimePeriod::CurrentYear => LAST_CORPUS_YEAR..LAST_CORPUS_YEAR + 1,
            TimePeriod::EighteenHundreds => FIRST_CORPUS_YEAR..1900,
            TimePeriod::PreviousCentury => 1900..2000,
            TimePeriod::CurrentCentury => 2000..LAST_CORPUS_YEAR + 1,
            TimePeriod::SpecificYear(year) => year..year + 1,
        }
    }

    pub fn display(self) -> String {
        match self {
            TimePeriod::CurrentYear => "Current Year".to_string(),
            TimePeriod::EighteenHundreds => format!("{FIRST_CORPUS_YEAR}-1899"),
            TimePeriod::PreviousCentury => "1900-1999".to_string(),
            TimePeriod::CurrentCentury => format!("2000-{LAST_CORPUS_YEAR}"),
            TimePeriod::SpecificYear(year) => year.to_string(),
        }
    }

    /// Stable key under which the preset is persisted. `SpecificYear` stores
    /// its year separately.
    pub fn key(self) -> &'static str {
        match self {
            TimePeriod::CurrentYear => "current_year",
            TimePeriod::EighteenHundreds => "eighteen_hundreds",
            TimePeriod::PreviousCentury => "previous_century",
            TimePeriod::CurrentCentury => "current_century",
            TimePeriod::SpecificYear(_) => "specific_year",
        }
    }

    /// Rebuild a preset from its persisted key; unknown keys fall back to the
    /// default selection.
    pub fn from_key(key: &str, year: i32) -> TimePeriod {
        match key {
            "eighteen_hundreds" => TimePeriod::EighteenHundreds,
            "previous_century" => TimePeriod::PreviousCentury,
            "current_century" => TimePeriod::CurrentCentury,
            "specific_year" => TimePeriod::SpecificYear(year),
            _ => TimePeriod::CurrentYear,
        }
    }
}

impl Default for TimePeriod {
    fn default() -> Self {
        TimePeriod::CurrentYear
    }
}

#[cfg(test)]
mod tests {
    use super::{TimePeriod, LAST_CORPUS_YEAR};
    use pretty_assertions::assert_eq;

    #[test]
    fn ranges_are_half_open() {
        assert_eq!(
            TimePeriod::CurrentYear.range(),
            LAST_CORPUS_YEAR..LAST_CORPUS_YEAR + 1
        );
        assert_eq!(TimePeriod::EighteenHundreds.range(), 1880..1900);
        assert_eq!(TimePeriod::SpecificYear(1999).range(), 1999..2000);
    }

    #[test]
    fn keys_round_trip() {
        for period in [
            TimePeriod::CurrentYear,
            TimePeriod::EighteenHundreds,
            TimePeriod::PreviousCentury,
            TimePeriod::CurrentCentury,
            TimePeriod::SpecificYear(1985),
        ] {
            let rebuilt = TimePeriod::from_key(period.key(), 1985);
            assert_eq!(rebuilt, period);
        }
    }

    #[test]
    fn unknown_key_falls_back_to_default() {
        assert_eq!(
            TimePeriod::from_key("decade_of_the_future", 2010),
            TimePeriod::CurrentYear
        );
    }
}
