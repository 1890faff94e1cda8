use serde::{Deserialize, Serialize};

/// Gender filter applied when browsing candidates. Corpus rows only ever
/// carry `M` or `F`; `Both` is the no-constraint selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Both,
}

impl Gender {
    /// Single-letter code used in corpus rows, seen-store keys, and claims.
    pub fn code(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Both => "",
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Both => "Both / Either",
        }
    }

    pub fn from_code(code: &str) -> Option<Gender> {
        match code {
            "M" => Some(Gender::Male),
            "F" => Some(Gender::Female),
            "" => Some(Gender::Both),
            _ => None,
        }
    }

    /// True when a corpus row with `code` passes this filter selection.
    pub fn admits(self, code: &str) -> bool {
        self == Gender::Both || self.code() == code
    }
}
