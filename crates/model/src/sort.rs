use serde::{Deserialize, Serialize};

/// Ordering applied to the final candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSort {
    Random,
    Popular,
}

impl NameSort {
    /// Stable integer key used by the preference store.
    pub fn key(self) -> i64 {
        match self {
            NameSort::Random => 1,
            NameSort::Popular => 2,
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            NameSort::Random => "Random",
            NameSort::Popular => "Popularity",
        }
    }

    pub fn from_key(key: i64) -> Option<NameSort> {
        match key {
            1 => Some(NameSort::Random),
            2 => Some(NameSort::Popular),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NameSort;
    use pretty_assertions::assert_eq;

    #[test]
    fn keys_round_trip() {
        for sort in [NameSort::Random, NameSort::Popular] {
            assert_eq!(NameSort::from_key(sort.key()), Some(sort));
        }
        assert_eq!(NameSort::from_key(0), None);
    }
}
