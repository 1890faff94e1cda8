use serde::{Deserialize, Serialize};

/// A locally recorded swipe decision. Unique by `(name, gender_code)`;
/// created once and only ever toggled, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenName {
    pub name: String,
    pub gender_code: String,
    pub liked: bool,
}

impl SeenName {
    pub fn new(name: impl Into<String>, gender_code: impl Into<String>, liked: bool) -> Self {
        Self {
            name: name.into(),
            gender_code: gender_code.into(),
            liked,
        }
    }
}
