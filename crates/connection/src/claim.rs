use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// One party's side of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }
}

/// A liked `(name, gender)` pair declared by one side, pending or resolved
/// within a connection. Identity is the pair alone; the per-side ack flags
/// are payload and never participate in equality or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikedClaim {
    pub name: String,
    pub gender_code: String,
    pub person_one_acked: bool,
    pub person_two_acked: bool,
}

impl LikedClaim {
    /// Fresh claim, unread on both sides.
    pub fn new(name: impl Into<String>, gender_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gender_code: gender_code.into(),
            person_one_acked: false,
            person_two_acked: false,
        }
    }

    pub fn matches(&self, name: &str, gender_code: &str) -> bool {
        self.name == name && self.gender_code == gender_code
    }

    pub fn acked_by(&self, side: Side) -> bool {
        match side {
            Side::One => self.person_one_acked,
            Side::Two => self.person_two_acked,
        }
    }

    pub fn set_acked(&mut self, side: Side) {
        match side {
            Side::One => self.person_one_acked = true,
            Side::Two => self.person_two_acked = true,
        }
    }
}

impl PartialEq for LikedClaim {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.gender_code == other.gender_code
    }
}

impl Eq for LikedClaim {}

impl Hash for LikedClaim {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.gender_code.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::{LikedClaim, Side};

    #[test]
    fn identity_ignores_ack_flags() {
        let mut read = LikedClaim::new("Ava", "F");
        read.set_acked(Side::One);
        let unread = LikedClaim::new("Ava", "F");

        assert_eq!(read, unread);
        assert_ne!(LikedClaim::new("Ava", "F"), LikedClaim::new("Ava", "M"));
    }

    #[test]
    fn ack_is_per_side() {
        let mut claim = LikedClaim::new("Leo", "M");
        claim.set_acked(Side::Two);

        assert!(!claim.acked_by(Side::One));
        assert!(claim.acked_by(Side::Two));
    }
}
