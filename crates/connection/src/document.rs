use crate::claim::{LikedClaim, Side};
use namematch_model::PersonId;
use serde::{Deserialize, Serialize};

/// Effect of a like toggle on the shared aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleEffect {
    /// The claim was not present anywhere and is now pending on the caller's
    /// side.
    Added,
    /// The caller withdrew a pending claim.
    RemovedPending,
    /// The caller withdrew a matched claim: the match breaks and the claim
    /// returns to the partner's pending side, unread again.
    MatchBroken,
}

/// The shared two-party aggregate. Invariants:
/// - a `(name, gender_code)` pair appears in at most one of the three claim
///   sets at any time, and `matched` is disjoint from both pending sets;
/// - `person_two` transitions `None -> Some` exactly once;
/// - every mutation of a like-set runs [`Connection::reconcile`] before the
///   document is persisted;
/// - `version` increases by one on every successful remote write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    #[serde(default)]
    pub version: u64,
    pub person_one: PersonId,
    pub person_two: Option<PersonId>,
    pub person_one_liked: Vec<LikedClaim>,
    pub person_two_liked: Vec<LikedClaim>,
    pub matched: Vec<LikedClaim>,
}

impl Connection {
    /// Fresh connection for the creating device, with its liked history
    /// snapshotted in.
    pub fn new(id: impl Into<String>, person_one: PersonId, liked: Vec<LikedClaim>) -> Self {
        Self {
            id: id.into(),
            version: 0,
            person_one,
            person_two: None,
            person_one_liked: liked,
            person_two_liked: Vec::new(),
            matched: Vec::new(),
        }
    }

    /// Which side of the connection `person` is, if either.
    pub fn side_of(&self, person: &PersonId) -> Option<Side> {
        if self.person_one == *person {
            Some(Side::One)
        } else if self.person_two.as_ref() == Some(person) {
            Some(Side::Two)
        } else {
            None
        }
    }

    pub fn pending(&self, side: Side) -> &[LikedClaim] {
        match side {
            Side::One => &self.person_one_liked,
            Side::Two => &self.person_two_liked,
        }
    }

    fn pending_mut(&mut self, side: Side) -> &mut Vec<LikedClaim> {
        match side {
            Side::One => &mut self.person_one_liked,
            Side::Two => &mut self.person_two_liked,
        }
    }

    /// Second device joins: sets `person_two`, snapshots its liked history,
    /// and immediately reconciles.
    pub fn join(&mut self, person: PersonId, liked: Vec<LikedClaim>) {
        debug_assert!(self.person_two.is_none());
        self.person_two = Some(person);
        self.person_two_liked = liked;
        self.reconcile();
    }

    /// Move every claim present in both pending sets into `matched`, unread
    /// on both sides. Idempotent and order-independent: a second run finds an
    /// empty intersection and moves nothing.
    pub fn reconcile(&mut self) -> usize {
        let intersection: Vec<LikedClaim> = self
            .person_one_liked
            .iter()
            .filter(|one| self.person_two_liked.contains(*one))
            .cloned()
            .collect();

        for claim in &intersection {
            self.person_one_liked.retain(|c| c != claim);
            self.person_two_liked.retain(|c| c != claim);
            self.matched
                .push(LikedClaim::new(claim.name.clone(), claim.gender_code.clone()));
        }

        intersection.len()
    }

    /// Declare a fresh like on `side`. Returns false (and changes nothing)
    /// when the pair is already pending on that side or already matched.
    pub fn add_like(&mut self, side: Side, name: &str, gender_code: &str) -> bool {
        if self.matched.iter().any(|c| c.matches(name, gender_code))
            || self.pending(side).iter().any(|c| c.matches(name, gender_code))
        {
            return false;
        }
        self.pending_mut(side)
            .push(LikedClaim::new(name, gender_code));
        true
    }

    /// Flip a like on `side` based on where the claim currently lives: absent
    /// everywhere it becomes pending; pending it is withdrawn; matched the
    /// match breaks and the claim returns to the partner's pending set.
    pub fn toggle_like(&mut self, side: Side, name: &str, gender_code: &str) -> ToggleEffect {
        let pending = self.pending_mut(side);
        if let Some(at) = pending.iter().position(|c| c.matches(name, gender_code)) {
            pending.remove(at);
            return ToggleEffect::RemovedPending;
        }

        if let Some(at) = self.matched.iter().position(|c| c.matches(name, gender_code)) {
            self.matched.remove(at);
            self.pending_mut(side.other())
                .push(LikedClaim::new(name, gender_code));
            return ToggleEffect::MatchBroken;
        }

        self.pending_mut(side)
            .push(LikedClaim::new(name, gender_code));
        ToggleEffect::Added
    }

    /// Flip the caller's own ack flag across all matched claims, leaving the
    /// partner's flags untouched.
    pub fn mark_matched_read(&mut self, side: Side) {
        for claim in &mut self.matched {
            claim.set_acked(side);
        }
    }

    /// True when `side` still has matches it has not read — drives the
    /// new-match badge shown to that party.
    pub fn has_unread_matches(&self, side: Side) -> bool {
        self.matched.iter().any(|claim| !claim.acked_by(side))
    }
}

#[cfg(test)]
mod tests {
    use super::{Connection, ToggleEffect};
    use crate::claim::{LikedClaim, Side};
    use namematch_model::PersonId;
    use pretty_assertions::assert_eq;

    fn claims(pairs: &[(&str, &str)]) -> Vec<LikedClaim> {
        pairs
            .iter()
            .map(|(name, code)| LikedClaim::new(*name, *code))
            .collect()
    }

    fn names(claims: &[LikedClaim]) -> Vec<String> {
        claims.iter().map(|c| c.name.clone()).collect()
    }

    fn two_party() -> Connection {
        let mut connection = Connection::new(
            "apple12345",
            PersonId::from("device-a"),
            claims(&[("Ava", "F"), ("Leo", "M")]),
        );
        connection.join(
            PersonId::from("device-b"),
            claims(&[("Ava", "F"), ("Mia", "F")]),
        );
        connection
    }

    #[test]
    fn reconcile_moves_intersection_only() {
        let connection = two_party();

        assert_eq!(names(&connection.matched), vec!["Ava"]);
        assert_eq!(names(&connection.person_one_liked), vec!["Leo"]);
        assert_eq!(names(&connection.person_two_liked), vec!["Mia"]);
    }

    #[test]
    fn reconcile_twice_is_a_noop() {
        let mut connection = two_party();
        let before = connection.clone();

        let moved = connection.reconcile();

        assert_eq!(moved, 0);
        assert_eq!(connection, before);
    }

    #[test]
    fn matched_claims_start_unread_on_both_sides() {
        let connection = two_party();

        assert!(connection.has_unread_matches(Side::One));
        assert!(connection.has_unread_matches(Side::Two));
    }

    #[test]
    fn mark_read_flips_only_the_callers_flag() {
        let mut connection = two_party();
        // one extra match, to cover multi-claim shapes
        connection.person_one_liked.push(LikedClaim::new("Noah", "M"));
        connection.person_two_liked.push(LikedClaim::new("Noah", "M"));
        connection.reconcile();

        connection.mark_matched_read(Side::One);

        assert!(connection.matched.iter().all(|c| c.person_one_acked));
        assert!(connection.matched.iter().all(|c| !c.person_two_acked));
        assert!(!connection.has_unread_matches(Side::One));
        assert!(connection.has_unread_matches(Side::Two));
    }

    #[test]
    fn pair_lives_in_at_most_one_set() {
        let connection = two_party();

        for claim in &connection.matched {
            assert!(!connection.person_one_liked.contains(claim));
            assert!(!connection.person_two_liked.contains(claim));
        }
    }

    #[test]
    fn add_like_refuses_duplicates_and_matched_pairs() {
        let mut connection = two_party();

        assert!(!connection.add_like(Side::One, "Leo", "M"));
        assert!(!connection.add_like(Side::Two, "Ava", "F"));
        assert!(connection.add_like(Side::One, "Ivy", "F"));
    }

    #[test]
    fn toggle_withdraws_a_pending_like() {
        let mut connection = two_party();

        let effect = connection.toggle_like(Side::One, "Leo", "M");

        assert_eq!(effect, ToggleEffect::RemovedPending);
        assert!(connection.person_one_liked.is_empty());
    }

    #[test]
    fn toggle_on_a_matched_claim_breaks_the_match() {
        let mut connection = two_party();

        let effect = connection.toggle_like(Side::One, "Ava", "F");

        assert_eq!(effect, ToggleEffect::MatchBroken);
        assert!(connection.matched.is_empty());
        // the partner still likes it, so the claim returns to their side
        assert_eq!(names(&connection.person_two_liked), vec!["Mia", "Ava"]);
        let returned = connection
            .person_two_liked
            .iter()
            .find(|c| c.name == "Ava")
            .unwrap();
        assert!(!returned.person_one_acked && !returned.person_two_acked);
    }

    #[test]
    fn toggle_of_an_unknown_pair_adds_it() {
        let mut connection = two_party();

        let effect = connection.toggle_like(Side::Two, "Ivy", "F");

        assert_eq!(effect, ToggleEffect::Added);
        assert!(connection
            .person_two_liked
            .iter()
            .any(|c| c.matches("Ivy", "F")));
    }

    #[test]
    fn side_of_matches_identities() {
        let connection = two_party();

        assert_eq!(connection.side_of(&PersonId::from("device-a")), Some(Side::One));
        assert_eq!(connection.side_of(&PersonId::from("device-b")), Some(Side::Two));
        assert_eq!(connection.side_of(&PersonId::from("stranger")), None);
    }
}
