// src/roster.rs
// Roster accumulator: entities discovered while paging through the live table.
//
// Names are unique (exact string equality) and kept in first-seen order,
// across pages and within a single page. Owned by the session; persisted as
// part of the session state.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::RosterMember;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<RosterMember>", into = "Vec<RosterMember>")]
pub struct Roster {
    members: Vec<RosterMember>,
    seen: HashSet<String>,
}

/// Counters after one `merge` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub current_page_count: usize,
    pub newly_added_count: usize,
    pub total_unique_count: usize,
}

impl Roster {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.members.len() }

    pub fn is_empty(&self) -> bool { self.members.is_empty() }

    /// Append unseen names in discovery order.
    pub fn merge(&mut self, found: impl IntoIterator<Item = RosterMember>) -> MergeReport {
        let mut current_page_count = 0;
        let mut newly_added_count = 0;
        for member in found {
            current_page_count += 1;
            if self.seen.insert(member.name.clone()) {
                self.members.push(member);
                newly_added_count += 1;
            }
        }
        let report = MergeReport {
            current_page_count,
            newly_added_count,
            total_unique_count: self.members.len(),
        };
        logf!(
            "Roster merge: {} on page, {} new, {} total",
            report.current_page_count, report.newly_added_count, report.total_unique_count
        );
        report
    }

    pub fn reset(&mut self) {
        self.members.clear();
        self.seen.clear();
    }

    pub fn snapshot(&self) -> Vec<RosterMember> {
        self.members.clone()
    }

    pub fn members(&self) -> &[RosterMember] {
        &self.members
    }

    /// Alphabetical (case-insensitive) copy; roster order is untouched.
    pub fn sorted_for_display(&self) -> Vec<RosterMember> {
        let mut out = self.members.clone();
        out.sort_by_cached_key(|m| m.name.to_lowercase());
        out
    }
}

impl From<Vec<RosterMember>> for Roster {
    fn from(members: Vec<RosterMember>) -> Self {
        let mut r = Roster::new();
        for m in members {
            if r.seen.insert(m.name.clone()) {
                r.members.push(m);
            }
        }
        r
    }
}

impl From<Roster> for Vec<RosterMember> {
    fn from(r: Roster) -> Self { r.members }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(name: &str) -> RosterMember { RosterMember::new(name, None) }

    fn names(r: &Roster) -> Vec<String> {
        r.members().iter().map(|m| m.name.clone()).collect()
    }

    #[test]
    fn merge_keeps_first_seen_order() {
        let mut r = Roster::new();
        r.merge([m("Carl")]);
        let rep = r.merge([m("Carl"), m("Dana")]);
        assert_eq!(names(&r), vec!["Carl", "Dana"]);
        assert_eq!(rep, MergeReport { current_page_count: 2, newly_added_count: 1, total_unique_count: 2 });
    }

    #[test]
    fn duplicates_within_one_call_are_suppressed() {
        let mut r = Roster::new();
        let rep = r.merge([m("Eve"), m("Eve"), m("eve")]);
        assert_eq!(rep.newly_added_count, 2, "equality is exact");
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn first_gender_sticks() {
        let mut r = Roster::new();
        r.merge([RosterMember::new("Fay", Some(s!("F")))]);
        r.merge([RosterMember::new("Fay", None)]);
        assert_eq!(r.snapshot()[0].gender.as_deref(), Some("F"));
    }

    #[test]
    fn reset_is_idempotent() {
        let mut r = Roster::new();
        r.merge([m("Gus")]);
        r.reset();
        r.reset();
        assert!(r.is_empty());
        // Forgotten names count as new again.
        assert_eq!(r.merge([m("Gus")]).newly_added_count, 1);
    }

    #[test]
    fn display_order_does_not_touch_roster_order() {
        let mut r = Roster::new();
        r.merge([m("zoe"), m("Adam"), m("bea")]);
        let shown: Vec<_> = r.sorted_for_display().into_iter().map(|m| m.name).collect();
        assert_eq!(shown, vec!["Adam", "bea", "zoe"]);
        assert_eq!(names(&r), vec!["zoe", "Adam", "bea"]);
    }

    #[test]
    fn serde_round_trip_dedups_on_load() {
        let json = r#"[{"name":"Hal"},{"name":"Hal","gender":"M"},{"name":"Ida","gender":"F"}]"#;
        let r: Roster = serde_json::from_str(json).unwrap();
        assert_eq!(names(&r), vec!["Hal", "Ida"]);
        let back = serde_json::to_string(&r).unwrap();
        assert_eq!(back, r#"[{"name":"Hal"},{"name":"Ida","gender":"F"}]"#);
    }
}
