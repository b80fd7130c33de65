use crate::models::{Match, TeamId};
use std::collections::HashMap;

/// Counts scorekeeping and referee assignments per team, to spread duty evenly
#[derive(Debug, Default, Clone)]
pub struct DutyCounter {
    counts: HashMap<TeamId, u32>,
}

impl DutyCounter {
    pub fn new() -> DutyCounter {
        Default::default()
    }

    /// A counter holding every referee assignment already recorded in `matches`
    pub fn seeded<'a, I: IntoIterator<Item = &'a Match>>(matches: I) -> DutyCounter {
        let mut counter = DutyCounter::new();
        for team in matches.into_iter().filter_map(|m| m.referee) {
            counter.record(team);
        }
        counter
    }

    pub fn record(&mut self, team: TeamId) {
        *self.counts.entry(team).or_insert(0) += 1;
    }

    pub fn count(&self, team: TeamId) -> u32 {
        self.counts.get(&team).copied().unwrap_or(0)
    }

    /// Pick the candidate with the fewest duties so far (lowest id on a tie) and count the new duty.
    /// Returns None when there are no candidates.
    pub fn assign<I: IntoIterator<Item = TeamId>>(&mut self, candidates: I) -> Option<TeamId> {
        self.assign_with(candidates, |_| ())
    }

    /// Like `assign`, with `tie_break` ordering candidates that have equal duty counts before
    /// falling back to the lowest id.
    pub fn assign_with<I, K, F>(&mut self, candidates: I, tie_break: F) -> Option<TeamId>
    where
        I: IntoIterator<Item = TeamId>,
        K: Ord,
        F: Fn(TeamId) -> K,
    {
        let team = candidates
            .into_iter()
            .min_by_key(|&team| (self.count(team), tie_break(team), team))?;
        self.record(team);
        Some(team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SetScore, Slot};
    use std::cmp::Reverse;

    #[test]
    fn spreads_duty() {
        let mut counter = DutyCounter::new();
        let picks: Vec<TeamId> = (0..6)
            .filter_map(|_| counter.assign(vec![3, 1, 2]))
            .collect();
        assert_eq!(picks, vec![1, 2, 3, 1, 2, 3]);
        assert_eq!(counter.assign(vec![]), None);
    }

    #[test]
    fn prefers_least_loaded() {
        let mut counter = DutyCounter::new();
        counter.record(1);
        counter.record(1);
        counter.record(2);
        assert_eq!(counter.assign(vec![1, 2]), Some(2));
        assert_eq!(counter.assign(vec![1, 2, 9]), Some(9));
        assert_eq!(counter.count(2), 2);
    }

    #[test]
    fn tie_break_before_id() {
        let mut counter = DutyCounter::new();
        counter.record(3);
        // 1 and 2 are tied on duty, the tie-break prefers 2 over the lower id
        assert_eq!(counter.assign_with(vec![1, 2, 3], |t| Reverse(t)), Some(2));
        assert_eq!(counter.assign_with(vec![1, 2, 3], |t| Reverse(t)), Some(1));
    }

    #[test]
    fn seeded_from_history() {
        let m = |referee| Match {
            id: 1,
            tournament_id: 1,
            round_id: 1,
            poule_id: None,
            field: 1,
            home: Slot::team(1),
            away: Slot::team(2),
            referee,
            sets: [SetScore::default(); 2],
        };
        let history = vec![m(Some(3)), m(None), m(Some(3)), m(Some(4))];
        let counter = DutyCounter::seeded(&history);
        assert_eq!(counter.count(3), 2);
        assert_eq!(counter.count(4), 1);
        assert_eq!(counter.count(1), 0);
    }
}
