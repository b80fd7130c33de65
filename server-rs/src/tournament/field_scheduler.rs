use crate::error::Error;
use crate::models::{RoundKind, Tournament};
use chrono::{Duration, NaiveTime};

/// A match placed on a field, not yet persisted
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PlannedMatch<M> {
    pub field: i32,
    pub entry: M,
}

/// A round of matches played at the same time, not yet persisted
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PlannedRound<M> {
    pub number: i32,
    pub kind: RoundKind,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub matches: Vec<PlannedMatch<M>>,
}

/// Packs matches into consecutive time slots, no more per slot than there are fields.
/// One scheduler is used for a whole tournament, so rounds of every phase share one numbering and one clock.
#[derive(Debug, Clone)]
pub struct FieldScheduler {
    clock: NaiveTime,
    match_duration: Duration,
    fields: usize,
    next_round: i32,
}

impl FieldScheduler {
    pub fn new(tourney: &Tournament) -> FieldScheduler {
        FieldScheduler::with_settings(
            tourney.start_time,
            tourney.match_duration_minutes,
            tourney.num_fields,
        )
    }

    pub fn with_settings(start: NaiveTime, match_duration_minutes: i32, num_fields: i32) -> FieldScheduler {
        FieldScheduler {
            clock: start,
            match_duration: Duration::minutes(match_duration_minutes.max(1) as i64),
            fields: num_fields.max(1) as usize,
            next_round: 1,
        }
    }

    /// Split `entries` into rounds of at most one match per field, in order.
    /// Fails if a round would end past midnight.
    pub fn pack<M>(&mut self, kind: RoundKind, entries: Vec<M>) -> Result<Vec<PlannedRound<M>>, Error> {
        let mut rounds = vec![];
        let mut entries = entries.into_iter().peekable();

        while entries.peek().is_some() {
            let (end, wrapped) = self.clock.overflowing_add_signed(self.match_duration);
            if wrapped != 0 {
                return Err(Error::ScheduleOverrunsDay);
            }
            let matches = entries
                .by_ref()
                .take(self.fields)
                .zip(1..)
                .map(|(entry, field)| PlannedMatch { field, entry })
                .collect();

            rounds.push(PlannedRound {
                number: self.next_round,
                kind,
                start: self.clock,
                end,
                matches,
            });
            self.clock = end;
            self.next_round += 1;
        }

        Ok(rounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn chunks_by_field_count() {
        let mut sched = FieldScheduler::with_settings(time(9, 0), 20, 2);
        let rounds = sched.pack(RoundKind::Group, vec!['a', 'b', 'c', 'd', 'e']).unwrap();

        assert_eq!(rounds.len(), 3);
        assert!(rounds.iter().all(|r| r.matches.len() <= 2));
        assert_eq!(
            rounds[2].matches,
            vec![PlannedMatch {
                field: 1,
                entry: 'e'
            }]
        );
        let fields: Vec<i32> = rounds[0].matches.iter().map(|m| m.field).collect();
        assert_eq!(fields, vec![1, 2]);
        assert_eq!(
            rounds.iter().map(|r| r.start).collect::<Vec<_>>(),
            vec![time(9, 0), time(9, 20), time(9, 40)]
        );
        assert_eq!(rounds[2].end, time(10, 0));
    }

    #[test]
    fn numbering_and_clock_continue_across_phases() {
        let mut sched = FieldScheduler::with_settings(time(10, 0), 15, 3);
        let group = sched.pack(RoundKind::Group, vec![1, 2, 3, 4]).unwrap();
        let knockout = sched.pack(RoundKind::Knockout, vec![5]).unwrap();
        let last = sched.pack(RoundKind::Final, vec![6]).unwrap();

        let all: Vec<&PlannedRound<i32>> = group.iter().chain(&knockout).chain(&last).collect();
        assert_eq!(
            all.iter().map(|r| r.number).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        for pair in all.windows(2) {
            assert!(pair[1].start - pair[0].start >= Duration::minutes(15));
        }
        assert_eq!(last[0].kind, RoundKind::Final);
        assert_eq!(sched.clock, time(11, 0));
    }

    #[test]
    fn nothing_to_pack() {
        let mut sched = FieldScheduler::with_settings(time(9, 0), 20, 2);
        assert!(sched.pack::<i32>(RoundKind::Knockout, vec![]).unwrap().is_empty());
        assert_eq!(sched.clock, time(9, 0));
    }

    #[test]
    fn past_midnight() {
        let mut sched = FieldScheduler::with_settings(time(23, 0), 25, 1);
        assert_eq!(
            sched.pack(RoundKind::Group, vec![1, 2, 3]),
            Err(Error::ScheduleOverrunsDay)
        );
    }
}
