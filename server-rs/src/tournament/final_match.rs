use crate::error::Error;
use crate::models::{Match, RankPlaceholder, TeamId};
use crate::standings::{match_winner, Side};
use log::warn;

/// A knockout match between two poule winners
pub fn is_champions_match(m: &Match) -> bool {
    let rank_one = |p: Option<RankPlaceholder>| matches!(p, Some(RankPlaceholder { position: 1, .. }));
    rank_one(m.home.placeholder()) && rank_one(m.away.placeholder())
}

/// The two finalists: winners of the rank 1 against rank 1 knockout matches, in schedule order.
///
/// Every such match must be complete and decided. If more than two teams qualify, the first two are taken.
pub fn finalists(knockout: &[Match]) -> Result<(TeamId, TeamId), Error> {
    let champions: Vec<&Match> = knockout.iter().filter(|m| is_champions_match(m)).collect();
    if champions.len() < 2 {
        return Err(Error::NotEnoughFinalists);
    }

    let mut winners: Vec<TeamId> = vec![];
    for m in champions {
        if !m.is_complete() {
            return Err(Error::KnockoutMatchIncomplete(m.id));
        }
        let (home, away) = m.teams().ok_or(Error::KnockoutMatchUnresolved(m.id))?;
        let winner = match match_winner(m) {
            Some(Side::Home) => home,
            Some(Side::Away) => away,
            None => return Err(Error::UndecidedMatch(m.id)),
        };
        if !winners.contains(&winner) {
            winners.push(winner);
        }
    }

    match winners[..] {
        [first, second, ref rest @ ..] => {
            if !rest.is_empty() {
                warn!("{} more poule winners qualified for the final, ignoring {:?}", rest.len(), rest);
            }
            Ok((first, second))
        }
        _ => Err(Error::NotEnoughFinalists),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SetScore, Slot};

    fn knockout(id: i32, rank: i32, teams: (TeamId, TeamId), s1: (i32, i32), s2: (i32, i32)) -> Match {
        let side = |poule_id, team| {
            Slot::Placeholder(RankPlaceholder {
                poule_id,
                position: rank,
            })
            .resolve(team)
        };
        Match {
            id,
            tournament_id: 1,
            round_id: 5,
            poule_id: None,
            field: id,
            home: side(1, teams.0),
            away: side(2, teams.1),
            referee: None,
            sets: [SetScore::new(s1.0, s1.1), SetScore::new(s2.0, s2.1)],
        }
    }

    #[test]
    fn straight_sets_and_split_sets() {
        let matches = vec![
            knockout(1, 1, (1, 2), (21, 12), (21, 17)),
            knockout(2, 2, (3, 4), (21, 12), (21, 17)),
            // 1-1 in sets, 40-38 on points
            knockout(3, 1, (5, 6), (21, 17), (19, 21)),
        ];
        assert_eq!(finalists(&matches), Ok((1, 5)));
    }

    #[test]
    fn away_winner() {
        let matches = vec![
            knockout(1, 1, (1, 2), (10, 21), (12, 21)),
            knockout(2, 1, (3, 4), (18, 21), (21, 15)),
        ];
        assert_eq!(finalists(&matches), Ok((2, 3)));
    }

    #[test]
    fn true_tie_rejected() {
        let matches = vec![
            knockout(1, 1, (1, 2), (21, 12), (21, 17)),
            knockout(2, 1, (3, 4), (21, 19), (19, 21)),
        ];
        assert_eq!(finalists(&matches), Err(Error::UndecidedMatch(2)));
    }

    #[test]
    fn needs_two_champion_matches() {
        let matches = vec![
            knockout(1, 1, (1, 2), (21, 12), (21, 17)),
            knockout(2, 2, (3, 4), (21, 12), (21, 17)),
        ];
        assert_eq!(finalists(&matches), Err(Error::NotEnoughFinalists));
    }

    #[test]
    fn incomplete_match_rejected() {
        let mut unplayed = knockout(2, 1, (3, 4), (21, 12), (0, 0));
        unplayed.sets[1] = SetScore::default();
        let matches = vec![knockout(1, 1, (1, 2), (21, 12), (21, 17)), unplayed];
        assert_eq!(finalists(&matches), Err(Error::KnockoutMatchIncomplete(2)));
    }

    #[test]
    fn extra_winners_ignored() {
        let matches = vec![
            knockout(1, 1, (1, 2), (21, 12), (21, 17)),
            knockout(2, 1, (3, 4), (12, 21), (17, 21)),
            knockout(3, 1, (5, 6), (21, 12), (21, 17)),
        ];
        assert_eq!(finalists(&matches), Ok((1, 4)));
    }
}
