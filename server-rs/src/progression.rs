use crate::db::DBWrapper;
use crate::error::Error;
use crate::models::{Match, RoundKind, Team, TeamId, TournamentId};
use crate::standings::{match_winner, poule_ranking, tally, Side, TeamRecord};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Lowest level, for teams ranked 5th or worse in their poule or not in a poule
pub const GROUP_ONLY_LEVEL: u8 = 5;

/// One line of the overall ranking
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct OverallEntry {
    pub rank: usize,
    pub team: Team,
    /// group phase results
    pub group: TeamRecord,
    /// knockout and final results
    pub knockout: TeamRecord,
    pub played: i32,
    pub level: u8,
    /// 1 for the winner of the final, 2 for the runner-up
    pub final_position: Option<u8>,
}

/// Level and final position of the two finalists, once the final is complete.
/// A tied final keeps both at level 1 without a position.
fn final_positions(final_match: Option<&Match>) -> HashMap<TeamId, Option<u8>> {
    let m = match final_match {
        Some(m) if m.is_complete() => m,
        _ => return HashMap::new(),
    };
    let (home, away) = match m.teams() {
        Some(teams) => teams,
        None => return HashMap::new(),
    };
    let (home_pos, away_pos) = match match_winner(m) {
        Some(Side::Home) => (Some(1), Some(2)),
        Some(Side::Away) => (Some(2), Some(1)),
        None => (None, None),
    };
    HashMap::from([(home, home_pos), (away, away_pos)])
}

fn level_for(poule_rank: Option<usize>) -> u8 {
    match poule_rank {
        Some(rank @ 1..=4) => rank as u8,
        _ => GROUP_ONLY_LEVEL,
    }
}

/// Rank every team by how far it progressed.
///
/// `poule_ranks` holds each poule member's 1-based rank in its poule. Finalists of a complete final
/// come first, ordered by their final position. The remaining order is level first. Levels 1 to 4
/// are then ordered by knockout points and knockout balance, and level 5 by group points and group
/// balance. Team id breaks any remaining tie.
pub fn rank_progression(
    teams: &[Team],
    poule_ranks: &HashMap<TeamId, usize>,
    group_matches: &[Match],
    knockout_matches: &[Match],
    final_match: Option<&Match>,
) -> Vec<OverallEntry> {
    let team_ids: Vec<TeamId> = teams.iter().map(|t| t.id).collect();
    let group = tally(group_matches, &team_ids);
    let knockout = tally(knockout_matches, &team_ids);
    let finalists = final_positions(final_match);

    let mut entries: Vec<OverallEntry> = teams
        .iter()
        .map(|team| {
            let (level, final_position) = match finalists.get(&team.id) {
                Some(position) => (1, *position),
                None => (level_for(poule_ranks.get(&team.id).copied()), None),
            };
            let group = group[&team.id];
            let knockout = knockout[&team.id];
            OverallEntry {
                rank: 0,
                team: team.clone(),
                group,
                knockout,
                played: group.played + knockout.played,
                level,
                final_position,
            }
        })
        .collect();

    entries.sort_by_key(|e| {
        let decisive = if e.level < GROUP_ONLY_LEVEL {
            &e.knockout
        } else {
            &e.group
        };
        (
            e.level,
            e.final_position.unwrap_or(u8::MAX),
            Reverse(decisive.points),
            Reverse(decisive.balance()),
            e.team.id,
        )
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}

/// Overall standings of a tournament
pub fn overall_standings(db: &mut DBWrapper, id: TournamentId) -> Result<Vec<OverallEntry>, Error> {
    db.find_tournament(id)?;
    let teams = db.find_teams(id)?;

    let mut poule_ranks = HashMap::new();
    for poule in db.find_poules(id)? {
        for (i, team_id) in poule_ranking(db, poule.id)?.into_iter().enumerate() {
            poule_ranks.insert(team_id, i + 1);
        }
    }

    let group = db.find_matches_of_kind(id, RoundKind::Group)?;
    let finals = db.find_matches_of_kind(id, RoundKind::Final)?;
    let mut knockout = db.find_matches_of_kind(id, RoundKind::Knockout)?;
    knockout.extend(finals.iter().cloned());

    Ok(rank_progression(
        &teams,
        &poule_ranks,
        &group,
        &knockout,
        finals.first(),
    ))
}
