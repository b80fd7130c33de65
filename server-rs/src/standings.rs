use crate::db::DBWrapper;
use crate::error::Error;
use crate::models::{Match, Poule, PouleId, Team, TeamId, TournamentId};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Which side of a match
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Side {
    Home,
    Away,
}

/// A team's accumulated results over a set of matches
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct TeamRecord {
    pub team_id: TeamId,
    pub points: i32,
    pub points_for: i32,
    pub points_against: i32,
    pub played: i32,
}

impl TeamRecord {
    pub fn new(team_id: TeamId) -> TeamRecord {
        TeamRecord {
            team_id,
            ..Default::default()
        }
    }

    pub fn balance(&self) -> i32 {
        self.points_for - self.points_against
    }
}

/// Match points for one set: 2 for the winner, 1 each on a draw
fn set_points(home: i32, away: i32) -> (i32, i32) {
    if home > away {
        (2, 0)
    } else if away > home {
        (0, 2)
    } else {
        (1, 1)
    }
}

/// Decide a match: most sets won, then most points over both sets.
/// Returns None on a true tie. Missing scores count as 0.
pub fn match_winner(m: &Match) -> Option<Side> {
    let (mut home_sets, mut away_sets, mut home_total, mut away_total) = (0, 0, 0, 0);
    for set in &m.sets {
        let (h, a) = (set.home.unwrap_or(0), set.away.unwrap_or(0));
        if h > a {
            home_sets += 1;
        } else if a > h {
            away_sets += 1;
        }
        home_total += h;
        away_total += a;
    }
    if home_sets != away_sets {
        return Some(if home_sets > away_sets { Side::Home } else { Side::Away });
    }
    if home_total != away_total {
        return Some(if home_total > away_total { Side::Home } else { Side::Away });
    }
    None
}

/// Accumulate records for `team_ids` over the complete matches in `matches`.
/// Matches with a team outside `team_ids` only count for the tracked side.
pub fn tally(matches: &[Match], team_ids: &[TeamId]) -> HashMap<TeamId, TeamRecord> {
    let mut records: HashMap<TeamId, TeamRecord> = team_ids
        .iter()
        .map(|id| (*id, TeamRecord::new(*id)))
        .collect();

    for m in matches.iter().filter(|m| m.is_complete()) {
        let (home, away) = match m.teams() {
            Some(teams) => teams,
            None => continue,
        };
        let (mut home_points, mut away_points, mut home_for, mut away_for) = (0, 0, 0, 0);
        for (h, a) in m.sets.iter().filter_map(|s| s.played()) {
            let (hp, ap) = set_points(h, a);
            home_points += hp;
            away_points += ap;
            home_for += h;
            away_for += a;
        }
        if let Some(r) = records.get_mut(&home) {
            r.points += home_points;
            r.points_for += home_for;
            r.points_against += away_for;
            r.played += 1;
        }
        if let Some(r) = records.get_mut(&away) {
            r.points += away_points;
            r.points_for += away_for;
            r.points_against += home_for;
            r.played += 1;
        }
    }

    records
}

/// Order records by points, then balance (both descending), then team id
pub fn rank(records: HashMap<TeamId, TeamRecord>) -> Vec<TeamRecord> {
    let mut ranked: Vec<TeamRecord> = records.into_values().collect();
    ranked.sort_by_key(|r| (Reverse(r.points), Reverse(r.balance()), r.team_id));
    ranked
}

/// Ranked standings of `team_ids` over `matches`
pub fn standings(matches: &[Match], team_ids: &[TeamId]) -> Vec<TeamRecord> {
    rank(tally(matches, team_ids))
}

/// Team ids of a poule in standings order
pub fn poule_ranking(db: &mut DBWrapper, poule_id: PouleId) -> Result<Vec<TeamId>, Error> {
    let team_ids: Vec<TeamId> = db.find_poule_teams(poule_id)?.iter().map(|t| t.id).collect();
    let matches = db.find_poule_matches(poule_id)?;
    Ok(standings(&matches, &team_ids)
        .into_iter()
        .map(|r| r.team_id)
        .collect())
}

/// The team currently at `rank` (1-based) in a poule
pub fn team_by_rank(db: &mut DBWrapper, poule_id: PouleId, rank: i32) -> Result<Option<Team>, Error> {
    db.find_poule(poule_id)?;
    if rank < 1 {
        return Ok(None);
    }
    match poule_ranking(db, poule_id)?.get(rank as usize - 1) {
        Some(team_id) => Ok(Some(db.find_team(*team_id)?)),
        None => Ok(None),
    }
}

/// Standings of one poule, with team details
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PouleStandings {
    pub poule: Poule,
    pub rows: Vec<(Team, TeamRecord)>,
}

/// Standings for every poule of a tournament, in poule creation order
pub fn poule_standings(db: &mut DBWrapper, id: TournamentId) -> Result<Vec<PouleStandings>, Error> {
    db.find_tournament(id)?;
    let mut res = vec![];
    for poule in db.find_poules(id)? {
        let teams = db.find_poule_teams(poule.id)?;
        let team_ids: Vec<TeamId> = teams.iter().map(|t| t.id).collect();
        let matches = db.find_poule_matches(poule.id)?;
        let mut by_id: HashMap<TeamId, Team> = teams.into_iter().map(|t| (t.id, t)).collect();
        let rows = standings(&matches, &team_ids)
            .into_iter()
            .filter_map(|r| by_id.remove(&r.team_id).map(|t| (t, r)))
            .collect();
        res.push(PouleStandings { poule, rows });
    }
    Ok(res)
}
