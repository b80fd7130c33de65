//! The scheduling engine: group phase generation, knockout resolution and the final.
//!
//! Every operation runs in a single immediate transaction, so a failure leaves the stored
//! schedule untouched and two generations for the same tournament can't interleave.

pub mod field_scheduler;
pub mod final_match;
pub mod knockout;
pub mod round_robin;
pub mod scorekeeper;

use crate::db::DBWrapper;
use crate::error::Error;
use crate::models::{
    Match, MatchId, NewDBMatch, NewDBRound, PouleId, Round, RoundKind, TeamId, Tournament,
    TournamentId,
};
use crate::standings::poule_ranking;
use field_scheduler::{FieldScheduler, PlannedRound};
use knockout::KnockoutPairing;
use log::{debug, info, warn};
use round_robin::pairing_queue;
use scorekeeper::DutyCounter;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};

pub use crate::standings::team_by_rank;

/// A group match before it is stored
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct GroupMatch {
    pub poule_id: PouleId,
    pub home: TeamId,
    pub away: TeamId,
    pub scorekeeper: Option<TeamId>,
}

/// The whole day's schedule, before it is stored
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SchedulePlan {
    pub group: Vec<PlannedRound<GroupMatch>>,
    pub knockout: Vec<PlannedRound<KnockoutPairing>>,
    pub final_round: Option<PlannedRound<()>>,
}

/// Plan the group phase, knockout placeholders and final for `poules`, given in creation order
/// with their teams.
///
/// Every pass takes the next pairing of each poule that still has one, so poules progress through
/// their round-robin side by side.
pub fn plan_schedule(
    tourney: &Tournament,
    poules: &[(PouleId, Vec<TeamId>)],
) -> Result<SchedulePlan, Error> {
    let mut queues: Vec<(PouleId, &[TeamId], VecDeque<(TeamId, TeamId)>)> = vec![];
    for (poule_id, teams) in poules {
        if teams.len() < 2 {
            warn!(
                "poule {} has {} team(s), leaving it out of the group phase",
                poule_id,
                teams.len()
            );
            continue;
        }
        queues.push((*poule_id, teams.as_slice(), pairing_queue(teams)));
    }
    if queues.is_empty() {
        return Err(Error::NoSchedulablePoules);
    }

    let mut scheduler = FieldScheduler::new(tourney);
    let mut counter = DutyCounter::new();
    let mut group = vec![];
    loop {
        let wave: Vec<GroupMatch> = queues
            .iter_mut()
            .filter_map(|(poule_id, teams, queue)| {
                let (home, away) = queue.pop_front()?;
                let others = teams.iter().copied().filter(|t| *t != home && *t != away);
                // teams with more matches left are harder to place later, so they go first
                let still_playing =
                    |t: TeamId| Reverse(queue.iter().filter(|(h, a)| *h == t || *a == t).count());
                Some(GroupMatch {
                    poule_id: *poule_id,
                    home,
                    away,
                    scorekeeper: counter.assign_with(others, still_playing),
                })
            })
            .collect();
        if wave.is_empty() {
            break;
        }
        group.extend(scheduler.pack(RoundKind::Group, wave)?);
    }

    let sizes: Vec<(PouleId, usize)> = poules.iter().map(|(id, teams)| (*id, teams.len())).collect();
    let knockout = scheduler.pack(RoundKind::Knockout, knockout::placeholders(&sizes))?;
    let final_round = if knockout.is_empty() {
        None
    } else {
        scheduler.pack(RoundKind::Final, vec![()])?.pop()
    };

    Ok(SchedulePlan {
        group,
        knockout,
        final_round,
    })
}

fn store_round<M, F>(
    db: &mut DBWrapper,
    tournament_id: TournamentId,
    planned: &PlannedRound<M>,
    to_row: F,
) -> Result<Round, Error>
where
    F: Fn(&M) -> NewDBMatch,
{
    let round = db.insert_round(NewDBRound {
        tournament_id,
        round_number: planned.number,
        kind: planned.kind.as_str(),
        start_time: planned.start,
        end_time: planned.end,
    })?;
    let rows: Vec<NewDBMatch> = planned
        .matches
        .iter()
        .map(|m| NewDBMatch {
            tournament_id,
            round_id: round.id,
            field_number: m.field,
            ..to_row(&m.entry)
        })
        .collect();
    db.insert_matches(&rows)?;
    debug!(
        "round {} ({}) at {}: {} match(es)",
        round.number,
        round.kind,
        round.start.format("%H:%M"),
        rows.len()
    );
    Ok(round)
}

/// Create the group rounds, the knockout placeholder rounds and an empty final.
/// Refused once a group phase exists.
pub fn generate_group_phase(db: &mut DBWrapper, id: TournamentId) -> Result<Vec<Round>, Error> {
    db.transaction(|db| {
        let tourney = db.find_tournament(id)?;
        if db.has_round_of_kind(id, RoundKind::Group)? {
            return Err(Error::GroupPhaseExists);
        }

        let mut poules = vec![];
        for poule in db.find_poules(id)? {
            let teams: Vec<TeamId> = db.find_poule_teams(poule.id)?.iter().map(|t| t.id).collect();
            poules.push((poule.id, teams));
        }
        let plan = plan_schedule(&tourney, &poules)?;

        let mut rounds = vec![];
        for planned in &plan.group {
            rounds.push(store_round(db, id, planned, |m| NewDBMatch {
                poule_id: Some(m.poule_id),
                home_team_id: Some(m.home),
                away_team_id: Some(m.away),
                referee_team_id: m.scorekeeper,
                ..Default::default()
            })?);
        }
        for planned in &plan.knockout {
            rounds.push(store_round(db, id, planned, |(home, away)| NewDBMatch {
                home_rank_poule_id: Some(home.poule_id),
                home_rank_position: Some(home.position),
                away_rank_poule_id: Some(away.poule_id),
                away_rank_position: Some(away.position),
                ..Default::default()
            })?);
        }
        if let Some(planned) = &plan.final_round {
            rounds.push(store_round(db, id, planned, |_| NewDBMatch::default())?);
        }

        info!(
            "generated schedule for tournament {}: {} group, {} knockout and {} final round(s)",
            id,
            plan.group.len(),
            plan.knockout.len(),
            plan.final_round.iter().count()
        );
        Ok(rounds)
    })
}

/// Fill the knockout placeholders from the current poule standings and assign knockout referees.
///
/// Can be run again at any time. Every run recomputes teams and referees from scratch.
pub fn generate_knockout_phase(db: &mut DBWrapper, id: TournamentId) -> Result<Vec<Match>, Error> {
    db.transaction(|db| {
        db.find_tournament(id)?;
        let round_ids: Vec<_> = db
            .find_rounds_of_kind(id, RoundKind::Knockout)?
            .iter()
            .map(|r| r.id)
            .collect();
        if round_ids.is_empty() {
            return Err(Error::NoKnockoutStructure);
        }
        let mut matches = db.find_round_matches(&round_ids)?;

        let mut rankings: HashMap<PouleId, Vec<TeamId>> = HashMap::new();
        for poule_id in knockout::referenced_poules(&matches) {
            rankings.insert(poule_id, poule_ranking(db, poule_id)?);
        }
        knockout::resolve_placeholders(&mut matches, &rankings)?;

        let knockout_ids: HashSet<MatchId> = matches.iter().map(|m| m.id).collect();
        let history = db.find_tournament_matches(id)?;
        let mut counter =
            DutyCounter::seeded(history.iter().filter(|m| !knockout_ids.contains(&m.id)));
        let teams: Vec<TeamId> = db.find_teams(id)?.iter().map(|t| t.id).collect();
        knockout::assign_referees(&mut matches, &teams, &mut counter);

        for m in &matches {
            db.save_match(m)?;
        }
        info!(
            "resolved {} knockout match(es) for tournament {}",
            matches.len(),
            id
        );
        Ok(matches)
    })
}

/// Put the winners of the poule winners' knockout matches into the final
pub fn generate_final(db: &mut DBWrapper, id: TournamentId) -> Result<Match, Error> {
    db.transaction(|db| {
        db.find_tournament(id)?;
        let final_ids: Vec<_> = db
            .find_rounds_of_kind(id, RoundKind::Final)?
            .iter()
            .map(|r| r.id)
            .collect();
        let mut final_match = db
            .find_round_matches(&final_ids)?
            .into_iter()
            .next()
            .ok_or(Error::NoFinalStructure)?;

        let knockout = db.find_matches_of_kind(id, RoundKind::Knockout)?;
        let (home, away) = final_match::finalists(&knockout)?;
        if final_match.has_scores() && final_match.teams() != Some((home, away)) {
            warn!(
                "final {} already has scores, replacing teams {:?} with {} vs {}",
                final_match.id,
                final_match.teams(),
                home,
                away
            );
        }
        final_match.home = final_match.home.resolve(home);
        final_match.away = final_match.away.resolve(away);
        db.save_match(&final_match)?;

        info!("final of tournament {}: team {} vs team {}", id, home, away);
        Ok(final_match)
    })
}

/// How far the group and knockout phases have been played
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct PhaseStatus {
    pub group_total: usize,
    pub group_completed: usize,
    pub knockout_total: usize,
    pub knockout_completed: usize,
}

impl PhaseStatus {
    fn count(matches: &[Match]) -> (usize, usize) {
        (matches.len(), matches.iter().filter(|m| m.is_complete()).count())
    }

    pub fn group_complete(&self) -> bool {
        self.group_total > 0 && self.group_completed == self.group_total
    }

    pub fn knockout_complete(&self) -> bool {
        self.knockout_total > 0 && self.knockout_completed == self.knockout_total
    }
}

pub fn phase_status(db: &mut DBWrapper, id: TournamentId) -> Result<PhaseStatus, Error> {
    db.find_tournament(id)?;
    let (group_total, group_completed) =
        PhaseStatus::count(&db.find_matches_of_kind(id, RoundKind::Group)?);
    let (knockout_total, knockout_completed) =
        PhaseStatus::count(&db.find_matches_of_kind(id, RoundKind::Knockout)?);
    Ok(PhaseStatus {
        group_total,
        group_completed,
        knockout_total,
        knockout_completed,
    })
}
