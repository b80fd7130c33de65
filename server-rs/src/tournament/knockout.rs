use super::scorekeeper::DutyCounter;
use crate::error::Error;
use crate::models::{Match, PouleId, RankPlaceholder, Slot, TeamId};
use itertools::Itertools;
use log::warn;
use std::collections::{HashMap, HashSet};

/// A knockout match before resolution: home rank against away rank
pub type KnockoutPairing = (RankPlaceholder, RankPlaceholder);

/// Rank-against-rank pairings for poules paired off in creation order.
///
/// `poules` holds each poule with its team count. The poules are paired off two at a time, and a trailing
/// unpaired poule is left out. Each pair meets at every rank both poules can fill. All rank 1 matches
/// come first, then all rank 2 matches, and so on.
pub fn placeholders(poules: &[(PouleId, usize)]) -> Vec<KnockoutPairing> {
    let pairs: Vec<((PouleId, usize), (PouleId, usize))> = poules.iter().copied().tuples().collect();
    let deepest = pairs.iter().map(|(a, b)| a.1.min(b.1)).max().unwrap_or(0);

    (1..=deepest)
        .flat_map(|rank| {
            pairs
                .iter()
                .filter(move |(a, b)| a.1.min(b.1) >= rank)
                .map(move |(a, b)| {
                    (
                        RankPlaceholder {
                            poule_id: a.0,
                            position: rank as i32,
                        },
                        RankPlaceholder {
                            poule_id: b.0,
                            position: rank as i32,
                        },
                    )
                })
        })
        .collect()
}

fn resolve_slot(slot: Slot, rankings: &HashMap<PouleId, Vec<TeamId>>) -> Result<Slot, Error> {
    let placeholder = match slot.placeholder() {
        Some(p) => p,
        None => return Ok(slot),
    };
    let team = rankings
        .get(&placeholder.poule_id)
        .and_then(|ranking| {
            usize::try_from(placeholder.position - 1)
                .ok()
                .and_then(|i| ranking.get(i))
        })
        .ok_or(Error::RankOutOfRange {
            poule: placeholder.poule_id,
            rank: placeholder.position,
        })?;
    Ok(slot.resolve(*team))
}

/// Poules referenced by a placeholder in any of `matches`
pub fn referenced_poules(matches: &[Match]) -> Vec<PouleId> {
    matches
        .iter()
        .flat_map(|m| [m.home.placeholder(), m.away.placeholder()])
        .flatten()
        .map(|p| p.poule_id)
        .unique()
        .collect()
}

/// Fill every placeholder side with the team currently at that rank.
///
/// `rankings` maps each poule to its team ids in standings order. Sides without a placeholder are
/// left alone. A rank the poule can't fill fails the whole resolution.
pub fn resolve_placeholders(
    matches: &mut [Match],
    rankings: &HashMap<PouleId, Vec<TeamId>>,
) -> Result<(), Error> {
    for m in matches.iter_mut() {
        let home = resolve_slot(m.home, rankings)?;
        let away = resolve_slot(m.away, rankings)?;
        if m.has_scores() && (home.team_id() != m.home.team_id() || away.team_id() != m.away.team_id()) {
            warn!(
                "knockout match {} already has scores, replacing teams {:?} vs {:?} with {:?} vs {:?}",
                m.id,
                m.home.team_id(),
                m.away.team_id(),
                home.team_id(),
                away.team_id()
            );
        }
        m.home = home;
        m.away = away;
    }
    Ok(())
}

/// Assign a referee to every resolved match, round by round.
///
/// Candidates for a match are the `teams` that don't play in any match of the same round. Any
/// referee already set on `matches` is cleared first. `counter` should hold the duties recorded
/// outside these matches.
pub fn assign_referees(matches: &mut [Match], teams: &[TeamId], counter: &mut DutyCounter) {
    for m in matches.iter_mut() {
        m.referee = None;
    }

    let round_ids: Vec<_> = matches.iter().map(|m| m.round_id).unique().collect();
    for round_id in round_ids {
        let playing: HashSet<TeamId> = matches
            .iter()
            .filter(|m| m.round_id == round_id)
            .flat_map(|m| [m.home.team_id(), m.away.team_id()])
            .flatten()
            .collect();

        for m in matches
            .iter_mut()
            .filter(|m| m.round_id == round_id && m.teams().is_some())
        {
            m.referee = counter.assign(teams.iter().copied().filter(|t| !playing.contains(t)));
        }
    }
}
