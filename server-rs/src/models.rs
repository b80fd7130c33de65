use super::schema::{matches, poules, rounds, teams, tournaments};
use crate::error::Error;
use chrono::NaiveTime;
use diesel::prelude::*;
use std::fmt;
use std::str::FromStr;

pub type TournamentId = i32;
pub type PouleId = i32;
pub type TeamId = i32;
pub type RoundId = i32;
pub type MatchId = i32;

#[derive(Queryable, Selectable, AsChangeset, Debug, PartialEq, Eq, Clone)]
#[diesel(table_name = tournaments)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub start_time: NaiveTime,
    pub num_fields: i32,
    pub match_duration_minutes: i32,
    pub break_duration_minutes: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = tournaments)]
pub struct NewTournament<'a> {
    pub name: &'a str,
    pub start_time: NaiveTime,
    pub num_fields: i32,
    pub match_duration_minutes: i32,
    pub break_duration_minutes: i32,
}

#[derive(Queryable, Selectable, AsChangeset, Debug, PartialEq, Eq, Clone)]
#[diesel(table_name = poules)]
pub struct Poule {
    pub id: PouleId,
    pub tournament_id: TournamentId,
    pub name: String,
}

#[derive(Insertable)]
#[diesel(table_name = poules)]
pub struct NewPoule<'a> {
    pub tournament_id: TournamentId,
    pub name: &'a str,
}

#[derive(Queryable, Selectable, AsChangeset, Debug, PartialEq, Eq, Clone)]
#[diesel(table_name = teams)]
#[diesel(treat_none_as_null = true)]
pub struct Team {
    pub id: TeamId,
    pub tournament_id: TournamentId,
    pub poule_id: Option<PouleId>,
    pub name: String,
}

#[derive(Insertable)]
#[diesel(table_name = teams)]
pub struct NewTeam<'a> {
    pub tournament_id: TournamentId,
    pub poule_id: Option<PouleId>,
    pub name: &'a str,
}

#[derive(Queryable, Selectable, Debug, PartialEq, Eq, Clone)]
#[diesel(table_name = rounds)]
pub struct DBRound {
    pub id: RoundId,
    pub tournament_id: TournamentId,
    pub round_number: i32,
    pub kind: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Insertable)]
#[diesel(table_name = rounds)]
pub struct NewDBRound<'a> {
    pub tournament_id: TournamentId,
    pub round_number: i32,
    pub kind: &'a str,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Queryable, Selectable, AsChangeset, Debug, PartialEq, Eq, Clone)]
#[diesel(table_name = matches)]
#[diesel(treat_none_as_null = true)]
pub struct DBMatch {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round_id: RoundId,
    pub poule_id: Option<PouleId>,
    pub field_number: i32,
    pub home_team_id: Option<TeamId>,
    pub away_team_id: Option<TeamId>,
    pub referee_team_id: Option<TeamId>,
    pub home_rank_poule_id: Option<PouleId>,
    pub home_rank_position: Option<i32>,
    pub away_rank_poule_id: Option<PouleId>,
    pub away_rank_position: Option<i32>,
    pub home_set1_score: Option<i32>,
    pub away_set1_score: Option<i32>,
    pub home_set2_score: Option<i32>,
    pub away_set2_score: Option<i32>,
}

#[derive(Insertable, Debug, Default, PartialEq, Eq, Clone)]
#[diesel(table_name = matches)]
pub struct NewDBMatch {
    pub tournament_id: TournamentId,
    pub round_id: RoundId,
    pub poule_id: Option<PouleId>,
    pub field_number: i32,
    pub home_team_id: Option<TeamId>,
    pub away_team_id: Option<TeamId>,
    pub referee_team_id: Option<TeamId>,
    pub home_rank_poule_id: Option<PouleId>,
    pub home_rank_position: Option<i32>,
    pub away_rank_poule_id: Option<PouleId>,
    pub away_rank_position: Option<i32>,
}

/// Phase a round belongs to
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum RoundKind {
    Group,
    Knockout,
    Final,
}

impl RoundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundKind::Group => "group",
            RoundKind::Knockout => "knockout",
            RoundKind::Final => "final",
        }
    }
}

impl fmt::Display for RoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RoundKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "group" => Ok(RoundKind::Group),
            "knockout" => Ok(RoundKind::Knockout),
            "final" => Ok(RoundKind::Final),
            _ => Err(Error::UnknownRoundKind(s.to_string())),
        }
    }
}

/// in memory representation of a round
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Round {
    pub id: RoundId,
    pub tournament_id: TournamentId,
    pub number: i32,
    pub kind: RoundKind,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Round {
    pub fn from_db_round(round: DBRound) -> Result<Round, Error> {
        Ok(Round {
            id: round.id,
            tournament_id: round.tournament_id,
            number: round.round_number,
            kind: round.kind.parse()?,
            start: round.start_time,
            end: round.end_time,
        })
    }
}

/// A reference to "whoever finishes at `position` in `poule_id`"
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct RankPlaceholder {
    pub poule_id: PouleId,
    pub position: i32,
}

/// One side of a match.
/// Knockout sides start as a placeholder and keep it once a concrete team is resolved.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Slot {
    Empty,
    Placeholder(RankPlaceholder),
    Team {
        team_id: TeamId,
        placeholder: Option<RankPlaceholder>,
    },
}

impl Slot {
    pub fn team(team_id: TeamId) -> Slot {
        Slot::Team {
            team_id,
            placeholder: None,
        }
    }

    fn from_columns(team: Option<TeamId>, poule: Option<PouleId>, position: Option<i32>) -> Slot {
        let placeholder = match (poule, position) {
            (Some(poule_id), Some(position)) => Some(RankPlaceholder { poule_id, position }),
            _ => None,
        };
        match (team, placeholder) {
            (Some(team_id), placeholder) => Slot::Team {
                team_id,
                placeholder,
            },
            (None, Some(placeholder)) => Slot::Placeholder(placeholder),
            (None, None) => Slot::Empty,
        }
    }

    fn to_columns(&self) -> (Option<TeamId>, Option<PouleId>, Option<i32>) {
        let placeholder = self.placeholder();
        (
            self.team_id(),
            placeholder.map(|p| p.poule_id),
            placeholder.map(|p| p.position),
        )
    }

    /// The concrete team on this side, if resolved
    pub fn team_id(&self) -> Option<TeamId> {
        match self {
            Slot::Team { team_id, .. } => Some(*team_id),
            _ => None,
        }
    }

    pub fn placeholder(&self) -> Option<RankPlaceholder> {
        match self {
            Slot::Placeholder(p) => Some(*p),
            Slot::Team { placeholder, .. } => *placeholder,
            Slot::Empty => None,
        }
    }

    /// Fill in a concrete team, keeping any placeholder
    pub fn resolve(&self, team_id: TeamId) -> Slot {
        Slot::Team {
            team_id,
            placeholder: self.placeholder(),
        }
    }
}

/// Score of one set. Both values are None until recorded.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct SetScore {
    pub home: Option<i32>,
    pub away: Option<i32>,
}

/// Highest score a side can record in one set
pub const MAX_SET_SCORE: i32 = 999;

impl SetScore {
    pub fn new(home: i32, away: i32) -> SetScore {
        SetScore {
            home: Some(home),
            away: Some(away),
        }
    }

    /// Both scores, if this set counts as played (0-0 means not played)
    pub fn played(&self) -> Option<(i32, i32)> {
        match (self.home, self.away) {
            (Some(0), Some(0)) => None,
            (Some(h), Some(a)) => Some((h, a)),
            _ => None,
        }
    }
}

/// in memory representation of a match
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round_id: RoundId,
    pub poule_id: Option<PouleId>,
    pub field: i32,
    pub home: Slot,
    pub away: Slot,
    pub referee: Option<TeamId>,
    pub sets: [SetScore; 2],
}

impl Match {
    pub fn from_db_match(m: DBMatch) -> Match {
        Match {
            id: m.id,
            tournament_id: m.tournament_id,
            round_id: m.round_id,
            poule_id: m.poule_id,
            field: m.field_number,
            home: Slot::from_columns(m.home_team_id, m.home_rank_poule_id, m.home_rank_position),
            away: Slot::from_columns(m.away_team_id, m.away_rank_poule_id, m.away_rank_position),
            referee: m.referee_team_id,
            sets: [
                SetScore {
                    home: m.home_set1_score,
                    away: m.away_set1_score,
                },
                SetScore {
                    home: m.home_set2_score,
                    away: m.away_set2_score,
                },
            ],
        }
    }

    pub fn to_db_match(&self) -> DBMatch {
        let (home_team_id, home_rank_poule_id, home_rank_position) = self.home.to_columns();
        let (away_team_id, away_rank_poule_id, away_rank_position) = self.away.to_columns();
        DBMatch {
            id: self.id,
            tournament_id: self.tournament_id,
            round_id: self.round_id,
            poule_id: self.poule_id,
            field_number: self.field,
            home_team_id,
            away_team_id,
            referee_team_id: self.referee,
            home_rank_poule_id,
            home_rank_position,
            away_rank_poule_id,
            away_rank_position,
            home_set1_score: self.sets[0].home,
            away_set1_score: self.sets[0].away,
            home_set2_score: self.sets[1].home,
            away_set2_score: self.sets[1].away,
        }
    }

    /// Both concrete teams, if both sides are resolved
    pub fn teams(&self) -> Option<(TeamId, TeamId)> {
        Some((self.home.team_id()?, self.away.team_id()?))
    }

    pub fn involves(&self, team_id: TeamId) -> bool {
        self.home.team_id() == Some(team_id) || self.away.team_id() == Some(team_id)
    }

    /// A match is complete once all four set scores are in and neither set is 0-0
    pub fn is_complete(&self) -> bool {
        self.sets.iter().all(|s| s.played().is_some())
    }

    pub fn has_scores(&self) -> bool {
        self.sets.iter().any(|s| s.home.is_some() || s.away.is_some())
    }
}
