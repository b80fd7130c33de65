use crate::db::parse_time_of_day;
use crate::error::Error;
use crate::models::{
    Match, MatchId, Poule, PouleId, Round, SetScore, Slot, Team, TeamId, Tournament, TournamentId,
};
use crate::progression::OverallEntry;
use crate::standings::PouleStandings;
use crate::tournament::PhaseStatus;
use chrono::NaiveTime;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A command that can be sent from server to client
#[derive(PartialEq, Debug)]
pub enum ServerCommand {
    /// Report an error to the client
    Error(Error),
    /// Report that a command succeeded
    Okay,
    /// Report a new tournament's id
    NewTournament(TournamentId),
    /// Report a new poule's id
    NewPoule(PouleId),
    /// Report a new team's id
    NewTeam(TeamId),
    Tournaments(Vec<Tournament>),
    Poules(Vec<Poule>),
    Teams(Vec<Team>),
    /// Report the team at a poule rank, if any
    Team(Option<Team>),
    /// Report a tournament's schedule, with every round's matches
    Rounds {
        id: TournamentId,
        rounds: Vec<(Round, Vec<Match>)>,
    },
    /// Report the standings of every poule in a tournament
    Standings {
        id: TournamentId,
        poules: Vec<PouleStandings>,
    },
    /// Report the overall ranking of a tournament
    OverallStandings {
        id: TournamentId,
        entries: Vec<OverallEntry>,
    },
    PhaseStatus {
        id: TournamentId,
        status: PhaseStatus,
    },
}

/// A command sent to the server from the client
#[derive(PartialEq, Eq, Debug)]
pub enum ClientCommand<'a> {
    /// Create a new tournament
    NewTournament {
        name: &'a str,
        start_time: NaiveTime,
        num_fields: i32,
        match_duration_minutes: i32,
        break_duration_minutes: i32,
    },
    /// List all tournaments
    Tournaments,
    /// Change a tournament's settings
    UpdateTournament {
        id: TournamentId,
        name: &'a str,
        start_time: NaiveTime,
        num_fields: i32,
        match_duration_minutes: i32,
        break_duration_minutes: i32,
    },
    DeleteTournament(TournamentId),
    /// Create a poule in a tournament
    NewPoule {
        tournament: TournamentId,
        name: &'a str,
    },
    /// List the poules of a tournament
    Poules(TournamentId),
    RenamePoule {
        id: PouleId,
        name: &'a str,
    },
    DeletePoule(PouleId),
    /// Create a team in a tournament, optionally placed in a poule
    NewTeam {
        tournament: TournamentId,
        name: &'a str,
        poule: Option<PouleId>,
    },
    /// List the teams of a tournament
    Teams(TournamentId),
    RenameTeam {
        id: TeamId,
        name: &'a str,
    },
    /// Move a team to a poule, or out of its poule
    AssignTeam {
        id: TeamId,
        poule: Option<PouleId>,
    },
    DeleteTeam(TeamId),
    /// Generate the group phase, knockout placeholders and final
    GenerateGroupPhase(TournamentId),
    /// Fill the knockout matches from the current standings
    GenerateKnockoutPhase(TournamentId),
    /// Fill the final from the knockout results
    GenerateFinal(TournamentId),
    /// Get the team currently at a rank in a poule
    TeamByRank {
        poule: PouleId,
        rank: i32,
    },
    /// Get a tournament's schedule
    Rounds(TournamentId),
    /// Record the scores of a match
    Score {
        id: MatchId,
        sets: [SetScore; 2],
    },
    Standings(TournamentId),
    OverallStandings(TournamentId),
    PhaseStatus(TournamentId),
    /// Get updates on a tournament
    ObserveTournament(TournamentId),
    // stop getting updates on a tournament
    StopObserveTournament(TournamentId),
}

/// Display an optional value, with - for None
struct Dash<'a, T>(&'a Option<T>);

impl<T: Display> Display for Dash<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "-"),
        }
    }
}

impl Display for Slot {
    /// A team id once resolved, poule#rank while a placeholder, - when empty
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Team { team_id, .. } => write!(f, "{}", team_id),
            Slot::Placeholder(p) => write!(f, "{}#{}", p.poule_id, p.position),
            Slot::Empty => write!(f, "-"),
        }
    }
}

impl ServerCommand {
    fn write_list<T, F>(f: &mut Formatter<'_>, items: &[T], mut write_item: F) -> fmt::Result
    where
        F: FnMut(&mut Formatter<'_>, &T) -> fmt::Result,
    {
        write!(f, "[")?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write_item(f, item)?;
        }
        write!(f, "]")
    }

    fn write_match(f: &mut Formatter<'_>, m: &Match) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}, {}, {}, {}, {}, {}]",
            m.id,
            m.field,
            m.home,
            m.away,
            Dash(&m.referee),
            Dash(&m.sets[0].home),
            Dash(&m.sets[0].away),
            Dash(&m.sets[1].home),
            Dash(&m.sets[1].away)
        )
    }
}

impl fmt::Display for ServerCommand {
    /// Serialize the command into the textual representation expected by the client
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ServerCommand::*;

        match self {
            Okay => write!(f, "okay"),
            Error(e) => write!(f, "error {}", e),
            NewTournament(id) => write!(f, "new_tournament {}", id),
            NewPoule(id) => write!(f, "new_poule {}", id),
            NewTeam(id) => write!(f, "new_team {}", id),
            Tournaments(tourneys) => {
                write!(f, "tournaments ")?;
                ServerCommand::write_list(f, tourneys, |f, t| {
                    write!(
                        f,
                        "[{}, {}, {}, {}, {}, {}]",
                        t.id,
                        t.name,
                        t.start_time.format("%H:%M"),
                        t.num_fields,
                        t.match_duration_minutes,
                        t.break_duration_minutes
                    )
                })
            }
            Poules(poules) => {
                write!(f, "poules ")?;
                ServerCommand::write_list(f, poules, |f, p| write!(f, "[{}, {}]", p.id, p.name))
            }
            Teams(teams) => {
                write!(f, "teams ")?;
                ServerCommand::write_list(f, teams, |f, t| {
                    write!(f, "[{}, {}, {}]", t.id, t.name, Dash(&t.poule_id))
                })
            }
            Team(Some(team)) => write!(f, "team {}, {}", team.id, team.name),
            Team(None) => write!(f, "team -"),
            Rounds { id, rounds } => {
                write!(f, "rounds {}, ", id)?;
                ServerCommand::write_list(f, rounds, |f, (round, matches)| {
                    write!(
                        f,
                        "[{}, {}, {}, {}, {}, ",
                        round.id,
                        round.number,
                        round.kind,
                        round.start.format("%H:%M"),
                        round.end.format("%H:%M")
                    )?;
                    ServerCommand::write_list(f, matches, ServerCommand::write_match)?;
                    write!(f, "]")
                })
            }
            Standings { id, poules } => {
                write!(f, "standings {}, ", id)?;
                ServerCommand::write_list(f, poules, |f, standings| {
                    write!(f, "[{}, {}, ", standings.poule.id, standings.poule.name)?;
                    ServerCommand::write_list(f, &standings.rows, |f, (team, r)| {
                        write!(
                            f,
                            "[{}, {}, {}, {}, {}, {}, {}]",
                            team.id,
                            team.name,
                            r.points,
                            r.points_for,
                            r.points_against,
                            r.balance(),
                            r.played
                        )
                    })?;
                    write!(f, "]")
                })
            }
            OverallStandings { id, entries } => {
                write!(f, "overall_standings {}, ", id)?;
                ServerCommand::write_list(f, entries, |f, e| {
                    write!(
                        f,
                        "[{}, {}, {}, {}, {}, {}, {}, {}, {}, {}]",
                        e.rank,
                        e.team.id,
                        e.team.name,
                        e.group.points,
                        e.group.points_for,
                        e.group.points_against,
                        e.group.balance(),
                        e.played,
                        e.level,
                        Dash(&e.final_position)
                    )
                })
            }
            PhaseStatus { id, status } => write!(
                f,
                "phase_status {}, {}, {}, {}, {}, {}, {}",
                id,
                status.group_total,
                status.group_completed,
                status.group_complete(),
                status.knockout_total,
                status.knockout_completed,
                status.knockout_complete()
            ),
        }
    }
}

/// Parse a command from a client into a command and arguments
fn parse_cmd(msg: &str) -> (&str, Vec<&str>) {
    match msg.char_indices().find(|(_, c)| c.is_whitespace()) {
        Some((i, _)) => (&msg[..i], msg[i..].split(',').map(str::trim).collect()),
        None => (msg, Vec::new()),
    }
}

lazy_static! {
    // number of arguments expected for each command
    static ref NUM_ARGS: HashMap<&'static str, usize> = {
        let mut m = HashMap::new();
        m.insert("new_tournament", 5);
        m.insert("tournaments", 0);
        m.insert("update_tournament", 6);
        m.insert("delete_tournament", 1);
        m.insert("new_poule", 2);
        m.insert("poules", 1);
        m.insert("rename_poule", 2);
        m.insert("delete_poule", 1);
        m.insert("new_team", 3);
        m.insert("teams", 1);
        m.insert("rename_team", 2);
        m.insert("assign_team", 2);
        m.insert("delete_team", 1);
        m.insert("generate_group_phase", 1);
        m.insert("generate_knockout_phase", 1);
        m.insert("generate_final", 1);
        m.insert("team_by_rank", 2);
        m.insert("rounds", 1);
        m.insert("score", 5);
        m.insert("standings", 1);
        m.insert("overall_standings", 1);
        m.insert("phase_status", 1);
        m.insert("observe_tournament", 1);
        m.insert("stop_observe_tournament", 1);
        m
    };
}

fn parse_val<F: FromStr>(str: &str) -> Result<F, Error> {
    match str.parse::<F>() {
        Ok(id) => Ok(id),
        Err(_) => Err(Error::InvalidNumberId),
    }
}

/// Parse a value that may be - for null
fn parse_opt<F: FromStr>(str: &str) -> Result<Option<F>, Error> {
    match str {
        "-" => Ok(None),
        _ => Ok(Some(parse_val(str)?)),
    }
}

impl ClientCommand<'_> {
    /// Parse a command from the textual representation sent by a client
    pub fn deserialize(message: &str) -> Result<ClientCommand, Error> {
        use ClientCommand::*;

        let msg = message.trim();
        let (cmd, args) = parse_cmd(msg);
        // check for command existence + correct number of arguments
        let expected_args = NUM_ARGS.get(cmd);
        match expected_args {
            None => return Err(Error::InvalidCommand(cmd.to_string())),
            Some(expected) => {
                if args.len() != *expected {
                    return Err(Error::InvalidNumberOfArguments {
                        cmd: cmd.to_string(),
                        expected: *expected,
                        actual: args.len(),
                    });
                }
            }
        }
        // command is correct, so deserialize
        match cmd {
            "new_tournament" => Ok(NewTournament {
                name: args[0],
                start_time: parse_time_of_day(args[1])?,
                num_fields: parse_val(args[2])?,
                match_duration_minutes: parse_val(args[3])?,
                break_duration_minutes: parse_val(args[4])?,
            }),
            "tournaments" => Ok(Tournaments),
            "update_tournament" => Ok(UpdateTournament {
                id: parse_val(args[0])?,
                name: args[1],
                start_time: parse_time_of_day(args[2])?,
                num_fields: parse_val(args[3])?,
                match_duration_minutes: parse_val(args[4])?,
                break_duration_minutes: parse_val(args[5])?,
            }),
            "delete_tournament" => Ok(DeleteTournament(parse_val(args[0])?)),
            "new_poule" => Ok(NewPoule {
                tournament: parse_val(args[0])?,
                name: args[1],
            }),
            "poules" => Ok(Poules(parse_val(args[0])?)),
            "rename_poule" => Ok(RenamePoule {
                id: parse_val(args[0])?,
                name: args[1],
            }),
            "delete_poule" => Ok(DeletePoule(parse_val(args[0])?)),
            "new_team" => Ok(NewTeam {
                tournament: parse_val(args[0])?,
                name: args[1],
                poule: parse_opt(args[2])?,
            }),
            "teams" => Ok(Teams(parse_val(args[0])?)),
            "rename_team" => Ok(RenameTeam {
                id: parse_val(args[0])?,
                name: args[1],
            }),
            "assign_team" => Ok(AssignTeam {
                id: parse_val(args[0])?,
                poule: parse_opt(args[1])?,
            }),
            "delete_team" => Ok(DeleteTeam(parse_val(args[0])?)),
            "generate_group_phase" => Ok(GenerateGroupPhase(parse_val(args[0])?)),
            "generate_knockout_phase" => Ok(GenerateKnockoutPhase(parse_val(args[0])?)),
            "generate_final" => Ok(GenerateFinal(parse_val(args[0])?)),
            "team_by_rank" => Ok(TeamByRank {
                poule: parse_val(args[0])?,
                rank: parse_val(args[1])?,
            }),
            "rounds" => Ok(Rounds(parse_val(args[0])?)),
            "score" => Ok(Score {
                id: parse_val(args[0])?,
                sets: [
                    SetScore {
                        home: parse_opt(args[1])?,
                        away: parse_opt(args[2])?,
                    },
                    SetScore {
                        home: parse_opt(args[3])?,
                        away: parse_opt(args[4])?,
                    },
                ],
            }),
            "standings" => Ok(Standings(parse_val(args[0])?)),
            "overall_standings" => Ok(OverallStandings(parse_val(args[0])?)),
            "phase_status" => Ok(PhaseStatus(parse_val(args[0])?)),
            "observe_tournament" => Ok(ObserveTournament(parse_val(args[0])?)),
            "stop_observe_tournament" => Ok(StopObserveTournament(parse_val(args[0])?)),
            _ => Err(Error::InvalidCommand(cmd.to_string())),
        }
    }
}
