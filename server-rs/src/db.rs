use crate::error::Error;
use crate::models::{
    DBMatch, DBRound, Match, MatchId, NewDBMatch, NewDBRound, NewPoule, NewTeam, NewTournament,
    Poule, PouleId, Round, RoundId, RoundKind, SetScore, Team, TeamId, Tournament, TournamentId,
    MAX_SET_SCORE,
};
use crate::schema::{matches, poules, rounds, teams, tournaments};
use chrono::NaiveTime;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, info};
use std::collections::HashMap;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// Parse a HH:MM time of day
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, Error> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| Error::InvalidTime(s.to_string()))
}

fn configure_connection(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
}

fn run_migrations(conn: &mut SqliteConnection) -> Result<(), Error> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::MigrationError(e.to_string()))?;
    if !applied.is_empty() {
        info!("applied {} database migration(s)", applied.len());
    }
    Ok(())
}

#[derive(Debug)]
struct ConnectionSetup;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionSetup {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        configure_connection(conn).map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn init_db_pool(db_url: &str) -> Result<SqlitePool, Error> {
    let manage = ConnectionManager::<SqliteConnection>::new(db_url);
    let pool = Pool::builder()
        .connection_customizer(Box::new(ConnectionSetup))
        .build(manage)?;
    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;
    Ok(pool)
}

/// Open a single connection with the schema in place (":memory:" works)
pub fn establish_connection(db_url: &str) -> Result<SqliteConnection, Error> {
    let mut conn = SqliteConnection::establish(db_url)?;
    configure_connection(&mut conn)?;
    run_migrations(&mut conn)?;
    Ok(conn)
}

fn validate_settings(
    num_fields: i32,
    match_duration_minutes: i32,
    break_duration_minutes: i32,
) -> Result<(), Error> {
    if num_fields < 1 {
        return Err(Error::InvalidTournamentSettings("at least one field is needed"));
    }
    if match_duration_minutes < 1 {
        return Err(Error::InvalidTournamentSettings(
            "match duration must be at least a minute",
        ));
    }
    if break_duration_minutes < 0 {
        return Err(Error::InvalidTournamentSettings(
            "break duration can't be negative",
        ));
    }
    Ok(())
}

fn into_matches(rows: Vec<DBMatch>) -> Vec<Match> {
    rows.into_iter().map(Match::from_db_match).collect()
}

/// A database connection wrapper, which associates the database with functions to manipulate it
pub struct DBWrapper<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> DBWrapper<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> DBWrapper<'c> {
        DBWrapper { db }
    }

    fn conn(&mut self) -> &mut SqliteConnection {
        self.db
    }

    /// Run `f` in an immediate transaction. Writers are serialized and any error rolls everything back.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut DBWrapper<'_>) -> Result<T, Error>,
    {
        self.db
            .immediate_transaction(|conn| f(&mut DBWrapper { db: conn }))
    }

    // ---- Tournaments ----

    /// Create a new tournament
    pub fn new_tournament(&mut self, tourney: NewTournament) -> Result<Tournament, Error> {
        validate_settings(
            tourney.num_fields,
            tourney.match_duration_minutes,
            tourney.break_duration_minutes,
        )?;
        Ok(diesel::insert_into(tournaments::table)
            .values(&tourney)
            .returning(Tournament::as_returning())
            .get_result(self.conn())?)
    }

    /// Lookup a tournament with the given id
    pub fn find_tournament(&mut self, id: TournamentId) -> Result<Tournament, Error> {
        match tournaments::table
            .find(id)
            .select(Tournament::as_select())
            .first(self.conn())
            .optional()?
        {
            Some(t) => Ok(t),
            None => Err(Error::NoSuchTournament),
        }
    }

    pub fn find_tournaments(&mut self) -> Result<Vec<Tournament>, Error> {
        Ok(tournaments::table
            .order(tournaments::id.asc())
            .select(Tournament::as_select())
            .load(self.conn())?)
    }

    /// Update a tournament's settings
    pub fn save_tournament(&mut self, tourney: &Tournament) -> Result<(), Error> {
        validate_settings(
            tourney.num_fields,
            tourney.match_duration_minutes,
            tourney.break_duration_minutes,
        )?;
        self.find_tournament(tourney.id)?;
        diesel::update(tournaments::table.find(tourney.id))
            .set(tourney)
            .execute(self.conn())?;
        Ok(())
    }

    /// Delete a tournament with everything it owns
    pub fn delete_tournament(&mut self, id: TournamentId) -> Result<(), Error> {
        self.transaction(|db| {
            db.find_tournament(id)?;
            let removed = diesel::delete(matches::table.filter(matches::tournament_id.eq(id)))
                .execute(db.conn())?;
            diesel::delete(rounds::table.filter(rounds::tournament_id.eq(id))).execute(db.conn())?;
            diesel::delete(teams::table.filter(teams::tournament_id.eq(id))).execute(db.conn())?;
            diesel::delete(poules::table.filter(poules::tournament_id.eq(id))).execute(db.conn())?;
            diesel::delete(tournaments::table.find(id)).execute(db.conn())?;
            debug!("deleted tournament {} ({} matches)", id, removed);
            Ok(())
        })
    }

    // ---- Poules ----

    /// Create a new poule in a tournament
    pub fn new_poule(&mut self, tournament_id: TournamentId, name: &str) -> Result<Poule, Error> {
        self.find_tournament(tournament_id)?;
        Ok(diesel::insert_into(poules::table)
            .values(&NewPoule {
                tournament_id,
                name,
            })
            .returning(Poule::as_returning())
            .get_result(self.conn())?)
    }

    pub fn find_poule(&mut self, id: PouleId) -> Result<Poule, Error> {
        match poules::table
            .find(id)
            .select(Poule::as_select())
            .first(self.conn())
            .optional()?
        {
            Some(p) => Ok(p),
            None => Err(Error::NoSuchPoule),
        }
    }

    /// Load all poules in a tournament, in creation order
    pub fn find_poules(&mut self, tournament_id: TournamentId) -> Result<Vec<Poule>, Error> {
        Ok(poules::table
            .filter(poules::tournament_id.eq(tournament_id))
            .order(poules::id.asc())
            .select(Poule::as_select())
            .load(self.conn())?)
    }

    pub fn rename_poule(&mut self, id: PouleId, name: &str) -> Result<(), Error> {
        let poule = self.find_poule(id)?;
        diesel::update(poules::table.find(id))
            .set(&Poule {
                name: name.to_string(),
                ..poule
            })
            .execute(self.conn())?;
        Ok(())
    }

    /// Delete a poule. Its teams stay in the tournament, unassigned.
    /// Refused once the group phase exists, since that would change pool sizes.
    pub fn delete_poule(&mut self, id: PouleId) -> Result<(), Error> {
        self.transaction(|db| {
            let poule = db.find_poule(id)?;
            db.check_not_scheduled(poule.tournament_id)?;
            diesel::update(teams::table.filter(teams::poule_id.eq(id)))
                .set(teams::poule_id.eq(None::<PouleId>))
                .execute(db.conn())?;
            diesel::delete(poules::table.find(id)).execute(db.conn())?;
            Ok(())
        })
    }

    // ---- Teams ----

    /// Check that a poule exists and belongs to the given tournament
    fn check_poule_in_tournament(
        &mut self,
        tournament_id: TournamentId,
        poule_id: PouleId,
    ) -> Result<(), Error> {
        match self.find_poule(poule_id) {
            Ok(p) if p.tournament_id == tournament_id => Ok(()),
            Ok(_) | Err(Error::NoSuchPoule) => Err(Error::PouleNotInTournament),
            Err(e) => Err(e),
        }
    }

    fn check_name_free(
        &mut self,
        tournament_id: TournamentId,
        name: &str,
        except: Option<TeamId>,
    ) -> Result<(), Error> {
        let existing = teams::table
            .filter(teams::tournament_id.eq(tournament_id).and(teams::name.eq(name)))
            .select(Team::as_select())
            .first(self.conn())
            .optional()?;
        match existing {
            Some(team) if Some(team.id) != except => Err(Error::TeamNameTaken(name.to_string())),
            _ => Ok(()),
        }
    }

    fn check_not_scheduled(&mut self, tournament_id: TournamentId) -> Result<(), Error> {
        if self.has_round_of_kind(tournament_id, RoundKind::Group)? {
            Err(Error::ScheduleLocked)
        } else {
            Ok(())
        }
    }

    /// Create a new team, optionally placed in a poule
    pub fn new_team(
        &mut self,
        tournament_id: TournamentId,
        name: &str,
        poule_id: Option<PouleId>,
    ) -> Result<Team, Error> {
        self.find_tournament(tournament_id)?;
        if let Some(poule_id) = poule_id {
            self.check_poule_in_tournament(tournament_id, poule_id)?;
            self.check_not_scheduled(tournament_id)?;
        }
        self.check_name_free(tournament_id, name, None)?;
        Ok(diesel::insert_into(teams::table)
            .values(&NewTeam {
                tournament_id,
                poule_id,
                name,
            })
            .returning(Team::as_returning())
            .get_result(self.conn())?)
    }

    pub fn find_team(&mut self, id: TeamId) -> Result<Team, Error> {
        match teams::table
            .find(id)
            .select(Team::as_select())
            .first(self.conn())
            .optional()?
        {
            Some(t) => Ok(t),
            None => Err(Error::NoSuchTeam),
        }
    }

    /// Load all teams in a tournament
    pub fn find_teams(&mut self, tournament_id: TournamentId) -> Result<Vec<Team>, Error> {
        Ok(teams::table
            .filter(teams::tournament_id.eq(tournament_id))
            .order(teams::id.asc())
            .select(Team::as_select())
            .load(self.conn())?)
    }

    /// Load all teams in a poule
    pub fn find_poule_teams(&mut self, poule_id: PouleId) -> Result<Vec<Team>, Error> {
        Ok(teams::table
            .filter(teams::poule_id.eq(poule_id))
            .order(teams::id.asc())
            .select(Team::as_select())
            .load(self.conn())?)
    }

    fn save_team(&mut self, team: &Team) -> Result<(), Error> {
        diesel::update(teams::table.find(team.id))
            .set(team)
            .execute(self.conn())?;
        Ok(())
    }

    pub fn rename_team(&mut self, id: TeamId, name: &str) -> Result<(), Error> {
        let team = self.find_team(id)?;
        self.check_name_free(team.tournament_id, name, Some(id))?;
        self.save_team(&Team {
            name: name.to_string(),
            ..team
        })
    }

    /// Move a team into a poule, or out of any poule with None
    pub fn assign_team(&mut self, id: TeamId, poule_id: Option<PouleId>) -> Result<(), Error> {
        let team = self.find_team(id)?;
        if let Some(poule_id) = poule_id {
            self.check_poule_in_tournament(team.tournament_id, poule_id)?;
        }
        self.check_not_scheduled(team.tournament_id)?;
        self.save_team(&Team { poule_id, ..team })
    }

    pub fn delete_team(&mut self, id: TeamId) -> Result<(), Error> {
        let team = self.find_team(id)?;
        self.check_not_scheduled(team.tournament_id)?;
        diesel::delete(teams::table.find(id)).execute(self.conn())?;
        Ok(())
    }

    // ---- Rounds ----

    /// Check whether a tournament has any round of the given kind
    pub fn has_round_of_kind(
        &mut self,
        tournament_id: TournamentId,
        kind: RoundKind,
    ) -> Result<bool, Error> {
        let count: i64 = rounds::table
            .filter(
                rounds::tournament_id
                    .eq(tournament_id)
                    .and(rounds::kind.eq(kind.as_str())),
            )
            .count()
            .get_result(self.conn())?;
        Ok(count > 0)
    }

    /// Load all rounds of a tournament in round number order
    pub fn find_rounds(&mut self, tournament_id: TournamentId) -> Result<Vec<Round>, Error> {
        rounds::table
            .filter(rounds::tournament_id.eq(tournament_id))
            .order(rounds::round_number.asc())
            .select(DBRound::as_select())
            .load(self.conn())?
            .into_iter()
            .map(Round::from_db_round)
            .collect()
    }

    pub fn find_rounds_of_kind(
        &mut self,
        tournament_id: TournamentId,
        kind: RoundKind,
    ) -> Result<Vec<Round>, Error> {
        Ok(self
            .find_rounds(tournament_id)?
            .into_iter()
            .filter(|r| r.kind == kind)
            .collect())
    }

    /// Every round of a tournament with its matches, in schedule order
    pub fn find_schedule(
        &mut self,
        tournament_id: TournamentId,
    ) -> Result<Vec<(Round, Vec<Match>)>, Error> {
        self.find_tournament(tournament_id)?;
        let rounds = self.find_rounds(tournament_id)?;
        let round_ids: Vec<RoundId> = rounds.iter().map(|r| r.id).collect();
        let mut by_round: HashMap<RoundId, Vec<Match>> = HashMap::new();
        for m in self.find_round_matches(&round_ids)? {
            by_round.entry(m.round_id).or_default().push(m);
        }
        Ok(rounds
            .into_iter()
            .map(|r| {
                let matches = by_round.remove(&r.id).unwrap_or_default();
                (r, matches)
            })
            .collect())
    }

    pub fn insert_round(&mut self, round: NewDBRound) -> Result<Round, Error> {
        let round = diesel::insert_into(rounds::table)
            .values(&round)
            .returning(DBRound::as_returning())
            .get_result(self.conn())?;
        Round::from_db_round(round)
    }

    // ---- Matches ----

    pub fn insert_matches(&mut self, new_matches: &[NewDBMatch]) -> Result<usize, Error> {
        if new_matches.is_empty() {
            return Ok(0);
        }
        Ok(diesel::insert_into(matches::table)
            .values(new_matches)
            .execute(self.conn())?)
    }

    pub fn find_match(&mut self, id: MatchId) -> Result<Match, Error> {
        match matches::table
            .find(id)
            .select(DBMatch::as_select())
            .first(self.conn())
            .optional()?
        {
            Some(m) => Ok(Match::from_db_match(m)),
            None => Err(Error::NoSuchMatch),
        }
    }

    /// Load the matches of the given rounds, ordered by round then field
    pub fn find_round_matches(&mut self, round_ids: &[RoundId]) -> Result<Vec<Match>, Error> {
        let rows = matches::table
            .filter(matches::round_id.eq_any(round_ids.to_vec()))
            .order((matches::round_id.asc(), matches::field_number.asc()))
            .select(DBMatch::as_select())
            .load(self.conn())?;
        Ok(into_matches(rows))
    }

    /// Load the group matches of a poule
    pub fn find_poule_matches(&mut self, poule_id: PouleId) -> Result<Vec<Match>, Error> {
        let rows = matches::table
            .filter(matches::poule_id.eq(poule_id))
            .order((matches::round_id.asc(), matches::field_number.asc()))
            .select(DBMatch::as_select())
            .load(self.conn())?;
        Ok(into_matches(rows))
    }

    /// Load every match of a tournament
    pub fn find_tournament_matches(
        &mut self,
        tournament_id: TournamentId,
    ) -> Result<Vec<Match>, Error> {
        let rows = matches::table
            .filter(matches::tournament_id.eq(tournament_id))
            .order((matches::round_id.asc(), matches::field_number.asc()))
            .select(DBMatch::as_select())
            .load(self.conn())?;
        Ok(into_matches(rows))
    }

    /// Load the matches of every round of the given kind, in schedule order
    pub fn find_matches_of_kind(
        &mut self,
        tournament_id: TournamentId,
        kind: RoundKind,
    ) -> Result<Vec<Match>, Error> {
        let round_ids: Vec<RoundId> = self
            .find_rounds_of_kind(tournament_id, kind)?
            .iter()
            .map(|r| r.id)
            .collect();
        self.find_round_matches(&round_ids)
    }

    pub fn save_match(&mut self, m: &Match) -> Result<(), Error> {
        diesel::update(matches::table.find(m.id))
            .set(&m.to_db_match())
            .execute(self.conn())?;
        Ok(())
    }

    /// Record both set scores of a match, replacing anything stored
    pub fn submit_score(&mut self, id: MatchId, sets: [SetScore; 2]) -> Result<Match, Error> {
        for value in sets.iter().flat_map(|s| [s.home, s.away]).flatten() {
            if value < 0 {
                return Err(Error::NegativeScore);
            }
            if value > MAX_SET_SCORE {
                return Err(Error::ScoreTooHigh(value));
            }
        }
        let mut m = self.find_match(id)?;
        m.sets = sets;
        self.save_match(&m)?;
        Ok(m)
    }
}
