use crate::models::{MatchId, PouleId, MAX_SET_SCORE};
use std::mem;
use std::num::ParseIntError;
use thiserror::Error;

/// Broad classes of failure, used to decide how a rejected operation is reported
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorCategory {
    /// Missing entity, unmet structural precondition, duplicate generation, invalid input
    Precondition,
    /// Stored results don't allow a decision (ties, ranks that no longer exist)
    DataInconsistency,
    /// Failure in the database or the host system
    Storage,
    /// Malformed client message
    Protocol,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    DBError(#[from] diesel::result::Error),
    #[error("database pool error: could not establish database connection")]
    R2D2Error(#[from] r2d2::Error),
    #[error("database connection error: {0}")]
    ConnectionError(#[from] diesel::ConnectionError),
    #[error("database migration failed: {0}")]
    MigrationError(String),
    #[error("unknown round kind stored in database: {0}")]
    UnknownRoundKind(String),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("unrecognized command: {0}")]
    InvalidCommand(String),
    #[error("invalid number of arguments for command {cmd} - expected {expected}, found {actual}")]
    InvalidNumberOfArguments {
        cmd: String,
        expected: usize,
        actual: usize,
    },
    #[error("no such connected client")]
    NoSuchConnectedClient,
    #[error("couldn't parse client command as text (make sure to use utf-8 encoded messages)")]
    MessageParseError,
    #[error("malformed id or number")]
    InvalidNumberId,
    #[error("malformed time of day {0} (expected HH:MM)")]
    InvalidTime(String),

    #[error("no such tournament")]
    NoSuchTournament,
    #[error("no such poule")]
    NoSuchPoule,
    #[error("no such team")]
    NoSuchTeam,
    #[error("no such match")]
    NoSuchMatch,
    #[error("invalid tournament settings: {0}")]
    InvalidTournamentSettings(&'static str),
    #[error("team name {0} is already taken in this tournament")]
    TeamNameTaken(String),
    #[error("poule does not belong to this tournament")]
    PouleNotInTournament,
    #[error("set scores can't be negative")]
    NegativeScore,
    #[error("set score {0} is too high (at most {max})", max = MAX_SET_SCORE)]
    ScoreTooHigh(i32),
    #[error("poule assignments are locked once the group phase exists")]
    ScheduleLocked,

    #[error("group phase already exists and will not be overwritten")]
    GroupPhaseExists,
    #[error("no poule has at least 2 teams")]
    NoSchedulablePoules,
    #[error("schedule doesn't fit in a single day")]
    ScheduleOverrunsDay,
    #[error("knockout structure is missing, generate the group phase first")]
    NoKnockoutStructure,
    #[error("final structure is missing, generate the group phase first")]
    NoFinalStructure,
    #[error("not enough #1 vs #1 knockout winners to fill the final")]
    NotEnoughFinalists,
    #[error("knockout match {0} is not complete")]
    KnockoutMatchIncomplete(MatchId),
    #[error("knockout match {0} has no team on one side")]
    KnockoutMatchUnresolved(MatchId),

    #[error("match {0} is tied on sets and points, can't determine a winner")]
    UndecidedMatch(MatchId),
    #[error("poule {poule} has no team at rank {rank}")]
    RankOutOfRange { poule: PouleId, rank: i32 },
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        use Error::*;
        match self {
            DBError(_) | R2D2Error(_) | ConnectionError(_) | MigrationError(_)
            | UnknownRoundKind(_) | IoError(_) => ErrorCategory::Storage,
            InvalidCommand(_)
            | InvalidNumberOfArguments { .. }
            | NoSuchConnectedClient
            | MessageParseError
            | InvalidNumberId
            | InvalidTime(_) => ErrorCategory::Protocol,
            UndecidedMatch(_) | RankOutOfRange { .. } => ErrorCategory::DataInconsistency,
            _ => ErrorCategory::Precondition,
        }
    }
}

// wrapped library errors compare by variant only
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        use Error::*;
        match (self, other) {
            (DBError(_), DBError(_))
            | (R2D2Error(_), R2D2Error(_))
            | (ConnectionError(_), ConnectionError(_))
            | (IoError(_), IoError(_)) => true,
            _ => mem::discriminant(self) == mem::discriminant(other) && self.to_string() == other.to_string(),
        }
    }
}

impl Eq for Error {}

impl From<ParseIntError> for Error {
    fn from(_e: ParseIntError) -> Error {
        Error::InvalidNumberId
    }
}
