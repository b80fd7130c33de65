pub mod cmd;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod progression;
pub mod schema;
pub mod server;
pub mod standings;
pub mod tournament;
