use poule_server::*;

use dotenv::dotenv;
use log::error;
use std::env;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    logging::init_logger();

    let addr = env::var("SERVER_URL").unwrap_or_else(|_| "127.0.0.1:9000".to_string());
    let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| "tournament.db".to_string());

    match server::run_server(&addr, &db_url).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}
