use chrono::Local;
use env_logger::Builder;
use log::LevelFilter;
use std::{env, io::Write};

/// Log to stderr with a timestamp. RUST_LOG overrides the default Info level.
pub fn init_logger() {
    let mut builder = Builder::new();

    builder.format(|formatter, record| {
        writeln!(
            formatter,
            "{} [{}] ({}): {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    if let Ok(var) = env::var("RUST_LOG") {
        builder.parse_filters(&var);
    } else {
        builder.filter(None, LevelFilter::Info);
    }

    builder.init();
}
