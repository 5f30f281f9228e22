use chrono::Local;
use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;

/// Timestamped log lines on stderr. `RUST_LOG`, when set, wins over `debug`.
pub fn init(debug: bool) {
    let level = if debug { LevelFilter::Debug } else { LevelFilter::Info };

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Warn)
        .filter(Some(env!("CARGO_PKG_NAME")), level);

    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
    log::debug!("Logger initialized at {}", level);
}
