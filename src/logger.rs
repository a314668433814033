use log::LevelFilter;
use std::str::FromStr;

pub fn init(level: &str) {
    let mut logger = env_logger::Builder::new();
    logger.format_timestamp_millis();
    logger.filter(None, LevelFilter::from_str(level).unwrap_or(LevelFilter::Info));
    logger.init();
}
