use config::{Config, ConfigError, Environment, File};
use serde_derive::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Listener {
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Log {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Prometheus {
    pub enable: bool,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub log: Log,
    pub listener: Listener,
    pub prometheus: Prometheus,
}

impl Settings {
    pub fn init(config_file: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut s = Config::new();

        s.set_default("log.level", "info")?;
        s.set_default("listener.host", "0.0.0.0:9995")?;
        s.set_default("prometheus.enable", false)?;
        s.set_default("prometheus.host", "0.0.0.0:9100")?;

        // surcharge the defaults with the user config
        match config_file {
            Some(path) => {
                s.merge(File::from(path))?;
            }
            None => println!("No config provided, launching the app with the default configuration"),
        }

        // allow APP_* environment variables to override everything
        s.merge(Environment::with_prefix("APP").separator("_"))?;

        // freeze the configuration
        s.try_into()
    }
}
