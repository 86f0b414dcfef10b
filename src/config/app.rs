use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;
use crate::Error;

pub const DEFAULT_DATA_PATH: &str = "data/nyc_median_rent.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const DEFAULT_APPENDIX_DIR: &str = "appendix";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 50002;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub data_path: PathBuf,
    pub output_dir: PathBuf,
    pub appendix_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            appendix_dir: PathBuf::from(DEFAULT_APPENDIX_DIR),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads `HOUSING_*` variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let port = match lookup("HOUSING_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("Invalid HOUSING_PORT format: {}", raw)))?,
            None => defaults.port,
        };
        let log_level = lookup("HOUSING_LOG_LEVEL").unwrap_or(defaults.log_level);
        Level::from_str(&log_level)
            .map_err(|_| Error::Config(format!("Invalid HOUSING_LOG_LEVEL: {}", log_level)))?;

        Ok(Self {
            data_path: lookup("HOUSING_DATA_PATH").map(PathBuf::from).unwrap_or(defaults.data_path),
            output_dir: lookup("HOUSING_OUTPUT_DIR").map(PathBuf::from).unwrap_or(defaults.output_dir),
            appendix_dir: lookup("HOUSING_APPENDIX_DIR").map(PathBuf::from).unwrap_or(defaults.appendix_dir),
            host: lookup("HOUSING_HOST").unwrap_or(defaults.host),
            port,
            log_level,
        })
    }

    pub fn level(&self) -> Level {
        Level::from_str(&self.log_level).unwrap_or(Level::INFO)
    }
}
