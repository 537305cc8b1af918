use crate::error::{AppError, Result};
use crate::models::StationProfile;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const REQUIRED_VARS: [&str; 4] = [
    "SPOTIFY_CLIENT_ID",
    "SPOTIFY_CLIENT_SECRET",
    "SPOTIFY_REDIRECT_URI",
    "SPOTIFY_PLAYLIST_ID",
];

pub const DEFAULT_TOKEN_PATH: &str = "spotify_tokens.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub playlist_id: String,
    /// Poll interval between station checks
    pub check_interval: Duration,
    /// Never launch a local browser for the consent step
    pub headless: bool,
    pub browser_executable_path: Option<String>,
    pub webdriver_url: String,
    pub token_path: PathBuf,
    pub callback_port: u16,
    pub auth_timeout: Duration,
    pub fetch_timeout: Duration,
    pub max_primary_failures: u32,
    pub stations: Vec<StationProfile>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("{} must be set", key)))
        };

        let production = lookup("APP_ENV").is_some_and(|v| v == "production");
        let skip_browser = lookup("SKIP_BROWSER").is_some_and(|v| v == "true");

        let stations = lookup("STATIONS")
            .unwrap_or_else(|| "radio538,slam".to_string())
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|key| {
                StationProfile::by_key(key)
                    .ok_or_else(|| AppError::Config(format!("Unknown station: {}", key)))
            })
            .collect::<Result<Vec<_>>>()?;

        if stations.is_empty() {
            return Err(AppError::Config("STATIONS must name at least one station".to_string()));
        }

        Ok(Config {
            client_id: required("SPOTIFY_CLIENT_ID")?,
            client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            redirect_uri: required("SPOTIFY_REDIRECT_URI")?,
            playlist_id: required("SPOTIFY_PLAYLIST_ID")?,
            check_interval: Duration::from_millis(parse_number(&lookup, "CHECK_INTERVAL", 60_000)?),
            headless: production || skip_browser,
            browser_executable_path: lookup("BROWSER_EXECUTABLE_PATH").filter(|v| !v.is_empty()),
            webdriver_url: lookup("WEBDRIVER_URL")
                .unwrap_or_else(|| "http://localhost:4444".to_string()),
            token_path: lookup("TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_PATH)),
            callback_port: parse_number(&lookup, "CALLBACK_PORT", 8888)?,
            auth_timeout: Duration::from_secs(parse_number(&lookup, "AUTH_TIMEOUT_SECS", 300)?),
            fetch_timeout: Duration::from_secs(parse_number(&lookup, "FETCH_TIMEOUT_SECS", 30)?),
            max_primary_failures: parse_number(&lookup, "MAX_PRIMARY_FAILURES", 3)?,
            stations,
        })
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a number, got {:?}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn required_pairs() -> Vec<(&'static str, &'static str)> {
        vec![
            ("SPOTIFY_CLIENT_ID", "client"),
            ("SPOTIFY_CLIENT_SECRET", "secret"),
            ("SPOTIFY_REDIRECT_URI", "http://localhost:8888/callback"),
            ("SPOTIFY_PLAYLIST_ID", "playlist"),
        ]
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_absent() {
        let config = Config::from_lookup(lookup_from(&required_pairs())).unwrap();

        assert_eq!(config.check_interval, Duration::from_millis(60_000));
        assert_eq!(config.callback_port, 8888);
        assert_eq!(config.max_primary_failures, 3);
        assert_eq!(config.token_path, PathBuf::from(DEFAULT_TOKEN_PATH));
        assert!(!config.headless);
        let keys: Vec<_> = config.stations.iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["radio538", "slam"]);
    }

    #[test]
    fn missing_playlist_is_a_config_error() {
        let pairs: Vec<_> = required_pairs()
            .into_iter()
            .filter(|(k, _)| *k != "SPOTIFY_PLAYLIST_ID")
            .collect();

        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("SPOTIFY_PLAYLIST_ID")));
    }

    #[test]
    fn production_or_skip_browser_means_headless() {
        let mut pairs = required_pairs();
        pairs.push(("APP_ENV", "production"));
        assert!(Config::from_lookup(lookup_from(&pairs)).unwrap().headless);

        let mut pairs = required_pairs();
        pairs.push(("SKIP_BROWSER", "true"));
        assert!(Config::from_lookup(lookup_from(&pairs)).unwrap().headless);
    }

    #[test]
    fn interval_override_and_bad_numbers() {
        let mut pairs = required_pairs();
        pairs.push(("CHECK_INTERVAL", "15000"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.check_interval, Duration::from_millis(15_000));

        let mut pairs = required_pairs();
        pairs.push(("CHECK_INTERVAL", "soon"));
        assert!(matches!(
            Config::from_lookup(lookup_from(&pairs)),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn unknown_station_is_rejected() {
        let mut pairs = required_pairs();
        pairs.push(("STATIONS", "slam,veronica"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("veronica")));
    }
}
