use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::time::Duration;

// Which quote-fetcher implementation the service runs with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherMode {
    Live,
    Fixture,
}

impl FetcherMode {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "fixture" | "mock" => FetcherMode::Fixture,
            _ => FetcherMode::Live,
        }
    }
}

// YAML-serializable configuration structure
#[derive(Serialize, Deserialize, Debug)]
pub struct ConfigYaml {
    pub api_key: Option<String>,
    pub api_base_url: Option<String>,
    pub port: Option<u16>,
    pub environment: Option<String>,
    pub fetcher: Option<FetcherMode>,
    pub fetch_timeout_secs: Option<u64>,
    pub fetch_max_retries: Option<u32>,
    pub log_dir: Option<String>,
}

// Holds application-wide settings
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub port: u16,
    pub environment: String,
    pub fetcher: FetcherMode,
    pub fetch_timeout: Duration,
    pub fetch_max_retries: u32,
    pub log_dir: String,
}

const DEFAULT_API_BASE_URL: &str = "https://www.alphavantage.co/query";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FETCH_MAX_RETRIES: u32 = 3;

impl AppConfig {
    // Load configuration from YAML file or environment variables
    pub fn load() -> Self {
        // Check for CONFIG_FILE environment variable first
        if let Ok(config_file) = env::var("CONFIG_FILE") {
            Self::from_yaml(&config_file)
        } else {
            Self::from_env()
        }
    }

    // Load configuration from YAML file
    pub fn from_yaml(file_path: &str) -> Self {
        let yaml_content = fs::read_to_string(file_path)
            .unwrap_or_else(|e| panic!("Failed to read config file {}: {}", file_path, e));

        let yaml_config: ConfigYaml = serde_yaml::from_str(&yaml_content)
            .unwrap_or_else(|e| panic!("Failed to parse YAML config: {}", e));

        Self {
            api_key: yaml_config.api_key.unwrap_or_else(|| "demo".to_string()),
            api_base_url: yaml_config
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            port: yaml_config.port.unwrap_or(DEFAULT_PORT),
            environment: yaml_config
                .environment
                .unwrap_or_else(|| "development".to_string()),
            fetcher: yaml_config.fetcher.unwrap_or(FetcherMode::Live),
            fetch_timeout: Duration::from_secs(
                yaml_config
                    .fetch_timeout_secs
                    .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            ),
            fetch_max_retries: yaml_config
                .fetch_max_retries
                .unwrap_or(DEFAULT_FETCH_MAX_RETRIES),
            log_dir: yaml_config.log_dir.unwrap_or_else(|| "logs".to_string()),
        }
    }

    // Load all configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_key = env::var("STOCK_API_KEY").unwrap_or_else(|_| "demo".to_string());

        let api_base_url =
            env::var("STOCK_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let environment =
            env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let fetcher = env::var("FETCHER_MODE")
            .map(|s| FetcherMode::parse(&s))
            .unwrap_or(FetcherMode::Live);

        let fetch_timeout_secs = env::var("FETCH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);

        let fetch_max_retries = env::var("FETCH_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_FETCH_MAX_RETRIES);

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        Self {
            api_key,
            api_base_url,
            port,
            environment,
            fetcher,
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            fetch_max_retries,
            log_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn fetcher_mode_parses_aliases() {
        assert_eq!(FetcherMode::parse("fixture"), FetcherMode::Fixture);
        assert_eq!(FetcherMode::parse("MOCK"), FetcherMode::Fixture);
        assert_eq!(FetcherMode::parse("live"), FetcherMode::Live);
        assert_eq!(FetcherMode::parse("anything-else"), FetcherMode::Live);
    }

    #[test]
    fn from_yaml_applies_defaults_for_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_key: test-key\nport: 9000\nfetcher: fixture").unwrap();

        let config = AppConfig::from_yaml(file.path().to_str().unwrap());
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.port, 9000);
        assert_eq!(config.fetcher, FetcherMode::Fixture);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.fetch_max_retries, 3);
        assert_eq!(config.log_dir, "logs");
    }
}
