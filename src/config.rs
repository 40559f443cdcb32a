use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub browser: BrowserConfig,
    pub extractor: ExtractorConfig,
    pub labels: LabelConfig,
    pub scheduler: SchedulerConfig,
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub chrome_path: Option<String>,
    pub user_agent: String,
    pub window_width: u32,
    pub window_height: u32,
    pub navigation_timeout_secs: u64,
    /// Fixed wait after navigation so client-side rendering can fill the page.
    pub settle_secs: u64,
    pub extra_args: Vec<String>,
}

/// Where the match fields live on the source page. These track a third-party
/// layout and are expected to change; keep them out of code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    pub period_selector: String,
    pub home_score_selector: String,
    pub away_score_selector: String,
    pub home_team_selector: String,
    pub away_team_selector: String,
    pub period_marker: String,
    pub concluded_markers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    pub home_team: String,
    pub away_team: String,
    pub in_progress: String,
    pub pending: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Six-field cron (seconds first), as used by tokio-cron-scheduler.
    pub refresh_cron: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusPolicy {
    /// Serve whatever the last completed cycle stored.
    #[default]
    Cached,
    /// Run a cycle (single-flight per match) before answering.
    Fresh,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub status_policy: StatusPolicy,
    pub ttl_hours: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub directory: Option<String>,
    pub file_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 60,
            settle_secs: 5,
            extra_args: vec![
                "--disable-setuid-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-accelerated-2d-canvas".to_string(),
                "--disable-gpu".to_string(),
                "--disable-web-security".to_string(),
                "--disable-features=VizDisplayCompositor".to_string(),
            ],
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        let score_row = "#detail > div:nth-of-type(3) > div:nth-of-type(1) > div:nth-of-type(3) > div";
        Self {
            period_selector: format!("{score_row} > div:nth-of-type(2) > span:nth-of-type(1)"),
            home_score_selector: format!("{score_row} > div:nth-of-type(1) > span:nth-of-type(1)"),
            away_score_selector: format!("{score_row} > div:nth-of-type(1) > span:nth-of-type(3)"),
            home_team_selector: ".duelParticipant__home .participant__participantName".to_string(),
            away_team_selector: ".duelParticipant__away .participant__participantName".to_string(),
            period_marker: "Quarter".to_string(),
            concluded_markers: vec![
                "Finished".to_string(),
                "Final".to_string(),
                "After Overtime".to_string(),
                "After Penalties".to_string(),
                "Ended".to_string(),
            ],
        }
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            home_team: "Home".to_string(),
            away_team: "Away".to_string(),
            in_progress: "Maç Devam Ediyor".to_string(),
            pending: "Bekleniyor".to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_cron: "0 * * * * *".to_string(),
            enabled: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_prefix: "match-watcher".to_string(),
        }
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Layers built-in defaults, optional `config/` files, an optional explicit
    /// file, then `MATCH_WATCHER__*` environment variables.
    pub fn load(extra_file: Option<&Path>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local config (ignored by git)
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = extra_file {
            builder = builder.add_source(File::from(path));
        }

        let s = builder
            .add_source(Environment::with_prefix("MATCH_WATCHER").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;
        config.apply_env_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Legacy variables honoured for drop-in deployments.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.browser.chrome_path.is_none() {
            self.browser.chrome_path = lookup("CHROME_PATH")
                .or_else(|| lookup("PUPPETEER_EXECUTABLE_PATH"))
                .filter(|path| !path.trim().is_empty());
        }

        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse::<u16>().ok()) {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port must be greater than 0".into()));
        }

        if self.browser.navigation_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Browser navigation_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            return Err(ConfigError::Message("Browser viewport must be non-empty".into()));
        }

        if self.browser.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Browser user_agent must not be empty".into()));
        }

        if self.extractor.period_marker.trim().is_empty() {
            return Err(ConfigError::Message("Extractor period_marker must not be empty".into()));
        }

        for (name, selector) in self.extractor.selectors() {
            if scraper::Selector::parse(selector).is_err() {
                return Err(ConfigError::Message(format!(
                    "Invalid CSS selector for extractor.{}: {}",
                    name, selector
                )));
            }
        }

        if !Self::is_valid_cron(&self.scheduler.refresh_cron) {
            return Err(ConfigError::Message(
                "Invalid cron expression in scheduler.refresh_cron".into(),
            ));
        }

        if self.registry.ttl_hours == Some(0) {
            return Err(ConfigError::Message("Registry ttl_hours must be greater than 0".into()));
        }

        Ok(())
    }

    fn is_valid_cron(cron_expr: &str) -> bool {
        // seconds minute hour day month weekday [year]
        let parts: Vec<&str> = cron_expr.split_whitespace().collect();
        if parts.len() != 6 && parts.len() != 7 {
            return false;
        }

        parts.iter().all(|part| {
            part.chars().all(|c| {
                c.is_ascii_alphanumeric() || matches!(c, '*' | '-' | ',' | '/' | '?' | '#')
            })
        })
    }
}

impl ExtractorConfig {
    pub fn selectors(&self) -> [(&'static str, &str); 5] {
        [
            ("period_selector", self.period_selector.as_str()),
            ("home_score_selector", self.home_score_selector.as_str()),
            ("away_score_selector", self.away_score_selector.as_str()),
            ("home_team_selector", self.home_team_selector.as_str()),
            ("away_team_selector", self.away_team_selector.as_str()),
        ]
    }
}
