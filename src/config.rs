use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_TARGET_PROCESS: &str = "browser.exe";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub input: InputConfig,
    pub monitor: MonitorConfig,
    pub executor: ExecutorConfig,
    pub current_profile: String,
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    pub device_path: String,
    /// Комбинации, которые нельзя перехватывать (заняты системой)
    #[serde(default)]
    pub reserved_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    pub detection_mode: String,
    pub poll_interval_ms: u64,
    pub cache_ttl_ms: u64,
    pub error_backoff_ms: u64,
    pub join_timeout_ms: u64,
    pub match_mode: MatchMode,
    /// Считать цель активной, если ни один способ определения окна не работает
    #[serde(default)]
    pub match_when_undetectable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Lenient,
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStrategy {
    Clipboard,
    Typing,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutorConfig {
    pub text_strategy: TextStrategy,
    pub paste_combo: String,
    pub paste_restore_delay_ms: u64,
    pub line_delay_ms: u64,
    /// "auto" - взять из LC_ALL / LC_TIME / LANG
    pub locale: String,
    /// "auto" - формат по локали (для русской добавляется "года")
    pub date_long_format: String,
    pub date_short_format: String,
    pub datetime_format: String,
    pub time_format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileConfig {
    #[serde(default = "default_target_process")]
    pub target_process: String,
    /// клавиша -> действие в строковой форме
    #[serde(default)]
    pub mappings: BTreeMap<String, String>,
}

fn default_target_process() -> String {
    DEFAULT_TARGET_PROCESS.to_string()
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            target_process: default_target_process(),
            mappings: BTreeMap::new(),
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

impl ExecutorConfig {
    pub fn paste_restore_delay(&self) -> Duration {
        Duration::from_millis(self.paste_restore_delay_ms)
    }

    pub fn line_delay(&self) -> Duration {
        Duration::from_millis(self.line_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(DEFAULT_PROFILE.to_string(), ProfileConfig::default());

        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
                filter: "ahk_remap=info".to_string(),
            },
            input: InputConfig {
                device_path: "auto".to_string(),
                reserved_keys: vec!["ctrl+alt+delete".to_string(), "ctrl+alt+backspace".to_string()],
            },
            monitor: MonitorConfig {
                detection_mode: "auto".to_string(),
                poll_interval_ms: 200,
                cache_ttl_ms: 100,
                error_backoff_ms: 1000,
                join_timeout_ms: 1000,
                match_mode: MatchMode::Lenient,
                match_when_undetectable: false,
            },
            executor: ExecutorConfig {
                text_strategy: TextStrategy::Clipboard,
                paste_combo: "ctrl+v".to_string(),
                paste_restore_delay_ms: 50,
                line_delay_ms: 50,
                locale: "auto".to_string(),
                date_long_format: "auto".to_string(),
                date_short_format: "%d.%m.%Y".to_string(),
                datetime_format: "%d.%m.%Y %H:%M:%S".to_string(),
                time_format: "%H:%M:%S".to_string(),
            },
            current_profile: DEFAULT_PROFILE.to_string(),
            profiles,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("AHK_REMAP_").split("__"));

        let mut config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;
        config.normalize_profiles();

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        // Валидация настроек мониторинга
        match self.monitor.detection_mode.as_str() {
            "auto" | "xdotool" | "kdotool" | "sway" => {}
            _ => anyhow::bail!(
                "Неверный режим детекции окон: {}",
                self.monitor.detection_mode
            ),
        }

        if self.monitor.poll_interval_ms < 10 {
            anyhow::bail!("poll_interval_ms должно быть минимум 10");
        }

        if self.monitor.cache_ttl_ms == 0 {
            anyhow::bail!("cache_ttl_ms должно быть больше 0");
        }

        if self.monitor.join_timeout_ms == 0 {
            anyhow::bail!("join_timeout_ms должно быть больше 0");
        }

        if self.executor.paste_combo.trim().is_empty() {
            anyhow::bail!("paste_combo не может быть пустым");
        }

        // Валидация профилей
        for (name, profile) in &self.profiles {
            if profile.target_process.trim().is_empty() {
                anyhow::bail!("Пустой целевой процесс в профиле '{}'", name);
            }
        }

        Ok(())
    }

    /// Гарантирует профиль по умолчанию и существующий текущий профиль
    pub fn normalize_profiles(&mut self) {
        self.profiles
            .entry(DEFAULT_PROFILE.to_string())
            .or_default();

        if !self.profiles.contains_key(&self.current_profile) {
            warn!(
                "Профиль '{}' не найден, переключаемся на '{}'",
                self.current_profile, DEFAULT_PROFILE
            );
            self.current_profile = DEFAULT_PROFILE.to_string();
        }
    }

    pub fn profile(&self, name: &str) -> Option<&ProfileConfig> {
        self.profiles.get(name)
    }

    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }
}
