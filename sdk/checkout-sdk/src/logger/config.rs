//! Logger configuration as read from the `[log]` table.

use std::str::FromStr;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    pub console: LogConsole,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConsole {
    pub enabled: bool,
    pub level: Level,
    pub log_format: LogFormat,
    /// Overrides the directive derived from `level` when set.
    pub filtering_directive: Option<String>,
}

impl Default for LogConsole {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Level::default(),
            log_format: LogFormat::default(),
            filtering_directive: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Default,
    Json,
}

/// Wrapper over [`tracing::Level`] so it can be deserialized from `"debug"`, `"INFO"` and the like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level(tracing::Level);

impl Level {
    pub fn into_level(self) -> tracing::Level {
        self.0
    }
}

impl Default for Level {
    fn default() -> Self {
        Self(tracing::Level::INFO)
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let level = String::deserialize(deserializer)?;
        tracing::Level::from_str(&level)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_case_insensitive() {
        let console: LogConsole =
            serde_json::from_value(serde_json::json!({"level": "DEBUG", "log_format": "json"}))
                .unwrap();
        assert_eq!(console.level.into_level(), tracing::Level::DEBUG);
        assert_eq!(console.log_format, LogFormat::Json);
        assert!(console.enabled);
    }

    #[test]
    fn unknown_level_is_rejected() {
        let result: Result<LogConsole, _> =
            serde_json::from_value(serde_json::json!({"level": "loud"}));
        assert!(result.is_err());
    }
}
