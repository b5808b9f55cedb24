//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and from `STOCKBOOK__*` environment variables,
//! the latter taking precedence.
use config::{Config, ConfigError, Environment, File};
use engine::EngineConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("stockbook.db".to_string())
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("STOCKBOOK").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults_apply_to_an_empty_file() {
        let settings = parse("");
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.database.url(), "sqlite:stockbook.db?mode=rwc");
        assert_eq!(settings.engine, EngineConfig::default());
    }

    #[test]
    fn reads_database_and_engine_sections() {
        let settings = parse(
            r#"
            database = "memory"

            [app]
            level = "debug"

            [engine]
            allow_negative_stock = true
            "#,
        );
        assert_eq!(settings.app.level, "debug");
        assert_eq!(settings.database.url(), "sqlite::memory:");
        assert!(settings.engine.allow_negative_stock);
        assert!(settings.engine.auto_revalue);
    }

    #[test]
    fn sqlite_path_builds_a_file_url() {
        let settings = parse(
            r#"
            [database]
            sqlite = "/var/lib/stockbook/shop.db"
            "#,
        );
        assert_eq!(
            settings.database.url(),
            "sqlite:/var/lib/stockbook/shop.db?mode=rwc"
        );
    }
}
