use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{AuthSettings, DatabaseSettings, LoggingSettings, ServerSettings, Settings};

/// Prefix for environment overrides, e.g. `WARBLER__SERVER__PORT=8080`.
pub const ENV_PREFIX: &str = "WARBLER";

/// Loads the application configuration.
///
/// Sources, lowest precedence first: built-in defaults, an optional
/// `config.toml` in the working directory, `WARBLER__*` environment
/// variables, and finally `DATABASE_URL`. A `.env` file is read first so its
/// values count as environment variables.
pub fn load_config() -> Result<Settings, ConfigError> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok();
    load_config_from("config", None, database_url)
}

/// The sources behind [`load_config`], with the environment injectable.
///
/// `env` replaces the process environment when given; `database_url` is the
/// final override for `database.url`.
pub fn load_config_from(
    file: &str,
    env: Option<config::Map<String, String>>,
    database_url: Option<String>,
) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(file).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(env),
        )
        .set_override_option("database.url", database_url)?
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;

    tracing::debug!(
        host = %settings.server.host,
        port = settings.server.port,
        "Configuration loaded."
    );
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        Some(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn defaults_apply_without_any_source() {
        let settings = load_config_from("does-not-exist", env(&[]), None).unwrap();
        assert_eq!(settings.database.url, "postgresql:///warbler");
        assert_eq!(settings.database.max_connections, 10);
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.auth.bcrypt_cost, 12);
        assert_eq!(settings.logging.level, "info");
        assert!(settings.logging.directory.is_none());
    }

    #[test]
    fn file_then_env_then_database_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warbler.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[database]\nurl = \"postgresql:///from-file\"\nmax_connections = 3\n\n[server]\nport = 8000"
        )
        .unwrap();
        let file_name = path.with_extension("");
        let file_name = file_name.to_str().unwrap();

        let settings = load_config_from(file_name, env(&[]), None).unwrap();
        assert_eq!(settings.database.url, "postgresql:///from-file");
        assert_eq!(settings.database.max_connections, 3);
        assert_eq!(settings.server.port, 8000);

        let settings =
            load_config_from(file_name, env(&[("WARBLER__SERVER__PORT", "9000")]), None).unwrap();
        assert_eq!(settings.server.port, 9000);

        let settings = load_config_from(
            file_name,
            env(&[("WARBLER__DATABASE__URL", "postgresql:///from-env")]),
            Some("postgresql:///warbler-test".to_string()),
        )
        .unwrap();
        assert_eq!(settings.database.url, "postgresql:///warbler-test");
    }

    #[test]
    fn rejects_out_of_range_bcrypt_cost() {
        let err = load_config_from("does-not-exist", env(&[("WARBLER__AUTH__BCRYPT_COST", "3")]), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn rejects_zero_pool_size() {
        let mut settings = Settings::default();
        settings.database.max_connections = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn socket_addr_requires_ip_host() {
        let mut server = ServerSettings::default();
        assert_eq!(server.socket_addr().unwrap().to_string(), "0.0.0.0:3000");
        server.host = "not-an-ip".into();
        assert!(server.socket_addr().is_err());
    }
}
