use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// `COOKBOOK_SEARCH__SMART_SEARCH_ENABLED=false` overrides
/// `search.smart_search_enabled`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("COOKBOOK_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[remote]
base_url = "http://localhost:5000/"

[search]
smart_search_enabled = false
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.remote.base_url, "http://localhost:5000/");
        assert!(!config.search.smart_search_enabled);
    }

    #[test]
    fn test_load_config_from_str_missing_remote() {
        let toml = r#"
[database]
path = "x.db"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config(Path::new("/nonexistent/cookbook.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[remote]
base_url = "http://127.0.0.1:5000/"

[retry]
max_retries = 5

[database]
path = "/data/recipes.db"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.database.path.to_str().unwrap(), "/data/recipes.db");
    }
}
