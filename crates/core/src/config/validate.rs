use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - remote.base_url is a non-empty http(s) URL
/// - transport and auth timeouts are non-zero
/// - retry multiplier is finite and at least 1.0
/// - search.per_page and runtime.worker_threads are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let base_url = config.remote.base_url.trim();
    if base_url.is_empty() {
        return Err(invalid("remote.base_url cannot be empty"));
    }
    match reqwest::Url::parse(base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => {
            return Err(invalid(&format!(
                "remote.base_url has unsupported scheme '{}'",
                url.scheme()
            )))
        }
        Err(e) => return Err(invalid(&format!("remote.base_url is invalid: {}", e))),
    }

    for (name, value) in [
        ("remote.connect_timeout_secs", config.remote.connect_timeout_secs),
        ("remote.read_timeout_secs", config.remote.read_timeout_secs),
        ("remote.write_timeout_secs", config.remote.write_timeout_secs),
        ("auth.primary_timeout_secs", config.auth.primary_timeout_secs),
        ("auth.fallback_timeout_secs", config.auth.fallback_timeout_secs),
        ("search.timeout_ms", config.search.timeout_ms),
    ] {
        if value == 0 {
            return Err(invalid(&format!("{} cannot be 0", name)));
        }
    }

    let multiplier = config.retry.multiplier;
    if !multiplier.is_finite() || multiplier < 1.0 {
        return Err(invalid("retry.multiplier must be a finite number of at least 1.0"));
    }

    if config.search.per_page == 0 {
        return Err(invalid("search.per_page cannot be 0"));
    }

    if config.runtime.worker_threads == 0 {
        return Err(invalid("runtime.worker_threads cannot be 0"));
    }

    Ok(())
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::ValidationError(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn base() -> Config {
        load_config_from_str(
            r#"
[remote]
base_url = "https://recipes.example.com/api/"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&base()).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = base();
        config.remote.base_url = "   ".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));

        config.remote.base_url = "not a url".to_string();
        assert!(validate_config(&config).is_err());

        config.remote.base_url = "ftp://recipes.example.com".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = base();
        config.remote.read_timeout_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("remote.read_timeout_secs"));
    }

    #[test]
    fn test_validate_rejects_shrinking_multiplier() {
        let mut config = base();
        config.retry.multiplier = 0.5;
        assert!(validate_config(&config).is_err());

        config.retry.multiplier = f64::NAN;
        assert!(validate_config(&config).is_err());

        config.retry.multiplier = 1.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_rejects_infinite_multiplier() {
        let config = load_config_from_str(
            r#"
[remote]
base_url = "https://recipes.example.com/api/"

[retry]
multiplier = inf
"#,
        )
        .unwrap();
        assert!(config.retry.multiplier.is_infinite());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let mut config = base();
        config.search.per_page = 0;
        assert!(validate_config(&config).is_err());

        let mut config = base();
        config.runtime.worker_threads = 0;
        assert!(validate_config(&config).is_err());
    }
}
