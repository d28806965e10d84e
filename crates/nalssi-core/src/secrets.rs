//! Weather API key lookup.
//!
//! The key is bound once at startup from, in order: the `NALSSI_OWM_API_KEY`
//! environment variable, the system keyring, then the config file.

use crate::config::WeatherConfig;

pub const API_KEY_ENV: &str = "NALSSI_OWM_API_KEY";
pub const KEYRING_SERVICE: &str = "nalssi";
pub const KEYRING_USER: &str = "openweathermap";

/// Resolve the weather API key from all configured sources.
pub fn resolve_api_key(config: &WeatherConfig) -> Option<String> {
    let from_env = std::env::var(API_KEY_ENV).ok();
    pick_api_key(from_env, keyring_api_key, config)
}

/// Store the API key in the system keyring.
pub fn store_api_key(key: &str) -> keyring::Result<()> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
    entry.set_password(key)?;
    tracing::info!("Stored weather API key in system keyring");
    Ok(())
}

fn keyring_api_key() -> Option<String> {
    let entry = match keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!("Keyring unavailable: {}", e);
            return None;
        }
    };

    match entry.get_password() {
        Ok(key) => Some(key),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            tracing::warn!("Failed to read API key from keyring: {}", e);
            None
        }
    }
}

fn pick_api_key(
    from_env: Option<String>,
    from_keyring: impl FnOnce() -> Option<String>,
    config: &WeatherConfig,
) -> Option<String> {
    let non_empty = |s: String| {
        let trimmed = s.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    };

    if let Some(key) = from_env.and_then(non_empty) {
        tracing::debug!("Using weather API key from {}", API_KEY_ENV);
        return Some(key);
    }
    if let Some(key) = from_keyring().and_then(non_empty) {
        tracing::debug!("Using weather API key from keyring");
        return Some(key);
    }
    config.api_key.clone().and_then(non_empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(key: Option<&str>) -> WeatherConfig {
        WeatherConfig {
            api_key: key.map(str::to_string),
            ..WeatherConfig::default()
        }
    }

    #[test]
    fn test_env_wins_over_everything() {
        let config = config_with_key(Some("from-file"));
        let key = pick_api_key(Some("from-env".into()), || Some("from-keyring".into()), &config);
        assert_eq!(key.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_keyring_used_when_env_missing() {
        let config = config_with_key(Some("from-file"));
        let key = pick_api_key(None, || Some("from-keyring".into()), &config);
        assert_eq!(key.as_deref(), Some("from-keyring"));
    }

    #[test]
    fn test_blank_values_are_skipped() {
        let config = config_with_key(Some("from-file"));
        let key = pick_api_key(Some("   ".into()), || Some(String::new()), &config);
        assert_eq!(key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_no_key_anywhere() {
        let config = config_with_key(None);
        assert!(pick_api_key(None, || None, &config).is_none());
    }
}
