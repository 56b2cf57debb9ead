//! Application configuration loader.
//!
//! Reads `config.toml` from the data directory and deserializes it into
//! [`AppConfig`]. Falls back to defaults when the file is missing or
//! malformed -- a bad config file must never keep the webhook server from
//! starting.

use std::path::Path;

use relayguard_types::config::AppConfig;

/// Load application configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`AppConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_app_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_app_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_app_config(tmp.path()).await;
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn load_app_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
fallback_reply = "Sorry, try again later."

[detector]
min_message_interval_secs = 3.5
duplicate_window_secs = 120

[webhook]
url = "https://bot.example.com/webhook"
secret_token = "shared-secret"

[signatures]
fragments = ["Acme Support"]
openers = ["Hi there!"]
"#,
        )
        .await
        .unwrap();

        let config = load_app_config(tmp.path()).await;
        assert_eq!(config.detector.min_message_interval_secs, 3.5);
        assert_eq!(config.detector.duplicate_window_secs, 120);
        // Unset detector field keeps its default
        assert_eq!(config.detector.max_tracked_messages, 50);
        assert_eq!(config.webhook.url.as_deref(), Some("https://bot.example.com/webhook"));
        assert_eq!(config.webhook.secret_token.as_deref(), Some("shared-secret"));
        assert_eq!(config.signatures.fragments, vec!["Acme Support"]);
        assert_eq!(config.fallback_reply, "Sorry, try again later.");
    }

    #[tokio::test]
    async fn load_app_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_app_config(tmp.path()).await;
        assert_eq!(config, AppConfig::default());
    }
}
