use std::{collections::HashMap, fs, path::Path, time::Duration};

use tracing::warn;

use crate::account::RefreshPolicy;

pub const SETTINGS_FILE: &str = "studio.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub request_timeout_secs: Option<u64>,
    pub account_max_age_secs: Option<u64>,
    pub email: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".into(),
            request_timeout_secs: None,
            account_max_age_secs: None,
            email: None,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        match self.account_max_age_secs {
            Some(0) => RefreshPolicy::Manual,
            Some(secs) => RefreshPolicy::MaxAge(Duration::from_secs(secs)),
            None => RefreshPolicy::OnMount,
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, env);
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!("config: ignoring unreadable {SETTINGS_FILE} error={err}");
            return;
        }
    };

    if let Some(v) = file_cfg.get("api_base_url").and_then(toml::Value::as_str) {
        settings.api_base_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("email").and_then(toml::Value::as_str) {
        settings.email = Some(v.to_string());
    }
    if let Some(v) = file_cfg.get("request_timeout_secs") {
        settings.request_timeout_secs = seconds(v);
    }
    if let Some(v) = file_cfg.get("account_max_age_secs") {
        settings.account_max_age_secs = seconds(v);
    }
}

fn seconds(value: &toml::Value) -> Option<u64> {
    match value {
        toml::Value::Integer(v) => u64::try_from(*v).ok(),
        toml::Value::String(v) => v.trim().parse().ok(),
        _ => None,
    }
}

fn apply_env(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("STUDIO_API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = env("STUDIO_EMAIL") {
        settings.email = Some(v);
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = Some(parsed),
            Err(_) => warn!("config: ignoring APP__REQUEST_TIMEOUT_SECS={v}"),
        }
    }

    if let Some(v) = env("APP__ACCOUNT_MAX_AGE_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.account_max_age_secs = Some(parsed),
            Err(_) => warn!("config: ignoring APP__ACCOUNT_MAX_AGE_SECS={v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let settings = load_settings_from(Path::new("./does-not-exist/studio.toml"), no_env);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.refresh_policy(), RefreshPolicy::OnMount);
        assert_eq!(settings.request_timeout(), None);
    }

    #[test]
    fn file_values_are_overridden_by_env() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("studio_settings_test_{suffix}.toml"));
        fs::write(
            &path,
            concat!(
                "api_base_url = \"https://api.example.com\"\n",
                "request_timeout_secs = 30\n",
                "account_max_age_secs = \"120\"\n",
            ),
        )
        .expect("write settings");

        let settings = load_settings_from(&path, |key| match key {
            "APP__API_BASE_URL" => Some("https://staging.example.com".to_string()),
            "STUDIO_EMAIL" => Some("creator@example.com".to_string()),
            _ => None,
        });

        assert_eq!(settings.api_base_url, "https://staging.example.com");
        assert_eq!(settings.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            settings.refresh_policy(),
            RefreshPolicy::MaxAge(Duration::from_secs(120))
        );
        assert_eq!(settings.email.as_deref(), Some("creator@example.com"));

        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn unreadable_file_keeps_defaults() {
        let mut settings = Settings::default();
        apply_file(&mut settings, "api_base_url = [");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn zero_max_age_means_manual_refresh() {
        let mut settings = Settings::default();
        apply_env(&mut settings, |key| {
            (key == "APP__ACCOUNT_MAX_AGE_SECS").then(|| "0".to_string())
        });
        assert_eq!(settings.refresh_policy(), RefreshPolicy::Manual);
    }
}
