use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::Settings;
use super::validation::validate_config;
use super::ConfigError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 2] = ["max_tokens", "tokens"];

/// Environment variables that take precedence over file configuration.
const ENV_OVERRIDES: [(&str, &[&str]); 5] = [
    ("OPENAI_API_KEY", &["llm", "api_key"]),
    ("QDRANT_URL", &["vector_store", "url"]),
    ("QDRANT_API_KEY", &["vector_store", "api_key"]),
    ("FLOWGUARD_ADMIN_API_KEY", &["admin", "api_key"]),
    ("PORT", &["server", "port"]),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("FLOWGUARD_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Merged raw configuration, secrets layered over the public file.
    pub fn load_config(&self) -> Value {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        deep_merge(&public_config, &secrets_config)
    }

    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        let mut config = self.load_config();
        apply_env_overrides(&mut config, |name| env::var(name).ok())?;
        settings_from_value(config)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

pub fn settings_from_value(config: Value) -> Result<Settings, ConfigError> {
    validate_config(&config)?;
    serde_json::from_value(config).map_err(|err| ConfigError::Invalid(err.to_string()))
}

fn apply_env_overrides<F>(config: &mut Value, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !config.is_object() {
        *config = Value::Object(Map::new());
    }

    for (name, path) in ENV_OVERRIDES {
        let Some(raw) = lookup(name).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let value = if name == "PORT" {
            let port = raw.trim().parse::<u16>().map_err(|_| {
                ConfigError::Invalid(format!("{} must be a valid port number", name))
            })?;
            Value::from(port)
        } else {
            Value::String(raw)
        };
        ensure_object_path(config, path, value);
    }
    Ok(())
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Ignoring unparsable config file {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(err) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), err);
            Value::Object(Map::new())
        }
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::settings::VectorBackend;
    use serde_json::json;

    #[test]
    fn deep_merge_layers_secrets_over_public_config() {
        let public_config = json!({
            "llm": { "model": "gpt-4o-mini", "api_key": null },
            "agent": { "max_retries": 3 }
        });
        let secrets = json!({ "llm": { "api_key": "sk-test" } });

        let merged = deep_merge(&public_config, &secrets);

        assert_eq!(
            merged,
            json!({
                "llm": { "model": "gpt-4o-mini", "api_key": "sk-test" },
                "agent": { "max_retries": 3 }
            })
        );
    }

    #[test]
    fn env_overrides_create_missing_sections() {
        let mut config = json!({ "server": { "host": "0.0.0.0" } });
        apply_env_overrides(&mut config, |name| match name {
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            "PORT" => Some("9100".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config["llm"]["api_key"], json!("sk-env"));
        assert_eq!(config["server"]["port"], json!(9100));
        assert_eq!(config["server"]["host"], json!("0.0.0.0"));
    }

    #[test]
    fn env_override_rejects_invalid_port() {
        let mut config = json!({});
        let result = apply_env_overrides(&mut config, |name| {
            (name == "PORT").then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn settings_fill_defaults_for_missing_fields() {
        let settings = settings_from_value(json!({
            "vector_store": { "backend": "memory" },
            "agent": { "retrieval_limit": 4 }
        }))
        .unwrap();

        assert_eq!(settings.vector_store.backend, VectorBackend::Memory);
        assert_eq!(settings.vector_store.collection, "kone_manuals");
        assert_eq!(settings.agent.retrieval_limit, 4);
        assert_eq!(settings.agent.max_retries, 3);
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert!(settings.llm.api_key.is_none());
    }

    #[test]
    fn load_settings_reads_yaml_and_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::from_dirs(
            dir.path().to_path_buf(),
            dir.path().to_path_buf(),
        ));
        fs::write(
            dir.path().join("config.yml"),
            "app:\n  environment: production\nagent:\n  max_retries: 2\n",
        )
        .unwrap();
        fs::write(dir.path().join("secrets.yaml"), "admin:\n  api_key: letmein\n").unwrap();

        let service = ConfigService::new(paths);
        let settings = settings_from_value(service.load_config()).unwrap();

        assert_eq!(settings.app.environment, "production");
        assert_eq!(settings.agent.max_retries, 2);
        assert_eq!(settings.admin.api_key.as_deref(), Some("letmein"));
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "llm": { "api_key": "sk-live", "model": "gpt-4o-mini" },
            "admin": { "api_key": null },
            "items": [{ "password": "pw" }]
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "llm": { "api_key": "****", "model": "gpt-4o-mini" },
                "admin": { "api_key": null },
                "items": [{ "password": "****" }]
            })
        );
    }
}
