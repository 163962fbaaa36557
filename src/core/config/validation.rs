use serde_json::{Map, Value};

use super::ConfigError;

pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(app) = expect_optional_object(root, "app")? {
        validate_optional_string_field(app, "app.name", "name")?;
        validate_optional_string_field(app, "app.environment", "environment")?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_optional_string_field(llm, "llm.model", "model")?;
        validate_optional_string_field(llm, "llm.embedding_model", "embedding_model")?;
        validate_u64_field(
            llm,
            "llm.request_timeout_secs",
            "request_timeout_secs",
            1,
            3_600,
        )?;
    }

    if let Some(store) = expect_optional_object(root, "vector_store")? {
        validate_enum_field(store, "vector_store.backend", "backend", &["qdrant", "memory"])?;
        validate_optional_string_field(store, "vector_store.url", "url")?;
        validate_optional_string_field(store, "vector_store.api_key", "api_key")?;
        validate_optional_string_field(store, "vector_store.collection", "collection")?;
        validate_u64_field(store, "vector_store.dimension", "dimension", 1, 65_536)?;
    }

    if let Some(agent) = expect_optional_object(root, "agent")? {
        validate_u64_field(agent, "agent.retrieval_limit", "retrieval_limit", 1, 50)?;
        validate_u64_field(agent, "agent.max_retries", "max_retries", 0, 10)?;
        validate_u64_field(
            agent,
            "agent.run_timeout_secs",
            "run_timeout_secs",
            1,
            86_400,
        )?;
    }

    if let Some(admin) = expect_optional_object(root, "admin")? {
        validate_optional_string_field(admin, "admin.api_key", "api_key")?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ConfigError::Invalid(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    match section.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(config_type_error(path, "string")),
    }
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if allowed.contains(&text) {
        return Ok(());
    }
    Err(ConfigError::Invalid(format!(
        "Invalid config at '{}': expected one of {}",
        path,
        allowed.join(", ")
    )))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    if items.iter().all(Value::is_string) {
        return Ok(());
    }
    Err(config_type_error(path, "array of strings"))
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::Invalid(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
