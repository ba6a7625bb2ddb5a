use serde_json::{Map, Value};
use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 1, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(logging) = expect_optional_object(root, "logging")? {
        validate_enum_field(
            logging,
            "logging.level",
            "level",
            &["trace", "debug", "info", "warn", "error"],
        )?;
        validate_optional_string_field(logging, "logging.file_name", "file_name")?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_enum_field(llm, "llm.backend", "backend", &["auto", "remote", "local"])?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 86_400)?;

        if let Some(remote) = expect_optional_object(llm, "remote")? {
            validate_optional_string_field(remote, "llm.remote.api_base", "api_base")?;
            validate_optional_string_field(remote, "llm.remote.api_key", "api_key")?;
            validate_optional_string_field(remote, "llm.remote.model", "model")?;
            validate_f64_field(remote, "llm.remote.temperature", "temperature", 0.0, 2.0)?;
        }

        if let Some(local) = expect_optional_object(llm, "local")? {
            validate_optional_string_field(local, "llm.local.base_url", "base_url")?;
            validate_optional_string_field(local, "llm.local.model_name", "model_name")?;
            validate_u64_field(local, "llm.local.max_new_tokens", "max_new_tokens", 1, 32_768)?;
            validate_f64_field(local, "llm.local.temperature", "temperature", 0.0, 2.0)?;
            validate_f64_field(local, "llm.local.top_p", "top_p", 0.0, 1.0)?;
            validate_f64_field(
                local,
                "llm.local.repeat_penalty",
                "repeat_penalty",
                0.0,
                10.0,
            )?;
        }
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_enum_field(embedding, "embedding.backend", "backend", &["hash", "remote"])?;
        validate_u64_field(embedding, "embedding.dimension", "dimension", 8, 16_384)?;
        validate_optional_string_field(embedding, "embedding.model", "model")?;
        validate_optional_string_field(embedding, "embedding.api_base", "api_base")?;
    }

    if let Some(store) = expect_optional_object(root, "vector_store")? {
        validate_enum_field(
            store,
            "vector_store.backend",
            "backend",
            &["sqlite", "chroma", "flat", "faiss"],
        )?;
        validate_enum_field(
            store,
            "vector_store.distance",
            "distance",
            &["cosine", "euclidean"],
        )?;
        validate_optional_string_field(store, "vector_store.dir", "dir")?;
    }

    if let Some(rag) = expect_optional_object(root, "rag")? {
        validate_u64_field(rag, "rag.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(rag, "rag.chunk_overlap", "chunk_overlap", 0, 1_000_000)?;
        validate_u64_field(rag, "rag.top_k", "top_k", 1, 1_000)?;
        validate_u64_field(
            rag,
            "rag.supplement_threshold",
            "supplement_threshold",
            0,
            1_000_000,
        )?;
        validate_u64_field(rag, "rag.supplement_results", "supplement_results", 0, 100)?;
        validate_u64_field(rag, "rag.excerpt_chars", "excerpt_chars", 1, 100_000)?;
        validate_u64_field(
            rag,
            "rag.request_timeout_secs",
            "request_timeout_secs",
            1,
            86_400,
        )?;
        validate_bool_field(rag, "rag.seed_on_startup", "seed_on_startup")?;
        validate_bool_field(rag, "rag.seed_web_search", "seed_web_search")?;

        let size = rag.get("chunk_size").and_then(Value::as_u64).unwrap_or(1000);
        let overlap = rag.get("chunk_overlap").and_then(Value::as_u64).unwrap_or(200);
        if overlap >= size {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at 'rag.chunk_overlap': must be smaller than rag.chunk_size ({})",
                size
            )));
        }
    }

    if let Some(search) = expect_optional_object(root, "search")? {
        validate_enum_field(search, "search.engine", "engine", &["baidu", "duckduckgo"])?;
        validate_u64_field(search, "search.max_results", "max_results", 1, 100)?;
        validate_u64_field(
            search,
            "search.per_query_results",
            "per_query_results",
            1,
            50,
        )?;
        validate_u64_field(search, "search.query_delay_ms", "query_delay_ms", 0, 60_000)?;
        validate_u64_field(search, "search.timeout_secs", "timeout_secs", 1, 600)?;
        validate_optional_string_field(search, "search.user_agent", "user_agent")?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    let normalized = text.trim().to_lowercase();
    if allowed.iter().any(|candidate| *candidate == normalized) {
        return Ok(());
    }
    Err(ApiError::BadRequest(format!(
        "Invalid config at '{}': unsupported value '{}' (expected one of: {})",
        path,
        text,
        allowed.join(", ")
    )))
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
