//! Subcommand implementations.

use crate::cli::OutputFormat;
use crate::config::CliConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use strata_query::{compile_search, normalize, SearchQuery};
use tracing::debug;

/// `strata normalize`
pub fn normalize_request(input: Option<PathBuf>) -> Result<String> {
    let text = read_input(input.as_deref())?;
    let request: Value = serde_json::from_str(&text).context("Input is not valid JSON")?;
    let normalized = normalize(&request);
    serde_json::to_string_pretty(&normalized).context("Failed to serialize output")
}

/// `strata compile`
pub fn compile_request(
    config: &CliConfig,
    input: Option<PathBuf>,
    format: OutputFormat,
) -> Result<String> {
    let text = read_input(input.as_deref())?;
    let query: SearchQuery = text.parse().context("Failed to decode search request")?;
    let compiled = compile_search(&query, &config.compiler)
        .context("Failed to compile search request")?;
    debug!(related = compiled.compiled.has_related_conditions, "Compiled request");

    match format {
        OutputFormat::Cypher => Ok(compiled.statement),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&compiled).context("Failed to serialize output")
        }
    }
}

/// `strata config`
pub fn show_config(config: &CliConfig) -> Result<String> {
    config.to_toml()
}

/// Read the whole input file, or stdin for `None` / `-`.
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input: {}", path.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("request.json");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_compile_from_file() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, r#"{"where": {"name": "Jack"}, "labels": ["Person"]}"#);

        let output =
            compile_request(&CliConfig::default(), Some(path), OutputFormat::Cypher).unwrap();
        assert!(output.starts_with("MATCH (record:__RECORD__:`Person`)"));
    }

    #[test]
    fn test_compile_json_output() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, r#"{"where": {"COMPANY": {"name": "Acme"}}}"#);

        let output =
            compile_request(&CliConfig::default(), Some(path), OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["where"]["hasRelatedConditions"], Value::Bool(true));
        assert_eq!(value["where"]["pagination"], Value::String(String::new()));
    }

    #[test]
    fn test_compile_error_carries_cause() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, r#"{"where": {"age": {"$between": [1, 2]}}}"#);

        let err = compile_request(&CliConfig::default(), Some(path), OutputFormat::Cypher)
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to compile search request");
        assert!(format!("{err:#}").contains("Unknown operator `$between`"));
    }

    #[test]
    fn test_normalize_from_file() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, r#"{"where": {"$or": {"a": 1, "b": 2}}}"#);

        let output = normalize_request(Some(path)).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value, serde_json::json!({"where": {"$or": [{"a": 1}, {"b": 2}]}}));
    }

    #[test]
    fn test_missing_input_file() {
        let err = normalize_request(Some(PathBuf::from("/nonexistent/request.json"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read input"));
    }
}
