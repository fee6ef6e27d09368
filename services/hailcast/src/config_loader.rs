//! Configuration loader for the hailcast pipeline.
//!
//! Reads a YAML `ModelerConfig`, substituting `${VAR}` and `${VAR:-default}`
//! from the environment before parsing. Path and worker overrides
//! (`HAILCAST_MODEL_PATH`, `HAILCAST_PATCH_PATH`, `HAILCAST_WORKERS`) are
//! applied afterwards.

use anyhow::{Context, Result};
use patch_classifier::ModelerConfig;
use std::fs;
use std::path::Path;

/// Load, expand and validate a modeler configuration file.
pub fn load_config(path: &Path) -> Result<ModelerConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let expanded = expand_env_vars(&content)
        .with_context(|| format!("Failed to expand environment variables in {}", path.display()))?;

    let config = ModelerConfig::from_yaml(&expanded)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        .with_env_overrides();

    config
        .validate()
        .context("Configuration invalid after environment overrides")?;

    anyhow::ensure!(
        config.patch_path.exists(),
        "Patch path does not exist: {}",
        config.patch_path.display()
    );

    Ok(config)
}

/// Expand environment variables in configuration content
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            let mut depth = 1;

            while depth > 0 {
                match chars.next() {
                    Some('{') => {
                        depth += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        depth -= 1;
                        if depth > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve `VAR` or `VAR:-default`
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
model_path: ${HAILCAST_TEST_ROOT}/models
patch_path: ${HAILCAST_TEST_ROOT}
train:
  start: 2020-05-01
  end: 2020-05-31
num_examples: ${HAILCAST_TEST_EXAMPLES:-500}
class_percentage:
  0: 0.25
  1: 0.25
  2: 0.25
  3: 0.25
patch_size: 32
forecast_variables: [REFL_1000M, UP_HELI_MAX]
"#;

    #[test]
    fn test_expand_env_vars_simple() {
        std::env::set_var("HAILCAST_TEST_VAR", "test_value");
        let result = expand_env_vars("prefix_${HAILCAST_TEST_VAR}_suffix").unwrap();
        assert_eq!(result, "prefix_test_value_suffix");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        std::env::remove_var("HAILCAST_NONEXISTENT");
        let result = expand_env_vars("value_${HAILCAST_NONEXISTENT:-default}_end").unwrap();
        assert_eq!(result, "value_default_end");
    }

    #[test]
    fn test_expand_env_vars_missing_required() {
        std::env::remove_var("HAILCAST_REQUIRED");
        assert!(expand_env_vars("${HAILCAST_REQUIRED}").is_err());
        assert!(expand_env_vars("${HAILCAST_UNCLOSED").is_err());
    }

    #[test]
    fn test_resolve_var_expr_override_default() {
        std::env::set_var("HAILCAST_SET_VAR", "custom");
        assert_eq!(resolve_var_expr("HAILCAST_SET_VAR:-default").unwrap(), "custom");
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("HAILCAST_TEST_ROOT", dir.path());
        let path = dir.path().join("hailcast.yaml");
        fs::write(&path, CONFIG).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.num_examples, 500);
        assert_eq!(config.model_path, dir.path().join("models"));
        assert_eq!(config.forecast_variables.len(), 2);
        assert!(config.forecast.is_none());
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config(Path::new("/nonexistent/hailcast.yaml")).is_err());
    }
}
