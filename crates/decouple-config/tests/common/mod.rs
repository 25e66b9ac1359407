// crates/decouple-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for decouple-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use decouple_config::ConfigError;
use decouple_config::IngressConfig;

/// Result type used by config tests.
pub type TestResult = Result<(), String>;

/// Minimal valid configuration text.
pub const MINIMAL_TOML: &str = r#"
[routing]
path = "/var/run/broker/targets.json"
"#;

/// Parses `toml_str` without validating it.
pub fn config_from_toml(toml_str: &str) -> Result<IngressConfig, String> {
    toml::from_str(toml_str).map_err(|err| err.to_string())
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<IngressConfig, String> {
    config_from_toml(MINIMAL_TOML)
}

/// Asserts `result` is an error whose message contains `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
