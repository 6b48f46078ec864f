//! Tests for configuration file loading.

use super::*;
use serial_test::serial;
use std::env;
use std::fs;

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = env::temp_dir().join(name);
    fs::write(&path, contents).expect("Failed to write test config");
    path
}

/// Removes the variable on creation and on drop.
struct EnvGuard(&'static str);

impl EnvGuard {
    fn new(name: &'static str) -> Self {
        env::remove_var(name);
        EnvGuard(name)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        env::remove_var(self.0);
    }
}

// ===== Paths =====

#[test]
fn default_config_path_contains_jlv_config_toml() {
    let path = default_config_path().expect("Should have default path");
    let path_str = path.to_string_lossy();
    assert!(
        path_str.contains("jlv") && path_str.ends_with("config.toml"),
        "Path should contain 'jlv' and end with 'config.toml', got: {}",
        path_str
    );
}

#[test]
fn default_log_path_ends_with_jlv_log() {
    let path = default_log_path();
    assert!(
        path.to_string_lossy().ends_with("jlv.log"),
        "Default log path should end with 'jlv.log', got: {:?}",
        path
    );
}

// ===== File loading =====

#[test]
fn load_config_file_returns_ok_none_for_missing_file() {
    let result = load_config_file("/nonexistent/path/to/config.toml");
    assert_eq!(result, Ok(None));
}

#[test]
fn load_config_file_parses_valid_toml() {
    let path = write_temp(
        "jlv_test_config.toml",
        r#"
chunk_size = 250
show_kernel_messages = true
priority_ceiling = 4
start_at_tail = true
log_file_path = "/tmp/jlv-test.log"
"#,
    );

    let config = load_config_file(&path)
        .expect("Should parse valid TOML")
        .expect("File exists");
    assert_eq!(config.chunk_size, Some(250));
    assert_eq!(config.show_kernel_messages, Some(true));
    assert_eq!(config.priority_ceiling, Some(4));
    assert_eq!(config.start_at_tail, Some(true));
    assert_eq!(config.log_file_path, Some(PathBuf::from("/tmp/jlv-test.log")));

    fs::remove_file(path).ok();
}

#[test]
fn load_config_file_returns_error_for_invalid_toml() {
    let path = write_temp("jlv_test_invalid.toml", "chunk_size = [unclosed");
    let result = load_config_file(&path);
    assert!(
        matches!(result, Err(ConfigError::ParseError { .. })),
        "got {:?}",
        result
    );
    fs::remove_file(path).ok();
}

#[test]
fn config_file_rejects_unknown_fields() {
    let result: Result<ConfigFile, _> = toml::from_str("theme = \"dark\"");
    assert!(result.is_err(), "deny_unknown_fields should reject 'theme'");
}

#[test]
fn out_of_range_priority_is_rejected() {
    let path = write_temp("jlv_test_bad_priority.toml", "priority_ceiling = 9");
    let result = load_config_file(&path);
    assert!(
        matches!(
            result,
            Err(ConfigError::InvalidValue {
                key: "priority_ceiling",
                ..
            })
        ),
        "got {:?}",
        result
    );
    fs::remove_file(path).ok();
}

#[test]
fn zero_chunk_size_is_rejected() {
    let path = write_temp("jlv_test_zero_chunk.toml", "chunk_size = 0");
    let result = load_config_file(&path);
    assert!(matches!(
        result,
        Err(ConfigError::InvalidValue {
            key: "chunk_size",
            ..
        })
    ));
    fs::remove_file(path).ok();
}

// ===== Merging =====

#[test]
fn resolved_config_default_has_expected_values() {
    let config = ResolvedConfig::default();
    assert_eq!(config.chunk_size, 500);
    assert!(!config.show_kernel_messages);
    assert_eq!(config.priority_ceiling, None);
    assert!(!config.start_at_tail);
    assert!(!config.log_file_path.as_os_str().is_empty());
}

#[test]
fn merge_config_uses_defaults_when_none() {
    assert_eq!(merge_config(None), ResolvedConfig::default());
}

#[test]
fn merge_config_overrides_with_config_file_values() {
    let file = ConfigFile {
        chunk_size: Some(42),
        priority_ceiling: Some(3),
        start_at_tail: Some(true),
        ..ConfigFile::default()
    };
    let resolved = merge_config(Some(file));
    assert_eq!(resolved.chunk_size, 42);
    assert_eq!(resolved.priority_ceiling, Some(Priority::Error));
    assert!(resolved.start_at_tail);
    assert_eq!(resolved.log_file_path, default_log_path());
    assert!(!resolved.show_kernel_messages);
}

// ===== Environment =====

#[test]
#[serial(jlv_chunk_size)]
fn apply_env_overrides_respects_chunk_size() {
    let _guard = EnvGuard::new(CHUNK_SIZE_ENV);
    env::set_var(CHUNK_SIZE_ENV, "64");
    let result = apply_env_overrides(ResolvedConfig::default());
    assert_eq!(result.chunk_size, 64);
}

#[test]
#[serial(jlv_chunk_size)]
fn apply_env_overrides_ignores_invalid_chunk_size() {
    let _guard = EnvGuard::new(CHUNK_SIZE_ENV);
    for raw in ["0", "lots", "-3"] {
        env::set_var(CHUNK_SIZE_ENV, raw);
        let result = apply_env_overrides(ResolvedConfig::default());
        assert_eq!(result.chunk_size, DEFAULT_CHUNK_SIZE, "value {:?}", raw);
    }
}

#[test]
#[serial(jlv_chunk_size)]
fn apply_env_overrides_no_change_when_env_var_not_set() {
    let _guard = EnvGuard::new(CHUNK_SIZE_ENV);
    let base = ResolvedConfig::default();
    assert_eq!(apply_env_overrides(base.clone()), base);
}

#[test]
#[serial(jlv_config)]
fn load_config_with_precedence_prefers_explicit_path() {
    let _guard = EnvGuard::new(CONFIG_ENV);
    let explicit = write_temp("jlv_explicit.toml", "chunk_size = 11");
    let from_env = write_temp("jlv_env.toml", "chunk_size = 22");
    env::set_var(CONFIG_ENV, &from_env);

    let config = load_config_with_precedence(Some(explicit.clone()))
        .expect("valid")
        .expect("present");
    assert_eq!(config.chunk_size, Some(11));

    fs::remove_file(explicit).ok();
    fs::remove_file(from_env).ok();
}

#[test]
#[serial(jlv_config)]
fn load_config_with_precedence_uses_env_var_when_no_explicit_path() {
    let _guard = EnvGuard::new(CONFIG_ENV);
    let from_env = write_temp("jlv_env_only.toml", "start_at_tail = true");
    env::set_var(CONFIG_ENV, &from_env);

    let config = load_config_with_precedence(None)
        .expect("valid")
        .expect("present");
    assert_eq!(config.start_at_tail, Some(true));

    fs::remove_file(from_env).ok();
}

// ===== CLI =====

#[test]
fn apply_cli_overrides_replaces_only_given_values() {
    let base = ResolvedConfig {
        chunk_size: 10,
        show_kernel_messages: true,
        ..ResolvedConfig::default()
    };
    let result = apply_cli_overrides(
        base.clone(),
        CliOverrides {
            priority_ceiling: Some(Priority::Warning),
            start_at_tail: Some(true),
            ..CliOverrides::default()
        },
    );
    assert_eq!(result.chunk_size, 10);
    assert!(result.show_kernel_messages);
    assert_eq!(result.priority_ceiling, Some(Priority::Warning));
    assert!(result.start_at_tail);
    assert_eq!(apply_cli_overrides(base.clone(), CliOverrides::default()), base);
}

#[test]
#[serial(jlv_chunk_size)]
fn precedence_chain_file_env_cli() {
    let _guard = EnvGuard::new(CHUNK_SIZE_ENV);
    let file = ConfigFile {
        chunk_size: Some(100),
        show_kernel_messages: Some(true),
        ..ConfigFile::default()
    };
    env::set_var(CHUNK_SIZE_ENV, "200");

    let resolved = apply_env_overrides(merge_config(Some(file)));
    assert_eq!(resolved.chunk_size, 200, "env beats file");

    let resolved = apply_cli_overrides(
        resolved,
        CliOverrides {
            chunk_size: Some(300),
            ..CliOverrides::default()
        },
    );
    assert_eq!(resolved.chunk_size, 300, "cli beats env");
    assert!(resolved.show_kernel_messages, "file value survives");
}
