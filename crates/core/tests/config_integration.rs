//! msgparse.toml 통합 설정 테스트
//!
//! - msgparse.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use msgparse_core::config::{MsgparseConfig, TzOffset};
use msgparse_core::error::{ConfigError, MsgparseError};

// =============================================================================
// msgparse.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../msgparse.toml.example");
    let config = MsgparseConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.engine.catalog_path, "/etc/msgparse/catalog.yml");
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../msgparse.toml.example");
    let config = MsgparseConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_code_defaults() {
    let content = include_str!("../../../msgparse.toml.example");
    let example = MsgparseConfig::parse(content).expect("should parse");
    let defaults = MsgparseConfig::default();

    assert_eq!(example.general.log_level, defaults.general.log_level);
    assert_eq!(example.engine.tz_offset, defaults.engine.tz_offset);
    assert_eq!(example.engine.strip_priority, defaults.engine.strip_priority);
    assert_eq!(example.engine.keep_raw, defaults.engine.keep_raw);
    assert_eq!(example.engine.raw_field, defaults.engine.raw_field);
    assert_eq!(
        example.engine.message_id_field,
        defaults.engine.message_id_field
    );
    assert_eq!(example.engine.payload_field, defaults.engine.payload_field);
    assert_eq!(example.engine.max_line_bytes, defaults.engine.max_line_bytes);
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn partial_config_general_only() {
    let toml = r#"
[general]
log_level = "debug"
log_format = "pretty"
"#;
    let config = MsgparseConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.engine.message_id_field, "messageid");
}

#[test]
fn partial_config_engine_only() {
    let toml = r#"
[engine]
tz_offset = "-05:00"
strip_priority = false
"#;
    let config = MsgparseConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(
        TzOffset::parse(&config.engine.tz_offset),
        Some(TzOffset::Fixed(-5 * 3600))
    );
    assert!(!config.engine.strip_priority);
    assert_eq!(config.general.log_level, "info");
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[general]
log_level = "info"
"#;

    let original = std::env::var("MSGPARSE_GENERAL_LOG_LEVEL").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("MSGPARSE_GENERAL_LOG_LEVEL", "error");
    }

    let mut config = MsgparseConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.general.log_level.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("MSGPARSE_GENERAL_LOG_LEVEL", val),
            None => std::env::remove_var("MSGPARSE_GENERAL_LOG_LEVEL"),
        }
    }

    assert_eq!(result, "error");
}

#[test]
#[serial_test::serial]
fn env_override_bool_field() {
    let original = std::env::var("MSGPARSE_ENGINE_KEEP_RAW").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("MSGPARSE_ENGINE_KEEP_RAW", "false");
    }

    let mut config = MsgparseConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.engine.keep_raw;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("MSGPARSE_ENGINE_KEEP_RAW", val),
            None => std::env::remove_var("MSGPARSE_ENGINE_KEEP_RAW"),
        }
    }

    assert!(!result);
}

#[test]
#[serial_test::serial]
fn env_override_numeric_field() {
    let original = std::env::var("MSGPARSE_ENGINE_MAX_LINE_BYTES").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("MSGPARSE_ENGINE_MAX_LINE_BYTES", "8192");
    }

    let mut config = MsgparseConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.engine.max_line_bytes;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("MSGPARSE_ENGINE_MAX_LINE_BYTES", val),
            None => std::env::remove_var("MSGPARSE_ENGINE_MAX_LINE_BYTES"),
        }
    }

    assert_eq!(result, 8192);
}

#[test]
#[serial_test::serial]
fn env_override_missing_var_keeps_toml_value() {
    let toml = r#"
[engine]
tz_offset = "+01:00"
"#;

    // SAFETY: 존재하지 않는 변수를 명시적으로 제거
    unsafe {
        std::env::remove_var("MSGPARSE_ENGINE_TZ_OFFSET");
    }

    let mut config = MsgparseConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();

    assert_eq!(config.engine.tz_offset, "+01:00");
}

// =============================================================================
// 빈 파일 / 잘못된 형식 에러 테스트
// =============================================================================

#[test]
fn empty_string_parses_with_defaults() {
    let config = MsgparseConfig::parse("").expect("empty string should parse");
    config.validate().expect("should validate");
    assert_eq!(config.general.log_level, "info");
}

#[test]
fn comments_only_parses_with_defaults() {
    let toml = r#"
# 주석만 있는 파일
# 모든 줄이 주석입니다
"#;
    let config = MsgparseConfig::parse(toml).expect("comments-only should parse");
    config.validate().expect("should validate");
}

#[test]
fn malformed_toml_returns_parse_error() {
    let err = MsgparseConfig::parse("[invalid toml").unwrap_err();
    assert!(matches!(
        err,
        MsgparseError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn invalid_type_returns_parse_error() {
    let toml = r#"
[engine]
keep_raw = "not_a_bool"
"#;
    assert!(MsgparseConfig::parse(toml).is_err());
}

#[test]
fn invalid_value_fails_validation_not_parse() {
    let toml = r#"
[engine]
max_line_bytes = 0
"#;
    let config = MsgparseConfig::parse(toml).expect("should parse");
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        MsgparseError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[tokio::test]
async fn load_from_disk_applies_validation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("msgparse.toml");
    tokio::fs::write(&path, "[engine]\ntz_offset = \"bogus\"\n")
        .await
        .expect("write");

    let err = MsgparseConfig::from_file(&path).await.unwrap_err();
    assert!(err.to_string().contains("tz_offset"));
}
