//! 설정 관리 -- msgparse.toml 파싱 및 런타임 설정
//!
//! [`MsgparseConfig`]는 모든 섹션의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`MSGPARSE_ENGINE_TZ_OFFSET=+09:00` 형식)
//! 3. 설정 파일 (`msgparse.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), msgparse_core::error::MsgparseError> {
//! use msgparse_core::config::MsgparseConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = MsgparseConfig::load("msgparse.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = MsgparseConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, MsgparseError};

/// 라인 최대 크기 상한 (바이트)
const MAX_LINE_BYTES_LIMIT: usize = 16 * 1024 * 1024;

/// msgparse 통합 설정
///
/// `msgparse.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MsgparseConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 매칭 엔진 설정
    #[serde(default)]
    pub engine: EngineSection,
}

impl MsgparseConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, MsgparseError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, MsgparseError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MsgparseError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                MsgparseError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, MsgparseError> {
        toml::from_str(toml_str).map_err(|e| {
            MsgparseError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `MSGPARSE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "MSGPARSE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "MSGPARSE_GENERAL_LOG_FORMAT");

        // Engine
        override_string(
            &mut self.engine.catalog_path,
            "MSGPARSE_ENGINE_CATALOG_PATH",
        );
        override_string(&mut self.engine.tz_offset, "MSGPARSE_ENGINE_TZ_OFFSET");
        override_bool(
            &mut self.engine.strip_priority,
            "MSGPARSE_ENGINE_STRIP_PRIORITY",
        );
        override_bool(&mut self.engine.keep_raw, "MSGPARSE_ENGINE_KEEP_RAW");
        override_string(&mut self.engine.raw_field, "MSGPARSE_ENGINE_RAW_FIELD");
        override_string(
            &mut self.engine.message_id_field,
            "MSGPARSE_ENGINE_MESSAGE_ID_FIELD",
        );
        override_string(
            &mut self.engine.payload_field,
            "MSGPARSE_ENGINE_PAYLOAD_FIELD",
        );
        override_usize(
            &mut self.engine.max_line_bytes,
            "MSGPARSE_ENGINE_MAX_LINE_BYTES",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), MsgparseError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        self.engine.validate()
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 매칭 엔진 설정 섹션
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// 카탈로그 YAML 파일 경로
    pub catalog_path: String,
    /// 날짜 파싱 기본 타임존 (`local` 또는 `+HH:MM`)
    pub tz_offset: String,
    /// 선행 syslog `<PRI>` 제거 여부
    pub strip_priority: bool,
    /// 원본 라인을 레코드에 보존할지 여부
    pub keep_raw: bool,
    /// 원본 라인을 저장할 필드명
    pub raw_field: String,
    /// 헤더가 추출하는 메시지 ID 필드명
    pub message_id_field: String,
    /// 헤더가 추출하는 페이로드 필드명
    pub payload_field: String,
    /// 라인 최대 크기 (바이트)
    pub max_line_bytes: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            catalog_path: "/etc/msgparse/catalog.yml".to_owned(),
            tz_offset: "local".to_owned(),
            strip_priority: true,
            keep_raw: true,
            raw_field: "event.original".to_owned(),
            message_id_field: "messageid".to_owned(),
            payload_field: "payload".to_owned(),
            max_line_bytes: 64 * 1024,
        }
    }
}

impl EngineSection {
    /// 엔진 섹션의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), MsgparseError> {
        if TzOffset::parse(&self.tz_offset).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "engine.tz_offset".to_owned(),
                reason: format!("'{}' must be 'local' or of the form +HH:MM", self.tz_offset),
            }
            .into());
        }

        for (field, value) in [
            ("engine.message_id_field", &self.message_id_field),
            ("engine.payload_field", &self.payload_field),
        ] {
            if value.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "must not be empty".to_owned(),
                }
                .into());
            }
        }

        if self.keep_raw && self.raw_field.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "engine.raw_field".to_owned(),
                reason: "must not be empty when keep_raw is enabled".to_owned(),
            }
            .into());
        }

        if self.max_line_bytes == 0 || self.max_line_bytes > MAX_LINE_BYTES_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "engine.max_line_bytes".to_owned(),
                reason: format!("must be 1-{MAX_LINE_BYTES_LIMIT}"),
            }
            .into());
        }

        Ok(())
    }
}

/// 날짜 파싱에 사용할 타임존 오프셋
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TzOffset {
    /// 프로세스 로컬 타임존
    Local,
    /// UTC 기준 고정 오프셋 (초, 동쪽이 양수)
    Fixed(i32),
}

impl TzOffset {
    /// `local`, `Z`, `+HH:MM`, `+HHMM`, `+HH` 형식을 파싱합니다.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "local" => return Some(Self::Local),
            "Z" | "UTC" => return Some(Self::Fixed(0)),
            _ => {}
        }

        let (sign, rest) = match value.as_bytes().first()? {
            b'+' => (1, &value[1..]),
            b'-' => (-1, &value[1..]),
            _ => return None,
        };

        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if rest.len() - digits.len() > 1 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let (hours, minutes) = match digits.len() {
            2 => (digits.parse::<i32>().ok()?, 0),
            4 => (
                digits[..2].parse::<i32>().ok()?,
                digits[2..].parse::<i32>().ok()?,
            ),
            _ => return None,
        };
        if hours > 23 || minutes > 59 {
            return None;
        }
        Some(Self::Fixed(sign * (hours * 3600 + minutes * 60)))
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}
