//! 엔진 설정
//!
//! [`EngineConfig`]는 core의 [`EngineSection`](msgparse_core::config::EngineSection)을
//! 기반으로 디스패처가 라인마다 참조하는 해석된 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use msgparse_core::config::MsgparseConfig;
//! use msgparse_engine::config::EngineConfig;
//!
//! let core_config = MsgparseConfig::default();
//! let config = EngineConfig::from_core(&core_config.engine)?;
//! ```

use msgparse_core::config::{EngineSection, TzOffset};

use crate::error::EngineError;

/// 라인 최대 크기 상한
const MAX_LINE_BYTES_LIMIT: usize = 16 * 1024 * 1024;

/// 디스패처 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// 날짜 파싱 기본 타임존
    pub tz: TzOffset,
    /// 선행 `<PRI>` 제거 여부
    pub strip_priority: bool,
    /// 원본 라인 보존 여부
    pub keep_raw: bool,
    /// 원본 라인을 저장할 필드명
    pub raw_field: String,
    /// 메시지 ID 필드명
    pub message_id_field: String,
    /// 페이로드 필드명
    pub payload_field: String,
    /// 라인 최대 크기 (바이트)
    pub max_line_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tz: TzOffset::Local,
            strip_priority: true,
            keep_raw: true,
            raw_field: "event.original".to_owned(),
            message_id_field: "messageid".to_owned(),
            payload_field: "payload".to_owned(),
            max_line_bytes: 64 * 1024,
        }
    }
}

impl EngineConfig {
    /// core의 `EngineSection`에서 엔진 설정을 생성합니다.
    ///
    /// # Errors
    /// 타임존 오프셋을 해석할 수 없거나 검증에 실패한 경우
    pub fn from_core(core: &EngineSection) -> Result<Self, EngineError> {
        let tz = TzOffset::parse(&core.tz_offset).ok_or_else(|| EngineError::Config {
            field: "tz_offset".to_owned(),
            reason: format!("'{}' must be 'local' or of the form +HH:MM", core.tz_offset),
        })?;

        let config = Self {
            tz,
            strip_priority: core.strip_priority,
            keep_raw: core.keep_raw,
            raw_field: core.raw_field.clone(),
            message_id_field: core.message_id_field.clone(),
            payload_field: core.payload_field.clone(),
            max_line_bytes: core.max_line_bytes,
        };
        config.validate()?;
        Ok(config)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.message_id_field.is_empty() {
            return Err(EngineError::Config {
                field: "message_id_field".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.payload_field.is_empty() {
            return Err(EngineError::Config {
                field: "payload_field".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.keep_raw && self.raw_field.is_empty() {
            return Err(EngineError::Config {
                field: "raw_field".to_owned(),
                reason: "must not be empty when keep_raw is enabled".to_owned(),
            });
        }

        if self.max_line_bytes == 0 || self.max_line_bytes > MAX_LINE_BYTES_LIMIT {
            return Err(EngineError::Config {
                field: "max_line_bytes".to_owned(),
                reason: format!("must be 1-{MAX_LINE_BYTES_LIMIT}"),
            });
        }

        Ok(())
    }
}

/// 엔진 설정 빌더
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기본 타임존을 설정합니다.
    pub fn tz(mut self, tz: TzOffset) -> Self {
        self.config.tz = tz;
        self
    }

    /// `<PRI>` 제거 여부를 설정합니다.
    pub fn strip_priority(mut self, strip: bool) -> Self {
        self.config.strip_priority = strip;
        self
    }

    /// 원본 라인 보존 여부를 설정합니다.
    pub fn keep_raw(mut self, keep: bool) -> Self {
        self.config.keep_raw = keep;
        self
    }

    /// 원본 라인 필드명을 설정합니다.
    pub fn raw_field(mut self, field: impl Into<String>) -> Self {
        self.config.raw_field = field.into();
        self
    }

    /// 메시지 ID 필드명을 설정합니다.
    pub fn message_id_field(mut self, field: impl Into<String>) -> Self {
        self.config.message_id_field = field.into();
        self
    }

    /// 페이로드 필드명을 설정합니다.
    pub fn payload_field(mut self, field: impl Into<String>) -> Self {
        self.config.payload_field = field.into();
        self
    }

    /// 라인 최대 크기를 설정합니다.
    pub fn max_line_bytes(mut self, bytes: usize) -> Self {
        self.config.max_line_bytes = bytes;
        self
    }

    /// 설정을 검증하고 `EngineConfig`를 생성합니다.
    pub fn build(self) -> Result<EngineConfig, EngineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
