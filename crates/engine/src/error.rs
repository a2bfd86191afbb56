//! 엔진 에러 타입
//!
//! [`CompileError`]는 패턴/포맷/조합기 구성 단계의 에러이고,
//! [`EngineError`]는 카탈로그 로딩과 설정 단계의 에러입니다.
//! 두 에러 모두 로드 시점에만 발생하며, 라인 단위 처리 중에는 발생하지 않습니다.
//! `From<EngineError> for MsgparseError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use msgparse_core::error::{CatalogError, ConfigError, MsgparseError};

/// 패턴 및 포맷 컴파일 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// 빈 패턴
    #[error("empty pattern")]
    EmptyPattern,

    /// 닫히지 않은 `%{`
    #[error("unclosed capture starting at offset {offset}")]
    UnclosedCapture {
        /// `%{`의 바이트 오프셋
        offset: usize,
    },

    /// 한 패턴 안에서 같은 캡처 이름이 중복됨
    #[error("duplicate capture name '{name}'")]
    DuplicateCapture {
        /// 중복된 캡처 이름
        name: String,
    },

    /// 단계가 없는 Sequence
    #[error("sequence must have at least one step")]
    EmptySequence,

    /// 후보가 없는 Alternative
    #[error("alternative must have at least one candidate")]
    EmptyAlternative,

    /// 다른 아레나에서 만든 매처 ID
    #[error("unknown matcher id {0}")]
    UnknownMatcher(u32),

    /// 날짜 포맷 에러
    #[error("invalid date format '{format}': {reason}")]
    DateFormat {
        /// 포맷 문자열
        format: String,
        /// 실패 사유
        reason: String,
    },

    /// 기간(duration) 포맷 에러
    #[error("invalid duration format '{format}': {reason}")]
    DurationFormat {
        /// 포맷 문자열
        format: String,
        /// 실패 사유
        reason: String,
    },
}

/// 외부 함수 호출 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FunctionError {
    /// 등록되지 않은 함수
    #[error("unknown function '{0}'")]
    Unknown(String),

    /// 인자 개수 불일치
    #[error("expected {expected} argument(s), got {got}")]
    Arity {
        /// 기대한 인자 수
        expected: usize,
        /// 실제 인자 수
        got: usize,
    },

    /// 인자 값이 올바르지 않음
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 규칙/프래그먼트 컴파일 실패
    #[error("compile error in '{context}': {source}")]
    Compile {
        /// 문제가 된 규칙 ID 또는 프래그먼트 이름
        context: String,
        /// 원인
        source: CompileError,
    },

    /// 카탈로그 파일 로딩 실패
    #[error("catalog load error: {path}: {reason}")]
    CatalogLoad {
        /// 카탈로그 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 카탈로그 유효성 검증 실패
    #[error("catalog validation error: '{rule_id}': {reason}")]
    CatalogValidation {
        /// 문제가 된 규칙 ID
        rule_id: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 존재하지 않는 프래그먼트/액션 참조
    #[error("unknown {kind} reference '{name}'")]
    UnknownReference {
        /// 참조 종류 (fragment, action)
        kind: &'static str,
        /// 참조 이름
        name: String,
    },

    /// 순환 참조
    #[error("cyclic {kind} reference through '{name}'")]
    CyclicReference {
        /// 참조 종류 (fragment, action)
        kind: &'static str,
        /// 순환에 포함된 이름
        name: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// 컴파일 에러에 규칙/프래그먼트 문맥을 붙입니다.
    pub fn compile(context: impl Into<String>, source: CompileError) -> Self {
        Self::Compile {
            context: context.into(),
            source,
        }
    }
}

impl From<EngineError> for MsgparseError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Compile { .. } => {
                MsgparseError::Catalog(CatalogError::Compile(err.to_string()))
            }
            EngineError::CatalogLoad { path, reason } => {
                MsgparseError::Catalog(CatalogError::Load { path, reason })
            }
            EngineError::CatalogValidation { rule_id, reason } => {
                MsgparseError::Catalog(CatalogError::Invalid { rule_id, reason })
            }
            EngineError::UnknownReference { ref name, .. }
            | EngineError::CyclicReference { ref name, .. } => {
                let rule_id = name.clone();
                MsgparseError::Catalog(CatalogError::Invalid {
                    rule_id,
                    reason: err.to_string(),
                })
            }
            EngineError::Config { field, reason } => {
                MsgparseError::Config(ConfigError::InvalidValue { field, reason })
            }
            EngineError::Io(e) => MsgparseError::Io(e),
        }
    }
}
