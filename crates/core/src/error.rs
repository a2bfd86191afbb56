//! 에러 타입 -- 도메인별 에러 정의
//!
//! 런타임 라인 단위 결과(헤더 불일치, 미등록 메시지 ID 등)는 에러가 아니라
//! [`ParseStatus`](crate::types::ParseStatus)로 표현됩니다.
//! 이 모듈의 에러는 모두 로드 시점(설정, 카탈로그) 에러입니다.

/// msgparse 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum MsgparseError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 카탈로그 로딩/컴파일 에러
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 카탈로그 에러
///
/// 엔진 크레이트의 세부 에러를 문자열로 감싸 상위 레이어로 전달합니다.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// 패턴/포맷 컴파일 실패
    #[error("compile failed: {0}")]
    Compile(String),

    /// 카탈로그 파일 로딩 실패
    #[error("load failed: {path}: {reason}")]
    Load { path: String, reason: String },

    /// 카탈로그 유효성 검증 실패
    #[error("invalid rule '{rule_id}': {reason}")]
    Invalid { rule_id: String, reason: String },
}
