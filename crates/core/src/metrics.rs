//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않은 경우 호출은 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `msgparse_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(msgparse_core::metrics::LINES_TOTAL, "status" => "parsed").increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 파싱 상태 레이블 키 (parsed, no_header_match, ...)
pub const LABEL_STATUS: &str = "status";

/// 카탈로그 이름 레이블 키
pub const LABEL_CATALOG: &str = "catalog";

// ─── 엔진 메트릭 ────────────────────────────────────────────────────

/// 처리된 라인 수 (counter, label: status)
pub const LINES_TOTAL: &str = "msgparse_lines_total";

/// 실패한 액션 수 (counter)
pub const ACTION_FAILURES_TOTAL: &str = "msgparse_action_failures_total";

/// 변환에 실패해 건너뛴 필드 매핑 수 (counter)
pub const MAPPING_FAILURES_TOTAL: &str = "msgparse_mapping_failures_total";

/// 로드된 규칙 수 (gauge, label: catalog)
pub const RULES_LOADED: &str = "msgparse_rules_loaded";

/// 카탈로그 스냅샷 교체 횟수 (counter)
pub const CATALOG_RELOADS_TOTAL: &str = "msgparse_catalog_reloads_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        LINES_TOTAL,
        "Total number of raw lines dispatched, by parse status"
    );
    describe_counter!(
        ACTION_FAILURES_TOTAL,
        "Total number of post-match actions that left their destination unset"
    );
    describe_counter!(
        MAPPING_FAILURES_TOTAL,
        "Total number of field mappings skipped because the value did not convert"
    );
    describe_gauge!(RULES_LOADED, "Number of rules in the active catalog");
    describe_counter!(
        CATALOG_RELOADS_TOTAL,
        "Total number of catalog snapshot swaps"
    );
}
