#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`pattern`]: `%{name}` / `%{name->}` 패턴 컴파일과 앵커 매칭
//! - [`matcher`]: 패턴과 조합기(Sequence, Alternative)를 담는 인터닝 아레나
//! - [`field`]: 라인 단위 필드 저장소
//! - [`action`]: 매칭 이후 필드를 파생하는 액션 체인
//! - [`function`]: `Invoke` 액션이 호출하는 외부 함수 레지스트리
//! - [`rule`]: 매처와 액션 체인의 묶음
//! - [`mapping`]: 추출 필드를 타입 있는 출력 필드로 옮기는 매핑 단계
//! - [`catalog`]: YAML 카탈로그 로딩, 컴파일, 린트
//! - [`dispatch`]: 헤더 -> 메시지 ID -> 메시지 규칙 디스패처와 핫 리로드 핸들
//! - [`syslog`]: `<PRI>` 제거와 facility/severity 분해
//! - [`config`]: 엔진 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! raw bytes -> PRI strip -> header Alternative -> msgid lookup -> message Alternative
//!                               |                                     |
//!                        header ActionChain                   message ActionChain
//!                               \______________ FieldStore ___________/
//!                                                   |
//!                                             FieldMapper
//!                                                   |
//!                                                 Record
//! ```

pub mod action;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod field;
pub mod function;
pub mod mapping;
pub mod matcher;
pub mod pattern;
pub mod rule;
pub mod syslog;

// --- 주요 타입 re-export ---

// 디스패처
pub use dispatch::{DispatchOutcome, Dispatcher, SharedDispatcher};

// 카탈로그
pub use catalog::{Catalog, CatalogBuilder, CatalogLoader, LintFinding};

// 매칭
pub use matcher::{Matcher, MatcherArena, MatcherId};
pub use pattern::{MatchOutcome, Pattern};
pub use rule::{Rule, RuleId};

// 액션
pub use action::{Action, ActionChain, ActionContext, ActionFailure, Arg};
pub use field::FieldStore;
pub use function::FunctionRegistry;

// 매핑
pub use mapping::{Conversion, FieldMapper, FieldMapping, MappingTarget, WritePolicy};

// 설정
pub use config::{EngineConfig, EngineConfigBuilder};

// 에러
pub use error::{CompileError, EngineError, FunctionError};
