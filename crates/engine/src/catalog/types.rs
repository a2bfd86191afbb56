//! 카탈로그 정의 데이터 타입
//!
//! YAML 카탈로그 파일에서 역직렬화되는 구조체들을 정의합니다.
//! 각 매처/액션 객체는 정확히 하나의 종류 키를 가져야 합니다.
//!
//! # YAML 스키마
//! ```yaml
//! name: demo
//! fragments:
//!   addr: { alternative: [ { pattern: "%{saddr}:" }, { pattern: "%{saddr->} " } ] }
//! actions:
//!   theme: { set: { dest: ec_theme, value: TEV } }
//! headers:
//!   - id: "HEADER#0"
//!     match: { pattern: "%{messageid}: %{payload}" }
//! messages:
//!   "10":
//!     - id: "MESSAGE#0"
//!       match: { sequence: [ { pattern: "src=" }, { ref: addr } ] }
//!       actions:
//!         - ref: theme
//! mappings:
//!   time_field: event_time
//!   fields:
//!     saddr:
//!       convert: ip
//!       to: [ { field: source.ip }, { field: related.ip, setter: append } ]
//!     user:
//!       to: [ { field: user.name, setter: prio, prio: 1 } ]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// 규칙 ID 최대 길이
const MAX_RULE_ID_LEN: usize = 256;

/// 카탈로그 -- 하나의 YAML 파일에 대응합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogDef {
    /// 카탈로그 이름 (벤더/제품)
    pub name: String,
    /// 이름으로 참조되는 공유 매처
    #[serde(default)]
    pub fragments: BTreeMap<String, MatcherDef>,
    /// 이름으로 참조되는 공유 액션
    #[serde(default)]
    pub actions: BTreeMap<String, ActionDef>,
    /// 헤더 규칙 (선언 순서대로 시도)
    pub headers: Vec<RuleDef>,
    /// 메시지 ID별 메시지 규칙
    #[serde(default)]
    pub messages: BTreeMap<String, Vec<RuleDef>>,
    /// 출력 필드 매핑
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<MappingsDef>,
}

impl CatalogDef {
    /// 카탈로그 구조의 유효성을 검증합니다.
    ///
    /// 참조 해석과 패턴 컴파일은 로더가 수행합니다.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.name.is_empty() {
            return Err(EngineError::CatalogValidation {
                rule_id: "(catalog)".to_owned(),
                reason: "catalog name must not be empty".to_owned(),
            });
        }

        if self.headers.is_empty() {
            return Err(EngineError::CatalogValidation {
                rule_id: self.name.clone(),
                reason: "catalog must define at least one header rule".to_owned(),
            });
        }

        for rule in self
            .headers
            .iter()
            .chain(self.messages.values().flatten())
        {
            rule.validate()?;
        }

        if let Some(msgid) = self.messages.keys().find(|id| id.is_empty()) {
            return Err(EngineError::CatalogValidation {
                rule_id: msgid.clone(),
                reason: "message id must not be empty".to_owned(),
            });
        }

        Ok(())
    }

    /// 전체 규칙 수
    pub fn rule_count(&self) -> usize {
        self.headers.len() + self.messages.values().map(Vec::len).sum::<usize>()
    }
}

/// 규칙 정의
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDef {
    /// 규칙 ID
    pub id: String,
    /// 매처
    #[serde(rename = "match")]
    pub matcher: MatcherDef,
    /// 액션 목록
    #[serde(default)]
    pub actions: Vec<ActionDef>,
}

impl RuleDef {
    /// 규칙 ID 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.id.is_empty() {
            return Err(EngineError::CatalogValidation {
                rule_id: "(empty)".to_owned(),
                reason: "rule id must not be empty".to_owned(),
            });
        }

        if self.id.len() > MAX_RULE_ID_LEN {
            return Err(EngineError::CatalogValidation {
                rule_id: self.id.clone(),
                reason: format!("rule id must not exceed {MAX_RULE_ID_LEN} characters"),
            });
        }

        Ok(())
    }
}

/// 매처 정의. 정확히 하나의 필드만 설정되어야 합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatcherDef {
    /// 패턴 문자열
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// 순차 조합
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<Vec<MatcherDef>>,
    /// 선택 조합
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative: Option<Vec<MatcherDef>>,
    /// 프래그먼트 참조
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// 종류별로 해석된 매처 정의
#[derive(Debug, Clone, Copy)]
pub enum MatcherKind<'a> {
    Pattern(&'a str),
    Sequence(&'a [MatcherDef]),
    Alternative(&'a [MatcherDef]),
    Reference(&'a str),
}

impl MatcherDef {
    /// 설정된 종류를 반환합니다. 0개 또는 2개 이상이면 `None`.
    pub fn kind(&self) -> Option<MatcherKind<'_>> {
        let mut kinds = [
            self.pattern.as_deref().map(MatcherKind::Pattern),
            self.sequence.as_deref().map(MatcherKind::Sequence),
            self.alternative.as_deref().map(MatcherKind::Alternative),
            self.reference.as_deref().map(MatcherKind::Reference),
        ]
        .into_iter()
        .flatten();

        let kind = kinds.next()?;
        kinds.next().is_none().then_some(kind)
    }
}

/// 액션 정의. 정확히 하나의 필드만 설정되어야 합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<SetDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<CopyDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<RawDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<CallDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTimeDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup: Option<LookupDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<UrlDef>,
    /// 공유 액션 참조
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// 종류별로 해석된 액션 정의
#[derive(Debug, Clone, Copy)]
pub enum ActionKind<'a> {
    Set(&'a SetDef),
    Copy(&'a CopyDef),
    Raw(&'a RawDef),
    Call(&'a CallDef),
    DateTime(&'a DateTimeDef),
    Duration(&'a DurationDef),
    Lookup(&'a LookupDef),
    Remove(&'a [String]),
    Url(&'a UrlDef),
    Reference(&'a str),
}

impl ActionDef {
    /// 설정된 종류를 반환합니다. 0개 또는 2개 이상이면 `None`.
    pub fn kind(&self) -> Option<ActionKind<'_>> {
        let mut kinds = [
            self.set.as_ref().map(ActionKind::Set),
            self.copy.as_ref().map(ActionKind::Copy),
            self.raw.as_ref().map(ActionKind::Raw),
            self.call.as_ref().map(ActionKind::Call),
            self.date_time.as_ref().map(ActionKind::DateTime),
            self.duration.as_ref().map(ActionKind::Duration),
            self.lookup.as_ref().map(ActionKind::Lookup),
            self.remove.as_deref().map(ActionKind::Remove),
            self.url.as_ref().map(ActionKind::Url),
            self.reference.as_deref().map(ActionKind::Reference),
        ]
        .into_iter()
        .flatten();

        let kind = kinds.next()?;
        kinds.next().is_none().then_some(kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetDef {
    pub dest: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopyDef {
    pub dest: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDef {
    pub dest: String,
}

/// 외부 함수 호출
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallDef {
    pub dest: String,
    /// 함수 이름 (예: `STRCAT`)
    #[serde(rename = "fn")]
    pub function: String,
    #[serde(default)]
    pub args: Vec<ArgDef>,
}

/// 함수/조회 인자. `field`와 `constant` 중 하나만 설정합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArgDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<String>,
}

/// 날짜/시간 파싱
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateTimeDef {
    pub dest: String,
    /// 공백 하나로 이어 붙일 소스 필드
    pub args: Vec<String>,
    /// 순서대로 시도할 포맷
    pub formats: Vec<String>,
    /// 타임존 오프셋 (`local`, `+09:00` 등)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
}

/// 기간 파싱
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DurationDef {
    pub dest: String,
    pub args: Vec<String>,
    pub formats: Vec<String>,
}

/// 상수 테이블 조회
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupDef {
    pub dest: String,
    pub key: ArgDef,
    pub table: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// URL 구성 요소 추출
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UrlDef {
    pub dest: String,
    pub source: String,
    /// `domain`, `fqdn`, `root`, `path`, `page`, `ext`, `port`, `query`
    pub part: String,
}

/// 출력 필드 매핑 섹션
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingsDef {
    /// 비어 있으면 날짜/시간 조각 필드로 조립해 채울 필드
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_field: Option<String>,
    /// 추출 필드 이름 -> 매핑
    #[serde(default)]
    pub fields: BTreeMap<String, FieldMappingDef>,
}

/// 추출 필드 하나의 매핑
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldMappingDef {
    /// `ip`, `long`, `double`, `date`, `mac`, `lowercase`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convert: Option<String>,
    pub to: Vec<TargetDef>,
}

/// 매핑 대상 필드
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDef {
    pub field: String,
    /// `set` (기본), `append`, `prio`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setter: Option<String>,
    /// `prio` 쓰기의 우선순위 (작을수록 우선)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prio: Option<u32>,
}
