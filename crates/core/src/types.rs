//! 도메인 타입 -- 파싱 결과 레코드
//!
//! 디스패처가 라인마다 반환하는 [`Record`]와 그 상태 [`ParseStatus`]를 정의합니다.
//! 하류(전송/저장) 컴포넌트는 이 타입만 보고 레코드를 처리합니다.
//! 카탈로그 매핑 단계가 만든 타입 있는 출력 필드는 [`MappedValue`]로 표현합니다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 라인 파싱 결과 상태
///
/// `Parsed` 이외의 값은 모두 예상 가능한 런타임 결과이며 에러로 취급하지 않습니다.
/// 파싱되지 않은 라인도 버리지 않고 태그를 붙여 전달합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    /// 헤더와 메시지 규칙이 모두 매칭됨
    Parsed,
    /// 어떤 헤더 규칙도 매칭되지 않았거나 메시지 ID를 얻지 못함
    #[default]
    NoHeaderMatch,
    /// 메시지 ID가 디스패치 테이블에 없음
    UnknownMessageId,
    /// 메시지 ID는 알려져 있으나 후보 규칙이 모두 실패
    NoRuleMatch,
    /// 최대 라인 크기 초과
    Oversized,
}

impl ParseStatus {
    /// 메트릭 레이블 등에 쓰이는 소문자 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::NoHeaderMatch => "no_header_match",
            Self::UnknownMessageId => "unknown_message_id",
            Self::NoRuleMatch => "no_rule_match",
            Self::Oversized => "oversized",
        }
    }
}

impl fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 매핑 단계의 출력 값
///
/// JSON으로는 태그 없이 숫자, 문자열, 배열로 직렬화됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappedValue {
    /// 정수 (`long` 변환)
    Long(i64),
    /// 실수 (`double` 변환)
    Double(f64),
    /// 문자열
    Text(String),
    /// 중복 없는 값 목록 (`append` 쓰기)
    List(Vec<MappedValue>),
}

impl fmt::Display for MappedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::List(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{value}")?;
                }
                Ok(())
            }
        }
    }
}

/// 파싱 결과 레코드
///
/// 평탄한 문자열 필드 맵과 파싱 상태를 담습니다.
/// 필드는 `BTreeMap`으로 보관하여 직렬화 순서가 항상 같습니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// 추출/파생된 필드
    pub fields: BTreeMap<String, String>,
    /// 카탈로그 매핑으로 만든 출력 필드
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mapped: BTreeMap<String, MappedValue>,
    /// 파싱 상태
    pub status: ParseStatus,
    /// 매칭된 헤더 규칙 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_rule: Option<String>,
    /// 매칭된 메시지 규칙 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_rule: Option<String>,
    /// 실패한 액션 수 (필드 단위 실패, 레코드 상태에는 영향 없음)
    #[serde(default)]
    pub action_failures: usize,
}

impl Record {
    /// 지정한 상태의 빈 레코드를 생성합니다.
    pub fn unparsed(status: ParseStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// 완전히 파싱되었는지 여부
    pub fn is_parsed(&self) -> bool {
        self.status == ParseStatus::Parsed
    }

    /// 필드 값을 조회합니다.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// 매핑된 출력 필드를 조회합니다.
    pub fn mapped(&self, field: &str) -> Option<&MappedValue> {
        self.mapped.get(field)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.status)?;
        if let Some(rule) = &self.message_rule {
            write!(f, " rule={rule}")?;
        }
        write!(f, " fields={}", self.fields.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_is_unparsed() {
        let record = Record::default();
        assert!(!record.is_parsed());
        assert_eq!(record.status, ParseStatus::NoHeaderMatch);
    }

    #[test]
    fn status_names_are_snake_case() {
        assert_eq!(ParseStatus::UnknownMessageId.as_str(), "unknown_message_id");
        let json = serde_json::to_string(&ParseStatus::NoRuleMatch).unwrap();
        assert_eq!(json, "\"no_rule_match\"");
    }

    #[test]
    fn record_get_reads_fields() {
        let mut record = Record::unparsed(ParseStatus::Parsed);
        record.fields.insert("saddr".to_owned(), "10.0.0.1".to_owned());
        assert!(record.is_parsed());
        assert_eq!(record.get("saddr"), Some("10.0.0.1"));
        assert_eq!(record.get("daddr"), None);
    }

    #[test]
    fn record_display_includes_status_and_rule() {
        let mut record = Record::unparsed(ParseStatus::Parsed);
        record.message_rule = Some("MESSAGE#3".to_owned());
        let text = record.to_string();
        assert!(text.contains("parsed"));
        assert!(text.contains("MESSAGE#3"));
    }

    #[test]
    fn mapped_values_serialize_untagged() {
        let mut record = Record::unparsed(ParseStatus::Parsed);
        record
            .mapped
            .insert("source.port".to_owned(), MappedValue::Long(443));
        record.mapped.insert(
            "related.ip".to_owned(),
            MappedValue::List(vec![
                MappedValue::Text("10.0.0.1".to_owned()),
                MappedValue::Text("10.0.0.2".to_owned()),
            ]),
        );

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""source.port":443"#), "got: {json}");
        assert!(json.contains(r#""related.ip":["10.0.0.1","10.0.0.2"]"#));

        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mapped("source.port"), Some(&MappedValue::Long(443)));
        assert_eq!(
            back.mapped("related.ip").map(ToString::to_string).as_deref(),
            Some("10.0.0.1,10.0.0.2")
        );
    }

    #[test]
    fn record_serialization_skips_missing_rule_ids() {
        let record = Record::unparsed(ParseStatus::NoHeaderMatch);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("header_rule"));
        assert!(!json.contains("mapped"));
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
