//! 필드 매핑 -- 액션 체인 이후 추출 필드를 출력 필드로 옮기는 단계
//!
//! 카탈로그의 `mappings` 섹션은 추출 필드 이름마다 변환기와 대상 필드 목록을 선언합니다.
//! 매핑은 레코드를 만들 때 한 번 적용되며 추출 필드 자체는 그대로 남습니다.
//!
//! # 쓰기 정책
//! - `set`: 마지막 값이 남습니다.
//! - `append`: 중복 없는 목록에 추가합니다.
//! - `prio`: 숫자가 작은 쪽이 이깁니다. `set`으로 쓴 값은 덮어쓰지 않습니다.
//!
//! 변환에 실패한 값은 대상에 쓰지 않습니다. 추출 필드는 이름 순으로 처리됩니다.
//!
//! # 시각 조립
//! `time_field`가 설정되어 있고 그 필드가 비어 있으면, 개별 날짜/시간 조각 필드로부터
//! 시각을 조립해 채웁니다 ([`DateAssembler`]).

use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use msgparse_core::config::TzOffset;
use msgparse_core::metrics as m;
use msgparse_core::types::MappedValue;

use crate::action::datetime::{DateAssembler, format_timestamp};
use crate::error::CompileError;
use crate::field::FieldStore;

/// JavaScript 안전 정수 범위 (2^53 - 1)
const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// 값 변환기
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    /// IPv4/IPv6 주소 검증 (대괄호와 `%zone`은 제거)
    Ip,
    /// 앞부분의 정수
    Long,
    /// 앞부분의 실수
    Double,
    /// RFC 3339 시각 (UTC로 정규화)
    Date,
    /// MAC 주소 (검증 없음)
    Mac,
    /// 소문자
    Lowercase,
}

impl Conversion {
    /// 카탈로그에서 쓰는 이름으로부터 변환합니다.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "ip" => Self::Ip,
            "long" => Self::Long,
            "double" => Self::Double,
            "date" => Self::Date,
            "mac" => Self::Mac,
            "lowercase" => Self::Lowercase,
            _ => return None,
        })
    }

    /// 카탈로그에서 쓰는 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Long => "long",
            Self::Double => "double",
            Self::Date => "date",
            Self::Mac => "mac",
            Self::Lowercase => "lowercase",
        }
    }

    /// 값을 변환합니다. 변환할 수 없으면 `None`.
    pub fn apply(&self, value: &str) -> Option<MappedValue> {
        match self {
            Self::Ip => to_ip(value).map(|ip| MappedValue::Text(ip.to_owned())),
            Self::Long => to_long(value).map(MappedValue::Long),
            Self::Double => to_double(value).map(MappedValue::Double),
            Self::Date => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|t| MappedValue::Text(format_timestamp(t.with_timezone(&Utc)))),
            Self::Mac => Some(MappedValue::Text(value.to_owned())),
            Self::Lowercase => Some(MappedValue::Text(value.to_lowercase())),
        }
    }
}

/// 대상 필드 쓰기 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WritePolicy {
    Set,
    Append,
    /// 숫자가 작을수록 우선
    Priority(u32),
}

/// 매핑 대상
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTarget {
    pub field: String,
    pub policy: WritePolicy,
}

/// 추출 필드 하나의 매핑
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub conversion: Option<Conversion>,
    pub targets: Vec<MappingTarget>,
}

/// 카탈로그 단위 매핑 단계
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    mappings: BTreeMap<String, FieldMapping>,
    time: Option<(String, DateAssembler)>,
}

/// 대상 필드의 현재 값과 우선순위
struct Slot {
    value: MappedValue,
    priority: Option<u32>,
}

impl FieldMapper {
    /// 빈 매퍼를 생성합니다. 아무 필드도 매핑하지 않습니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 추출 필드의 매핑을 등록합니다. 같은 필드는 덮어씁니다.
    pub fn insert(&mut self, source: impl Into<String>, mapping: FieldMapping) {
        self.mappings.insert(source.into(), mapping);
    }

    /// 시각 조립 대상 필드를 설정합니다.
    pub fn set_time_field(&mut self, field: impl Into<String>) -> Result<(), CompileError> {
        self.time = Some((field.into(), DateAssembler::new()?));
        Ok(())
    }

    /// 시각 조립 대상 필드
    pub fn time_field(&self) -> Option<&str> {
        self.time.as_ref().map(|(field, _)| field.as_str())
    }

    /// 등록된 매핑 수
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// 매핑과 시각 조립이 모두 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty() && self.time.is_none()
    }

    /// 시각 필드가 비어 있으면 조각 필드로 조립해 채웁니다. 채웠으면 `true`.
    pub fn fill_time(&self, store: &mut FieldStore, tz: TzOffset, now: DateTime<Utc>) -> bool {
        let Some((field, assembler)) = &self.time else {
            return false;
        };
        if store.contains(field) {
            return false;
        }
        match assembler.assemble(store, tz, now) {
            Some(timestamp) => {
                store.set_owned(field, format_timestamp(timestamp));
                true
            }
            None => false,
        }
    }

    /// 추출 필드를 출력 필드로 매핑합니다.
    pub fn map(&self, store: &FieldStore) -> BTreeMap<String, MappedValue> {
        if self.mappings.is_empty() {
            return BTreeMap::new();
        }
        let mut slots: BTreeMap<&str, Slot> = BTreeMap::new();

        for (name, raw) in store.iter() {
            let Some(mapping) = self.mappings.get(name) else {
                continue;
            };
            let value = match mapping.conversion {
                Some(conversion) => match conversion.apply(raw) {
                    Some(value) => value,
                    None => {
                        metrics::counter!(m::MAPPING_FAILURES_TOTAL).increment(1);
                        tracing::debug!(
                            field = %name,
                            value = %raw,
                            conversion = conversion.as_str(),
                            "field conversion failed, mapping skipped"
                        );
                        continue;
                    }
                },
                None => MappedValue::Text(raw.to_owned()),
            };

            for target in &mapping.targets {
                write(&mut slots, target, value.clone());
            }
        }

        slots
            .into_iter()
            .map(|(field, slot)| (field.to_owned(), slot.value))
            .collect()
    }
}

fn write<'a>(slots: &mut BTreeMap<&'a str, Slot>, target: &'a MappingTarget, value: MappedValue) {
    let field = target.field.as_str();
    match target.policy {
        WritePolicy::Set => {
            slots.insert(
                field,
                Slot {
                    value,
                    priority: None,
                },
            );
        }
        WritePolicy::Append => match slots.get_mut(field) {
            Some(slot) => match &mut slot.value {
                MappedValue::List(items) => {
                    if !items.contains(&value) {
                        items.push(value);
                    }
                }
                existing if *existing != value => {
                    let first = std::mem::replace(existing, MappedValue::List(Vec::new()));
                    *existing = MappedValue::List(vec![first, value]);
                }
                _ => {}
            },
            None => {
                slots.insert(
                    field,
                    Slot {
                        value: MappedValue::List(vec![value]),
                        priority: None,
                    },
                );
            }
        },
        WritePolicy::Priority(priority) => match slots.get_mut(field) {
            Some(slot) => {
                if slot.priority.is_some_and(|current| priority < current) {
                    slot.value = value;
                    slot.priority = Some(priority);
                }
            }
            None => {
                slots.insert(
                    field,
                    Slot {
                        value,
                        priority: Some(priority),
                    },
                );
            }
        },
    }
}

/// 앞 공백과 부호를 허용하고, 숫자 뒤의 나머지는 무시합니다.
fn to_long(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let sign_len = usize::from(trimmed.starts_with(['+', '-']));
    let digits = trimmed[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    let number: i64 = trimmed[..sign_len + digits].parse().ok()?;
    (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER)
        .contains(&number)
        .then_some(number)
}

/// 가장 긴 실수 접두어를 해석합니다. 유한한 값만 허용합니다.
fn to_double(value: &str) -> Option<f64> {
    let trimmed = value.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = usize::from(trimmed.starts_with(['+', '-']));
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let int_digits = digits(end);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits(end + 1);
        if frac_digits > 0 || int_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_digits = digits(end + 1 + sign);
        if exp_digits > 0 {
            end += 1 + sign + exp_digits;
        }
    }

    trimmed[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

/// 검증된 주소 문자열을 반환합니다.
fn to_ip(value: &str) -> Option<&str> {
    let mut address = value;
    if let Some(close) = address.find(']') {
        address = address.strip_prefix('[')?.get(..close - 1)?;
    }
    if let Some(zone) = address.find('%') {
        address = &address[..zone];
    }
    address.parse::<IpAddr>().ok().map(|_| address)
}
