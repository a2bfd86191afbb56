//! 액션 체인 -- 매칭 이후의 필드 파생 단계
//!
//! 규칙이 매칭되면 [`ActionChain`]이 선언 순서대로 실행됩니다.
//! 각 액션은 앞선 액션의 결과를 읽을 수 있습니다.
//!
//! # 실패 정책
//! 실패한 액션은 대상 필드만 비워 둡니다. 매칭 결과는 되돌리지 않으며,
//! 이후 액션은 계속 실행됩니다. 실패는 [`ActionFailure`]로 모아서 반환합니다.

pub mod datetime;
pub mod duration;
pub mod url;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use msgparse_core::config::TzOffset;

use crate::field::FieldStore;
use crate::function::FunctionRegistry;

pub use datetime::DateFormat;
pub use duration::DurationFormat;
pub use url::UrlComponent;

/// 함수/조회 인자
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Arg {
    /// 필드 값
    Field(String),
    /// 상수
    Constant(String),
}

impl Arg {
    /// 인자 값을 해석합니다. 필드가 없으면 `None`.
    pub fn resolve<'a>(&'a self, store: &'a FieldStore) -> Option<&'a str> {
        match self {
            Self::Field(name) => store.get(name),
            Self::Constant(value) => Some(value),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Field(name) => format!("field '{name}' is not set"),
            Self::Constant(_) => "constant".to_owned(),
        }
    }
}

/// 매칭 이후 실행되는 단일 액션
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// 상수 대입
    SetConstant { dest: String, value: String },
    /// 필드 복사
    CopyField { dest: String, source: String },
    /// 원본 라인 복사
    CopyRaw { dest: String },
    /// 외부 함수 호출
    Invoke {
        dest: String,
        function: String,
        args: Vec<Arg>,
    },
    /// 날짜/시간 파싱. 소스 필드는 공백 하나로 이어 붙입니다.
    ParseDateTime {
        dest: String,
        sources: Vec<String>,
        formats: Vec<DateFormat>,
        /// 엔진 기본 타임존 대신 쓸 오프셋
        tz: Option<TzOffset>,
    },
    /// 기간 파싱 (초 단위)
    ParseDuration {
        dest: String,
        sources: Vec<String>,
        formats: Vec<DurationFormat>,
    },
    /// 상수 테이블 조회
    Lookup {
        dest: String,
        key: Arg,
        table: BTreeMap<String, String>,
        default: Option<String>,
    },
    /// 필드 삭제
    Remove { fields: Vec<String> },
    /// URL 구성 요소 추출
    UrlPart {
        dest: String,
        source: String,
        part: UrlComponent,
    },
}

/// 액션 실행 문맥
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    /// 원본 라인 (PRI 제거 후)
    pub raw: &'a str,
    /// 외부 함수 레지스트리
    pub functions: &'a FunctionRegistry,
    /// 기본 타임존
    pub tz: TzOffset,
    /// 연도 없는 날짜의 기준 시각
    pub now: DateTime<Utc>,
}

/// 액션 실패 정보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    /// 액션 종류
    pub action: &'static str,
    /// 비어 있게 된 대상 필드
    pub dest: String,
    /// 실패 사유
    pub reason: String,
}

impl Action {
    /// 액션 종류 이름
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetConstant { .. } => "set",
            Self::CopyField { .. } => "copy",
            Self::CopyRaw { .. } => "raw",
            Self::Invoke { .. } => "call",
            Self::ParseDateTime { .. } => "date_time",
            Self::ParseDuration { .. } => "duration",
            Self::Lookup { .. } => "lookup",
            Self::Remove { .. } => "remove",
            Self::UrlPart { .. } => "url",
        }
    }

    /// 대상 필드 (Remove는 빈 문자열)
    pub fn dest(&self) -> &str {
        match self {
            Self::SetConstant { dest, .. }
            | Self::CopyField { dest, .. }
            | Self::CopyRaw { dest }
            | Self::Invoke { dest, .. }
            | Self::ParseDateTime { dest, .. }
            | Self::ParseDuration { dest, .. }
            | Self::Lookup { dest, .. }
            | Self::UrlPart { dest, .. } => dest,
            Self::Remove { .. } => "",
        }
    }

    /// 액션을 실행합니다.
    pub fn apply(&self, store: &mut FieldStore, ctx: &ActionContext<'_>) -> Result<(), ActionFailure> {
        match self {
            Self::SetConstant { dest, value } => store.set(dest, value),
            Self::CopyField { dest, source } => {
                let value = store
                    .get(source)
                    .ok_or_else(|| self.failure(format!("field '{source}' is not set")))?
                    .to_owned();
                store.set_owned(dest, value);
            }
            Self::CopyRaw { dest } => store.set(dest, ctx.raw),
            Self::Invoke {
                dest,
                function,
                args,
            } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.resolve(store).ok_or_else(|| self.failure(arg.describe()))?);
                }
                let result = ctx
                    .functions
                    .call(function, &values)
                    .map_err(|e| self.failure(format!("{function}: {e}")))?;
                store.set_owned(dest, result);
            }
            Self::ParseDateTime {
                dest,
                sources,
                formats,
                tz,
            } => {
                let input = join_sources(store, sources)
                    .ok_or_else(|| self.failure("no source field is set".to_owned()))?;
                let tz = tz.unwrap_or(ctx.tz);
                let timestamp = formats
                    .iter()
                    .find_map(|format| format.parse(&input, tz, ctx.now))
                    .ok_or_else(|| self.failure(format!("no format matched '{input}'")))?;
                store.set_owned(dest, datetime::format_timestamp(timestamp));
            }
            Self::ParseDuration {
                dest,
                sources,
                formats,
            } => {
                let input = join_sources(store, sources)
                    .ok_or_else(|| self.failure("no source field is set".to_owned()))?;
                let seconds = formats
                    .iter()
                    .find_map(|format| format.parse(&input))
                    .ok_or_else(|| self.failure(format!("no format matched '{input}'")))?;
                store.set_owned(dest, seconds.to_string());
            }
            Self::Lookup {
                dest,
                key,
                table,
                default,
            } => {
                let key = key.resolve(store).ok_or_else(|| self.failure(key.describe()))?;
                let value = table
                    .get(key)
                    .or(default.as_ref())
                    .ok_or_else(|| self.failure(format!("no entry for key '{key}'")))?
                    .clone();
                store.set_owned(dest, value);
            }
            Self::Remove { fields } => {
                for field in fields {
                    store.remove(field);
                }
            }
            Self::UrlPart { dest, source, part } => {
                let value = store
                    .get(source)
                    .ok_or_else(|| self.failure(format!("field '{source}' is not set")))?;
                let extracted = url::extract(value, *part)
                    .ok_or_else(|| self.failure(format!("no {part} in '{value}'")))?;
                store.set_owned(dest, extracted);
            }
        }
        Ok(())
    }

    fn failure(&self, reason: String) -> ActionFailure {
        ActionFailure {
            action: self.kind(),
            dest: self.dest().to_owned(),
            reason,
        }
    }
}

/// 설정된 소스 필드를 공백 하나로 이어 붙입니다. 하나도 없으면 `None`.
fn join_sources(store: &FieldStore, sources: &[String]) -> Option<String> {
    let mut joined = String::new();
    for value in sources.iter().filter_map(|source| store.get(source)) {
        if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(value);
    }
    (!joined.is_empty()).then_some(joined)
}

/// 순서가 있는 액션 목록
///
/// 동일한 액션은 카탈로그 로딩 시 인터닝되어 `Arc`로 공유됩니다.
#[derive(Debug, Clone, Default)]
pub struct ActionChain {
    actions: Box<[Arc<Action>]>,
}

impl ActionChain {
    /// 공유 액션 목록으로 체인을 생성합니다.
    pub fn new(actions: Vec<Arc<Action>>) -> Self {
        Self {
            actions: actions.into_boxed_slice(),
        }
    }

    /// 액션 값 목록으로 체인을 생성합니다.
    pub fn from_actions(actions: impl IntoIterator<Item = Action>) -> Self {
        Self::new(actions.into_iter().map(Arc::new).collect())
    }

    /// 모든 액션을 순서대로 실행하고 실패 목록을 반환합니다.
    pub fn apply(&self, store: &mut FieldStore, ctx: &ActionContext<'_>) -> Vec<ActionFailure> {
        let mut failures = Vec::new();
        for action in self.actions.iter() {
            if let Err(failure) = action.apply(store, ctx) {
                tracing::debug!(
                    action = failure.action,
                    dest = %failure.dest,
                    reason = %failure.reason,
                    "action failed"
                );
                failures.push(failure);
            }
        }
        failures
    }

    /// 액션을 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().map(|action| action.as_ref())
    }

    /// 액션 수
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn context(functions: &FunctionRegistry) -> ActionContext<'_> {
        ActionContext {
            raw: "<raw line>",
            functions,
            tz: TzOffset::Fixed(0),
            now: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        }
    }

    fn store_with(fields: &[(&str, &str)]) -> FieldStore {
        let mut store = FieldStore::new();
        store.merge_captures(fields);
        store
    }

    #[test]
    fn set_copy_and_raw() {
        let functions = FunctionRegistry::new();
        let ctx = context(&functions);
        let mut store = store_with(&[("saddr", "10.0.0.1")]);
        let chain = ActionChain::from_actions([
            Action::SetConstant {
                dest: "event.category".to_owned(),
                value: "network".to_owned(),
            },
            Action::CopyField {
                dest: "source.ip".to_owned(),
                source: "saddr".to_owned(),
            },
            Action::CopyRaw {
                dest: "event.original".to_owned(),
            },
        ]);

        assert!(chain.apply(&mut store, &ctx).is_empty());
        assert_eq!(store.get("event.category"), Some("network"));
        assert_eq!(store.get("source.ip"), Some("10.0.0.1"));
        assert_eq!(store.get("event.original"), Some("<raw line>"));
    }

    #[test]
    fn copy_of_missing_field_fails_without_write() {
        let functions = FunctionRegistry::new();
        let ctx = context(&functions);
        let mut store = FieldStore::new();
        let action = Action::CopyField {
            dest: "out".to_owned(),
            source: "missing".to_owned(),
        };
        let failure = action.apply(&mut store, &ctx).unwrap_err();
        assert_eq!(failure.action, "copy");
        assert_eq!(failure.dest, "out");
        assert!(!store.contains("out"));
    }

    #[test]
    fn later_actions_read_earlier_results() {
        let functions = FunctionRegistry::with_builtins();
        let ctx = context(&functions);
        let mut store = store_with(&[("sbytes", "100"), ("rbytes", "23")]);
        let chain = ActionChain::from_actions([
            Action::Invoke {
                dest: "bytes".to_owned(),
                function: "CALC".to_owned(),
                args: vec![
                    Arg::Field("sbytes".to_owned()),
                    Arg::Constant("+".to_owned()),
                    Arg::Field("rbytes".to_owned()),
                ],
            },
            Action::Invoke {
                dest: "label".to_owned(),
                function: "STRCAT".to_owned(),
                args: vec![
                    Arg::Constant("total=".to_owned()),
                    Arg::Field("bytes".to_owned()),
                ],
            },
        ]);

        assert!(chain.apply(&mut store, &ctx).is_empty());
        assert_eq!(store.get("bytes"), Some("123"));
        assert_eq!(store.get("label"), Some("total=123"));
    }

    #[test]
    fn invoke_with_missing_argument_fails() {
        let functions = FunctionRegistry::with_builtins();
        let ctx = context(&functions);
        let mut store = FieldStore::new();
        let action = Action::Invoke {
            dest: "out".to_owned(),
            function: "STRCAT".to_owned(),
            args: vec![Arg::Field("nope".to_owned())],
        };
        let failure = action.apply(&mut store, &ctx).unwrap_err();
        assert!(failure.reason.contains("nope"));
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_function_fails_closed() {
        let functions = FunctionRegistry::new();
        let ctx = context(&functions);
        let mut store = store_with(&[("a", "1")]);
        let chain = ActionChain::from_actions([
            Action::Invoke {
                dest: "out".to_owned(),
                function: "MISSING".to_owned(),
                args: vec![Arg::Field("a".to_owned())],
            },
            Action::SetConstant {
                dest: "after".to_owned(),
                value: "ran".to_owned(),
            },
        ]);

        let failures = chain.apply(&mut store, &ctx);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].reason.contains("MISSING"));
        assert!(!store.contains("out"));
        assert_eq!(store.get("after"), Some("ran"));
    }

    #[test]
    fn date_time_failure_does_not_stop_chain() {
        let functions = FunctionRegistry::new();
        let ctx = context(&functions);
        let mut store = store_with(&[("date", "2024-explode")]);
        let chain = ActionChain::from_actions([
            Action::ParseDateTime {
                dest: "event_time".to_owned(),
                sources: vec!["date".to_owned()],
                formats: vec![DateFormat::compile("YYYY-MM-DD HH:mm:ss").unwrap()],
                tz: None,
            },
            Action::SetConstant {
                dest: "after".to_owned(),
                value: "ran".to_owned(),
            },
        ]);

        let failures = chain.apply(&mut store, &ctx);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].action, "date_time");
        assert!(!store.contains("event_time"));
        assert_eq!(store.get("after"), Some("ran"));
    }

    #[test]
    fn date_time_joins_sources_and_tries_formats_in_order() {
        let functions = FunctionRegistry::new();
        let ctx = context(&functions);
        let mut store = store_with(&[("date", "15/01/2024"), ("time", "12:00:00")]);
        let action = Action::ParseDateTime {
            dest: "event_time".to_owned(),
            sources: vec!["date".to_owned(), "missing".to_owned(), "time".to_owned()],
            formats: vec![
                DateFormat::compile("YYYY-MM-DD HH:mm:ss").unwrap(),
                DateFormat::compile("DD/MM/YYYY HH:mm:ss").unwrap(),
            ],
            tz: Some(TzOffset::Fixed(3600)),
        };

        action.apply(&mut store, &ctx).unwrap();
        assert_eq!(store.get("event_time"), Some("2024-01-15T11:00:00Z"));
    }

    #[test]
    fn duration_action() {
        let functions = FunctionRegistry::new();
        let ctx = context(&functions);
        let mut store = store_with(&[("elapsed", "00:01:30")]);
        let action = Action::ParseDuration {
            dest: "event.duration".to_owned(),
            sources: vec!["elapsed".to_owned()],
            formats: vec![DurationFormat::compile("H:m:s").unwrap()],
        };
        action.apply(&mut store, &ctx).unwrap();
        assert_eq!(store.get("event.duration"), Some("90"));
    }

    #[test]
    fn lookup_with_default() {
        let functions = FunctionRegistry::new();
        let ctx = context(&functions);
        let table: BTreeMap<String, String> = [("1", "deny"), ("2", "allow")]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        let lookup = |default: Option<&str>| Action::Lookup {
            dest: "action".to_owned(),
            key: Arg::Field("code".to_owned()),
            table: table.clone(),
            default: default.map(str::to_owned),
        };

        let mut store = store_with(&[("code", "2")]);
        lookup(None).apply(&mut store, &ctx).unwrap();
        assert_eq!(store.get("action"), Some("allow"));

        let mut store = store_with(&[("code", "9")]);
        assert!(lookup(None).apply(&mut store, &ctx).is_err());
        lookup(Some("unknown")).apply(&mut store, &ctx).unwrap();
        assert_eq!(store.get("action"), Some("unknown"));
    }

    #[test]
    fn remove_fields() {
        let functions = FunctionRegistry::new();
        let ctx = context(&functions);
        let mut store = store_with(&[("tmp1", "a"), ("tmp2", "b"), ("keep", "c")]);
        let action = Action::Remove {
            fields: vec!["tmp1".to_owned(), "tmp2".to_owned(), "absent".to_owned()],
        };
        action.apply(&mut store, &ctx).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("keep"), Some("c"));
    }

    #[test]
    fn url_part_action() {
        let functions = FunctionRegistry::new();
        let ctx = context(&functions);
        let mut store = store_with(&[("url", "http://example.com/index.html")]);
        let action = Action::UrlPart {
            dest: "url.domain".to_owned(),
            source: "url".to_owned(),
            part: UrlComponent::Domain,
        };
        action.apply(&mut store, &ctx).unwrap();
        assert_eq!(store.get("url.domain"), Some("example.com"));

        let action = Action::UrlPart {
            dest: "url.query".to_owned(),
            source: "url".to_owned(),
            part: UrlComponent::Query,
        };
        assert!(action.apply(&mut store, &ctx).is_err());
        assert!(!store.contains("url.query"));
    }

    #[test]
    fn identical_actions_hash_equal() {
        use std::collections::HashSet;

        let a = Action::SetConstant {
            dest: "x".to_owned(),
            value: "1".to_owned(),
        };
        let mut set = HashSet::new();
        set.insert(a.clone());
        assert!(!set.insert(a));
    }
}
