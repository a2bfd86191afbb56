//! 디스패처 -- 원본 라인 하나를 레코드로 변환합니다 (msgid_select).
//!
//! # 처리 순서
//! 1. 줄바꿈 제거 후 크기 검사 (`max_line_bytes` 초과 시 `Oversized`)
//! 2. UTF-8 손실 허용 디코딩, 원본 보존
//! 3. `<PRI>` 제거 (설정 시)
//! 4. 헤더 규칙 선택 후 헤더 액션 실행
//! 5. 메시지 ID로 메시지 규칙 목록 조회 (해시 한 번)
//! 6. 페이로드에 메시지 규칙 선택 후 메시지 액션 실행
//! 7. 헤더가 매칭되었으면 비어 있는 시각 필드를 날짜/시간 조각으로 채움
//! 8. 레코드를 만들 때 카탈로그 매핑 적용 ([`crate::mapping`])
//!
//! 어떤 바이트 입력에도 패닉하거나 에러를 반환하지 않습니다.
//! 매칭 실패는 [`ParseStatus`]로 표현됩니다.
//!
//! # 핫 리로드
//! [`SharedDispatcher`]는 완성된 디스패처 스냅샷을 통째로 교체합니다.
//! 읽는 쪽은 `Arc`를 복제해 사용하므로 부분적으로 만들어진 카탈로그를 보지 않습니다.

use std::borrow::Cow;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use msgparse_core::config::EngineSection;
use msgparse_core::metrics as m;
use msgparse_core::types::{ParseStatus, Record};

use crate::action::ActionContext;
use crate::catalog::{Catalog, CatalogLoader};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::field::FieldStore;
use crate::function::FunctionRegistry;
use crate::rule::RuleId;
use crate::syslog;

/// syslog facility 필드명
pub const FACILITY_FIELD: &str = "syslog.facility";
/// syslog severity 필드명
pub const SEVERITY_FIELD: &str = "syslog.severity";

/// 라인 하나의 디스패치 결과 (필드는 호출자의 저장소에 남습니다)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// 파싱 상태
    pub status: ParseStatus,
    /// 매칭된 헤더 규칙
    pub header_rule: Option<RuleId>,
    /// 매칭된 메시지 규칙
    pub message_rule: Option<RuleId>,
    /// 실패한 액션 수
    pub action_failures: usize,
}

impl DispatchOutcome {
    fn unparsed(status: ParseStatus) -> Self {
        Self {
            status,
            header_rule: None,
            message_rule: None,
            action_failures: 0,
        }
    }
}

/// 디스패처
///
/// 카탈로그와 함수 레지스트리를 읽기 전용으로 공유하며 `Send + Sync`입니다.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    catalog: Arc<Catalog>,
    functions: Arc<FunctionRegistry>,
    config: EngineConfig,
}

impl Dispatcher {
    /// 새 디스패처를 생성합니다.
    pub fn new(
        catalog: Arc<Catalog>,
        functions: Arc<FunctionRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            functions,
            config,
        }
    }

    /// core 설정 섹션으로부터 카탈로그를 로드하여 디스패처를 생성합니다.
    ///
    /// # Errors
    /// 설정이 올바르지 않거나 카탈로그 로드에 실패한 경우
    pub async fn from_section(
        section: &EngineSection,
        functions: Arc<FunctionRegistry>,
    ) -> Result<Self, EngineError> {
        let config = EngineConfig::from_core(section)?;
        let catalog = CatalogLoader::load_file(&section.catalog_path, &functions).await?;
        Ok(Self::new(Arc::new(catalog), functions, config))
    }

    /// 카탈로그
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// 함수 레지스트리
    pub fn functions(&self) -> &Arc<FunctionRegistry> {
        &self.functions
    }

    /// 엔진 설정
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 원본 라인을 레코드로 변환합니다.
    pub fn dispatch(&self, raw: &[u8]) -> Record {
        let mut store = FieldStore::new();
        let outcome = self.dispatch_into(raw, &mut store);
        self.to_record(outcome, store)
    }

    /// 호출자가 소유한 저장소에 필드를 채웁니다. 저장소는 먼저 비워집니다.
    pub fn dispatch_into(&self, raw: &[u8], store: &mut FieldStore) -> DispatchOutcome {
        store.clear();
        let now = Utc::now();
        let outcome = self.run(raw, store, now);
        if outcome.header_rule.is_some() {
            self.catalog
                .mapper()
                .fill_time(store, self.config.tz, now);
        }

        metrics::counter!(m::LINES_TOTAL, m::LABEL_STATUS => outcome.status.as_str())
            .increment(1);
        if outcome.action_failures > 0 {
            metrics::counter!(m::ACTION_FAILURES_TOTAL).increment(outcome.action_failures as u64);
        }

        tracing::debug!(
            status = %outcome.status,
            header_rule = ?outcome.header_rule.and_then(|id| self.rule_name(id)),
            message_rule = ?outcome.message_rule.and_then(|id| self.rule_name(id)),
            action_failures = outcome.action_failures,
            fields = store.len(),
            "dispatched line"
        );

        outcome
    }

    /// 결과와 저장소로 레코드를 만듭니다. 카탈로그 매핑은 여기서 적용됩니다.
    pub fn to_record(&self, outcome: DispatchOutcome, store: FieldStore) -> Record {
        let mapped = self.catalog.mapper().map(&store);
        Record {
            fields: store.into_fields(),
            mapped,
            status: outcome.status,
            header_rule: outcome
                .header_rule
                .and_then(|id| self.rule_name(id))
                .map(str::to_owned),
            message_rule: outcome
                .message_rule
                .and_then(|id| self.rule_name(id))
                .map(str::to_owned),
            action_failures: outcome.action_failures,
        }
    }

    fn rule_name(&self, id: RuleId) -> Option<&str> {
        self.catalog.rule(id).map(|rule| rule.id())
    }

    fn run(&self, raw: &[u8], store: &mut FieldStore, now: DateTime<Utc>) -> DispatchOutcome {
        let content = raw
            .iter()
            .rposition(|b| !matches!(b, b'\r' | b'\n'))
            .map_or(&raw[..0], |last| &raw[..=last]);
        if content.len() > self.config.max_line_bytes {
            return DispatchOutcome::unparsed(ParseStatus::Oversized);
        }

        let decoded = String::from_utf8_lossy(content);
        let mut line: &str = &decoded;

        if self.config.keep_raw {
            store.set(&self.config.raw_field, line);
        }

        if self.config.strip_priority {
            let (priority, rest) = syslog::strip_priority(line);
            if let Some(priority) = priority {
                store.set_owned(FACILITY_FIELD, priority.facility.to_string());
                store.set_owned(SEVERITY_FIELD, priority.severity.to_string());
            }
            line = rest;
        }

        let ctx = ActionContext {
            raw: line,
            functions: &self.functions,
            tz: self.config.tz,
            now,
        };
        let catalog = &*self.catalog;

        // 헤더
        let mut captures = Vec::new();
        let Some(header) = catalog.match_rules(catalog.header_rules(), line, &mut captures)
        else {
            return DispatchOutcome::unparsed(ParseStatus::NoHeaderMatch);
        };
        store.merge_captures(&captures);

        let mut outcome = DispatchOutcome {
            status: ParseStatus::NoHeaderMatch,
            header_rule: Some(header.id),
            message_rule: None,
            action_failures: header.rule.actions().apply(store, &ctx).len(),
        };

        let Some(msgid) = store.get(&self.config.message_id_field) else {
            return outcome;
        };
        let Some(key) = catalog.message_key(msgid) else {
            outcome.status = ParseStatus::UnknownMessageId;
            return outcome;
        };

        // 헤더 액션이 페이로드를 다시 만들 수 있으므로 필드가 우선
        let payload: Cow<'_, str> = match store.get(&self.config.payload_field) {
            Some(payload) => Cow::Owned(payload.to_owned()),
            None => Cow::Borrowed(line.get(header.consumed..).unwrap_or_default()),
        };

        // 메시지
        let mut captures = Vec::new();
        let Some(message) = catalog.match_rules(catalog.message_rules(key), &payload, &mut captures)
        else {
            outcome.status = ParseStatus::NoRuleMatch;
            return outcome;
        };
        store.merge_captures(&captures);

        outcome.action_failures += message.rule.actions().apply(store, &ctx).len();
        outcome.message_rule = Some(message.id);
        outcome.status = ParseStatus::Parsed;
        outcome
    }
}

/// 핫 리로드 가능한 디스패처 핸들
#[derive(Debug)]
pub struct SharedDispatcher {
    current: RwLock<Arc<Dispatcher>>,
}

impl SharedDispatcher {
    /// 초기 디스패처로 핸들을 생성합니다.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            current: RwLock::new(Arc::new(dispatcher)),
        }
    }

    /// 현재 스냅샷을 반환합니다.
    pub fn load(&self) -> Arc<Dispatcher> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// 스냅샷을 교체하고 이전 스냅샷을 반환합니다.
    pub fn swap(&self, next: Dispatcher) -> Arc<Dispatcher> {
        let next = Arc::new(next);
        let catalog = next.catalog().name().to_owned();
        let rules = next.catalog().rule_count();

        let previous = {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, next)
        };

        metrics::counter!(m::CATALOG_RELOADS_TOTAL).increment(1);
        tracing::info!(catalog = %catalog, rules, "swapped catalog snapshot");
        previous
    }

    /// 카탈로그 파일을 다시 로드하여 교체합니다.
    ///
    /// 로드에 실패하면 현재 스냅샷을 유지합니다.
    pub async fn reload(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let current = self.load();
        let catalog = CatalogLoader::load_file(path, current.functions()).await?;
        self.swap(Dispatcher::new(
            Arc::new(catalog),
            Arc::clone(current.functions()),
            current.config().clone(),
        ));
        Ok(())
    }

    /// 현재 스냅샷으로 라인을 처리합니다.
    pub fn dispatch(&self, raw: &[u8]) -> Record {
        self.load().dispatch(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfigBuilder;
    use msgparse_core::types::MappedValue;

    const CATALOG: &str = r#"
name: unit
headers:
  - id: "HEADER#0"
    match: { pattern: "%{hdate} %{hhost} %{messageid}: %{payload}" }
  - id: "HEADER#1"
    match: { pattern: "%{messageid}| " }
    actions:
      - set: { dest: header_kind, value: pipe }
messages:
  "10":
    - id: "MESSAGE#0"
      match: { pattern: "Policy ID=%{policy_id} Rate=%{fld2} exceeds threshold" }
      actions:
        - set: { dest: event.category, value: threshold }
  "20":
    - id: "MESSAGE#1"
      match: { pattern: "user=%{user}" }
"#;

    fn dispatcher(config: EngineConfig) -> Dispatcher {
        let functions = FunctionRegistry::with_builtins();
        let catalog = CatalogLoader::parse_yaml(CATALOG, "unit.yml", &functions).unwrap();
        Dispatcher::new(Arc::new(catalog), Arc::new(functions), config)
    }

    fn default_dispatcher() -> Dispatcher {
        dispatcher(EngineConfig::default())
    }

    #[test]
    fn parses_header_and_message() {
        let record = default_dispatcher().dispatch(
            b"2024-01-15 fw01 10: Policy ID=10 Rate=50 exceeds threshold",
        );
        assert!(record.is_parsed());
        assert_eq!(record.get("policy_id"), Some("10"));
        assert_eq!(record.get("fld2"), Some("50"));
        assert_eq!(record.get("hhost"), Some("fw01"));
        assert_eq!(record.get("event.category"), Some("threshold"));
        assert_eq!(record.header_rule.as_deref(), Some("HEADER#0"));
        assert_eq!(record.message_rule.as_deref(), Some("MESSAGE#0"));
    }

    #[test]
    fn payload_defaults_to_unconsumed_remainder() {
        let record = default_dispatcher().dispatch(b"20| user=root");
        assert!(record.is_parsed());
        assert_eq!(record.header_rule.as_deref(), Some("HEADER#1"));
        assert_eq!(record.get("user"), Some("root"));
        assert_eq!(record.get("header_kind"), Some("pipe"));
    }

    #[test]
    fn unknown_message_id_keeps_header_fields() {
        let record = default_dispatcher().dispatch(b"2024-01-15 fw01 99: anything");
        assert_eq!(record.status, ParseStatus::UnknownMessageId);
        assert!(!record.is_parsed());
        assert_eq!(record.get("messageid"), Some("99"));
        assert_eq!(record.get("hhost"), Some("fw01"));
        assert_eq!(record.message_rule, None);
    }

    #[test]
    fn no_header_match() {
        let record = default_dispatcher().dispatch(b"garbage");
        assert_eq!(record.status, ParseStatus::NoHeaderMatch);
        assert_eq!(record.header_rule, None);
        assert_eq!(record.get("event.original"), Some("garbage"));
    }

    #[test]
    fn no_rule_match() {
        let record = default_dispatcher().dispatch(b"2024-01-15 fw01 20: nothing useful");
        assert_eq!(record.status, ParseStatus::NoRuleMatch);
        assert_eq!(record.header_rule.as_deref(), Some("HEADER#0"));
    }

    #[test]
    fn priority_is_stripped_and_decoded() {
        let record = default_dispatcher().dispatch(b"<134>20| user=admin\r\n");
        assert!(record.is_parsed());
        assert_eq!(record.get(FACILITY_FIELD), Some("16"));
        assert_eq!(record.get(SEVERITY_FIELD), Some("6"));
        assert_eq!(record.get("event.original"), Some("<134>20| user=admin"));
    }

    #[test]
    fn priority_kept_when_disabled() {
        let config = EngineConfigBuilder::new()
            .strip_priority(false)
            .build()
            .unwrap();
        let record = dispatcher(config).dispatch(b"<134>20| user=admin");
        assert_eq!(record.get(FACILITY_FIELD), None);
        assert_eq!(record.get("messageid"), Some("<134>20"));
        assert_eq!(record.status, ParseStatus::UnknownMessageId);
    }

    #[test]
    fn oversized_line() {
        let config = EngineConfigBuilder::new().max_line_bytes(8).build().unwrap();
        let record = dispatcher(config).dispatch(b"20| user=administrator");
        assert_eq!(record.status, ParseStatus::Oversized);
        assert!(record.fields.is_empty());
    }

    #[test]
    fn line_terminator_does_not_count_toward_size_limit() {
        let config = EngineConfigBuilder::new().max_line_bytes(12).build().unwrap();
        let d = dispatcher(config);

        let record = d.dispatch(b"20| user=roo\n");
        assert!(record.is_parsed());
        assert_eq!(record.get("user"), Some("roo"));
        assert!(d.dispatch(b"20| user=roo\r\n").is_parsed());

        assert_eq!(d.dispatch(b"20| user=root\n").status, ParseStatus::Oversized);
    }

    #[test]
    fn raw_not_kept_when_disabled() {
        let config = EngineConfigBuilder::new().keep_raw(false).build().unwrap();
        let record = dispatcher(config).dispatch(b"20| user=root");
        assert!(record.is_parsed());
        assert_eq!(record.get("event.original"), None);
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let record = default_dispatcher().dispatch(b"20| user=\xff\xfe");
        assert!(record.is_parsed());
        assert_eq!(record.get("user"), Some("\u{fffd}\u{fffd}"));
    }

    #[test]
    fn mappings_and_time_fill_apply_to_record() {
        let functions = FunctionRegistry::new();
        let catalog = CatalogLoader::parse_yaml(
            r#"
name: mapped
headers:
  - id: "HEADER#0"
    match: { pattern: "%{hdate} %{htime} %{hhost} %{messageid}: %{payload}" }
messages:
  "30":
    - id: "MESSAGE#0"
      match: { pattern: "%{saddr} -> %{daddr} bytes=%{bytes} %{act}" }
mappings:
  time_field: event_time
  fields:
    event_time: { convert: date, to: [ { field: "@timestamp" } ] }
    hhost: { to: [ { field: host.name, setter: prio, prio: 1 } ] }
    saddr:
      convert: ip
      to: [ { field: source.ip }, { field: related.ip, setter: append } ]
    daddr:
      convert: ip
      to: [ { field: destination.ip }, { field: related.ip, setter: append } ]
    bytes: { convert: long, to: [ { field: network.bytes } ] }
    act: { convert: lowercase, to: [ { field: event.action } ] }
"#,
            "mapped.yml",
            &functions,
        )
        .unwrap();
        let config = EngineConfigBuilder::new()
            .tz(msgparse_core::config::TzOffset::Fixed(0))
            .build()
            .unwrap();
        let d = Dispatcher::new(Arc::new(catalog), Arc::new(functions), config);

        let record = d.dispatch(b"2024-01-15 12:00:00 fw01 30: 10.0.0.1 -> 10.0.0.2 bytes=1024 DENY");
        assert!(record.is_parsed());
        assert_eq!(record.get("event_time"), Some("2024-01-15T12:00:00Z"));

        let text = |v: &str| MappedValue::Text(v.to_owned());
        assert_eq!(record.mapped("@timestamp"), Some(&text("2024-01-15T12:00:00Z")));
        assert_eq!(record.mapped("host.name"), Some(&text("fw01")));
        assert_eq!(record.mapped("source.ip"), Some(&text("10.0.0.1")));
        assert_eq!(record.mapped("network.bytes"), Some(&MappedValue::Long(1024)));
        assert_eq!(record.mapped("event.action"), Some(&text("deny")));
        assert_eq!(
            record.mapped("related.ip"),
            Some(&MappedValue::List(vec![text("10.0.0.2"), text("10.0.0.1")]))
        );
        // 추출 필드는 그대로 남음
        assert_eq!(record.get("saddr"), Some("10.0.0.1"));

        let record = d.dispatch(b"2024-01-15 12:00:00 fw01 30: fw02 -> 10.0.0.2 bytes=lots deny");
        assert_eq!(record.mapped("source.ip"), None);
        assert_eq!(record.mapped("network.bytes"), None);
        assert_eq!(
            record.mapped("related.ip"),
            Some(&MappedValue::List(vec![text("10.0.0.2")]))
        );

        let record = d.dispatch(b"garbage");
        assert!(record.mapped.is_empty());
        assert_eq!(record.get("event_time"), None);
    }

    #[test]
    fn catalog_without_mappings_leaves_mapped_empty() {
        let record = default_dispatcher().dispatch(b"2024-01-15 fw01 20: user=root");
        assert!(record.is_parsed());
        assert!(record.mapped.is_empty());
    }

    #[test]
    fn dispatch_into_clears_store() {
        let d = default_dispatcher();
        let mut store = FieldStore::new();
        store.set("stale", "value");

        let outcome = d.dispatch_into(b"20| user=root", &mut store);
        assert_eq!(outcome.status, ParseStatus::Parsed);
        assert!(!store.contains("stale"));

        d.dispatch_into(b"garbage", &mut store);
        assert!(!store.contains("user"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn shared_dispatcher_swaps_snapshot() {
        let shared = SharedDispatcher::new(default_dispatcher());
        let before = shared.load();
        assert!(shared.dispatch(b"20| user=root").is_parsed());

        let functions = FunctionRegistry::new();
        let replacement = CatalogLoader::parse_yaml(
            "name: other\nheaders:\n  - id: H\n    match: { pattern: \"%{messageid}| \" }\n",
            "other.yml",
            &functions,
        )
        .unwrap();
        let previous = shared.swap(Dispatcher::new(
            Arc::new(replacement),
            Arc::new(functions),
            EngineConfig::default(),
        ));

        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(shared.load().catalog().name(), "other");
        assert_eq!(
            shared.dispatch(b"20| user=root").status,
            ParseStatus::UnknownMessageId
        );
        // 이전 스냅샷은 여전히 사용 가능
        assert!(before.dispatch(b"20| user=root").is_parsed());
    }

    #[test]
    fn dispatcher_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dispatcher>();
        assert_send_sync::<SharedDispatcher>();
    }
}
