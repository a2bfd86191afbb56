//! 카탈로그 -- 컴파일된 헤더/메시지 규칙 집합
//!
//! 카탈로그는 다음을 소유합니다:
//! - 모든 매처를 담은 [`MatcherArena`]
//! - 헤더 규칙 목록 (선언 순서대로 시도)
//! - 메시지 ID -> 메시지 규칙 목록 디스패치 테이블
//! - 출력 필드 매핑 단계 ([`FieldMapper`])
//!
//! 메시지 ID 문자열은 로드 시 조밀한 정수 키([`MessageKey`])로 변환되어
//! 라인당 조회는 해시 한 번으로 끝납니다.
//!
//! 카탈로그는 빌드 이후 불변이며 `Arc<Catalog>`로 여러 스레드에서 공유됩니다.

pub mod lint;
pub mod loader;
pub mod types;

use std::collections::{HashMap, HashSet};

use crate::action::ActionChain;
use crate::error::EngineError;
use crate::mapping::FieldMapper;
use crate::matcher::{MatcherArena, MatcherId};
use crate::rule::{Rule, RuleId, RuleMatch};

pub use lint::LintFinding;
pub use loader::CatalogLoader;
pub use types::CatalogDef;

/// 메시지 ID의 조밀한 키
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageKey(u32);

impl MessageKey {
    /// 디스패치 테이블 내 인덱스
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// 컴파일된 카탈로그
#[derive(Debug)]
pub struct Catalog {
    name: String,
    arena: MatcherArena,
    rules: Vec<Rule>,
    headers: Box<[RuleId]>,
    message_keys: HashMap<Box<str>, MessageKey>,
    messages: Vec<Box<[RuleId]>>,
    mapper: FieldMapper,
}

impl Catalog {
    /// 카탈로그 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 매처 아레나
    pub fn arena(&self) -> &MatcherArena {
        &self.arena
    }

    /// 규칙을 조회합니다.
    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.index())
    }

    /// 헤더 규칙 목록 (선언 순서)
    pub fn header_rules(&self) -> &[RuleId] {
        &self.headers
    }

    /// 메시지 ID의 키를 조회합니다.
    pub fn message_key(&self, msgid: &str) -> Option<MessageKey> {
        self.message_keys.get(msgid).copied()
    }

    /// 메시지 키에 대응하는 규칙 목록 (선언 순서)
    pub fn message_rules(&self, key: MessageKey) -> &[RuleId] {
        self.messages.get(key.index()).map_or(&[], |rules| rules)
    }

    /// 등록된 메시지 ID 목록 (정렬됨)
    pub fn message_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.message_keys.keys().map(|id| &**id).collect();
        ids.sort_unstable();
        ids
    }

    /// 전체 규칙 수
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 출력 필드 매핑 단계
    pub fn mapper(&self) -> &FieldMapper {
        &self.mapper
    }

    /// 캡처 이름만 다른 후보 쌍을 찾습니다.
    pub fn lint(&self) -> Vec<LintFinding> {
        lint::lint(self)
    }

    /// 후보 규칙을 선언 순서대로 시도하여 첫 매칭 규칙을 반환합니다.
    ///
    /// 매칭된 규칙의 캡처만 `out`에 추가되며, 실패한 후보의 캡처는 남지 않습니다.
    pub fn match_rules<'a>(
        &'a self,
        candidates: &[RuleId],
        input: &'a str,
        out: &mut Vec<(&'a str, &'a str)>,
    ) -> Option<RuleMatch<'a>> {
        candidates.iter().find_map(|&id| {
            let rule = self.rule(id)?;
            let consumed = self.arena.match_into(rule.matcher(), input, out)?;
            Some(RuleMatch { id, rule, consumed })
        })
    }
}

/// 카탈로그 빌더
///
/// 매처는 [`CatalogBuilder::arena_mut`]로 먼저 만든 뒤 규칙에 연결합니다.
#[derive(Debug)]
pub struct CatalogBuilder {
    name: String,
    arena: MatcherArena,
    rules: Vec<Rule>,
    rule_ids: HashSet<String>,
    headers: Vec<RuleId>,
    message_keys: HashMap<Box<str>, MessageKey>,
    messages: Vec<Vec<RuleId>>,
    mapper: FieldMapper,
}

impl CatalogBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arena: MatcherArena::new(),
            rules: Vec::new(),
            rule_ids: HashSet::new(),
            headers: Vec::new(),
            message_keys: HashMap::new(),
            messages: Vec::new(),
            mapper: FieldMapper::new(),
        }
    }

    /// 매처 아레나
    pub fn arena_mut(&mut self) -> &mut MatcherArena {
        &mut self.arena
    }

    /// 출력 필드 매핑 단계
    pub fn mapper_mut(&mut self) -> &mut FieldMapper {
        &mut self.mapper
    }

    /// 헤더 규칙을 추가합니다.
    ///
    /// # Errors
    /// 규칙 ID가 중복되거나 매처가 이 아레나의 것이 아닌 경우
    pub fn add_header(
        &mut self,
        id: &str,
        matcher: MatcherId,
        actions: ActionChain,
    ) -> Result<RuleId, EngineError> {
        let rule_id = self.push_rule(id, matcher, actions)?;
        self.headers.push(rule_id);
        Ok(rule_id)
    }

    /// 메시지 ID에 메시지 규칙을 추가합니다.
    ///
    /// # Errors
    /// 규칙 ID가 중복되거나 매처가 이 아레나의 것이 아닌 경우
    pub fn add_message(
        &mut self,
        msgid: &str,
        id: &str,
        matcher: MatcherId,
        actions: ActionChain,
    ) -> Result<RuleId, EngineError> {
        let rule_id = self.push_rule(id, matcher, actions)?;
        let next_key = MessageKey(self.messages.len() as u32);
        let key = *self.message_keys.entry(Box::from(msgid)).or_insert(next_key);
        if key == next_key {
            self.messages.push(Vec::new());
        }
        self.messages[key.index()].push(rule_id);
        Ok(rule_id)
    }

    fn push_rule(
        &mut self,
        id: &str,
        matcher: MatcherId,
        actions: ActionChain,
    ) -> Result<RuleId, EngineError> {
        if self.arena.get(matcher).is_none() {
            return Err(EngineError::CatalogValidation {
                rule_id: id.to_owned(),
                reason: format!("matcher {} does not belong to this catalog", matcher.index()),
            });
        }
        if !self.rule_ids.insert(id.to_owned()) {
            return Err(EngineError::CatalogValidation {
                rule_id: id.to_owned(),
                reason: "duplicate rule id".to_owned(),
            });
        }
        let rule_id = RuleId(self.rules.len() as u32);
        self.rules.push(Rule::new(id, matcher, actions));
        Ok(rule_id)
    }

    /// 현재까지 추가된 규칙 수
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 카탈로그를 완성합니다.
    ///
    /// # Errors
    /// 헤더 규칙이 하나도 없는 경우
    pub fn build(self) -> Result<Catalog, EngineError> {
        if self.headers.is_empty() {
            return Err(EngineError::CatalogValidation {
                rule_id: self.name,
                reason: "catalog must define at least one header rule".to_owned(),
            });
        }

        Ok(Catalog {
            name: self.name,
            arena: self.arena,
            rules: self.rules,
            headers: self.headers.into_boxed_slice(),
            message_keys: self.message_keys,
            messages: self
                .messages
                .into_iter()
                .map(Vec::into_boxed_slice)
                .collect(),
            mapper: self.mapper,
        })
    }
}
