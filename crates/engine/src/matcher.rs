//! 매처 아레나 -- 패턴과 조합기(Sequence, Alternative)를 한곳에 보관합니다.
//!
//! 모든 매처는 [`MatcherArena`] 안에 저장되고 [`MatcherId`]로 참조됩니다.
//! 동일한 정의는 하나의 슬롯을 공유합니다:
//! 패턴은 원본 문자열로, 조합기는 자식 ID 목록으로 인터닝됩니다.
//!
//! 자식은 항상 부모보다 먼저 만들어지므로 아레나 안의 그래프는 순환하지 않습니다.
//!
//! # 조합기 의미
//! - **Sequence** (all_match): 단계를 순서대로 커서 위에서 실행합니다.
//!   한 단계라도 실패하면 전체가 실패하고 캡처는 하나도 남지 않습니다.
//! - **Alternative** (linear_select): 선언 순서대로 후보를 시도하여 첫 성공을 그대로 반환합니다.
//!   이후 후보는 평가하지 않고, 실패한 후보의 캡처는 보이지 않습니다.

use std::collections::HashMap;

use crate::error::CompileError;
use crate::pattern::{MatchOutcome, Pattern};

/// 아레나 내 매처 식별자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatcherId(u32);

impl MatcherId {
    /// 아레나 내 인덱스
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// 아레나에 저장된 매처
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// 단일 패턴
    Pattern(Pattern),
    /// 순차 조합 (all_match)
    Sequence(Box<[MatcherId]>),
    /// 선택 조합 (linear_select)
    Alternative(Box<[MatcherId]>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CombinatorKind {
    Sequence,
    Alternative,
}

/// 매처 아레나
#[derive(Debug, Default)]
pub struct MatcherArena {
    nodes: Vec<Matcher>,
    patterns: HashMap<Box<str>, MatcherId>,
    combinators: HashMap<(CombinatorKind, Box<[MatcherId]>), MatcherId>,
}

impl MatcherArena {
    /// 빈 아레나를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 패턴을 컴파일하여 추가합니다. 같은 원본 문자열은 기존 ID를 반환합니다.
    pub fn pattern(&mut self, src: &str) -> Result<MatcherId, CompileError> {
        if let Some(id) = self.patterns.get(src) {
            return Ok(*id);
        }
        let pattern = Pattern::compile(src)?;
        let id = self.push(Matcher::Pattern(pattern));
        self.patterns.insert(Box::from(src), id);
        Ok(id)
    }

    /// Sequence를 추가합니다.
    ///
    /// # Errors
    /// 단계가 비어 있거나 이 아레나의 ID가 아닌 경우
    pub fn sequence(&mut self, steps: Vec<MatcherId>) -> Result<MatcherId, CompileError> {
        if steps.is_empty() {
            return Err(CompileError::EmptySequence);
        }
        self.combinator(CombinatorKind::Sequence, steps)
    }

    /// Alternative를 추가합니다.
    ///
    /// # Errors
    /// 후보가 비어 있거나 이 아레나의 ID가 아닌 경우
    pub fn alternative(&mut self, candidates: Vec<MatcherId>) -> Result<MatcherId, CompileError> {
        if candidates.is_empty() {
            return Err(CompileError::EmptyAlternative);
        }
        self.combinator(CombinatorKind::Alternative, candidates)
    }

    fn combinator(
        &mut self,
        kind: CombinatorKind,
        children: Vec<MatcherId>,
    ) -> Result<MatcherId, CompileError> {
        if let Some(unknown) = children.iter().find(|id| id.index() >= self.nodes.len()) {
            return Err(CompileError::UnknownMatcher(unknown.0));
        }
        let children = children.into_boxed_slice();
        if let Some(id) = self.combinators.get(&(kind, children.clone())) {
            return Ok(*id);
        }
        let node = match kind {
            CombinatorKind::Sequence => Matcher::Sequence(children.clone()),
            CombinatorKind::Alternative => Matcher::Alternative(children.clone()),
        };
        let id = self.push(node);
        self.combinators.insert((kind, children), id);
        Ok(id)
    }

    fn push(&mut self, node: Matcher) -> MatcherId {
        let id = MatcherId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// 매처를 조회합니다.
    pub fn get(&self, id: MatcherId) -> Option<&Matcher> {
        self.nodes.get(id.index())
    }

    /// 모든 매처를 ID와 함께 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (MatcherId, &Matcher)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (MatcherId(idx as u32), node))
    }

    /// 저장된 매처 수
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 입력 앞부분에 매처를 실행합니다.
    pub fn match_prefix<'a>(&'a self, id: MatcherId, input: &'a str) -> Option<MatchOutcome<'a>> {
        let mut captures = Vec::new();
        let consumed = self.match_into(id, input, &mut captures)?;
        Some(MatchOutcome { captures, consumed })
    }

    /// 캡처를 `out`에 추가하며 매칭합니다. 실패하면 `out`은 호출 전 상태로 돌아갑니다.
    pub(crate) fn match_into<'a>(
        &'a self,
        id: MatcherId,
        input: &'a str,
        out: &mut Vec<(&'a str, &'a str)>,
    ) -> Option<usize> {
        match self.nodes.get(id.index())? {
            Matcher::Pattern(pattern) => pattern.match_into(input, out),
            Matcher::Sequence(steps) => {
                let mark = out.len();
                let mut cursor = 0;
                for step in steps.iter() {
                    match self.match_into(*step, &input[cursor..], out) {
                        Some(consumed) => cursor += consumed,
                        None => {
                            out.truncate(mark);
                            return None;
                        }
                    }
                }
                Some(cursor)
            }
            Matcher::Alternative(candidates) => candidates
                .iter()
                .find_map(|candidate| self.match_into(*candidate, input, out)),
        }
    }
}
