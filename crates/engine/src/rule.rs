//! 규칙 -- 컴파일된 매처와 액션 체인의 묶음
//!
//! 규칙은 로드 시 한 번 컴파일되어 여러 스레드에서 상태 없이 재사용됩니다.

use crate::action::ActionChain;
use crate::matcher::MatcherId;

/// 카탈로그 내 규칙 식별자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub(crate) u32);

impl RuleId {
    /// 카탈로그 내 인덱스
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// 파싱 규칙
#[derive(Debug, Clone)]
pub struct Rule {
    id: Box<str>,
    matcher: MatcherId,
    actions: ActionChain,
}

impl Rule {
    /// 새 규칙을 생성합니다.
    pub fn new(id: impl Into<Box<str>>, matcher: MatcherId, actions: ActionChain) -> Self {
        Self {
            id: id.into(),
            matcher,
            actions,
        }
    }

    /// 규칙 ID (예: `MESSAGE#12`)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 매처
    pub fn matcher(&self) -> MatcherId {
        self.matcher
    }

    /// 액션 체인
    pub fn actions(&self) -> &ActionChain {
        &self.actions
    }
}

/// 규칙 후보 목록의 매칭 결과
#[derive(Debug, Clone, Copy)]
pub struct RuleMatch<'a> {
    /// 이긴 규칙의 ID
    pub id: RuleId,
    /// 이긴 규칙
    pub rule: &'a Rule,
    /// 소비한 입력 길이
    pub consumed: usize,
}
