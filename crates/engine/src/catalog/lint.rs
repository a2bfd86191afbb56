//! 카탈로그 린트 -- 캡처 이름만 다른 후보 탐지
//!
//! 같은 선택 지점(Alternative, 헤더 목록, 메시지 규칙 목록) 안의 두 패턴이
//! 리터럴 골격은 같고 캡처 이름만 다르면, 앞선 후보가 항상 먼저 이기므로
//! 뒤 후보는 도달할 수 없습니다. 이런 쌍은 보고만 하고 수정하지 않습니다.
//!
//! 패턴은 원문 기준으로 인터닝되므로 완전히 같은 패턴을 쓰는 두 후보는
//! 같은 [`MatcherId`]를 가집니다. 이 경우도 뒤 후보는 도달할 수 없습니다.

use std::collections::HashMap;
use std::fmt;

use crate::matcher::{Matcher, MatcherId};
use crate::rule::RuleId;

use super::Catalog;

/// 린트 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    /// 선택 지점 (예: `headers`, `message '10'`, `alternative #4`)
    pub location: String,
    /// 먼저 선언된 후보
    pub first: String,
    /// 도달할 수 없는 후보
    pub second: String,
    /// 공통 골격
    pub skeleton: String,
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: '{}' shadows '{}' (same skeleton '{}'), later candidate is unreachable",
            self.location, self.first, self.second, self.skeleton
        )
    }
}

pub(super) fn lint(catalog: &Catalog) -> Vec<LintFinding> {
    let arena = catalog.arena();
    let mut findings = Vec::new();

    for (id, node) in arena.iter() {
        if let Matcher::Alternative(candidates) = node {
            let labelled = candidates.iter().map(|&child| (child, pattern_label(catalog, child)));
            check(catalog, &format!("alternative #{}", id.index()), labelled, &mut findings);
        }
    }

    let rule_labels = |rules: &[RuleId]| -> Vec<(MatcherId, String)> {
        rules
            .iter()
            .filter_map(|&id| catalog.rule(id))
            .map(|rule| (rule.matcher(), rule.id().to_owned()))
            .collect()
    };

    check(
        catalog,
        "headers",
        rule_labels(catalog.header_rules()).into_iter(),
        &mut findings,
    );

    for msgid in catalog.message_ids() {
        if let Some(key) = catalog.message_key(msgid) {
            check(
                catalog,
                &format!("message '{msgid}'"),
                rule_labels(catalog.message_rules(key)).into_iter(),
                &mut findings,
            );
        }
    }

    findings
}

fn pattern_label(catalog: &Catalog, id: MatcherId) -> String {
    match catalog.arena().get(id) {
        Some(Matcher::Pattern(pattern)) => pattern.source().to_owned(),
        _ => format!("#{}", id.index()),
    }
}

fn check(
    catalog: &Catalog,
    location: &str,
    candidates: impl Iterator<Item = (MatcherId, String)>,
    findings: &mut Vec<LintFinding>,
) {
    // 골격 -> 첫 후보 라벨
    let mut seen: HashMap<String, String> = HashMap::new();

    for (id, label) in candidates {
        let Some(Matcher::Pattern(pattern)) = catalog.arena().get(id) else {
            continue;
        };
        let skeleton = pattern.skeleton();
        match seen.get(&skeleton) {
            Some(first) => findings.push(LintFinding {
                location: location.to_owned(),
                first: first.clone(),
                second: label,
                skeleton,
            }),
            None => {
                seen.insert(skeleton, label);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionChain;
    use crate::catalog::CatalogBuilder;

    #[test]
    fn flags_alternative_branches_with_same_skeleton() {
        let mut builder = CatalogBuilder::new("demo");
        let arena = builder.arena_mut();
        let a = arena.pattern("user=%{user} ").unwrap();
        let b = arena.pattern("user=%{username} ").unwrap();
        let c = arena.pattern("uid=%{uid} ").unwrap();
        let alt = arena.alternative(vec![a, b, c]).unwrap();
        builder.add_header("H", alt, ActionChain::default()).unwrap();
        let catalog = builder.build().unwrap();

        let findings = catalog.lint();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].first, "user=%{user} ");
        assert_eq!(findings[0].second, "user=%{username} ");
        assert_eq!(findings[0].skeleton, "user=%{} ");
        assert!(findings[0].to_string().contains("unreachable"));
    }

    #[test]
    fn flags_message_rules_with_same_skeleton() {
        let mut builder = CatalogBuilder::new("demo");
        let header = builder.arena_mut().pattern("%{messageid}: %{payload}").unwrap();
        builder
            .add_header("H", header, ActionChain::default())
            .unwrap();
        let a = builder.arena_mut().pattern("src=%{saddr}").unwrap();
        let b = builder.arena_mut().pattern("src=%{daddr}").unwrap();
        builder
            .add_message("10", "MESSAGE#0", a, ActionChain::default())
            .unwrap();
        builder
            .add_message("10", "MESSAGE#1", b, ActionChain::default())
            .unwrap();
        let catalog = builder.build().unwrap();

        let findings = catalog.lint();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].location, "message '10'");
        assert_eq!(findings[0].first, "MESSAGE#0");
        assert_eq!(findings[0].second, "MESSAGE#1");
    }

    #[test]
    fn trim_and_plain_captures_differ() {
        let mut builder = CatalogBuilder::new("demo");
        let arena = builder.arena_mut();
        let a = arena.pattern("%{x->} end").unwrap();
        let b = arena.pattern("%{y} end").unwrap();
        let alt = arena.alternative(vec![a, b]).unwrap();
        builder.add_header("H", alt, ActionChain::default()).unwrap();
        assert!(builder.build().unwrap().lint().is_empty());
    }

    #[test]
    fn shared_matcher_at_one_choice_point_is_flagged() {
        let mut builder = CatalogBuilder::new("demo");
        let m = builder.arena_mut().pattern("%{messageid}: %{payload}").unwrap();
        builder.add_header("H0", m, ActionChain::default()).unwrap();
        builder.add_header("H1", m, ActionChain::default()).unwrap();

        let findings = builder.build().unwrap().lint();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].location, "headers");
        assert_eq!(findings[0].first, "H0");
        assert_eq!(findings[0].second, "H1");
    }

    #[test]
    fn identical_patterns_from_yaml_are_flagged() {
        let catalog = crate::catalog::CatalogLoader::parse_yaml(
            r#"
name: dup
fragments:
  twice: { alternative: [ { pattern: "x=%{x}" }, { pattern: "x=%{x}" } ] }
headers:
  - id: "HEADER#0"
    match: { pattern: "%{messageid}: %{payload}" }
messages:
  "10":
    - id: "MESSAGE#0"
      match: { pattern: "user=%{user}" }
      actions: [ { set: { dest: event.action, value: login } } ]
    - id: "MESSAGE#1"
      match: { pattern: "user=%{user}" }
      actions: [ { set: { dest: event.action, value: logout } } ]
"#,
            "dup.yml",
            &crate::function::FunctionRegistry::new(),
        )
        .unwrap();

        let findings = catalog.lint();
        assert_eq!(findings.len(), 2, "got: {findings:?}");

        let message = findings
            .iter()
            .find(|f| f.location == "message '10'")
            .expect("duplicate message rule should be reported");
        assert_eq!(message.first, "MESSAGE#0");
        assert_eq!(message.second, "MESSAGE#1");

        let alternative = findings
            .iter()
            .find(|f| f.location.starts_with("alternative"))
            .expect("duplicate alternative branch should be reported");
        assert_eq!(alternative.first, "x=%{x}");
        assert_eq!(alternative.second, "x=%{x}");
    }
}
