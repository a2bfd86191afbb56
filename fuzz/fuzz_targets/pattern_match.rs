#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use msgparse_engine::MatcherArena;

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 패턴 소스 (최대 4개)
    patterns: Vec<String>,
    /// 조합 방식
    shape: Shape,
    /// 매칭 대상
    input: String,
}

#[derive(Arbitrary, Debug)]
enum Shape {
    Single,
    Sequence,
    Alternative,
}

fuzz_target!(|input: FuzzInput| {
    let mut arena = MatcherArena::new();

    // 컴파일 실패는 에러로만 보고되어야 한다
    let ids: Vec<_> = input
        .patterns
        .iter()
        .take(4)
        .filter_map(|src| arena.pattern(src).ok())
        .collect();
    let Some(&first) = ids.first() else {
        return;
    };

    let root = match input.shape {
        Shape::Single => Ok(first),
        Shape::Sequence => arena.sequence(ids),
        Shape::Alternative => arena.alternative(ids),
    };
    let Ok(root) = root else {
        return;
    };

    if let Some(outcome) = arena.match_prefix(root, &input.input) {
        // 소비 길이는 입력 안에 있고 문자 경계여야 한다
        assert!(outcome.consumed <= input.input.len());
        assert!(input.input.is_char_boundary(outcome.consumed));
    }
});
