//! 패턴 컴파일러 -- `%{name}` 캡처 문법을 실행 가능한 매처로 변환합니다.
//!
//! # 문법
//! - `%{name}`: 다음 리터럴이 처음 나타나는 위치까지 최소 구간을 캡처
//! - `%{name->}`: 위와 같고, 다음 리터럴이 공백으로 시작하면 입력의 공백 1개 이상과 매칭.
//!   캡처 값의 앞뒤 공백은 제거됩니다.
//! - `%{}` / `%{->}`: 값을 버리는 캡처
//! - `{`가 뒤따르지 않는 `%`는 리터럴
//!
//! 마지막 세그먼트인 캡처는 입력의 나머지 전부를 가져가고,
//! 바로 다음에 다른 캡처가 오는 캡처는 빈 문자열을 가져갑니다.
//! 리터럴은 바이트 단위로 그대로 비교하며 정규식 메타문자는 없습니다.
//!
//! # 사용 예시
//! ```
//! use msgparse_engine::pattern::Pattern;
//!
//! let pattern = Pattern::compile("Policy ID=%{policy_id} Rate=%{fld2} exceeds threshold").unwrap();
//! let outcome = pattern.match_prefix("Policy ID=10 Rate=50 exceeds threshold").unwrap();
//! assert_eq!(outcome.captures, vec![("policy_id", "10"), ("fld2", "50")]);
//! ```

use std::collections::HashSet;
use std::fmt;

use crate::error::CompileError;

const CAPTURE_OPEN: &str = "%{";
const TRIM_SUFFIX: &str = "->";

/// 매칭 결과
///
/// 캡처는 패턴(또는 조합기) 순서대로 `(이름, 값)` 쌍으로 담깁니다.
/// 버리는 캡처(`%{}`)는 포함되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome<'a> {
    /// 캡처된 필드
    pub captures: Vec<(&'a str, &'a str)>,
    /// 소비한 입력 길이 (바이트)
    pub consumed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Capture {
    name: Option<Box<str>>,
    trim: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Literal(Box<str>),
    Capture(Capture),
}

/// 컴파일된 패턴
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    source: Box<str>,
    segments: Box<[Segment]>,
}

impl Pattern {
    /// 패턴 문자열을 컴파일합니다.
    ///
    /// # Errors
    /// - 빈 패턴
    /// - 닫히지 않은 `%{`
    /// - 같은 캡처 이름의 중복
    pub fn compile(src: &str) -> Result<Self, CompileError> {
        if src.is_empty() {
            return Err(CompileError::EmptyPattern);
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut names = HashSet::new();
        let mut rest = src;
        let mut offset = 0;

        while let Some(idx) = rest.find(CAPTURE_OPEN) {
            literal.push_str(&rest[..idx]);

            let body_start = idx + CAPTURE_OPEN.len();
            let close = rest[body_start..]
                .find('}')
                .ok_or(CompileError::UnclosedCapture {
                    offset: offset + idx,
                })?;
            let body = &rest[body_start..body_start + close];

            let (name, trim) = match body.strip_suffix(TRIM_SUFFIX) {
                Some(name) => (name, true),
                None => (body, false),
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(
                    std::mem::take(&mut literal).into_boxed_str(),
                ));
            }

            let name = if name.is_empty() {
                None
            } else {
                if !names.insert(name) {
                    return Err(CompileError::DuplicateCapture {
                        name: name.to_owned(),
                    });
                }
                Some(Box::from(name))
            };
            segments.push(Segment::Capture(Capture { name, trim }));

            let consumed = body_start + close + 1;
            rest = &rest[consumed..];
            offset += consumed;
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal.into_boxed_str()));
        }

        Ok(Self {
            source: Box::from(src),
            segments: segments.into_boxed_slice(),
        })
    }

    /// 원본 패턴 문자열
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 값을 저장하는 캡처 이름을 패턴 순서대로 반환합니다.
    pub fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Capture(Capture {
                name: Some(name), ..
            }) => Some(&**name),
            _ => None,
        })
    }

    /// 캡처 이름을 지운 골격 문자열
    ///
    /// 골격이 같고 원본이 다른 두 패턴은 캡처 이름만 다릅니다.
    pub fn skeleton(&self) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in self.segments.iter() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Capture(Capture { trim: true, .. }) => out.push_str("%{->}"),
                Segment::Capture(Capture { trim: false, .. }) => out.push_str("%{}"),
            }
        }
        out
    }

    /// 입력 앞부분에 패턴을 매칭합니다.
    ///
    /// 입력 시작에 고정(anchored)되며 입력 전체를 소비할 필요는 없습니다.
    pub fn match_prefix<'a>(&'a self, input: &'a str) -> Option<MatchOutcome<'a>> {
        let mut captures = Vec::new();
        let consumed = self.match_into(input, &mut captures)?;
        Some(MatchOutcome { captures, consumed })
    }

    /// 캡처를 `out`에 추가하며 매칭하고, 소비한 길이를 반환합니다.
    ///
    /// 실패하면 `out`은 호출 전 상태로 돌아갑니다.
    pub(crate) fn match_into<'a>(
        &'a self,
        input: &'a str,
        out: &mut Vec<(&'a str, &'a str)>,
    ) -> Option<usize> {
        let mark = out.len();
        let consumed = self.match_segments(input, out);
        if consumed.is_none() {
            out.truncate(mark);
        }
        consumed
    }

    fn match_segments<'a>(
        &'a self,
        input: &'a str,
        out: &mut Vec<(&'a str, &'a str)>,
    ) -> Option<usize> {
        let mut pos = 0;
        let mut pending: Option<&Capture> = None;

        for segment in self.segments.iter() {
            match segment {
                Segment::Capture(capture) => {
                    // 캡처 바로 뒤의 캡처: 앞 캡처는 빈 값
                    if let Some(previous) = pending.replace(capture) {
                        record(out, previous, "");
                    }
                }
                Segment::Literal(literal) => {
                    let rest = &input[pos..];
                    match pending.take() {
                        None => {
                            if !rest.starts_with(&**literal) {
                                return None;
                            }
                            pos += literal.len();
                        }
                        Some(capture) => {
                            let (value, advance) = find_boundary(rest, literal, capture.trim)?;
                            record(out, capture, value);
                            pos += advance;
                        }
                    }
                }
            }
        }

        if let Some(capture) = pending {
            record(out, capture, &input[pos..]);
            pos = input.len();
        }

        Some(pos)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn record<'a>(out: &mut Vec<(&'a str, &'a str)>, capture: &'a Capture, value: &'a str) {
    if let Some(name) = &capture.name {
        let value = if capture.trim { value.trim() } else { value };
        out.push((name, value));
    }
}

/// 캡처 다음 리터럴의 위치를 찾아 `(캡처 값, 소비 길이)`를 반환합니다.
fn find_boundary<'a>(rest: &'a str, literal: &str, trim: bool) -> Option<(&'a str, usize)> {
    if trim && literal.starts_with(char::is_whitespace) {
        let core = literal.trim_start();

        if core.is_empty() {
            let start = rest.find(char::is_whitespace)?;
            let end = rest.len() - rest[start..].trim_start().len();
            return Some((&rest[..start], end));
        }

        // 공백 1개 이상 + core
        let mut from = 0;
        while let Some(found) = rest[from..].find(core) {
            let at = from + found;
            let before = &rest[..at];
            if before.ends_with(char::is_whitespace) {
                return Some((before.trim_end(), at + core.len()));
            }
            from = at + core.chars().next().map_or(1, char::len_utf8);
        }
        return None;
    }

    let at = rest.find(literal)?;
    Some((&rest[..at], at + literal.len()))
}
