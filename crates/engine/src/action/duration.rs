//! 기간(duration) 포맷 파서
//!
//! `d` (일), `H` (시), `m` (분), `s` (초) 단위 토큰과 리터럴로 구성된 포맷을
//! 초 단위 정수로 변환합니다. 예: `"H:m:s"` 포맷으로 `"01:02:03"` -> `3723`.
//! `[text]`는 이스케이프된 리터럴입니다.

use crate::error::CompileError;

use super::datetime::{match_literal, take_number};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Token {
    /// 단위 토큰 (초 단위 배수)
    Unit(u64),
    Literal(Box<str>),
}

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const SECONDS_PER_HOUR: u64 = 60 * 60;
const SECONDS_PER_MINUTE: u64 = 60;

/// 컴파일된 기간 포맷
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DurationFormat {
    source: Box<str>,
    tokens: Box<[Token]>,
}

impl DurationFormat {
    /// 포맷 문자열을 컴파일합니다.
    pub fn compile(src: &str) -> Result<Self, CompileError> {
        let error = |reason: &str| CompileError::DurationFormat {
            format: src.to_owned(),
            reason: reason.to_owned(),
        };

        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut rest = src;

        while let Some(c) = rest.chars().next() {
            rest = &rest[c.len_utf8()..];
            let unit = match c {
                'd' => SECONDS_PER_DAY,
                'H' => SECONDS_PER_HOUR,
                'm' => SECONDS_PER_MINUTE,
                's' => 1,
                '[' => {
                    let close = rest.find(']').ok_or_else(|| error("unclosed '['"))?;
                    literal.push_str(&rest[..close]);
                    rest = &rest[close + 1..];
                    continue;
                }
                other => {
                    literal.push(other);
                    continue;
                }
            };
            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal).into_boxed_str()));
            }
            tokens.push(Token::Unit(unit));
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal.into_boxed_str()));
        }

        if !tokens.iter().any(|t| matches!(t, Token::Unit(_))) {
            return Err(error("no unit tokens"));
        }

        Ok(Self {
            source: Box::from(src),
            tokens: tokens.into_boxed_slice(),
        })
    }

    /// 원본 포맷 문자열
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 입력을 초 단위 기간으로 해석합니다.
    pub fn parse(&self, input: &str) -> Option<u64> {
        let mut total: u64 = 0;
        let mut pos = 0;

        for token in self.tokens.iter() {
            match token {
                Token::Unit(multiplier) => {
                    let (value, end) = take_number(input, pos)?;
                    let seconds = u64::try_from(value).ok()?.checked_mul(*multiplier)?;
                    total = total.checked_add(seconds)?;
                    pos = end;
                }
                Token::Literal(text) => pos = match_literal(input, pos, text)?,
            }
        }

        Some(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(format: &str, input: &str) -> Option<u64> {
        DurationFormat::compile(format).unwrap().parse(input)
    }

    #[test]
    fn hours_minutes_seconds() {
        assert_eq!(parse("H:m:s", "01:02:03"), Some(3723));
        assert_eq!(parse("H:m:s", "1:2:3"), Some(3723));
    }

    #[test]
    fn days_and_escaped_literals() {
        assert_eq!(parse("d[d] H[h]", "2d 3h"), Some(2 * 86400 + 3 * 3600));
        assert_eq!(parse("s[ seconds]", "45 seconds"), Some(45));
    }

    #[test]
    fn missing_number_fails() {
        assert_eq!(parse("H:m:s", "01:02"), None);
        assert_eq!(parse("H:m:s", "aa:bb:cc"), None);
    }

    #[test]
    fn leading_spaces_are_skipped() {
        assert_eq!(parse("m:s", "  5:07"), Some(307));
    }

    #[test]
    fn overflow_fails() {
        assert_eq!(parse("d", "99999999999999999"), None);
    }

    #[test]
    fn compile_errors() {
        assert!(DurationFormat::compile("").is_err());
        assert!(DurationFormat::compile("[abc").is_err());
        assert!(DurationFormat::compile("[dHms]").is_err());
    }
}
