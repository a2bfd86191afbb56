//! 날짜/시간 포맷 파서
//!
//! 벤더 로그의 다양한 타임스탬프를 [`DateFormat`] 목록으로 해석합니다.
//!
//! # 토큰 (긴 토큰 우선)
//! | 토큰 | 의미 |
//! |------|------|
//! | `YYYY` | 4자리 연도 (1000-9999) |
//! | `YY` | 2자리 연도 (00-69 -> 20xx, 70-99 -> 19xx) |
//! | `MMMM` / `MMM` | 월 이름 / 월 약어 (대소문자 무시) |
//! | `MM` / `M` | 2자리 월 / 1-2자리 월 |
//! | `DD` / `D` | 2자리 일 / 1-2자리 일 |
//! | `HH` / `H` | 시 (0-23) |
//! | `mm` / `m` | 분 |
//! | `ss` / `s` | 초 (60은 59로 보정) |
//! | `A` | AM/PM, A.M./P.M. (앞서 읽은 시에 적용) |
//! | `X` | 유닉스 epoch 초 |
//! | `[text]` | 이스케이프된 리터럴 |
//!
//! 그 외 문자는 리터럴입니다. 숫자 토큰은 앞 공백을 건너뜁니다.
//! 입력이나 포맷 중 하나가 끝나면 파싱을 멈추며, 결과에는 최소한 월과 일(또는 epoch)이 필요합니다.
//!
//! [`DateAssembler`]는 `year`, `month`, `time` 같은 개별 필드에 흩어진 조각을
//! 하나의 시각으로 조립합니다.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, SecondsFormat, TimeZone, Utc,
};
use msgparse_core::config::TzOffset;

use crate::error::CompileError;
use crate::field::FieldStore;

const TWO_DIGIT_YEAR_EPOCH: i32 = 70;
const MAX_EPOCH_SECONDS: i64 = 0x100_0000_0000;
/// 연도 없는 날짜가 미래로 허용되는 최대 간격
const MAX_FUTURE_DAYS: i64 = 2;

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    Year,
    Year2,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Epoch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Directive {
    /// 고정 폭 숫자
    Fixed(Field, usize),
    /// 가변 폭 숫자
    Variable(Field),
    MonthName,
    MonthAbbr,
    AmPm,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Token {
    Directive(Directive),
    Literal(Box<str>),
}

/// 토큰 문자열 -> 지시자. 긴 토큰이 먼저 와야 합니다.
const DIRECTIVES: &[(&str, Directive)] = &[
    ("YYYY", Directive::Fixed(Field::Year, 4)),
    ("YY", Directive::Fixed(Field::Year2, 2)),
    ("MMMM", Directive::MonthName),
    ("MMM", Directive::MonthAbbr),
    ("MM", Directive::Fixed(Field::Month, 2)),
    ("M", Directive::Variable(Field::Month)),
    ("DD", Directive::Fixed(Field::Day, 2)),
    ("D", Directive::Variable(Field::Day)),
    ("HH", Directive::Fixed(Field::Hour, 2)),
    ("H", Directive::Variable(Field::Hour)),
    ("mm", Directive::Fixed(Field::Minute, 2)),
    ("m", Directive::Variable(Field::Minute)),
    ("ss", Directive::Fixed(Field::Second, 2)),
    ("s", Directive::Variable(Field::Second)),
    ("A", Directive::AmPm),
    ("X", Directive::Variable(Field::Epoch)),
];

/// 컴파일된 날짜 포맷
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateFormat {
    source: Box<str>,
    tokens: Box<[Token]>,
}

/// 조각 필드 이름과 시도할 포맷. 조각 값의 구분자는 공백으로 바꾼 뒤 해석합니다.
const COMPONENTS: &[(&str, &[&str])] = &[
    ("day", &["D"]),
    ("year", &["YYYY"]),
    ("month", &["MMMM", "MMM", "M"]),
    ("date", &["YYYY M D", "YYYY MMMM D", "YYYY MMM D"]),
    ("hour", &["H"]),
    ("min", &["m"]),
    ("secs", &["s"]),
    ("time", &["H m s"]),
];

#[derive(Debug, Clone, Default)]
struct DateParts {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: u32,
    minute: u32,
    second: u32,
    epoch: Option<i64>,
}

impl DateFormat {
    /// 포맷 문자열을 컴파일합니다.
    ///
    /// # Errors
    /// 빈 포맷, 닫히지 않은 `[`, 날짜 토큰이 없는 포맷
    pub fn compile(src: &str) -> Result<Self, CompileError> {
        let error = |reason: &str| CompileError::DateFormat {
            format: src.to_owned(),
            reason: reason.to_owned(),
        };

        if src.is_empty() {
            return Err(error("empty format"));
        }

        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut rest = src;

        'outer: while !rest.is_empty() {
            if let Some(escaped) = rest.strip_prefix('[') {
                let close = escaped.find(']').ok_or_else(|| error("unclosed '['"))?;
                literal.push_str(&escaped[..close]);
                rest = &escaped[close + 1..];
                continue;
            }

            for &(text, directive) in DIRECTIVES {
                if let Some(after) = rest.strip_prefix(text) {
                    flush_literal(&mut literal, &mut tokens);
                    tokens.push(Token::Directive(directive));
                    rest = after;
                    continue 'outer;
                }
            }

            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                literal.push(c);
            }
            rest = chars.as_str();
        }
        flush_literal(&mut literal, &mut tokens);

        if tokens.iter().all(|t| matches!(t, Token::Literal(_))) {
            return Err(error("no date tokens"));
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

    /// 입력을 해석하여 UTC 시각을 반환합니다.
    ///
    /// 연도가 없으면 `now`의 연도를 쓰고, 그 결과가 `now`보다 2일 넘게 미래이면 전년도로 봅니다.
    pub fn parse(&self, input: &str, tz: TzOffset, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut parts = DateParts::default();
        self.parse_into(input, &mut parts)?;
        parts.resolve(tz, now)
    }

    fn parse_into(&self, input: &str, parts: &mut DateParts) -> Option<()> {
        let mut pos = 0;
        for token in self.tokens.iter() {
            if pos >= input.len() {
                break;
            }
            pos = match token {
                Token::Literal(text) => match_literal(input, pos, text)?,
                Token::Directive(directive) => parse_directive(*directive, input, pos, parts)?,
            };
        }
        Some(())
    }
}

/// 개별 필드에 나뉘어 기록된 날짜/시간 조각을 조립합니다.
///
/// 조각 필드는 `day`, `year`, `month`, `date`, `hour`, `min`, `secs`, `time`이며,
/// 없으면 `h` 접두어가 붙은 헤더 필드(`hdate`, `htime` 등)를 봅니다.
/// 조각마다 포맷을 순서대로 시도하고, 성공한 포맷의 결과만 반영합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateAssembler {
    components: Box<[(&'static str, Box<[DateFormat]>)]>,
}

impl DateAssembler {
    /// 조각 포맷을 컴파일합니다.
    pub fn new() -> Result<Self, CompileError> {
        let components = COMPONENTS
            .iter()
            .map(|&(field, formats)| {
                let formats = formats
                    .iter()
                    .map(|f| DateFormat::compile(f))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((field, formats.into_boxed_slice()))
            })
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(Self {
            components: components.into_boxed_slice(),
        })
    }

    /// 저장소의 조각 필드로 시각을 조립합니다. 월과 일을 얻지 못하면 `None`.
    pub fn assemble(
        &self,
        store: &FieldStore,
        tz: TzOffset,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let mut parts = DateParts::default();

        for (field, formats) in self.components.iter() {
            let Some(value) = store
                .get(field)
                .or_else(|| store.get(&format!("h{field}")))
            else {
                continue;
            };

            let normalized: String = value
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
                .collect();
            for format in formats.iter() {
                let mut attempt = parts.clone();
                if format.parse_into(&normalized, &mut attempt).is_some() {
                    parts = attempt;
                    break;
                }
            }
        }

        parts.resolve(tz, now)
    }
}

fn parse_directive(
    directive: Directive,
    input: &str,
    pos: usize,
    parts: &mut DateParts,
) -> Option<usize> {
    let end = match directive {
        Directive::Fixed(field, width) => {
            let start = skip_spaces(input, pos);
            let digits = input.get(start..start + width)?;
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            parts.set(field, digits.parse().ok()?)?;
            start + width
        }
        Directive::Variable(field) => {
            let (value, end) = take_number(input, pos)?;
            parts.set(field, value)?;
            end
        }
        Directive::MonthAbbr => {
            let start = skip_spaces(input, pos);
            let abbr = input.get(start..start + 3)?;
            let month = MONTH_NAMES
                .iter()
                .position(|name| name[..3].eq_ignore_ascii_case(abbr))?;
            parts.month = Some(month as u32 + 1);
            start + 3
        }
        Directive::MonthName => {
            let start = skip_spaces(input, pos);
            let (month, name) = MONTH_NAMES.iter().enumerate().find(|(_, name)| {
                input
                    .get(start..start + name.len())
                    .is_some_and(|s| s.eq_ignore_ascii_case(name))
            })?;
            parts.month = Some(month as u32 + 1);
            start + name.len()
        }
        Directive::AmPm => parse_am_pm(input, pos, parts)?,
    };
    Some(end)
}

impl DateParts {
    fn set(&mut self, field: Field, value: i64) -> Option<()> {
        let in_range = |min: i64, max: i64| (min..=max).contains(&value).then_some(value);
        match field {
            Field::Year => self.year = Some(in_range(1000, 9999)? as i32),
            Field::Year2 => {
                let yy = in_range(0, 99)? as i32;
                self.year = Some(if yy < TWO_DIGIT_YEAR_EPOCH {
                    2000 + yy
                } else {
                    1900 + yy
                });
            }
            Field::Month => self.month = Some(in_range(1, 12)? as u32),
            Field::Day => self.day = Some(in_range(1, 31)? as u32),
            Field::Hour => self.hour = in_range(0, 23)? as u32,
            Field::Minute => self.minute = in_range(0, 59)? as u32,
            Field::Second => self.second = in_range(0, 60)?.min(59) as u32,
            Field::Epoch => self.epoch = Some(in_range(0, MAX_EPOCH_SECONDS)?),
        }
        Some(())
    }

    fn resolve(&self, tz: TzOffset, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let Some(epoch) = self.epoch {
            return DateTime::from_timestamp(epoch, 0);
        }
        let (month, day) = (self.month?, self.day?);

        match self.year {
            Some(year) => self.at(year, month, day, tz),
            None => {
                let candidate = self.at(now.year(), month, day, tz)?;
                if candidate - now > Duration::days(MAX_FUTURE_DAYS) {
                    self.at(now.year() - 1, month, day, tz)
                } else {
                    Some(candidate)
                }
            }
        }
    }

    fn at(&self, year: i32, month: u32, day: u32, tz: TzOffset) -> Option<DateTime<Utc>> {
        let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(
            self.hour,
            self.minute,
            self.second,
        )?;
        let local = match tz {
            TzOffset::Local => Local.from_local_datetime(&naive).earliest()?.fixed_offset(),
            TzOffset::Fixed(seconds) => FixedOffset::east_opt(seconds)?
                .from_local_datetime(&naive)
                .single()?,
        };
        Some(local.with_timezone(&Utc))
    }
}

/// 파싱 결과를 레코드에 저장할 문자열로 변환합니다 (RFC 3339, UTC).
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn flush_literal(literal: &mut String, tokens: &mut Vec<Token>) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal).into_boxed_str()));
    }
}

fn parse_am_pm(input: &str, pos: usize, parts: &mut DateParts) -> Option<usize> {
    let start = skip_spaces(input, pos);
    let head = input.get(start..start + 2)?.to_ascii_uppercase();
    let (is_pm, dotted) = match head.as_str() {
        "AM" => (false, false),
        "PM" => (true, false),
        "A." => (false, true),
        "P." => (true, true),
        _ => return None,
    };
    let mut end = start + 2;
    if dotted {
        if !input.get(end..end + 2)?.eq_ignore_ascii_case("M.") {
            return None;
        }
        end += 2;
    }

    if is_pm && parts.hour < 12 {
        parts.hour += 12;
    } else if !is_pm && parts.hour == 12 {
        parts.hour = 0;
    }
    Some(end)
}

/// `pos`부터 공백(' ')을 건너뛴 위치
pub(super) fn skip_spaces(input: &str, pos: usize) -> usize {
    pos + input[pos..].bytes().take_while(|b| *b == b' ').count()
}

/// 공백을 건너뛰고 숫자 1개 이상을 읽어 `(값, 끝 위치)`를 반환합니다.
pub(super) fn take_number(input: &str, pos: usize) -> Option<(i64, usize)> {
    let start = skip_spaces(input, pos);
    let len = input[start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if len == 0 {
        return None;
    }
    let value = input[start..start + len].parse().ok()?;
    Some((value, start + len))
}

/// 리터럴을 정확히 매칭하고, 실패하면 양쪽의 앞 공백을 무시하고 다시 시도합니다.
pub(super) fn match_literal(input: &str, pos: usize, literal: &str) -> Option<usize> {
    if input[pos..].starts_with(literal) {
        return Some(pos + literal.len());
    }
    let literal = literal.trim_start_matches(' ');
    let start = skip_spaces(input, pos);
    input[start..]
        .starts_with(literal)
        .then_some(start + literal.len())
}
