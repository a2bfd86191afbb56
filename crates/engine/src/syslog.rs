//! Syslog PRI 처리
//!
//! 라인 앞의 `<PRI>`를 제거하고 facility/severity로 분해합니다.
//!
//! ```text
//! <34>Oct 11 22:14:15 mymachine su: 'su root' failed
//!  ^^ PRI = facility(4) * 8 + severity(2)
//! ```

/// RFC 5424에서 유효한 최대 PRI 값
/// facility 최댓값 23 * 8 + severity 최댓값 7 = 191
const MAX_SYSLOG_PRI: u16 = 191;

/// PRI 숫자의 최대 자릿수
const MAX_PRI_DIGITS: usize = 3;

/// 분해된 syslog 우선순위
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Priority {
    /// facility (0-23)
    pub facility: u8,
    /// severity (0-7)
    pub severity: u8,
}

impl Priority {
    /// PRI 값에서 facility와 severity를 분리합니다.
    ///
    /// PRI = facility * 8 + severity
    pub fn decode(pri: u8) -> Self {
        Self {
            facility: pri / 8,
            severity: pri % 8,
        }
    }
}

/// 라인 앞의 `<PRI>`를 제거합니다.
///
/// 1-3자리 숫자이고 값이 0-191인 경우에만 제거하며, 그 외에는 라인을 그대로 반환합니다.
pub fn strip_priority(line: &str) -> (Option<Priority>, &str) {
    let Some(rest) = line.strip_prefix('<') else {
        return (None, line);
    };
    let Some(close) = rest.find('>') else {
        return (None, line);
    };

    let digits = &rest[..close];
    if digits.is_empty()
        || digits.len() > MAX_PRI_DIGITS
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return (None, line);
    }

    match digits.parse::<u16>() {
        Ok(pri) if pri <= MAX_SYSLOG_PRI => {
            (Some(Priority::decode(pri as u8)), &rest[close + 1..])
        }
        _ => (None, line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_pri_values() {
        assert_eq!(
            Priority::decode(34),
            Priority {
                facility: 4,
                severity: 2
            }
        );
        assert_eq!(
            Priority::decode(191),
            Priority {
                facility: 23,
                severity: 7
            }
        );
        assert_eq!(
            Priority::decode(0),
            Priority {
                facility: 0,
                severity: 0
            }
        );
    }

    #[test]
    fn strips_valid_priority() {
        let (pri, rest) = strip_priority("<134>Jan 15 12:00:00 fw01 msg");
        assert_eq!(
            pri,
            Some(Priority {
                facility: 16,
                severity: 6
            })
        );
        assert_eq!(rest, "Jan 15 12:00:00 fw01 msg");
    }

    #[test]
    fn leaves_invalid_priority_untouched() {
        for line in [
            "<192>too big",
            "<1234>too many digits",
            "<>empty",
            "<ab>letters",
            "<34 unterminated",
            "no priority",
            "",
        ] {
            assert_eq!(strip_priority(line), (None, line), "input: {line}");
        }
    }

    #[test]
    fn leading_zeros_are_accepted() {
        let (pri, rest) = strip_priority("<007>x");
        assert_eq!(pri.map(|p| p.severity), Some(7));
        assert_eq!(rest, "x");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn valid_priority_range(pri in 0u8..=191, body in "[ -~]{0,64}") {
                let line = format!("<{pri}>{body}");
                let (decoded, rest) = strip_priority(&line);
                prop_assert_eq!(decoded, Some(Priority::decode(pri)));
                prop_assert_eq!(rest, body.as_str());
            }

            #[test]
            fn arbitrary_input_does_not_panic(line in ".{0,64}") {
                let (_, rest) = strip_priority(&line);
                prop_assert!(line.ends_with(rest));
            }
        }
    }
}
