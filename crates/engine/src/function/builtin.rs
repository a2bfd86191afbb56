//! 기본 제공 함수
//!
//! 벤더 카탈로그에서 자주 쓰이는 함수들입니다.
//! [`register_all`] 또는 [`FunctionRegistry::with_builtins`]로 등록합니다.

use crate::error::FunctionError;

use super::FunctionRegistry;

/// 따옴표로 인정하는 문자
const QUOTE_CHARS: [char; 3] = ['"', '\'', '`'];

/// 모든 기본 함수를 레지스트리에 등록합니다.
pub fn register_all(registry: &mut FunctionRegistry) {
    registry.register("STRCAT", strcat);
    registry.register("CALC", calc);
    registry.register("RMQ", rmq);
    registry.register("DIRCHK", dirchk);
}

/// 인자를 순서대로 이어 붙입니다.
pub fn strcat(args: &[&str]) -> Result<String, FunctionError> {
    Ok(args.concat())
}

/// 정수 산술 `CALC(a, op, b)` (`+`, `-`, `*`)
pub fn calc(args: &[&str]) -> Result<String, FunctionError> {
    let [a, op, b] = args else {
        return Err(FunctionError::Arity {
            expected: 3,
            got: args.len(),
        });
    };
    let a = parse_operand(a)?;
    let b = parse_operand(b)?;

    let result = match *op {
        "+" => a.checked_add(b),
        "-" => a.checked_sub(b),
        "*" => a.checked_mul(b),
        other => {
            return Err(FunctionError::InvalidArgument(format!(
                "unknown operator '{other}'"
            )));
        }
    };

    result
        .map(|value| value.to_string())
        .ok_or_else(|| FunctionError::InvalidArgument("arithmetic overflow".to_owned()))
}

fn parse_operand(value: &str) -> Result<i64, FunctionError> {
    let trimmed = value.trim();
    // 빈 값은 0으로 취급
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse::<i64>()
        .map_err(|_| FunctionError::InvalidArgument(format!("'{value}' is not an integer")))
}

/// 앞뒤 공백을 제거하고 같은 종류의 따옴표 한 겹을 벗깁니다.
pub fn rmq(args: &[&str]) -> Result<String, FunctionError> {
    let [value] = args else {
        return Err(FunctionError::Arity {
            expected: 1,
            got: args.len(),
        });
    };
    let value = value.trim();

    let mut chars = value.chars();
    let unquoted = match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if first == last && QUOTE_CHARS.contains(&first) => {
            &value[first.len_utf8()..value.len() - last.len_utf8()]
        }
        _ => value,
    };
    Ok(unquoted.to_owned())
}

/// 트래픽 방향 분류 `DIRCHK(source, destination, marker)`
///
/// 목적지만 marker와 같으면 `outbound`, 출발지만 같으면 `inbound`, 그 외는 `internal`.
pub fn dirchk(args: &[&str]) -> Result<String, FunctionError> {
    let [source, destination, marker] = args else {
        return Err(FunctionError::Arity {
            expected: 3,
            got: args.len(),
        });
    };
    let marker = marker.trim();
    if marker.is_empty() {
        return Err(FunctionError::InvalidArgument(
            "direction marker is empty".to_owned(),
        ));
    }

    let direction = match (source.trim() == marker, destination.trim() == marker) {
        (false, true) => "outbound",
        (true, false) => "inbound",
        _ => "internal",
    };
    Ok(direction.to_owned())
}
