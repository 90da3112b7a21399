//! Duration literals: one or more `<int><unit>` groups, e.g. `1h30m`, `500ms`.

use std::time::Duration;

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;

fn unit_nanos(unit: &str) -> Option<u64> {
    let nanos = match unit {
        "ns" => 1,
        "us" => NANOS_PER_MICRO,
        "ms" => NANOS_PER_MILLI,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        "h" => 60 * 60 * NANOS_PER_SEC,
        "d" => 24 * 60 * 60 * NANOS_PER_SEC,
        "w" => 7 * 24 * 60 * 60 * NANOS_PER_SEC,
        _ => return None,
    };
    Some(nanos)
}

/// Parse a duration literal. Returns `None` on any malformed input or overflow.
pub fn parse_duration(literal: &str) -> Option<Duration> {
    let mut rest = literal.trim();
    if rest.is_empty() {
        return None;
    }

    let mut total: u64 = 0;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return None;
        }
        let magnitude: u64 = rest[..digits_end].parse().ok()?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let nanos = unit_nanos(&rest[..unit_end])?;
        rest = &rest[unit_end..];

        total = total.checked_add(magnitude.checked_mul(nanos)?)?;
    }

    Some(Duration::from_nanos(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::seconds("10s", Duration::from_secs(10))]
    #[case::compound("1h30m", Duration::from_secs(90 * 60))]
    #[case::millis("500ms", Duration::from_millis(500))]
    #[case::micros("7us", Duration::from_micros(7))]
    #[case::days_and_weeks("1w1d", Duration::from_secs(8 * 24 * 60 * 60))]
    #[case::zero("0s", Duration::ZERO)]
    fn parses_valid_literals(#[case] literal: &str, #[case] expected: Duration) {
        assert_eq!(parse_duration(literal), Some(expected));
    }

    #[rstest]
    #[case::empty("")]
    #[case::no_unit("10")]
    #[case::no_magnitude("h")]
    #[case::unknown_unit("3y")]
    #[case::negative("-1h")]
    #[case::inner_space("1h 30m")]
    #[case::overflow("99999999999999999999h")]
    fn rejects_malformed_literals(#[case] literal: &str) {
        assert_eq!(parse_duration(literal), None);
    }
}
