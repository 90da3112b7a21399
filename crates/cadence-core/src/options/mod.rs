//! Task options embedded in a script.
//!
//! A script declares its schedule with a record literal:
//!
//! ```text
//! option task = {name: "rollup", every: 1h30m, concurrency: 2}
//! ```
//!
//! Rules:
//! - `name` is required
//! - exactly one of `every` / `cron`
//! - `concurrency` defaults to 1 and must be at least 1
//! - `retry` defaults to 1
//! - unknown or repeated keys are rejected

mod duration;

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::ports::ScriptParser;

pub use duration::parse_duration;

const DEFAULT_CONCURRENCY: u32 = 1;
const DEFAULT_RETRY: u32 = 1;

/// Options parsed out of a task script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOptions {
    pub name: String,
    pub every: Option<Duration>,
    pub cron: Option<String>,
    pub delay: Option<Duration>,
    pub concurrency: u32,
    pub retry: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("no task options found in script")]
    Missing,

    #[error("malformed task options: {0}")]
    Malformed(String),

    #[error("unknown task option {0:?}")]
    UnknownKey(String),

    #[error("task option {0:?} given more than once")]
    DuplicateKey(String),

    #[error("missing name in task options")]
    MissingName,

    #[error("cron or every is required in task options")]
    NoSchedule,

    #[error("cannot use both cron and every in task options")]
    Conflict,

    #[error("invalid duration for {key}: {value:?}")]
    InvalidDuration { key: &'static str, value: String },

    #[error("invalid cron expression {0:?}")]
    InvalidCron(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Default `ScriptParser`: reads the `option task = {...}` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct FluxOptionsParser;

impl FluxOptionsParser {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptParser for FluxOptionsParser {
    fn parse(&self, script: &str) -> Result<TaskOptions, OptionsError> {
        let body = find_options_record(script)?;

        let mut name = None;
        let mut every = None;
        let mut cron = None;
        let mut delay = None;
        let mut concurrency = None;
        let mut retry = None;

        for field in split_top_level(body, ',') {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            let (key, value) = field
                .split_once(':')
                .ok_or_else(|| OptionsError::Malformed(format!("expected key: value, got {field:?}")))?;
            let (key, value) = (key.trim(), value.trim());

            match key {
                "name" => set_once(&mut name, "name", parse_string("name", value)?)?,
                "every" => set_once(&mut every, "every", parse_duration_value("every", value)?)?,
                "cron" => set_once(&mut cron, "cron", parse_cron(value)?)?,
                "delay" => set_once(&mut delay, "delay", parse_duration_value("delay", value)?)?,
                "concurrency" => {
                    set_once(&mut concurrency, "concurrency", parse_u32("concurrency", value)?)?
                }
                "retry" => set_once(&mut retry, "retry", parse_u32("retry", value)?)?,
                other => return Err(OptionsError::UnknownKey(other.to_string())),
            }
        }

        let name = name.filter(|n: &String| !n.is_empty()).ok_or(OptionsError::MissingName)?;

        match (&every, &cron) {
            (Some(_), Some(_)) => return Err(OptionsError::Conflict),
            (None, None) => return Err(OptionsError::NoSchedule),
            _ => {}
        }
        if every == Some(Duration::ZERO) {
            return Err(OptionsError::InvalidDuration {
                key: "every",
                value: "0".to_string(),
            });
        }

        let concurrency = concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(OptionsError::InvalidValue {
                key: "concurrency",
                value: "0".to_string(),
            });
        }

        Ok(TaskOptions {
            name,
            every,
            cron,
            delay,
            concurrency,
            retry: retry.unwrap_or(DEFAULT_RETRY),
        })
    }
}

/// Locate `option task = { ... }` and return the text between the braces.
///
/// Only code is scanned: `//` comments and string literals are skipped.
fn find_options_record(script: &str) -> Result<&str, OptionsError> {
    let mut in_string = false;
    let mut escaped = false;
    let mut in_comment = false;
    let mut prev: Option<char> = None;

    for (i, c) in script.char_indices() {
        if in_comment {
            in_comment = c != '\n';
        } else if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
        } else {
            match c {
                '"' => in_string = true,
                '/' if script[i..].starts_with("//") => in_comment = true,
                'o' if prev.is_none_or(|p| !is_ident_char(p)) => {
                    if let Some(rest) = script[i..].strip_prefix("option")
                        && let Some(record) = options_record_body(rest)
                    {
                        return record;
                    }
                }
                _ => {}
            }
        }
        prev = Some(c);
    }
    Err(OptionsError::Missing)
}

/// `rest` follows the `option` keyword. `None` when this is not the task option.
fn options_record_body(rest: &str) -> Option<Result<&str, OptionsError>> {
    let rest = strip_keyword(rest, "task")?.trim_start();
    let Some(rest) = rest.strip_prefix('=') else {
        return Some(Err(OptionsError::Malformed(
            "expected '=' after option task".into(),
        )));
    };
    let Some(rest) = rest.trim_start().strip_prefix('{') else {
        return Some(Err(OptionsError::Malformed(
            "expected '{' after option task =".into(),
        )));
    };

    Some(match find_closing_brace(rest) {
        Some(end) => Ok(&rest[..end]),
        None => Err(OptionsError::Malformed("unterminated task options record".into())),
    })
}

/// `text` must start with whitespace, then `keyword` as a whole word.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let trimmed = text.trim_start();
    if trimmed.len() == text.len() {
        return None;
    }
    let rest = trimmed.strip_prefix(keyword)?;
    match rest.chars().next() {
        Some(c) if is_ident_char(c) => None,
        _ => Some(rest),
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Byte offset of the `}` closing a record whose `{` was just consumed.
fn find_closing_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Split on `sep` outside of string literals.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == sep {
            parts.push(&text[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

fn set_once<T>(slot: &mut Option<T>, key: &str, value: T) -> Result<(), OptionsError> {
    if slot.is_some() {
        return Err(OptionsError::DuplicateKey(key.to_string()));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_string(key: &'static str, value: &str) -> Result<String, OptionsError> {
    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .filter(|_| value.len() >= 2)
        .ok_or_else(|| OptionsError::InvalidValue {
            key,
            value: value.to_string(),
        })?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {
                return Err(OptionsError::InvalidValue {
                    key,
                    value: value.to_string(),
                });
            }
        }
    }
    Ok(out)
}

fn parse_duration_value(key: &'static str, value: &str) -> Result<Duration, OptionsError> {
    parse_duration(value).ok_or_else(|| OptionsError::InvalidDuration {
        key,
        value: value.to_string(),
    })
}

fn parse_u32(key: &'static str, value: &str) -> Result<u32, OptionsError> {
    value.parse().map_err(|_| OptionsError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_cron(value: &str) -> Result<String, OptionsError> {
    let expr = parse_string("cron", value)?;
    let trimmed = expr.trim();

    // The cron crate wants a leading seconds field.
    let normalized = match trimmed.split_whitespace().count() {
        _ if trimmed.starts_with('@') => trimmed.to_string(),
        5 => format!("0 {trimmed}"),
        6 => trimmed.to_string(),
        _ => return Err(OptionsError::InvalidCron(expr)),
    };
    cron::Schedule::from_str(&normalized).map_err(|_| OptionsError::InvalidCron(expr.clone()))?;
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(script: &str) -> Result<TaskOptions, OptionsError> {
        FluxOptionsParser::new().parse(script)
    }

    #[test]
    fn parses_every_with_defaults() {
        let opts = parse(
            r#"option task = {name: "rollup", every: 1h}
from(bucket: "b") |> range(start: -1h)"#,
        )
        .unwrap();

        assert_eq!(opts.name, "rollup");
        assert_eq!(opts.every, Some(Duration::from_secs(3600)));
        assert_eq!(opts.cron, None);
        assert_eq!(opts.concurrency, 1);
        assert_eq!(opts.retry, 1);
        assert_eq!(opts.delay, None);
    }

    #[test]
    fn parses_cron_and_all_optional_keys() {
        let opts = parse(
            r#"option task = {
                name: "nightly, with comma",
                cron: "0 2 * * *",
                delay: 10m,
                concurrency: 4,
                retry: 3,
            }"#,
        )
        .unwrap();

        assert_eq!(opts.name, "nightly, with comma");
        assert_eq!(opts.cron.as_deref(), Some("0 2 * * *"));
        assert_eq!(opts.delay, Some(Duration::from_secs(600)));
        assert_eq!(opts.concurrency, 4);
        assert_eq!(opts.retry, 3);
    }

    #[test]
    fn escaped_quotes_in_name() {
        let opts = parse(r#"option task = {name: "say \"hi\"", every: 5s}"#).unwrap();
        assert_eq!(opts.name, r#"say "hi""#);
    }

    #[test]
    fn ignores_other_options() {
        let opts = parse(
            r#"option now = () => 2024-01-01T00:00:00Z
option task = {name: "t", every: 1m}"#,
        )
        .unwrap();
        assert_eq!(opts.name, "t");
    }

    #[rstest]
    #[case::no_options("from(bucket: \"b\")", OptionsError::Missing)]
    #[case::empty_script("", OptionsError::Missing)]
    #[case::no_name("option task = {every: 1h}", OptionsError::MissingName)]
    #[case::empty_name("option task = {name: \"\", every: 1h}", OptionsError::MissingName)]
    #[case::no_schedule("option task = {name: \"a\"}", OptionsError::NoSchedule)]
    #[case::both_schedules(
        "option task = {name: \"a\", every: 1h, cron: \"* * * * *\"}",
        OptionsError::Conflict
    )]
    #[case::unknown_key(
        "option task = {name: \"a\", every: 1h, color: 3}",
        OptionsError::UnknownKey("color".into())
    )]
    #[case::duplicate_key(
        "option task = {name: \"a\", every: 1h, every: 2h}",
        OptionsError::DuplicateKey("every".into())
    )]
    #[case::zero_concurrency(
        "option task = {name: \"a\", every: 1h, concurrency: 0}",
        OptionsError::InvalidValue { key: "concurrency", value: "0".into() }
    )]
    #[case::bad_every(
        "option task = {name: \"a\", every: soon}",
        OptionsError::InvalidDuration { key: "every", value: "soon".into() }
    )]
    #[case::bad_cron(
        "option task = {name: \"a\", cron: \"every day\"}",
        OptionsError::InvalidCron("every day".into())
    )]
    fn rejects_invalid_options(#[case] script: &str, #[case] expected: OptionsError) {
        assert_eq!(parse(script).unwrap_err(), expected);
    }

    #[test]
    fn unterminated_record_is_malformed() {
        let err = parse(r#"option task = {name: "a", every: 1h"#).unwrap_err();
        assert!(matches!(err, OptionsError::Malformed(_)));
    }

    #[test]
    fn option_must_be_a_whole_word() {
        let err = parse(r#"myoption task = {name: "a", every: 1h}"#).unwrap_err();
        assert_eq!(err, OptionsError::Missing);
    }

    #[rstest]
    #[case::line_comment("// option task = 1\noption task = {name: \"real\", every: 1h}")]
    #[case::trailing_comment("x = 1 // option task = {}\noption task = {name: \"real\", every: 1h}")]
    #[case::string_literal("s = \"option task = 1\"\noption task = {name: \"real\", every: 1h}")]
    #[case::escaped_quote("s = \"\\\" option task = 1\"\noption task = {name: \"real\", every: 1h}")]
    fn skips_options_outside_code(#[case] script: &str) {
        assert_eq!(parse(script).unwrap().name, "real");
    }

    #[test]
    fn commented_out_record_is_missing() {
        let err = parse(r#"// option task = {name: "a", every: 1h}"#).unwrap_err();
        assert_eq!(err, OptionsError::Missing);
    }
}
