//! key=value 로그 라인 정규화
//!
//! 한 줄의 원시 텍스트를 [`Event`]로 변환합니다.
//!
//! # 라인 형식
//! ```text
//! <RFC 3339 TIMESTAMP> key1=value1 key2="value 2" ...
//! ```
//!
//! # 사용 예시
//! ```ignore
//! use logshield_pipeline::normalizer::KeyValueNormalizer;
//! use logshield_core::pipeline::LogParser;
//!
//! let normalizer = KeyValueNormalizer::new();
//! let event = normalizer.parse("2024-01-15T12:00:00Z service=ssh action=auth status=FAIL ip=1.2.3.4")?;
//! assert_eq!(event.service, "ssh");
//! ```

use chrono::{DateTime, Utc};
use logshield_core::error::ParseError;
use logshield_core::pipeline::LogParser;
use logshield_core::types::Event;

/// key=value 라인 노멀라이저
///
/// 상태가 없으므로 여러 수집 태스크가 `Arc`로 공유해 동시에 호출할 수 있습니다.
///
/// ## 규칙
/// - 앞뒤 공백 제거, 빈 라인은 [`ParseError::EmptyLine`]
/// - 큰따옴표로 감싼 값은 공백을 포함할 수 있음
/// - 토큰이 2개 미만이면 [`ParseError::BadFormat`]
/// - 첫 토큰은 RFC 3339 타임스탬프 (UTC로 정규화)
/// - 알 수 없는 키와 `=`가 없는 토큰은 무시, 중복 키는 마지막 값 사용
/// - `service`가 비어 있으면 [`ParseError::MissingService`]
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyValueNormalizer;

impl KeyValueNormalizer {
    /// 새 노멀라이저를 생성합니다.
    pub fn new() -> Self {
        Self
    }
}

impl LogParser for KeyValueNormalizer {
    fn format_name(&self) -> &str {
        "kv"
    }

    fn parse(&self, raw: &str) -> Result<Event, ParseError> {
        let line = raw.trim();
        if line.is_empty() {
            return Err(ParseError::EmptyLine);
        }

        let tokens = tokenize(line);
        if tokens.len() < 2 {
            return Err(ParseError::BadFormat);
        }

        let timestamp = parse_timestamp(tokens[0])?;
        let mut event = Event::new(timestamp, String::new());
        event.raw = raw.to_owned();

        let mut service = None;
        for token in &tokens[1..] {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            let value = unquote(value);
            let value = (!value.is_empty()).then(|| value.to_owned());

            match key {
                "service" => service = value,
                "action" => event.action = value,
                "user" => event.user = value,
                "ip" => event.ip = value,
                "status" => event.status = value,
                "path" => event.path = value,
                _ => {}
            }
        }

        event.service = service.ok_or(ParseError::MissingService)?;
        Ok(event)
    }
}

/// 공백 기준 토큰 분리 (큰따옴표 안의 공백은 유지)
fn tokenize(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_quotes = false;

    for (idx, ch) in line.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
            if start.is_none() {
                start = Some(idx);
            }
        } else if ch.is_whitespace() && !in_quotes {
            if let Some(s) = start.take() {
                tokens.push(&line[s..idx]);
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }

    // 닫히지 않은 따옴표는 라인 끝까지 하나의 토큰
    if let Some(s) = start {
        tokens.push(&line[s..]);
    }

    tokens
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_timestamp(token: &str) -> Result<DateTime<Utc>, ParseError> {
    DateTime::parse_from_rfc3339(token)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ParseError::BadTimestamp {
            token: token.to_owned(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(line: &str) -> Result<Event, ParseError> {
        KeyValueNormalizer::new().parse(line)
    }

    #[test]
    fn format_name_is_kv() {
        assert_eq!(KeyValueNormalizer::new().format_name(), "kv");
    }

    #[test]
    fn parse_full_line() {
        let event = parse(
            "2024-01-15T12:00:00Z service=auth action=login user=alice ip=10.0.0.5 status=FAIL",
        )
        .unwrap();
        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
        );
        assert_eq!(event.service, "auth");
        assert_eq!(event.action(), Some("login"));
        assert_eq!(event.user.as_deref(), Some("alice"));
        assert_eq!(event.ip(), Some("10.0.0.5"));
        assert_eq!(event.status(), Some("FAIL"));
        assert_eq!(event.path(), None);
    }

    #[test]
    fn quoted_value_keeps_whitespace() {
        let event = parse(r#"2024-01-15T12:00:00Z service=web path="/admin panel" status=404"#)
            .unwrap();
        assert_eq!(event.path(), Some("/admin panel"));
        assert_eq!(event.status(), Some("404"));
    }

    #[test]
    fn offset_timestamp_is_normalized_to_utc() {
        let event = parse("2024-01-15T21:00:00+09:00 service=ssh").unwrap();
        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn surrounding_whitespace_is_ignored_and_raw_kept_verbatim() {
        let event = parse("   2024-01-15T12:00:00Z service=ssh   ").unwrap();
        assert_eq!(event.service, "ssh");
        assert_eq!(event.raw, "   2024-01-15T12:00:00Z service=ssh   ");
    }

    #[test]
    fn empty_line_is_rejected() {
        assert_eq!(parse(""), Err(ParseError::EmptyLine));
        assert_eq!(parse("   \t "), Err(ParseError::EmptyLine));
    }

    #[test]
    fn single_token_is_bad_format() {
        assert_eq!(parse("2024-01-15T12:00:00Z"), Err(ParseError::BadFormat));
        // 토큰 수가 타임스탬프보다 먼저 검사됨
        assert_eq!(parse("garbage"), Err(ParseError::BadFormat));
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let err = parse("yesterday service=auth").unwrap_err();
        assert!(matches!(err, ParseError::BadTimestamp { ref token, .. } if token == "yesterday"));
    }

    #[test]
    fn missing_service_is_rejected() {
        assert_eq!(
            parse("2024-01-15T12:00:00Z action=login ip=1.2.3.4"),
            Err(ParseError::MissingService)
        );
        assert_eq!(
            parse("2024-01-15T12:00:00Z service= ip=1.2.3.4"),
            Err(ParseError::MissingService)
        );
    }

    #[test]
    fn unknown_keys_and_bare_tokens_are_ignored() {
        let event = parse("2024-01-15T12:00:00Z hello service=ssh pid=42 world").unwrap();
        assert_eq!(event.service, "ssh");
        assert_eq!(event.action(), None);
    }

    #[test]
    fn repeated_key_last_wins() {
        let event = parse("2024-01-15T12:00:00Z service=ssh ip=1.1.1.1 ip=2.2.2.2").unwrap();
        assert_eq!(event.ip(), Some("2.2.2.2"));
    }

    #[test]
    fn empty_value_is_none() {
        let event = parse(r#"2024-01-15T12:00:00Z service=web path="" status=404"#).unwrap();
        assert_eq!(event.path(), None);
    }

    #[test]
    fn value_may_contain_equals_sign() {
        let event = parse("2024-01-15T12:00:00Z service=web path=/login?next=/admin").unwrap();
        assert_eq!(event.path(), Some("/login?next=/admin"));
    }

    #[test]
    fn unterminated_quote_runs_to_end_of_line() {
        let event = parse(r#"2024-01-15T12:00:00Z service=web path="/a b"#).unwrap();
        assert_eq!(event.path(), Some("\"/a b"));
    }

    #[test]
    fn tokenize_splits_on_any_whitespace() {
        assert_eq!(tokenize("a\tb  c"), vec!["a", "b", "c"]);
        assert_eq!(tokenize(r#"k="x y" z"#), vec![r#"k="x y""#, "z"]);
    }
}
