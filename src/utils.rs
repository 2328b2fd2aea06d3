use chrono::{DateTime, Utc};

/// Parse an ISO8601 timestamp as returned by the YouTube API.
pub fn parse_timestamp(date_str: &str) -> Option<DateTime<Utc>> {
    if date_str.is_empty() {
        return None;
    }
    date_str.parse::<DateTime<Utc>>().ok()
}

/// Parse a compact ISO8601 duration (P[T]1H2M3S) into total seconds.
///
/// Any subset of the hour/minute/second units may be absent; a bare "P" or
/// "PT" is valid and yields 0. Malformed input also yields 0 rather than
/// failing, so one broken item never aborts a whole ingestion batch.
pub fn parse_duration_seconds(duration_str: &str) -> u32 {
    let Some(body) = duration_str.strip_prefix('P') else {
        return 0;
    };
    let body = body.strip_prefix('T').unwrap_or(body);

    let mut total: u64 = 0;
    let mut current_number = String::new();

    for ch in body.chars() {
        if ch.is_ascii_digit() {
            current_number.push(ch);
            continue;
        }
        let Ok(num) = current_number.parse::<u64>() else {
            // Unit with no digits in front of it.
            return 0;
        };
        match ch {
            'H' => total += num * 3600,
            'M' => total += num * 60,
            'S' => total += num,
            _ => return 0,
        }
        current_number.clear();
    }

    if !current_number.is_empty() {
        // Trailing digits without a unit.
        return 0;
    }

    total.min(u32::MAX as u64) as u32
}

/// Replace the HTML escapes the YouTube API emits in titles and
/// descriptions with their literal characters.
///
/// Recognized escapes are `&quot;`, `&amp;`, `&lt;`, `&gt;`, `&apos;` and
/// decimal numeric references like `&#39;`. Anything else passes through
/// untouched, so text without escapes comes back unchanged and a bare
/// ampersand stays a bare ampersand.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match decode_one_entity(tail) {
            Some((decoded, consumed)) => {
                out.push(decoded);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode the escape at the start of `s`, returning the literal character
/// and how many bytes the escape spans. None if `s` does not start with a
/// recognized escape.
fn decode_one_entity(s: &str) -> Option<(char, usize)> {
    const NAMED: [(&str, char); 5] = [
        ("&quot;", '"'),
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&apos;", '\''),
    ];
    for (name, ch) in NAMED {
        if s.starts_with(name) {
            return Some((ch, name.len()));
        }
    }

    // Decimal numeric reference: &#NNN;
    let body = s.strip_prefix("&#")?;
    let end = body.find(';')?;
    let digits = &body[..end];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let code: u32 = digits.parse().ok()?;
    let ch = char::from_u32(code)?;
    Some((ch, 2 + end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_full() {
        assert_eq!(parse_duration_seconds("PT1H2M3S"), 3723);
    }

    #[test]
    fn duration_unit_subsets() {
        assert_eq!(parse_duration_seconds("PT4M13S"), 253);
        assert_eq!(parse_duration_seconds("PT2H"), 7200);
        assert_eq!(parse_duration_seconds("PT45S"), 45);
        assert_eq!(parse_duration_seconds("PT10M"), 600);
        assert_eq!(parse_duration_seconds("P2H3S"), 7203);
    }

    #[test]
    fn duration_empty_is_zero() {
        assert_eq!(parse_duration_seconds("PT"), 0);
        assert_eq!(parse_duration_seconds("P"), 0);
    }

    #[test]
    fn duration_malformed_is_zero() {
        assert_eq!(parse_duration_seconds(""), 0);
        assert_eq!(parse_duration_seconds("1H2M3S"), 0);
        assert_eq!(parse_duration_seconds("PT1X"), 0);
        assert_eq!(parse_duration_seconds("PTH"), 0);
        assert_eq!(parse_duration_seconds("PT90"), 0);
        assert_eq!(parse_duration_seconds("ten minutes"), 0);
    }

    #[test]
    fn decode_named_entities() {
        assert_eq!(
            decode_entities("&quot;Fish &amp; Chips&quot; &lt;live&gt;"),
            "\"Fish & Chips\" <live>"
        );
        assert_eq!(decode_entities("it&apos;s"), "it's");
    }

    #[test]
    fn decode_numeric_reference() {
        assert_eq!(decode_entities("don&#39;t"), "don't");
        assert_eq!(decode_entities("caf&#233;"), "café");
    }

    #[test]
    fn decode_is_identity_without_escapes() {
        let plain = "Episode 12: Tom & Jerry roundup";
        assert_eq!(decode_entities(plain), plain);
        assert_eq!(decode_entities(""), "");
    }

    #[test]
    fn decode_leaves_unrecognized_escapes_alone() {
        assert_eq!(decode_entities("&nbsp;"), "&nbsp;");
        assert_eq!(decode_entities("&#x27;"), "&#x27;");
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(decode_entities("a & b &"), "a & b &");
    }

    #[test]
    fn decode_single_pass_never_redecodes() {
        // &amp;lt; decodes to the four literal characters "&lt;", not "<".
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn parses_api_timestamps() {
        let ts = parse_timestamp("2024-03-01T12:30:00Z").unwrap();
        assert_eq!(ts.timestamp(), 1709296200);
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
