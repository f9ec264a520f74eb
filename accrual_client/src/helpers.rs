use std::time::Duration;

/// Parses the value of a `Retry-After` header.
///
/// Two forms are understood:
/// * a bare number of seconds, as per RFC 9110, e.g. `300`, and
/// * a sequence of decimal numbers with unit suffixes, e.g. `90s`, `1m30s`, `1.5h` or `250ms`.
///
/// Returns `None` for anything else, including negative values and HTTP dates.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.bytes().all(|b| b.is_ascii_digit()) {
        return value.parse::<u64>().ok().map(Duration::from_secs);
    }
    let mut rest = value;
    let mut total = 0f64;
    while !rest.is_empty() {
        let num_len = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
        if num_len == 0 {
            return None;
        }
        let number = rest[..num_len].parse::<f64>().ok()?;
        rest = &rest[num_len..];
        let unit_len = rest.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" | "μs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total += number * scale;
    }
    Duration::try_from_secs_f64(total).ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bare_seconds() {
        assert_eq!(parse_retry_after("300"), Some(Duration::from_secs(300)));
        assert_eq!(parse_retry_after(" 0 "), Some(Duration::ZERO));
    }

    #[test]
    fn unit_suffixes() {
        assert_eq!(parse_retry_after("60s"), Some(Duration::from_secs(60)));
        assert_eq!(parse_retry_after("1m30s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_retry_after("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_retry_after("1.5h"), Some(Duration::from_secs(5400)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_retry_after(""), None);
        assert_eq!(parse_retry_after("soon"), None);
        assert_eq!(parse_retry_after("-5s"), None);
        assert_eq!(parse_retry_after("10 parsecs"), None);
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }
}
