//! Parse collected response header lines.

/// Status line pieces: code and optional reason phrase.
pub(super) fn parse_status_line(line: &str) -> Option<(u32, Option<String>)> {
    let mut parts = line.trim().splitn(3, ' ');
    let proto = parts.next()?;
    if !proto.starts_with("HTTP/") {
        return None;
    }
    let code = parts.next()?.parse::<u32>().ok()?;
    let reason = parts
        .next()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    Some((code, reason))
}

/// Splits header lines of the last response into the reason phrase and
/// `(name, value)` pairs. Lines of earlier responses (redirects, 100-continue)
/// are dropped when a new status line starts.
pub(super) fn parse_headers(lines: &[String]) -> (Option<String>, Vec<(String, String)>) {
    let mut reason = None;
    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((_, r)) = parse_status_line(line) {
            reason = r;
            headers.clear();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    (reason, headers)
}
