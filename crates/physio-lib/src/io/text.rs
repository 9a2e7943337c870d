use anyhow::{Context, Result};
use std::path::Path;

/// Parse newline-delimited floating point series, ignoring blank/comment lines.
pub fn parse_f64_series(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let val: f64 = trimmed
            .parse()
            .with_context(|| format!("line {} is not f64: {}", idx + 1, trimmed))?;
        out.push(val);
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

/// Read a newline-delimited floating point series from disk.
pub fn read_f64_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_f64_series(&text)
}

/// Parse one notification payload written as hex, e.g. `00 01 2c` or `00012c`.
///
/// Whitespace, `:` and `-` separators are accepted between bytes. Returns
/// `Ok(None)` for blank and `#` comment lines.
pub fn parse_hex_payload(line: &str) -> Result<Option<Vec<u8>>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let digits: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(&digits);
    if !digits.is_ascii() {
        anyhow::bail!("non-hex characters in payload: {}", trimmed);
    }
    if digits.len() % 2 != 0 {
        anyhow::bail!("odd number of hex digits in payload: {}", trimmed);
    }
    let bytes = (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("invalid hex byte '{}' in {}", &digits[i..i + 2], trimmed))
        })
        .collect::<Result<Vec<u8>>>()?;
    Ok(Some(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_series_skipping_comments() {
        let series = parse_f64_series("# ecg\n0.5\n\n-1.25\n").unwrap();
        assert_eq!(series, vec![0.5, -1.25]);
        assert!(parse_f64_series("# nothing\n").is_err());
        assert!(parse_f64_series("abc").is_err());
    }

    #[test]
    fn parses_hex_payloads() {
        assert_eq!(
            parse_hex_payload("00 01 2c").unwrap(),
            Some(vec![0x00, 0x01, 0x2c])
        );
        assert_eq!(
            parse_hex_payload("0x0001022A").unwrap(),
            Some(vec![0x00, 0x01, 0x02, 0x2a])
        );
        assert_eq!(
            parse_hex_payload("a0:9e:1a").unwrap(),
            Some(vec![0xa0, 0x9e, 0x1a])
        );
        assert_eq!(parse_hex_payload("  # belt\n").unwrap(), None);
        assert!(parse_hex_payload("abc").is_err());
        assert!(parse_hex_payload("zz").is_err());
    }
}
