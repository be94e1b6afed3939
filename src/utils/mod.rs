//! Utility functions and helpers

use std::time::Duration;

use crate::errors::{Error, Result};

/// Parse a TTL string the way the broker accepts them.
///
/// Accepts plain seconds (`"3600"`) or one or more `<number><unit>` groups
/// with units `d`, `h`, `m`, `s` (`"6h"`, `"1h30m"`, `"90s"`).
pub fn parse_ttl(value: &str) -> Result<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation("Invalid duration: value is empty"));
    }

    if let Ok(seconds) = value.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let mut total: u64 = 0;
    let mut digits = String::new();

    for c in value.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let unit_secs = match c {
            'd' | 'D' => 86_400,
            'h' | 'H' => 3_600,
            'm' | 'M' => 60,
            's' | 'S' => 1,
            _ => {
                return Err(Error::validation(format!(
                    "Invalid duration unit '{}' in '{}': expected d, h, m or s",
                    c, value
                )))
            }
        };

        if digits.is_empty() {
            return Err(Error::validation(format!(
                "Invalid duration '{}': unit '{}' has no number",
                value, c
            )));
        }

        let quantity: u64 = digits
            .parse()
            .map_err(|e| Error::validation(format!("Invalid duration '{}': {}", value, e)))?;
        total = quantity
            .checked_mul(unit_secs)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| Error::validation(format!("Invalid duration '{}': overflow", value)))?;
        digits.clear();
    }

    if !digits.is_empty() {
        return Err(Error::validation(format!(
            "Invalid duration '{}': trailing number without unit",
            value
        )));
    }

    Ok(Duration::from_secs(total))
}

/// Format a duration compactly, e.g. `6h`, `5h59m12s`, `0s`.
pub fn format_ttl(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    if secs == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    for (unit, size) in [("h", 3_600), ("m", 60), ("s", 1)] {
        let n = secs / size;
        if n > 0 {
            out.push_str(&format!("{}{}", n, unit));
            secs %= size;
        }
    }
    out
}
