// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ISO 8601 duration parsing for loop timeouts and retry intervals

use std::time::Duration;

/// Parse an ISO 8601 duration of the form `P[nD]T[nH][nM][nS]`.
///
/// Supports days, hours, minutes and seconds (fractional seconds included),
/// which covers every duration a workflow definition can carry. Years and
/// months are rejected: they have no fixed length.
pub fn parse_iso8601_duration(s: &str) -> Result<Duration, String> {
    let rest = s
        .strip_prefix('P')
        .ok_or_else(|| format!("invalid ISO 8601 duration '{s}': missing P"))?;
    if rest.is_empty() {
        return Err(format!("invalid ISO 8601 duration '{s}': empty"));
    }

    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, t),
        None => (rest, ""),
    };

    let mut total = Duration::ZERO;
    for (part, in_time) in [(date_part, false), (time_part, true)] {
        let mut number = String::new();
        for c in part.chars() {
            if c.is_ascii_digit() || c == '.' {
                number.push(c);
                continue;
            }
            let value: f64 = number
                .parse()
                .map_err(|_| format!("invalid ISO 8601 duration '{s}': bad number"))?;
            number.clear();
            let secs = match (c, in_time) {
                ('D', false) => value * 86_400.0,
                ('H', true) => value * 3_600.0,
                ('M', true) => value * 60.0,
                ('S', true) => value,
                ('Y', _) | ('M', false) => {
                    return Err(format!(
                        "invalid ISO 8601 duration '{s}': years/months are not supported"
                    ))
                }
                _ => return Err(format!("invalid ISO 8601 duration '{s}': unit '{c}'")),
            };
            total += Duration::from_secs_f64(secs);
        }
        if !number.is_empty() {
            return Err(format!("invalid ISO 8601 duration '{s}': trailing number"));
        }
    }
    Ok(total)
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
