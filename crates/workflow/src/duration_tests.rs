// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    seconds      = { "PT30S", 30_000 },
    minutes      = { "PT5M", 300_000 },
    hours        = { "PT2H", 7_200_000 },
    days         = { "P1D", 86_400_000 },
    combined     = { "P1DT2H30M5S", 95_405_000 },
    fractional   = { "PT0.5S", 500 },
    zero_seconds = { "PT0S", 0 },
)]
fn parses_valid_durations(input: &str, expected_ms: u64) {
    assert_eq!(
        parse_iso8601_duration(input).unwrap(),
        Duration::from_millis(expected_ms)
    );
}

#[yare::parameterized(
    missing_p  = { "T30S" },
    empty      = { "P" },
    bad_number = { "PTxS" },
    months     = { "P3M" },
    years      = { "P1Y" },
    trailing   = { "PT30" },
    garbage    = { "30 seconds" },
)]
fn rejects_invalid_durations(input: &str) {
    assert!(parse_iso8601_duration(input).is_err());
}

#[test]
fn minutes_vs_months_disambiguated_by_t() {
    // M before T is months (rejected), after T is minutes
    assert!(parse_iso8601_duration("P2M").is_err());
    assert_eq!(
        parse_iso8601_duration("PT2M").unwrap(),
        Duration::from_secs(120)
    );
}
