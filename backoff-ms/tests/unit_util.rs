use backoff_ms::util::{format_millis, parse_millis, ParseDurationError};

#[test]
fn parse_bare_numbers_as_millis() {
    assert_eq!(parse_millis("1500"), Ok(1_500.0));
    assert_eq!(parse_millis(" 0.5 "), Ok(0.5));
    assert_eq!(parse_millis("1e3"), Ok(1_000.0));
    assert_eq!(parse_millis("-20"), Ok(-20.0));
}

#[test]
fn parse_units() {
    assert_eq!(parse_millis("250ms"), Ok(250.0));
    assert_eq!(parse_millis("1.5s"), Ok(1_500.0));
    assert_eq!(parse_millis("2m"), Ok(120_000.0));
    assert_eq!(parse_millis("24h"), Ok(86_400_000.0));
    assert_eq!(parse_millis("1d"), Ok(86_400_000.0));
    assert_eq!(parse_millis("5 S"), Ok(5_000.0));
    assert_eq!(parse_millis("250MS"), Ok(250.0));
}

#[test]
fn parse_rejects_garbage() {
    for input in ["", "abc", "5 parsecs", "1.2.3", "s", "10 m s"] {
        assert_eq!(
            parse_millis(input),
            Err(ParseDurationError::Invalid(input.to_string())),
            "{input:?}"
        );
    }
}

#[test]
fn format_picks_largest_whole_unit() {
    assert_eq!(format_millis(0.0), "0ms");
    assert_eq!(format_millis(750.0), "750ms");
    assert_eq!(format_millis(1_000.0), "1s");
    assert_eq!(format_millis(1_250.0), "1.25s");
    assert_eq!(format_millis(90_000.0), "1.5m");
    assert_eq!(format_millis(3_600_000.0), "1h");
    assert_eq!(format_millis(86_400_000.0), "1d");
}

#[test]
fn format_non_finite() {
    assert_eq!(format_millis(f64::NAN), "NaN");
    assert_eq!(format_millis(f64::INFINITY), "inf");
}
