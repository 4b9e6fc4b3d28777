use std::str::FromStr;

/// Parses a clap pattern such as `2,1` or `3`.
pub fn pattern_parser(s: &str) -> Result<Vec<u32>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Pattern string cannot be empty".to_string());
    }

    s.split(|c: char| c == ',' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let count: u32 = part.parse()
                .map_err(|_| format!("Invalid clap count: {}", part))?;
            if count == 0 {
                return Err("Clap counts must be positive".to_string());
            }
            Ok(count)
        })
        .collect()
}

/// Parses a strictly positive number, e.g. a duration or a frequency.
pub fn positive_parser(s: &str) -> Result<f64, String> {
    let s = s.trim();
    f64::from_str(s)
        .map_err(|e| format!("Invalid value '{}': {}", s, e))
        .and_then(|v| {
            if v.is_finite() && v > 0.0 {
                Ok(v)
            } else {
                Err(format!("Value must be positive, got {}", v))
            }
        })
}
