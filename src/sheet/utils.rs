/// Tokens a spreadsheet export uses for "no value".
const MISSING_TOKENS: &[&str] = &["nan", "NaN", "NA", "N/A", "null", "NULL", "None", "-"];

/// 1) Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// 2) A cell is missing when it is blank or a well-known null token.
pub fn is_missing(raw: &str) -> bool {
    let cleaned = clean_str(raw);
    cleaned.is_empty() || MISSING_TOKENS.contains(&cleaned.as_str())
}

/// 3) Coerce a cell to a finite `f64`.
///
/// Accepts thousands separators ("12,345.6"). Anything that doesn't parse, or
/// parses to NaN / infinity, is treated as a failed coercion.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    if is_missing(raw) {
        return None;
    }
    let cleaned = clean_str(raw);
    let value = match cleaned.parse::<f64>() {
        Ok(v) => v,
        Err(_) => cleaned.replace(',', "").parse::<f64>().ok()?,
    };
    value.is_finite().then_some(value)
}

/// 4) Coerce a cell to an integer year, truncating toward zero.
pub fn parse_year(raw: &str) -> Option<i64> {
    let value = parse_numeric(raw)?.trunc();
    if value < i64::MIN as f64 || value > i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}
