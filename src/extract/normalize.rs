/// Largest value a normalized field may take.
pub const MAX_VALUE: i64 = i32::MAX as i64;

const NOISE: [&str; 4] = ["zł", "m²", "m2", "²"];
const GROUND_FLOOR: &str = "parter";

/// Integer value of `text`, 0 when no digits can be found.
pub fn normalize_integer(text: &str) -> i64 {
    digits_value(&clean(text)).unwrap_or(0)
}

/// Floor number of `text`: `Some(0)` for ground floor, `None` when the text
/// states nothing usable.
pub fn normalize_floor(text: &str) -> Option<i64> {
    if text.trim().is_empty() {
        return None;
    }
    if text.to_lowercase().contains(GROUND_FLOOR) {
        return Some(0);
    }
    digits_value(&clean(text))
}

/// Strips markers and whitespace, then keeps the leading integer part:
/// everything before a `/` and before the first decimal separator.
fn clean(text: &str) -> String {
    let mut clean = text.to_string();
    for marker in NOISE {
        clean = clean.replace(marker, "");
    }
    clean.retain(|c| !c.is_whitespace());

    if let Some(pos) = clean.find('/') {
        clean.truncate(pos);
    }
    if let Some(pos) = clean.find(|c: char| c == ',' || c == '.') {
        clean.truncate(pos);
    }
    clean
}

fn digits_value(text: &str) -> Option<i64> {
    let mut digits = text.chars().filter_map(|c| c.to_digit(10)).peekable();
    digits.peek()?;
    let value = digits.fold(0i64, |acc, d| {
        acc.saturating_mul(10).saturating_add(i64::from(d))
    });
    Some(value.min(MAX_VALUE))
}
