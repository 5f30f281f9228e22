use once_cell::sync::Lazy;
use regex::Regex;

static PARENTHESISED_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*(\d[\d,.\s]*)\)").expect("valid regex"));
static PLAIN_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,3}(?:,\d{3})+|\d+").expect("valid regex"));
static REVIEW_AVERAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)(?:[.,](\d+))?").expect("valid regex"));
static PLACE_COORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!3d(-?\d+(?:\.\d+)?)!4d(-?\d+(?:\.\d+)?)").expect("valid regex"));
static VIEWPORT_COORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(-?\d+(?:\.\d+)?),(-?\d+(?:\.\d+)?)").expect("valid regex"));

/// Number of reviews from text like `"(1,234)"` or `"87 reviews"`.
pub fn parse_review_count(text: &str) -> Option<u32> {
    let raw = match PARENTHESISED_COUNT.captures(text) {
        Some(captures) => captures.get(1)?.as_str(),
        None => PLAIN_COUNT.find(text)?.as_str(),
    };
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok()
}

/// Star rating in `[0, 5]` from text like `"4.6 stars"` or `"4,6"`.
pub fn parse_review_average(text: &str) -> Option<f64> {
    let captures = REVIEW_AVERAGE.captures(text)?;
    let whole = captures.get(1)?.as_str();
    let value = match captures.get(2) {
        Some(fraction) => format!("{}.{}", whole, fraction.as_str()),
        None => whole.to_string(),
    };

    value
        .parse::<f64>()
        .ok()
        .filter(|rating| (0.0..=5.0).contains(rating))
}

/// Latitude/longitude from a place URL.
///
/// The `!3d..!4d..` pair pins the place itself and wins over the `@lat,lng`
/// viewport centre.
pub fn parse_coordinates(url: &str) -> Option<(f64, f64)> {
    let captures = PLACE_COORDS
        .captures(url)
        .or_else(|| VIEWPORT_COORDS.captures(url))?;

    let lat = captures.get(1)?.as_str().parse::<f64>().ok()?;
    let lng = captures.get(2)?.as_str().parse::<f64>().ok()?;

    if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) {
        Some((lat, lng))
    } else {
        None
    }
}

/// Drops a leading `"Label:"` from accessibility labels such as
/// `"Phone: (512) 555-0100"`.
pub fn strip_label(text: &str) -> &str {
    match text.split_once(':') {
        Some((label, rest))
            if !label.is_empty()
                && label.len() <= 20
                && !rest.starts_with("//")
                && label.chars().all(|c| c.is_alphabetic() || c == ' ') =>
        {
            rest.trim()
        }
        _ => text.trim(),
    }
}

/// Trimmed text, or `None` if nothing is left.
pub fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
