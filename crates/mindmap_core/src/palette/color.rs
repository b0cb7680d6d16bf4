//! CSS color value validation for palette input.

use once_cell::sync::Lazy;
use regex::Regex;

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").expect("valid hex regex")
});
static VAR_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^var\(--[A-Za-z0-9_-]+\)$").expect("valid var regex"));
static RGB_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^rgba?\(\s*\d{1,3}\s*,\s*\d{1,3}\s*,\s*\d{1,3}\s*(?:,\s*(?:0|1|0?\.\d+)\s*)?\)$")
        .expect("valid rgb regex")
});
static NAMED_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{3,32}$").expect("valid named color regex"));

/// Returns whether `value` is an accepted palette color.
///
/// Accepted: `#rgb`, `#rrggbb`, `#rrggbbaa`, `var(--token)`, `rgb()`/`rgba()`
/// and alphabetic CSS names.
pub fn is_valid_color(value: &str) -> bool {
    let value = value.trim();
    HEX_COLOR_RE.is_match(value)
        || VAR_COLOR_RE.is_match(value)
        || RGB_COLOR_RE.is_match(value)
        || NAMED_COLOR_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::is_valid_color;

    #[test]
    fn accepts_supported_forms() {
        for value in [
            "#fff",
            "#87CEEB",
            "#11223344",
            "var(--button-bg)",
            "rgb(1, 2, 3)",
            "rgba(10,20,30,0.5)",
            "teal",
        ] {
            assert!(is_valid_color(value), "{value} should be accepted");
        }
    }

    #[test]
    fn rejects_malformed_values() {
        for value in ["", "#ff", "#gggggg", "var(button)", "rgb(1,2)", "red;", "url(x)"] {
            assert!(!is_valid_color(value), "{value} should be rejected");
        }
    }
}
