use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{3}\s\d{1,2},\s\d{4}\.\s").expect("valid date regex"));
static NON_LETTERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z\s]").expect("valid letters regex"));

/// Canonical form used for labeling, training and prediction: lowercase ASCII
/// letters and whitespace only, without the posting date or buyer badge.
pub fn clean(text: &str) -> String {
    let lowered = text.to_lowercase();
    let undated = LEADING_DATE.replace(&lowered, "");
    let unbadged = undated.replace("verified buyer", "");
    NON_LETTERS.replace_all(&unbadged, "").trim().to_string()
}
