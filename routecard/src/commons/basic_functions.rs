use std::cmp::Ordering;
use std::time::Duration;

use crate::collect::provider::FieldValue;

/// Compare two strings in human order: digit runs compare numerically,
/// so "Block 2" sorts before "Block 10"
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = split_runs(a);
    let right = split_runs(b);

    for (l, r) in left.iter().zip(right.iter()) {
        let ord = match (l.as_bytes().first(), r.as_bytes().first()) {
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => compare_digits(l, r),
            _ => l.cmp(r),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

/// Sort in place using [`natural_cmp`]
pub fn natural_sort(values: &mut [String]) {
    values.sort_by(|a, b| natural_cmp(a, b));
}

fn split_runs(text: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;
    for (idx, ch) in text.char_indices() {
        let digit = ch.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != digit => {
                runs.push(&text[start..idx]);
                start = idx;
            }
            _ => {}
        }
        in_digits = Some(digit);
    }
    if start < text.len() {
        runs.push(&text[start..]);
    }
    runs
}

// Arbitrary-length digit runs: strip leading zeros, then length, then lexical
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
}

/// Join values the way a sentence lists them: "a", "a and b", "a, b and c"
pub fn human_join(values: &[String]) -> String {
    match values.len() {
        0 => String::new(),
        1 => values[0].clone(),
        n => format!("{} and {}", values[..n - 1].join(", "), values[n - 1]),
    }
}

/// Build the positional attribute text of a matched feature:
/// the first value, then the remaining ones in parentheses
pub fn format_attributes(values: &[FieldValue]) -> String {
    let mut text = String::new();
    if let Some(first) = values.first() {
        text.push_str(&first.to_string());
    }
    if values.len() > 1 {
        let rest: Vec<String> = values[1..].iter().map(|v| v.to_string()).collect();
        text.push_str(&format!(" ({})", rest.join(", ")));
    }
    text
}

/// Known misspelling in the provincial place-name layers
pub fn fix_place_names(text: &str) -> String {
    text.replace("Shaha", "Skaha")
}

/// Buffer distances are reported as whole metres
pub fn format_distance(meters: f64) -> String {
    format!("{}", meters.trunc() as i64)
}

/// Round to one decimal and keep the trailing digit, e.g. 12 -> "12.0"
pub fn format_one_decimal(value: f64) -> String {
    format!("{:.1}", round_one_decimal(value))
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Push `value` unless it is already present, keeping first-seen order
pub fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Human readable run duration for the end-of-run log line
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 120.0 {
        format!("{} seconds.", secs as u64)
    } else if secs < 3600.0 {
        format!("{:.1} minutes.", secs / 60.0)
    } else {
        format!("{:.2} hours.", secs / 3600.0)
    }
}
