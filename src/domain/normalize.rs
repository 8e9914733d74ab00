//! Locale-tolerant numeric literal normalization.
//!
//! Authored conditions often carry numbers written the way a human would type
//! them (`1,234.5`, `319,46`, `1.234.567`). The wrapped expression engine only
//! understands `.` as a decimal point, and reads `,` as an operator, so every
//! numeric token is rewritten into a canonical form before evaluation.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// ASCII digits only; other scripts are left to the engine untouched.
static NUMBER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?[0-9][0-9.,]*").expect("numeric token pattern is valid"));

/// Rewrite every ambiguous numeric literal in `expression`.
///
/// Characters outside matched tokens are preserved verbatim. Returns the input
/// unchanged (borrowed) when no token needs rewriting.
pub fn normalize_number_literals(expression: &str) -> Cow<'_, str> {
    NUMBER_TOKEN.replace_all(expression, |caps: &Captures<'_>| {
        normalize_number_token(&caps[0]).into_owned()
    })
}

/// Normalize a single numeric token matched by the literal scanner.
///
/// Tokens with at most one `.` and no `,` are already canonical and are
/// returned as-is, even when that single `.` was meant as a grouping
/// separator (`"1.234"` stays `"1.234"`).
pub fn normalize_number_token(token: &str) -> Cow<'_, str> {
    if !has_locale_separators(token) {
        return Cow::Borrowed(token);
    }

    let (sign, digits) = match token.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", token),
    };

    let has_comma = digits.contains(',');
    let has_dot = digits.contains('.');

    let body = if has_comma && has_dot {
        normalize_mixed(digits)
    } else if has_comma {
        match normalize_grouped(digits, ',') {
            Some(body) => body,
            None => return Cow::Borrowed(token),
        }
    } else {
        match normalize_grouped(digits, '.') {
            Some(body) => body,
            None => return Cow::Borrowed(token),
        }
    };

    Cow::Owned(format!("{sign}{body}"))
}

fn has_locale_separators(token: &str) -> bool {
    token.contains(',') || token.matches('.').nth(1).is_some()
}

/// Both separators present: the rightmost one is the decimal point, all other
/// separators are grouping marks.
fn normalize_mixed(digits: &str) -> String {
    let decimal_at = digits.rfind([',', '.']);

    digits
        .char_indices()
        .filter_map(|(index, ch)| match ch {
            '0'..='9' => Some(ch),
            ',' | '.' if Some(index) == decimal_at => Some('.'),
            _ => None,
        })
        .collect()
}

/// Only one kind of separator present. A three digit final group means every
/// separator is a grouping mark; anything else makes the last separator the
/// decimal point.
///
/// Returns `None` when the token has fewer than two non-trailing segments and
/// therefore nothing to rewrite.
fn normalize_grouped(digits: &str, separator: char) -> Option<String> {
    let mut segments: Vec<&str> = digits.split(separator).collect();
    while segments.last().is_some_and(|segment| segment.is_empty()) {
        segments.pop();
    }

    if separator == '.' && segments.len() <= 2 {
        return None;
    }

    let (last, leading) = segments.split_last()?;
    if leading.is_empty() {
        return None;
    }

    let mut body: String = leading.concat();
    if last.len() != 3 {
        body.push('.');
    }
    body.push_str(last);
    Some(body)
}
