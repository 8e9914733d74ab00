//! Placeholder resolution ahead of evaluation.
//!
//! Conditions are authored with `%key%` tokens that are filled in from the
//! subject being evaluated (`%player_level% > 10`). Resolution happens before
//! normalization, so resolved numbers go through the literal normalizer too.

use std::borrow::Cow;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PERCENT_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%([A-Za-z0-9_.\-]+)%").expect("placeholder pattern is valid"));
static PLACEHOLDER_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("placeholder key pattern is valid"));

/// Whether `key` can be written as a `%key%` token.
pub fn is_placeholder_key(key: &str) -> bool {
    PLACEHOLDER_KEY.is_match(key)
}

/// Replaces placeholder tokens in raw condition text for one subject.
pub trait PlaceholderResolver<S: ?Sized>: Send + Sync {
    fn resolve<'a>(&self, text: &'a str, subject: &S) -> Cow<'a, str>;
}

/// Resolver that leaves the text untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl<S: ?Sized> PlaceholderResolver<S> for Passthrough {
    fn resolve<'a>(&self, text: &'a str, _subject: &S) -> Cow<'a, str> {
        Cow::Borrowed(text)
    }
}

/// Source of placeholder values for a subject.
pub trait PlaceholderSource {
    fn placeholder(&self, key: &str) -> Option<Cow<'_, str>>;
}

impl PlaceholderSource for HashMap<String, String> {
    fn placeholder(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get(key).map(|value| Cow::Borrowed(value.as_str()))
    }
}

/// Resolves `%key%` tokens from a [`PlaceholderSource`] subject.
///
/// Unknown keys are left in place, so a missing placeholder surfaces as an
/// evaluation failure rather than silently changing the condition.
#[derive(Debug, Default, Clone, Copy)]
pub struct PercentPlaceholders;

impl<S> PlaceholderResolver<S> for PercentPlaceholders
where
    S: PlaceholderSource + ?Sized,
{
    fn resolve<'a>(&self, text: &'a str, subject: &S) -> Cow<'a, str> {
        PERCENT_TOKEN.replace_all(text, |caps: &Captures<'_>| {
            subject
                .placeholder(&caps[1])
                .map_or_else(|| caps[0].to_string(), Cow::into_owned)
        })
    }
}
