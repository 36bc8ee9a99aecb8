//! Table-driven token rewriting shared by the field normalisers.
//!
//! A normaliser is a `&'static [Step]`: each raw string enters as a single
//! token, and every step maps one token to zero, one or several tokens. A
//! step that drops a token is a filter, a step that yields several is a
//! split, everything else is a rewrite. Keeping the rules as data (rather
//! than inline `if`s in the merge loop) means each rule is testable on its
//! own and each layout's rule set reads as one table.

use once_cell::sync::Lazy;
use regex::Regex;

/// One rewrite, split or filter applied to a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Strip leading and trailing whitespace.
    Trim,
    Uppercase,
    /// Remove every whitespace character.
    RemoveWhitespace,
    /// Replace every occurrence of the first string with the second.
    Replace(&'static str, &'static str),
    /// Split on a separator character.
    SplitOn(char),
    /// Split on whitespace runs, dropping empty pieces.
    SplitWhitespace,
    /// Remove whitespace on either side of a hyphen (`2 - T12` → `2-T12`).
    TightenHyphens,
    /// Re-pair hyphen-delimited segments (`2-T12-3-T16` → `2-T12`, `3-T16`),
    /// keeping pairs that carry a `T` bar marker.
    HyphenPairs,
    /// Remove drawing cross-reference marks of the form `-A<alnum>`.
    StripBarMark,
    /// Rewrite the first `<qty> - T<dia>` occurrence as `<qty>-T<dia>`;
    /// tokens without one pass through unchanged.
    Canonicalize,
    /// `7T25` → `7-T25` when the part before the single `T` is all digits.
    Hyphenate,
    /// Drop empty tokens and lone `-` placeholders.
    DropPlaceholder,
    /// Keep only tokens containing at least one of these substrings.
    RequireAny(&'static [&'static str]),
    /// Keep only tokens made entirely of ASCII digits.
    RequireDigits,
    /// Replace the token with its first run of digits; drop it if none.
    FirstDigitRun,
    /// Append the canonical `" C/C"` spacing suffix.
    SuffixCentres,
    /// All-digit tokens get the `" C/C"` suffix, tokens already carrying
    /// `C/C` are uppercased, anything else is dropped.
    EnsureCentres,
    /// Re-space a trailing `C/C` as `" C/C"` (`150C/C` → `150 C/C`).
    SpaceCentres,
    /// Drop the `"0 C/C"` non-value.
    RejectZeroSpacing,
}

/// Canonical centre-to-centre suffix for stirrup spacing.
pub const CENTRES: &str = " C/C";

static RE_BAR_MARK: Lazy<Regex> = Lazy::new(|| Regex::new(r"-A[0-9A-Za-z]+").unwrap());

static RE_CALLOUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*-?\s*T(\d+)").unwrap());

static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

static RE_SPACED_HYPHEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*-\s*").unwrap());

impl Step {
    /// Apply this step to one token.
    pub fn apply(self, token: String) -> Vec<String> {
        match self {
            Step::Trim => vec![token.trim().to_string()],
            Step::Uppercase => vec![token.to_uppercase()],
            Step::RemoveWhitespace => {
                vec![token.chars().filter(|c| !c.is_whitespace()).collect()]
            }
            Step::Replace(from, to) => vec![token.replace(from, to)],
            Step::SplitOn(sep) => token.split(sep).map(str::to_string).collect(),
            Step::SplitWhitespace => token.split_whitespace().map(str::to_string).collect(),
            Step::TightenHyphens => vec![RE_SPACED_HYPHEN.replace_all(&token, "-").into_owned()],
            Step::HyphenPairs => hyphen_pairs(&token),
            Step::StripBarMark => vec![RE_BAR_MARK.replace_all(&token, "").into_owned()],
            Step::Canonicalize => vec![canonicalize(token)],
            Step::Hyphenate => vec![hyphenate(token)],
            Step::DropPlaceholder => keep_if(token, |t| !t.is_empty() && t != "-"),
            Step::RequireAny(needles) => keep_if(token, |t| needles.iter().any(|n| t.contains(n))),
            Step::RequireDigits => {
                keep_if(token, |t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()))
            }
            Step::FirstDigitRun => RE_DIGITS
                .find(&token)
                .map(|m| vec![m.as_str().to_string()])
                .unwrap_or_default(),
            Step::SuffixCentres => vec![format!("{token}{CENTRES}")],
            Step::EnsureCentres => ensure_centres(token),
            Step::SpaceCentres => vec![space_centres(token)],
            Step::RejectZeroSpacing => keep_if(token, |t| t != "0 C/C"),
        }
    }
}

/// Run a rule table over one raw value.
pub fn run(steps: &[Step], raw: &str) -> Vec<String> {
    steps.iter().fold(vec![raw.to_string()], |tokens, step| {
        tokens.into_iter().flat_map(|t| step.apply(t)).collect()
    })
}

fn keep_if(token: String, keep: impl FnOnce(&str) -> bool) -> Vec<String> {
    if keep(&token) {
        vec![token]
    } else {
        Vec::new()
    }
}

fn canonicalize(token: String) -> String {
    match RE_CALLOUT.captures(&token) {
        Some(caps) => format!("{}-T{}", &caps[1], &caps[2]),
        None => token,
    }
}

fn hyphenate(token: String) -> String {
    if !token.contains('T') || token.contains('-') {
        return token;
    }
    let parts: Vec<&str> = token.split('T').collect();
    match parts.as_slice() {
        [qty, dia] if !qty.is_empty() && qty.chars().all(|c| c.is_ascii_digit()) => {
            format!("{qty}-T{dia}")
        }
        _ => token,
    }
}

fn hyphen_pairs(token: &str) -> Vec<String> {
    let parts: Vec<&str> = token.split('-').collect();
    let pairs: Vec<String> = parts
        .chunks_exact(2)
        .map(|pair| format!("{}-{}", pair[0], pair[1]))
        .filter(|p| p.contains('T'))
        .collect();
    if !pairs.is_empty() {
        pairs
    } else if token.contains('T') {
        vec![token.to_string()]
    } else {
        Vec::new()
    }
}

fn ensure_centres(token: String) -> Vec<String> {
    if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
        vec![format!("{token}{CENTRES}")]
    } else if token.to_uppercase().contains("C/C") {
        vec![token.to_uppercase()]
    } else {
        Vec::new()
    }
}

fn space_centres(token: String) -> String {
    match token.strip_suffix("C/C").map(str::trim_end) {
        Some(head) if !head.is_empty() => format!("{head}{CENTRES}"),
        _ => token,
    }
}
