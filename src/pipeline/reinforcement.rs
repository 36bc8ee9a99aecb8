//! Reinforcement normalisation: bar callouts → canonical `<qty>-T<dia>`.
//!
//! The model transcribes bar callouts exactly as drawn, and drawings disagree:
//! `7T25`, `7-Y25`, `7#25`, `2-T16-A3` (with a bar-mark suffix), or several
//! groups joined with `+` in one cell. Each [`BarStyle`] is one rule table from
//! [`crate::pipeline::rules`]; a layout picks the style that matches how its
//! schedules are drawn.
//!
//! Tokens that no rule recognises are kept as-is; normalisation never
//! deletes data it does not understand, it only fails to improve it.

use crate::pipeline::rules::{self, Step};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which reinforcement rule table a layout applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarStyle {
    /// Full callout cleanup: `+` split, `Y`/`#` grades, bar marks, spacing.
    Callout,
    /// Compact cells such as `7T25`: strip spaces, collapse `TT`, add hyphen.
    Compact,
    /// Layered support cells: `+` split, placeholder `-` cells dropped.
    Layered,
    /// Strip drawings: run-on `2-T12-3-T16` text re-paired per bar group.
    Segmented,
    /// Case and whitespace folding only.
    Plain,
}

/// How the final reinforcement list is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarOrder {
    Lexicographic,
    /// Ascending `(diameter, quantity)`; unparseable tokens last.
    DiameterThenQuantity,
}

const CALLOUT: &[Step] = &[
    Step::SplitOn('+'),
    Step::Trim,
    Step::Uppercase,
    Step::RemoveWhitespace,
    Step::Replace("Y", "T"),
    Step::Replace("#", "T"),
    Step::StripBarMark,
    Step::Canonicalize,
    Step::DropPlaceholder,
];

const COMPACT: &[Step] = &[
    Step::SplitOn('+'),
    Step::Trim,
    Step::Uppercase,
    Step::RemoveWhitespace,
    Step::Replace("TT", "T"),
    Step::Hyphenate,
    Step::DropPlaceholder,
];

const LAYERED: &[Step] = &[
    Step::SplitOn('+'),
    Step::Trim,
    Step::Uppercase,
    Step::RemoveWhitespace,
    Step::DropPlaceholder,
];

// TH / EX are "through" and "extra" annotations written beside the bars.
const SEGMENTED: &[Step] = &[
    Step::Uppercase,
    Step::Replace("TH", ""),
    Step::Replace("EX", ""),
    Step::TightenHyphens,
    Step::SplitWhitespace,
    Step::HyphenPairs,
    Step::DropPlaceholder,
];

const PLAIN: &[Step] = &[
    Step::Trim,
    Step::Uppercase,
    Step::RemoveWhitespace,
    Step::DropPlaceholder,
];

impl BarStyle {
    pub fn rules(self) -> &'static [Step] {
        match self {
            BarStyle::Callout => CALLOUT,
            BarStyle::Compact => COMPACT,
            BarStyle::Layered => LAYERED,
            BarStyle::Segmented => SEGMENTED,
            BarStyle::Plain => PLAIN,
        }
    }
}

/// Normalise, deduplicate and order a reinforcement list.
pub fn normalize_reinforcement<S: AsRef<str>>(
    raw: &[S],
    style: BarStyle,
    order: BarOrder,
) -> Vec<String> {
    let unique: BTreeSet<String> = raw
        .iter()
        .flat_map(|r| rules::run(style.rules(), r.as_ref()))
        .collect();
    let mut bars: Vec<String> = unique.into_iter().collect();
    if order == BarOrder::DiameterThenQuantity {
        // Stable over the lexicographic order, so ties stay deterministic.
        bars.sort_by_key(|b| diameter_quantity_key(b));
    }
    bars
}

/// Sort key `(diameter, quantity)` for a `<qty>-T<dia>` callout.
///
/// Anything else maps to `(999, 999)` so it lands at the end instead of
/// being dropped.
pub fn diameter_quantity_key(bar: &str) -> (u32, u32) {
    const UNPARSEABLE: (u32, u32) = (999, 999);
    let mut parts = bar.split("-T");
    match (parts.next(), parts.next(), parts.next()) {
        (Some(qty), Some(dia), None) => match (dia.parse(), qty.parse()) {
            (Ok(d), Ok(q)) => (d, q),
            _ => UNPARSEABLE,
        },
        _ => UNPARSEABLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &[&str], style: BarStyle, order: BarOrder) -> Vec<String> {
        normalize_reinforcement(raw, style, order)
    }

    #[test]
    fn compact_collapses_spelling_variants() {
        let out = norm(
            &["7T25", "7-T25", " 7T25 "],
            BarStyle::Compact,
            BarOrder::DiameterThenQuantity,
        );
        assert_eq!(out, vec!["7-T25"]);
    }

    #[test]
    fn compact_collapses_doubled_marker() {
        let out = norm(&["2TT16"], BarStyle::Compact, BarOrder::Lexicographic);
        assert_eq!(out, vec!["2-T16"]);
    }

    #[test]
    fn diameter_then_quantity_order() {
        let out = norm(
            &["2-T16", "3-T12", "2-T12", "NIL"],
            BarStyle::Compact,
            BarOrder::DiameterThenQuantity,
        );
        assert_eq!(out, vec!["2-T12", "3-T12", "2-T16", "NIL"]);
    }

    #[test]
    fn unparseable_tokens_sort_last_and_survive() {
        assert_eq!(diameter_quantity_key("2-T16"), (16, 2));
        assert_eq!(diameter_quantity_key("2-T16-T8"), (999, 999));
        assert_eq!(diameter_quantity_key("T16"), (999, 999));
        let out = norm(
            &["B-RING", "4-T20"],
            BarStyle::Compact,
            BarOrder::DiameterThenQuantity,
        );
        assert_eq!(out, vec!["4-T20", "B-RING"]);
    }

    #[test]
    fn callout_grades_and_bar_marks() {
        let out = norm(
            &["2-Y16-A1 + 2#12", "3 - T20"],
            BarStyle::Callout,
            BarOrder::Lexicographic,
        );
        assert_eq!(out, vec!["2-T12", "2-T16", "3-T20"]);
    }

    #[test]
    fn callout_keeps_unrecognised_text() {
        let out = norm(&["NIL"], BarStyle::Callout, BarOrder::Lexicographic);
        assert_eq!(out, vec!["NIL"]);
    }

    #[test]
    fn layered_drops_placeholders() {
        let out = norm(
            &["-", "2-T16 + 1-T12", "", "2-t16"],
            BarStyle::Layered,
            BarOrder::Lexicographic,
        );
        assert_eq!(out, vec!["1-T12", "2-T16"]);
    }

    #[test]
    fn segmented_repairs_run_on_text() {
        let out = norm(
            &["2-T12-3-T16 TH", "2-T12EX"],
            BarStyle::Segmented,
            BarOrder::Lexicographic,
        );
        assert_eq!(out, vec!["2-T12", "3-T16"]);
    }

    #[test]
    fn segmented_keeps_space_separated_groups_apart() {
        let out = norm(
            &["2-T12 3-T16", "2-T12 TH 3-T16 EX", "2 - T12"],
            BarStyle::Segmented,
            BarOrder::Lexicographic,
        );
        assert_eq!(out, vec!["2-T12", "3-T16"]);
    }

    #[test]
    fn segmented_drops_non_bar_text() {
        let out = norm(&["(300X600)"], BarStyle::Segmented, BarOrder::Lexicographic);
        assert!(out.is_empty());
    }

    #[test]
    fn normalisation_is_idempotent() {
        let cases: [(&[&str], BarStyle, BarOrder); 4] = [
            (&["7T25", "2 - y16-A4", "NIL"], BarStyle::Callout, BarOrder::Lexicographic),
            (&["7T25", "2TT12"], BarStyle::Compact, BarOrder::DiameterThenQuantity),
            (&["2-T16+1-T12", "-"], BarStyle::Layered, BarOrder::Lexicographic),
            (&["2-T12-3-T16TH"], BarStyle::Segmented, BarOrder::Lexicographic),
        ];
        for (raw, style, order) in cases {
            let once = norm(raw, style, order);
            let twice = normalize_reinforcement(&once, style, order);
            assert_eq!(once, twice, "{style:?}");
        }
    }
}
