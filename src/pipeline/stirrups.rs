//! Stirrup cleaning: diameters and spacings, normalised independently.
//!
//! Diameters arrive as `T8`, `Y10`, `#8@`, `2L-T8`; spacings as `150`,
//! `@150 c/c`, `150mm C/C`, `±100`. Both lists end up as sorted sets. Spacing
//! styles that produce the canonical `" C/C"` suffix drop `"0 C/C"`: a zero
//! centre distance is an extraction artefact, never a real detail.

use crate::pipeline::rules::{self, Step};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which stirrup-diameter rule table a layout applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiaStyle {
    /// Case and whitespace folding only.
    Plain,
    /// Grade letters folded to `T`, `@` and `±` decoration removed.
    Decorated,
    /// Keep leg-configuration tokens (`2L-T8`) and bar tokens; drop the rest.
    LegAware,
}

/// Which stirrup-spacing rule table a layout applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpacingStyle {
    /// Case and whitespace folding; a trailing `C/C` is re-spaced canonically.
    Plain,
    /// Suffix stripped; only purely numeric remainders are kept.
    DigitsOnly,
    /// Decoration stripped; the first run of digits is the spacing.
    FirstDigitRun,
    /// Bare numbers get the suffix; values already carrying `C/C` pass through.
    PreSuffixed,
}

const DIA_PLAIN: &[Step] = &[
    Step::Trim,
    Step::Uppercase,
    Step::RemoveWhitespace,
    Step::DropPlaceholder,
];

const DIA_DECORATED: &[Step] = &[
    Step::Uppercase,
    Step::Replace("Y", "T"),
    Step::Replace("#", "T"),
    Step::Replace("@", ""),
    Step::Replace("±", ""),
    Step::RemoveWhitespace,
    Step::DropPlaceholder,
];

const DIA_LEG_AWARE: &[Step] = &[
    Step::Uppercase,
    Step::RemoveWhitespace,
    Step::RequireAny(&["L-", "T"]),
];

const SPACING_PLAIN: &[Step] = &[
    Step::Uppercase,
    Step::RemoveWhitespace,
    Step::SpaceCentres,
    Step::DropPlaceholder,
];

const SPACING_DIGITS_ONLY: &[Step] = &[
    Step::Uppercase,
    Step::RemoveWhitespace,
    Step::Replace("C/C", ""),
    Step::Replace("C", ""),
    Step::RequireDigits,
    Step::SuffixCentres,
    Step::RejectZeroSpacing,
];

const SPACING_FIRST_DIGIT_RUN: &[Step] = &[
    Step::Replace("@", ""),
    Step::Replace("±", ""),
    Step::Replace("/", ""),
    Step::Trim,
    Step::FirstDigitRun,
    Step::SuffixCentres,
    Step::RejectZeroSpacing,
];

const SPACING_PRE_SUFFIXED: &[Step] = &[
    Step::Trim,
    Step::EnsureCentres,
    Step::RemoveWhitespace,
    Step::SpaceCentres,
    Step::RejectZeroSpacing,
];

impl DiaStyle {
    pub fn rules(self) -> &'static [Step] {
        match self {
            DiaStyle::Plain => DIA_PLAIN,
            DiaStyle::Decorated => DIA_DECORATED,
            DiaStyle::LegAware => DIA_LEG_AWARE,
        }
    }
}

impl SpacingStyle {
    pub fn rules(self) -> &'static [Step] {
        match self {
            SpacingStyle::Plain => SPACING_PLAIN,
            SpacingStyle::DigitsOnly => SPACING_DIGITS_ONLY,
            SpacingStyle::FirstDigitRun => SPACING_FIRST_DIGIT_RUN,
            SpacingStyle::PreSuffixed => SPACING_PRE_SUFFIXED,
        }
    }
}

pub fn clean_dia<S: AsRef<str>>(raw: &[S], style: DiaStyle) -> Vec<String> {
    sorted_set(raw, style.rules())
}

pub fn clean_spacing<S: AsRef<str>>(raw: &[S], style: SpacingStyle) -> Vec<String> {
    sorted_set(raw, style.rules())
}

fn sorted_set<S: AsRef<str>>(raw: &[S], steps: &[Step]) -> Vec<String> {
    raw.iter()
        .flat_map(|r| rules::run(steps, r.as_ref()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_digit_run_collapses_and_drops_zero() {
        let out = clean_spacing(&["150", "150mm C/C", "0"], SpacingStyle::FirstDigitRun);
        assert_eq!(out, vec!["150 C/C"]);
    }

    #[test]
    fn first_digit_run_strips_decoration() {
        let out = clean_spacing(&["@100", "±125 c/c", "REST"], SpacingStyle::FirstDigitRun);
        assert_eq!(out, vec!["100 C/C", "125 C/C"]);
    }

    #[test]
    fn digits_only_rejects_units() {
        let out = clean_spacing(
            &["150 c/c", "200C", "150mm", "0"],
            SpacingStyle::DigitsOnly,
        );
        assert_eq!(out, vec!["150 C/C", "200 C/C"]);
    }

    #[test]
    fn pre_suffixed_passes_suffixed_values() {
        let out = clean_spacing(
            &["150", "100 c/c", "REST", "0"],
            SpacingStyle::PreSuffixed,
        );
        assert_eq!(out, vec!["100 C/C", "150 C/C"]);
    }

    #[test]
    fn plain_spacing_dedups_case_variants() {
        let out = clean_spacing(&["150 c/c", " 150  C/C", ""], SpacingStyle::Plain);
        assert_eq!(out, vec!["150 C/C"]);
    }

    #[test]
    fn plain_spacing_dedups_gap_variants() {
        let out = clean_spacing(&["150 C/C", "150C/C", "150 c/c"], SpacingStyle::Plain);
        assert_eq!(out, vec!["150 C/C"]);
    }

    #[test]
    fn pre_suffixed_dedups_gap_variants() {
        let out = clean_spacing(&["100C/C", "100 c/c", "0c/c"], SpacingStyle::PreSuffixed);
        assert_eq!(out, vec!["100 C/C"]);
    }

    #[test]
    fn decorated_dia() {
        let out = clean_dia(&["Y8@", "#8", " t8 ", "±10"], DiaStyle::Decorated);
        assert_eq!(out, vec!["10", "T8"]);
    }

    #[test]
    fn leg_aware_dia() {
        let out = clean_dia(&["2l-t8", "T10", "NIL", "8"], DiaStyle::LegAware);
        assert_eq!(out, vec!["2L-T8", "T10"]);
    }

    #[test]
    fn plain_dia_is_sorted_set() {
        let out = clean_dia(&["T10", "T8", "t8", "-"], DiaStyle::Plain);
        assert_eq!(out, vec!["T10", "T8"]);
    }

    #[test]
    fn canonical_spacing_is_a_fixed_point() {
        for style in [
            SpacingStyle::Plain,
            SpacingStyle::DigitsOnly,
            SpacingStyle::FirstDigitRun,
            SpacingStyle::PreSuffixed,
        ] {
            let once = clean_spacing(&["150", "200 C/C"], style);
            assert_eq!(clean_spacing(&once, style), once, "{style:?}");
        }
    }
}
