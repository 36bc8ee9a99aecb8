//! Layout patterns and the per-layout pipeline profile.
//!
//! Beam schedules come in eight known header layouts. Rather than one
//! hand-written pipeline per layout, every layout is described by a
//! [`LayoutProfile`] value: which normalisation rule tables apply, whether
//! pages are sliced, how fragments are merged, and what happens when the model
//! replies with something that is not JSON. The pipeline in
//! [`crate::extract`] is written once against this profile.

use crate::error::ScheduleError;
use crate::pipeline::reinforcement::{BarOrder, BarStyle};
use crate::pipeline::stirrups::{DiaStyle, SpacingStyle};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the eight known beam-schedule layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LayoutPattern {
    /// BEAM / SIZE / TOP, BOTTOM and STIRRUPS by left, mid span, right.
    Pattern1,
    /// "Beam marked" schedule whose size column reads `B x D/d`.
    Pattern2,
    /// "Beam marked" schedule whose size column reads `B x D`.
    Pattern3,
    /// Elevation/type table with top A, B, C, D1 and bottom G, E, D2.
    Pattern4,
    /// Elevation/type table with only top A and bottom B.
    Pattern5,
    /// Layered support table without a GRID ID column.
    Pattern6,
    /// Layered support table with a GRID ID column.
    Pattern7,
    /// Strip beam detail drawing, not a table.
    Pattern8,
}

impl LayoutPattern {
    /// Every layout, in number order.
    pub const ALL: [LayoutPattern; 8] = [
        LayoutPattern::Pattern1,
        LayoutPattern::Pattern2,
        LayoutPattern::Pattern3,
        LayoutPattern::Pattern4,
        LayoutPattern::Pattern5,
        LayoutPattern::Pattern6,
        LayoutPattern::Pattern7,
        LayoutPattern::Pattern8,
    ];

    /// The layout's number, 1–8.
    pub fn number(self) -> u8 {
        match self {
            LayoutPattern::Pattern1 => 1,
            LayoutPattern::Pattern2 => 2,
            LayoutPattern::Pattern3 => 3,
            LayoutPattern::Pattern4 => 4,
            LayoutPattern::Pattern5 => 5,
            LayoutPattern::Pattern6 => 6,
            LayoutPattern::Pattern7 => 7,
            LayoutPattern::Pattern8 => 8,
        }
    }

    /// Look a layout up by number.
    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.number() == n)
    }

    /// Interpret a classifier reply.
    ///
    /// The reply must be a bare number 1–8 once surrounding whitespace is
    /// trimmed. Anything else (prose, `"Pattern 3"`, `"9"`) is a
    /// classification failure; there is no retry and no fuzzy matching.
    pub fn from_response(response: &str) -> Result<Self, ScheduleError> {
        let trimmed = response.trim();
        let fail = || ScheduleError::ClassificationFailed {
            response: response.to_string(),
        };
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(fail());
        }
        trimmed
            .parse::<u8>()
            .ok()
            .and_then(Self::from_number)
            .ok_or_else(fail)
    }

    /// The pipeline profile for this layout.
    pub fn profile(self) -> LayoutProfile {
        use LayoutPattern::*;
        match self {
            Pattern1 => LayoutProfile {
                reinforcement: BarStyle::Compact,
                bar_order: BarOrder::DiameterThenQuantity,
                stirrup_dia: DiaStyle::Plain,
                stirrup_spacing: SpacingStyle::Plain,
                slices: Some(6),
                merge: MergePolicy::ById,
                id_rule: IdRule::NonEmpty,
                response: ResponseShape::Embedded,
                on_parse_failure: ParsePolicy::Skip,
            },
            Pattern2 => LayoutProfile {
                reinforcement: BarStyle::Compact,
                bar_order: BarOrder::DiameterThenQuantity,
                stirrup_dia: DiaStyle::Plain,
                stirrup_spacing: SpacingStyle::DigitsOnly,
                slices: None,
                merge: MergePolicy::ById,
                id_rule: IdRule::NonEmpty,
                response: ResponseShape::Embedded,
                on_parse_failure: ParsePolicy::Skip,
            },
            Pattern3 => LayoutProfile {
                reinforcement: BarStyle::Callout,
                bar_order: BarOrder::Lexicographic,
                stirrup_dia: DiaStyle::Decorated,
                stirrup_spacing: SpacingStyle::FirstDigitRun,
                slices: None,
                merge: MergePolicy::ById,
                id_rule: IdRule::Alphabetic,
                response: ResponseShape::Embedded,
                on_parse_failure: ParsePolicy::Skip,
            },
            Pattern4 | Pattern5 => LayoutProfile {
                reinforcement: BarStyle::Plain,
                bar_order: BarOrder::Lexicographic,
                stirrup_dia: DiaStyle::Plain,
                stirrup_spacing: SpacingStyle::Plain,
                slices: None,
                merge: MergePolicy::PerFragment,
                id_rule: IdRule::NonEmpty,
                response: ResponseShape::Embedded,
                on_parse_failure: ParsePolicy::Skip,
            },
            Pattern6 | Pattern7 => LayoutProfile {
                reinforcement: BarStyle::Layered,
                bar_order: BarOrder::Lexicographic,
                stirrup_dia: DiaStyle::Plain,
                stirrup_spacing: SpacingStyle::Plain,
                slices: None,
                merge: MergePolicy::PerFragment,
                id_rule: IdRule::NonEmpty,
                response: ResponseShape::BareObject,
                on_parse_failure: ParsePolicy::Skip,
            },
            Pattern8 => LayoutProfile {
                reinforcement: BarStyle::Segmented,
                bar_order: BarOrder::Lexicographic,
                stirrup_dia: DiaStyle::LegAware,
                stirrup_spacing: SpacingStyle::PreSuffixed,
                slices: None,
                merge: MergePolicy::PerFragment,
                id_rule: IdRule::NonEmpty,
                response: ResponseShape::Embedded,
                on_parse_failure: ParsePolicy::Abort,
            },
        }
    }
}

impl fmt::Display for LayoutPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pattern {}", self.number())
    }
}

/// Everything that differs between two layout pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutProfile {
    pub reinforcement: BarStyle,
    pub bar_order: BarOrder,
    pub stirrup_dia: DiaStyle,
    pub stirrup_spacing: SpacingStyle,
    /// Cut each page into this many horizontal bands before extraction.
    pub slices: Option<u32>,
    pub merge: MergePolicy,
    pub id_rule: IdRule,
    pub response: ResponseShape,
    pub on_parse_failure: ParsePolicy,
}

/// How fragments from different images are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergePolicy {
    /// One record per distinct `beam_id`; list fields are concatenated in
    /// encounter order and normalised once at the end.
    ById,
    /// Every fragment becomes its own record, normalised independently.
    PerFragment,
}

/// Which `beam_id` values identify a beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdRule {
    /// Any non-blank id.
    NonEmpty,
    /// Non-blank and containing at least one alphabetic character.
    Alphabetic,
}

impl IdRule {
    pub fn accepts(self, beam_id: &str) -> bool {
        let id = beam_id.trim();
        match self {
            IdRule::NonEmpty => !id.is_empty(),
            IdRule::Alphabetic => id.chars().any(char::is_alphabetic),
        }
    }
}

/// Where the JSON payload is expected inside a model reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseShape {
    /// Anywhere between the first `{` and the last `}`.
    Embedded,
    /// The trimmed reply must itself be one JSON object, nothing after it.
    BareObject,
}

/// What to do when an image's reply yields no usable JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParsePolicy {
    /// Warn, drop that image's contribution, continue.
    Skip,
    /// Stop the document; nothing is written.
    Abort,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_round_trip() {
        for p in LayoutPattern::ALL {
            assert_eq!(LayoutPattern::from_number(p.number()), Some(p));
        }
        assert_eq!(LayoutPattern::from_number(0), None);
        assert_eq!(LayoutPattern::from_number(9), None);
    }

    #[test]
    fn classifier_reply_is_trimmed() {
        assert_eq!(
            LayoutPattern::from_response(" 7\n").unwrap(),
            LayoutPattern::Pattern7
        );
    }

    #[test]
    fn non_numeric_reply_fails() {
        for reply in ["abc", "", "Pattern 3", "3.", "-2"] {
            let err = LayoutPattern::from_response(reply).unwrap_err();
            assert!(
                matches!(err, ScheduleError::ClassificationFailed { .. }),
                "{reply:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn out_of_range_reply_fails() {
        assert!(LayoutPattern::from_response("9").is_err());
        assert!(LayoutPattern::from_response("0").is_err());
        assert!(LayoutPattern::from_response("300").is_err());
    }

    #[test]
    fn only_pattern_one_slices() {
        for p in LayoutPattern::ALL {
            let sliced = p.profile().slices.is_some();
            assert_eq!(sliced, p == LayoutPattern::Pattern1, "{p}");
        }
    }

    #[test]
    fn strip_drawing_is_strict() {
        assert_eq!(
            LayoutPattern::Pattern8.profile().on_parse_failure,
            ParsePolicy::Abort
        );
        assert_eq!(
            LayoutPattern::Pattern5.profile().on_parse_failure,
            ParsePolicy::Skip
        );
    }

    #[test]
    fn id_rules() {
        assert!(IdRule::NonEmpty.accepts("12"));
        assert!(!IdRule::NonEmpty.accepts("  "));
        assert!(IdRule::Alphabetic.accepts("B12"));
        assert!(!IdRule::Alphabetic.accepts("12"));
        assert!(!IdRule::Alphabetic.accepts(""));
    }
}
