//! Fragment merging and record normalisation.
//!
//! Merging works on raw fragments: list fields are concatenated in encounter
//! order and normalised once at the end, so normalisation sees everything a
//! beam's slices contributed and the result does not depend on how the
//! fragments were grouped.

use crate::layout::{IdRule, LayoutProfile, MergePolicy};
use crate::pipeline::reinforcement::normalize_reinforcement;
use crate::pipeline::stirrups::{clean_dia, clean_spacing};
use crate::schedule::{BeamFragment, BeamRecord, Stirrups};
use std::collections::HashMap;
use tracing::debug;

/// Turn every fragment of a document into the final, ordered record list.
///
/// Fragments without an acceptable `beam_id` are excluded, fragments are
/// merged per the profile's policy, each record is normalised, and
/// placeholder rows (no width, no bars) are dropped.
pub fn assemble(fragments: Vec<BeamFragment>, profile: &LayoutProfile) -> Vec<BeamRecord> {
    let total = fragments.len();
    let identified: Vec<BeamFragment> = fragments
        .into_iter()
        .filter(|f| has_valid_id(f, profile.id_rule))
        .collect();
    if identified.len() < total {
        debug!(
            "Excluded {} fragment(s) without a usable beam_id",
            total - identified.len()
        );
    }

    let merged = match profile.merge {
        MergePolicy::ById => merge_by_id(identified),
        MergePolicy::PerFragment => identified,
    };

    merged
        .into_iter()
        .map(|f| normalize(f, profile))
        .filter(|r| {
            let keep = !r.is_placeholder();
            if !keep {
                debug!("Dropping placeholder row '{}'", r.beam_id);
            }
            keep
        })
        .collect()
}

fn has_valid_id(fragment: &BeamFragment, rule: IdRule) -> bool {
    fragment.beam_id.as_deref().is_some_and(|id| rule.accepts(id))
}

/// Combine fragments sharing a `beam_id` into one, keeping first-seen order.
///
/// The first fragment for an id seeds the size; later fragments only fill
/// dimensions that are still `null`. List fields are concatenated without
/// normalisation. Fragments without an id are dropped.
pub fn merge_by_id(fragments: Vec<BeamFragment>) -> Vec<BeamFragment> {
    let mut merged: Vec<BeamFragment> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for fragment in fragments {
        let Some(id) = fragment.beam_id.clone() else {
            continue;
        };
        match index.get(&id) {
            Some(&i) => absorb(&mut merged[i], fragment),
            None => {
                index.insert(id, merged.len());
                merged.push(fragment);
            }
        }
    }
    merged
}

fn absorb(into: &mut BeamFragment, other: BeamFragment) {
    if into.size.width.is_none() {
        into.size.width = other.size.width;
    }
    if into.size.depth.is_none() {
        into.size.depth = other.size.depth;
    }
    into.reinforcement.extend(other.reinforcement);
    into.stirrups.dia.extend(other.stirrups.dia);
    into.stirrups.spacing.extend(other.stirrups.spacing);
}

/// Apply the profile's rule tables to one fragment.
pub fn normalize(fragment: BeamFragment, profile: &LayoutProfile) -> BeamRecord {
    BeamRecord {
        beam_id: fragment.beam_id.unwrap_or_default().trim().to_string(),
        size: fragment.size,
        reinforcement: normalize_reinforcement(
            &fragment.reinforcement,
            profile.reinforcement,
            profile.bar_order,
        ),
        stirrups: Stirrups {
            dia: clean_dia(&fragment.stirrups.dia, profile.stirrup_dia),
            spacing: clean_spacing(&fragment.stirrups.spacing, profile.stirrup_spacing),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutPattern;
    use crate::schedule::BeamSize;
    use serde_json::Number;

    fn frag(id: &str, width: Option<u64>, bars: &[&str], spacing: &[&str]) -> BeamFragment {
        BeamFragment {
            beam_id: Some(id.to_string()),
            size: BeamSize {
                width: width.map(Number::from),
                depth: None,
            },
            reinforcement: bars.iter().map(|s| s.to_string()).collect(),
            stirrups: Stirrups {
                dia: vec![],
                spacing: spacing.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    #[test]
    fn slices_of_one_beam_merge_into_one_record() {
        let profile = LayoutPattern::Pattern1.profile();
        let out = assemble(
            vec![
                frag("B1", Some(300), &["2-T12"], &[]),
                frag("B1", None, &["1-T16"], &["150"]),
            ],
            &profile,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].beam_id, "B1");
        assert_eq!(out[0].size.width, Some(Number::from(300)));
        assert_eq!(out[0].reinforcement, vec!["2-T12", "1-T16"]);
        assert_eq!(out[0].stirrups.spacing, vec!["150"]);
    }

    #[test]
    fn first_fragment_seeds_size() {
        let merged = merge_by_id(vec![
            frag("B1", Some(300), &[], &[]),
            frag("B1", Some(450), &[], &[]),
        ]);
        assert_eq!(merged[0].size.width, Some(Number::from(300)));
    }

    #[test]
    fn later_fragment_fills_missing_dimension() {
        let mut second = frag("B1", None, &[], &[]);
        second.size.depth = Some(Number::from(600));
        let merged = merge_by_id(vec![frag("B1", Some(300), &[], &[]), second]);
        assert_eq!(merged[0].size.width, Some(Number::from(300)));
        assert_eq!(merged[0].size.depth, Some(Number::from(600)));
    }

    #[test]
    fn merge_keeps_first_seen_order() {
        let merged = merge_by_id(vec![
            frag("B2", Some(1), &[], &[]),
            frag("B1", Some(1), &[], &[]),
            frag("B2", Some(1), &["2-T12"], &[]),
        ]);
        let ids: Vec<_> = merged.iter().map(|f| f.beam_id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["B2", "B1"]);
    }

    #[test]
    fn merge_is_associative() {
        let a = frag("B1", Some(300), &["2-T12"], &["150"]);
        let b = frag("B1", None, &["1-T16"], &[]);
        let c = frag("B1", None, &["2-T12", "3-T20"], &["200"]);

        let left = merge_by_id(
            merge_by_id(vec![a.clone(), b.clone()])
                .into_iter()
                .chain([c.clone()])
                .collect(),
        );
        let right = merge_by_id(
            std::iter::once(a)
                .chain(merge_by_id(vec![b, c]))
                .collect(),
        );
        assert_eq!(left, right);
    }

    #[test]
    fn per_fragment_keeps_duplicates_apart() {
        let profile = LayoutPattern::Pattern5.profile();
        let out = assemble(
            vec![
                frag("B1", Some(300), &["2-T12"], &[]),
                frag("B1", Some(300), &["2-T16"], &[]),
            ],
            &profile,
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn placeholder_rows_are_dropped() {
        let profile = LayoutPattern::Pattern7.profile();
        let out = assemble(
            vec![
                frag("B1", None, &["-"], &[]),
                frag("B2", Some(230), &[], &[]),
                frag("B3", None, &["2-T12"], &[]),
            ],
            &profile,
        );
        let ids: Vec<_> = out.iter().map(|r| r.beam_id.as_str()).collect();
        assert_eq!(ids, vec!["B2", "B3"]);
    }

    #[test]
    fn fragments_without_usable_ids_are_excluded() {
        let mut anonymous = frag("", Some(300), &["2-T12"], &[]);
        anonymous.beam_id = None;
        let out = assemble(
            vec![
                anonymous,
                frag("  ", Some(300), &["2-T12"], &[]),
                frag("12", Some(300), &["2-T12"], &[]),
                frag("B4", Some(300), &["2-T12"], &[]),
            ],
            &LayoutPattern::Pattern3.profile(),
        );
        let ids: Vec<_> = out.iter().map(|r| r.beam_id.as_str()).collect();
        assert_eq!(ids, vec!["B4"]);
    }

    #[test]
    fn normalisation_runs_after_merge() {
        let profile = LayoutPattern::Pattern1.profile();
        let out = assemble(
            vec![
                frag("B1", Some(300), &["7T25"], &[]),
                frag("B1", None, &["7-T25", "2T12"], &[]),
            ],
            &profile,
        );
        assert_eq!(out[0].reinforcement, vec!["2-T12", "7-T25"]);
    }
}
