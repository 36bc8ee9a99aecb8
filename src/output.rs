//! Results of extracting one document or a whole batch.

use crate::layout::LayoutPattern;
use crate::schedule::BeamSchedule;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One document's extracted schedule, before or after it was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutput {
    pub pdf: PathBuf,
    pub pattern: LayoutPattern,
    pub schedule: BeamSchedule,
    pub stats: ExtractionStats,
}

/// Counters and timings for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub pages: usize,
    /// Extraction calls, classification excluded.
    pub model_calls: usize,
    pub fragments: usize,
    /// `beams` entries dropped by validation.
    pub rejected_beams: usize,
    /// Replies without usable JSON that were skipped.
    pub skipped_responses: usize,
    /// Records in the written schedule.
    pub beams: usize,
    pub render_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// What happened to one PDF in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DocumentOutcome {
    Written {
        pdf: PathBuf,
        path: PathBuf,
        pattern: LayoutPattern,
        beams: usize,
    },
    /// Classify-only runs: the detected layout, nothing written.
    Classified { pdf: PathBuf, pattern: LayoutPattern },
    Failed { pdf: PathBuf, error: String },
}

impl DocumentOutcome {
    pub fn pdf(&self) -> &PathBuf {
        match self {
            DocumentOutcome::Written { pdf, .. }
            | DocumentOutcome::Classified { pdf, .. }
            | DocumentOutcome::Failed { pdf, .. } => pdf,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DocumentOutcome::Failed { .. })
    }
}

/// Per-document outcomes, in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.len() - self.failed()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts() {
        let report = BatchReport {
            outcomes: vec![
                DocumentOutcome::Written {
                    pdf: "a.pdf".into(),
                    path: "out/a/a.json".into(),
                    pattern: LayoutPattern::Pattern2,
                    beams: 12,
                },
                DocumentOutcome::Failed {
                    pdf: "b.pdf".into(),
                    error: "Pattern detection failed".into(),
                },
                DocumentOutcome::Classified {
                    pdf: "c.pdf".into(),
                    pattern: LayoutPattern::Pattern8,
                },
            ],
        };
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded(), 2);
        assert!(report.has_failures());
        assert_eq!(report.outcomes[1].pdf(), &PathBuf::from("b.pdf"));
    }

    #[test]
    fn empty_report_has_no_failures() {
        assert!(!BatchReport::default().has_failures());
    }
}
