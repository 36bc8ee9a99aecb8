//! Prompts for layout classification and per-layout schedule extraction.
//!
//! Every prompt is built in, so the tool works without any files next to
//! it. A prompt directory (see [`crate::config::ExtractionConfig::prompt_dir`])
//! can override any of them: `classify.txt` replaces the classification
//! rubric and `prompt_<n>.txt` replaces the extraction prompt for layout `n`.
//! Overrides are read once per document.

use crate::error::ScheduleError;
use crate::layout::LayoutPattern;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the classification rubric override.
pub const CLASSIFY_FILE: &str = "classify.txt";

/// Rubric sent with the first page. The reply must be a bare number 1–8.
pub const CLASSIFICATION_PROMPT: &str = r#"You identify the HEADER layout of RCC beam schedule drawings.

Look ONLY at the header structure (column names). Ignore reinforcement
values, numbers and row content.

There are EXACTLY 8 layouts. Reply with ONE number from 1 to 8 and nothing
else: no explanation, no punctuation, no extra text.

LAYOUT 1
  Columns: BEAM numbers; SIZE (WIDTH, DEPTH), where width W and breadth B
  mean the same; BOTTOM REINFORCEMENT (LEFT, MID SPAN, RIGHT); TOP
  REINFORCEMENT (LEFT, MID SPAN, RIGHT); SHEAR STIRRUPS (LEFT, MID SPAN,
  RIGHT). A simple table with no "Bottom (Curtail)" and no "Extra Over
  Support" columns.

LAYOUT 2
  Columns: BEAM MARKED; SIZE (B x D/d); Bottom (Straight); Bottom (Curtail);
  Top (Straight); Ex. Top (Straight); Top (Extra Over Support) Left and
  Right; Stirrups (Upto L/4); Stirrups (Rest).
  Identifier: the SIZE column contains "/d".

LAYOUT 3
  Columns: Beam Marked; Size (B x D); Bottom (Straight); Bottom (Curtail);
  Top (Straight); Top (Extra Over Support - Left / Right); Stirrups
  (Upto L/4); Stirrups (Rest).
  Identifier: the SIZE column does NOT contain "/d".

LAYOUT 4
  Columns: BEAM; ELEVATION; TYPE; SIZE (WIDTH W); SIZE (DEPTH D); CLEAR
  SPAN (L). TOP REINFORCEMENT has A, B, C and D1(mm). BOTTOM REINFORCEMENT
  has G, E and D2(mm). STIRRUPS has S1.
  Reply 4 only if ALL of these columns exist.

LAYOUT 5
  Columns: BEAM; ELEVATION; TYPE; SIZE (WIDTH W); SIZE (DEPTH D); CLEAR
  SPAN (L); TOP REINF. A; BOTTOM REINF. B; STIRRUPS S1.
  There is NO C, D1(mm), D2(mm), G or E column.

LAYOUT 6
  Columns: BEAM NO; BEAM SIZE - BREADTH (B); BEAM SIZE - DEPTH (D).
  BOTTOM REINFORCEMENT: LEFT SUPPORT (Layer 1), MID SPAN (Layer 1 and 2),
  RIGHT SUPPORT (Layer 1). TOP REINFORCEMENT: LEFT SUPPORT (Layer 1 and 2),
  MID SPAN (Layer 1), RIGHT SUPPORT (Layer 1 and 2). STIRRUPS: NO OF LEGS,
  DIA, LEFT SUPPORT SPACING, MID SPACING, RIGHT SUPPORT SPACING. SIDE FACE
  REINFORCEMENT ON EACH FACE.
  There is NO column labelled "GRID ID".

LAYOUT 7
  Identical to layout 6 plus a separate column explicitly labelled
  "GRID ID". Do not assume GRID ID; it must be clearly visible in the header.

LAYOUT 8
  NOT A TABLE. A strip beam detail drawing: beam segments such as CB1a,
  CB1b, CB1c; sizes in brackets such as (300x600); reinforcement written
  above each segment; labels like LEGGED, NOS., SPAC.c/c, STRP.DIA.; no
  tabular grid header.

DECISION PRIORITY
  1. "/d" inside the size column -> 2
  2. "B x D" without "/d" -> 3
  3. Otherwise match the full header structure.

Reply with the number only."#;

/// JSON contract shared by every extraction prompt.
const OUTPUT_CONTRACT: &str = r#"Return ONLY a JSON object, with no markdown fences and no commentary:

{
  "beams": [
    {
      "beam_id": "B1",
      "size": {"width": 300, "depth": 600},
      "reinforcement": ["2-T12", "1-T16"],
      "stirrups": {"dia": ["T8"], "spacing": ["150"]}
    }
  ]
}

Rules:
- One entry per beam row (or beam segment). Copy beam ids exactly.
- width and depth are numbers in mm; use null when the cell is empty.
- reinforcement lists every bar callout for the beam, top and bottom, all
  positions, exactly as written (quantity, bar grade letter, diameter).
- stirrups.dia lists stirrup diameters; stirrups.spacing lists spacings.
- Use [] for empty cells. Never invent values that are not on the drawing.
- If the image shows no beams, return {"beams": []}."#;

const LAYOUT_1: &str = "You are reading a horizontal band cut from a beam schedule table with columns BEAM, SIZE (WIDTH, DEPTH), BOTTOM and TOP REINFORCEMENT (LEFT, MID SPAN, RIGHT) and SHEAR STIRRUPS (LEFT, MID SPAN, RIGHT). The header may not be visible in this band; rows may be cut at the top or bottom edge. Extract every complete or partial row you can read. Collect the bars from all six reinforcement cells into one list, and the stirrup diameters and spacings from all three stirrup cells.";

const LAYOUT_2: &str = "You are reading a beam schedule with columns BEAM MARKED, SIZE (B x D/d), Bottom (Straight), Bottom (Curtail), Top (Straight), Ex. Top (Straight), Top (Extra Over Support) Left and Right, Stirrups (Upto L/4) and Stirrups (Rest). Width is B and depth is D; ignore the effective depth after '/d'. Collect bars from every bottom and top column into one list. Stirrup cells read like 'T8 @ 150 c/c': put the diameter in dia and only the number in spacing.";

const LAYOUT_3: &str = "You are reading a beam schedule with columns Beam Marked, Size (B x D), Bottom (Straight), Bottom (Curtail), Top (Straight), Top (Extra Over Support - Left / Right), Stirrups (Upto L/4) and Stirrups (Rest). Width is B and depth is D. Collect bars from every bottom and top column into one list; a cell may join several groups with '+'. Stirrup cells read like '2L-T8 @ 150 c/c': put the bar in dia and the spacing in spacing.";

const LAYOUT_4: &str = "You are reading a beam elevation/type table with columns BEAM, ELEVATION, TYPE, SIZE (WIDTH W), SIZE (DEPTH D), CLEAR SPAN (L), top reinforcement A, B, C, D1(mm), bottom reinforcement G, E, D2(mm) and stirrups S1. Skip the lengths in D1 and D2. Collect the bar callouts from A, B, C, G and E into one list. S1 gives the stirrup diameter and spacing.";

const LAYOUT_5: &str = "You are reading a beam elevation/type table with columns BEAM, ELEVATION, TYPE, SIZE (WIDTH W), SIZE (DEPTH D), CLEAR SPAN (L), top reinforcement A, bottom reinforcement B and STIRRUPS S1. One BEAM cell may stack several beam ids vertically: emit a separate entry for each id, sharing the row's values.";

const LAYOUT_6: &str = "You are reading a layered beam schedule with columns BEAM NO, BEAM SIZE - BREADTH (B), BEAM SIZE - DEPTH (D), bottom and top reinforcement by support and layer, and STIRRUPS (NO OF LEGS, DIA, LEFT SUPPORT, MID and RIGHT SUPPORT SPACING). Breadth B is the width. Collect the bars from every support and layer cell into one list; write '-' cells as nothing. Ignore side face reinforcement. Your reply must start with '{'.";

const LAYOUT_7: &str = "You are reading a layered beam schedule with columns BEAM NO, GRID ID, BEAM SIZE - BREADTH (B), BEAM SIZE - DEPTH (D), bottom and top reinforcement by support and layer, and STIRRUPS (NO OF LEGS, DIA, LEFT SUPPORT, MID and RIGHT SUPPORT SPACING). Use BEAM NO as beam_id, not GRID ID. Breadth B is the width. Collect the bars from every support and layer cell into one list; write '-' cells as nothing. Ignore side face reinforcement. Your reply must start with '{'.";

const LAYOUT_8: &str = "You are reading a strip beam detail drawing, not a table. Each beam segment (for example CB1a, CB1b) has its size in brackets such as (300x600) and its bars written above and below it; annotations TH and EX may follow a callout. Report each segment as its own beam. Stirrups are given by LEGGED, NOS., SPAC.c/c and STRP.DIA labels: put the leg configuration and bar (for example '2L-T8') in dia and the spacing (for example '150' or '150 c/c') in spacing. Only report bars that are drawn against that segment.";

/// Built-in extraction prompt for a layout.
pub fn extraction_prompt(pattern: LayoutPattern) -> String {
    let layout = match pattern {
        LayoutPattern::Pattern1 => LAYOUT_1,
        LayoutPattern::Pattern2 => LAYOUT_2,
        LayoutPattern::Pattern3 => LAYOUT_3,
        LayoutPattern::Pattern4 => LAYOUT_4,
        LayoutPattern::Pattern5 => LAYOUT_5,
        LayoutPattern::Pattern6 => LAYOUT_6,
        LayoutPattern::Pattern7 => LAYOUT_7,
        LayoutPattern::Pattern8 => LAYOUT_8,
    };
    format!("{}\n\n{}", layout, OUTPUT_CONTRACT)
}

/// File name of a layout's extraction prompt override, `prompt_<n>.txt`.
pub fn prompt_file_name(pattern: LayoutPattern) -> String {
    format!("prompt_{}.txt", pattern.number())
}

/// The extraction prompt for `pattern`, from `prompt_dir` if it has one.
pub async fn load_extraction_prompt(
    pattern: LayoutPattern,
    prompt_dir: Option<&Path>,
) -> Result<String, ScheduleError> {
    match prompt_dir {
        Some(dir) => read_override(dir.join(prompt_file_name(pattern)))
            .await
            .map(|o| o.unwrap_or_else(|| extraction_prompt(pattern))),
        None => Ok(extraction_prompt(pattern)),
    }
}

/// The classification rubric, from `prompt_dir` if it has one.
pub async fn load_classification_prompt(prompt_dir: Option<&Path>) -> Result<String, ScheduleError> {
    match prompt_dir {
        Some(dir) => read_override(dir.join(CLASSIFY_FILE))
            .await
            .map(|o| o.unwrap_or_else(|| CLASSIFICATION_PROMPT.to_string())),
        None => Ok(CLASSIFICATION_PROMPT.to_string()),
    }
}

async fn read_override(path: PathBuf) -> Result<Option<String>, ScheduleError> {
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => {
            debug!("Using prompt override {}", path.display());
            Ok(Some(text))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ScheduleError::PromptUnreadable { path, source }),
    }
}
