use super::*;
use crate::id::{RunId, StepId};

#[test]
fn task_id_concatenates_run_and_step() {
    let id = task_id_for(&RunId::new("run_a"), &StepId::new("step_b"));
    assert_eq!(id, "run_a-step_b");
}

#[test]
fn truncate_preview_passes_short_content_through() {
    assert_eq!(truncate_preview("short"), "short");
}

#[test]
fn truncate_preview_bounds_long_content() {
    let long = "x".repeat(CONTENT_PREVIEW_MAX_LEN + 100);
    let preview = truncate_preview(&long);
    assert!(preview.len() <= CONTENT_PREVIEW_MAX_LEN + "…".len());
    assert!(preview.ends_with('…'));
}

#[test]
fn truncate_preview_does_not_split_a_multibyte_char() {
    let long = "é".repeat(CONTENT_PREVIEW_MAX_LEN);
    // Should not panic on non-char-boundary slicing.
    let _ = truncate_preview(&long);
}
