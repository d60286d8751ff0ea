use crate::logger;
use crate::types::{ActionStep, Facts};

/// The fixed write-text plan: open, pick the color, write the text, and
/// optionally close again.
pub fn build_plan(facts: &Facts, close_after: bool) -> Vec<ActionStep> {
    let mut steps = vec![
        ActionStep::OpenApplication,
        ActionStep::SelectColor { color: facts.color.as_str().to_string() },
        ActionStep::WriteText { text: facts.text.clone() },
    ];
    if close_after {
        steps.push(ActionStep::CloseApplication);
    }
    let names: Vec<&str> = steps.iter().map(ActionStep::name).collect();
    logger::info(&format!("planned {} steps: {}", steps.len(), names.join(", ")));
    steps
}
