use std::collections::HashMap;

/// One labeled choice on a step, pointing at the step it leads to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepOption {
    pub text: String,
    pub next: String,
}

/// One node of the flow. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub id: String,
    pub title: String,
    pub description: String,
    pub note: String,
    pub options: Vec<StepOption>,
    /// Unconditional continuation shown as a "Next" button when `options` is
    /// empty. Empty string means none; a step with neither is a terminal leaf.
    pub default_next: String,
    /// Whether a previously remembered choice may be replayed automatically
    /// when this step is revisited after a rewind.
    pub auto_select: bool,
}

impl Step {
    pub fn has_next_button(&self) -> bool {
        self.options.is_empty() && !self.default_next.is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        self.options.is_empty() && self.default_next.is_empty()
    }
}

/// The loader's output: a validated step map plus the entry point.
#[derive(Clone, Debug)]
pub struct FlowData {
    pub steps: HashMap<String, Step>,
    pub start: String,
    pub valid: bool,
}

/// Canonical key for the selection memory: sorted option texts joined.
///
/// Keyed by option text only, never by step id — two structurally different
/// steps with identical option wording share replay memory.
pub fn options_text_key(options: &[StepOption]) -> String {
    let mut texts: Vec<&str> = options.iter().map(|o| o.text.as_str()).collect();
    texts.sort_unstable();
    texts.join("||")
}
