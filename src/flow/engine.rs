use std::collections::HashMap;

use tracing::{debug, warn};

use crate::flow::step::{options_text_key, FlowData, Step};

/// Label recorded for the unconditional continuation button.
pub const NEXT_LABEL: &str = "Next";

/// One visited step on the user's path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub step_id: String,
    pub chosen_option: Option<String>,
    pub sequence_id: u64,
    pub auto_selected: bool,
}

/// Owns the visited-step history, resolves selections into transitions, and
/// replays remembered choices after a rewind.
///
/// The engine never fails on a dangling reference: an unknown target step
/// records the choice but appends nothing, leaving history consistent.
pub struct FlowEngine {
    steps: HashMap<String, Step>,
    start: String,
    history: Vec<HistoryEntry>,
    /// options-text-key -> previously chosen option text. Only fed from steps
    /// with `auto_select`.
    memory: HashMap<String, String>,
    sequence: u64,
}

impl FlowEngine {
    pub fn new(flow: FlowData) -> Self {
        let mut engine = Self {
            steps: flow.steps,
            start: flow.start,
            history: Vec::new(),
            memory: HashMap::new(),
            sequence: 0,
        };
        engine.push_entry(engine.start.clone());
        engine
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.get(id)
    }

    pub fn start_id(&self) -> &str {
        &self.start
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn last_index(&self) -> usize {
        self.history.len().saturating_sub(1)
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.history.len()
    }

    /// The step rendered for a history entry, if it still resolves.
    pub fn step_at(&self, index: usize) -> Option<&Step> {
        self.history
            .get(index)
            .and_then(|e| self.steps.get(&e.step_id))
    }

    fn push_entry(&mut self, step_id: String) {
        self.history.push(HistoryEntry {
            step_id,
            chosen_option: None,
            sequence_id: self.sequence,
            auto_selected: false,
        });
        self.sequence += 1;
    }

    fn remember(&mut self, index: usize, option_text: &str) {
        let key = match self.step_at(index) {
            Some(step) if step.auto_select && !step.options.is_empty() => {
                options_text_key(&step.options)
            }
            _ => return,
        };
        self.memory.insert(key, option_text.to_string());
    }

    /// Forward selection on the last entry. Records the choice, then appends
    /// the target step when it resolves; an unknown target records the choice
    /// and stops there.
    pub fn select_current(&mut self, option_text: &str, target: &str) {
        let index = self.last_index();
        let Some(entry) = self.history.last_mut() else {
            return;
        };
        entry.chosen_option = Some(option_text.to_string());
        self.remember(index, option_text);
        self.append(target);
    }

    /// Confirmed rewind: change the choice at `index`, drop everything after
    /// it, rebuild the selection memory from the surviving path, re-seed the
    /// sequence counter, then continue into `target`.
    pub fn rewind_and_select(&mut self, index: usize, option_text: &str, target: &str) {
        let Some(entry) = self.history.get_mut(index) else {
            warn!(index, "rewind target is not a valid history position");
            return;
        };
        entry.chosen_option = Some(option_text.to_string());
        entry.auto_selected = false;

        self.history.truncate(index + 1);
        self.sequence = match self.history.last() {
            Some(last) => last.sequence_id + 1,
            None => self.history.len() as u64,
        };
        self.rebuild_memory();
        debug!(index, next = target, "history rewound");
        self.append(target);
    }

    /// Same contract as an option selection, with the fixed "Next" label and
    /// the step's default continuation as target.
    pub fn advance_default(&mut self, index: usize) {
        let Some(target) = self.step_at(index).map(|s| s.default_next.clone()) else {
            return;
        };
        if self.is_last(index) {
            self.select_current(NEXT_LABEL, &target);
        } else {
            self.rewind_and_select(index, NEXT_LABEL, &target);
        }
    }

    /// Append a new unanswered entry for `target`, if it names a known step.
    pub fn append(&mut self, target: &str) -> bool {
        if !self.steps.contains_key(target) {
            if !target.is_empty() {
                warn!(next = target, "transition target not found, staying put");
            }
            return false;
        }
        self.push_entry(target.to_string());
        true
    }

    /// Auto-replay policy, evaluated for the last entry only. When the
    /// current step is replay-eligible and the memory holds a choice for its
    /// option wording, the entry is marked auto-selected and the matching
    /// target is returned for a deferred append.
    ///
    /// A remembered text that no longer matches any current option skips
    /// replay silently and leaves the stale memory entry in place.
    pub fn try_auto_replay(&mut self) -> Option<String> {
        let index = self.last_index();
        let step = self.step_at(index)?;
        if !step.auto_select || step.options.is_empty() {
            return None;
        }
        let entry = self.history.last()?;
        if entry.chosen_option.is_some() {
            return None;
        }
        let remembered = self.memory.get(&options_text_key(&step.options))?.clone();
        let Some(matched) = step.options.iter().find(|o| o.text == remembered) else {
            debug!(
                step = %step.id,
                "remembered choice no longer offered, skipping auto-replay"
            );
            return None;
        };
        let next = matched.next.clone();

        let entry = self.history.last_mut()?;
        entry.chosen_option = Some(remembered);
        entry.auto_selected = true;
        debug!(step = index, "auto-replayed previous choice");
        Some(next)
    }

    /// Jump entry point (dropdown/submenu): discard the whole path and start
    /// over at `step_id`.
    pub fn restart(&mut self, step_id: &str) {
        if !self.steps.contains_key(step_id) {
            warn!(step_id, "restart target not found");
            return;
        }
        self.history.clear();
        self.memory.clear();
        self.sequence = 0;
        self.push_entry(step_id.to_string());
    }

    fn rebuild_memory(&mut self) {
        self.memory.clear();
        let retained: Vec<(String, String)> = self
            .history
            .iter()
            .filter_map(|entry| {
                let chosen = entry.chosen_option.clone()?;
                let step = self.steps.get(&entry.step_id)?;
                if step.auto_select && !step.options.is_empty() {
                    Some((options_text_key(&step.options), chosen))
                } else {
                    None
                }
            })
            .collect();
        self.memory.extend(retained);
    }

    #[cfg(test)]
    fn memory_len(&self) -> usize {
        self.memory.len()
    }
}
