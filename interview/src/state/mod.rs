//! Static transition tables for the interview workflows.
//!
//! Every workflow declares a closed enum of states and a single exhaustive
//! `row` match. Successors, clarify links, progress and prompts are read from
//! that row, so the ordering of a workflow is fixed and reviewable in one
//! place. Adding a state without a row is a compile error.

mod quarterly;
mod quick;
mod setup;

pub use quarterly::QuarterlyState;
pub use quick::QuickState;
pub use setup::SetupState;

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use strum::IntoEnumIterator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateRole {
    /// Transient entry state; the runner moves past it when a session starts.
    Entry,
    Question,
    Clarify,
    /// Last working state. Reaching it triggers finalize.
    Generating,
    Terminal,
}

/// One row of a workflow transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateRow<S> {
    pub role: StateRole,
    pub next: S,
    pub clarify: Option<S>,
    pub parent: Option<S>,
    pub vagueness_check: bool,
    pub display_name: &'static str,
    pub question_number: u8,
    pub progress: u8,
    pub prompt: Option<&'static str>,
}

impl<S> StateRow<S> {
    pub fn entry(next: S, display_name: &'static str) -> Self {
        Self {
            role: StateRole::Entry,
            next,
            clarify: None,
            parent: None,
            vagueness_check: false,
            display_name,
            question_number: 0,
            progress: 0,
            prompt: None,
        }
    }

    pub fn question(
        next: S,
        question_number: u8,
        progress: u8,
        display_name: &'static str,
        prompt: &'static str,
    ) -> Self {
        Self {
            role: StateRole::Question,
            next,
            clarify: None,
            parent: None,
            vagueness_check: false,
            display_name,
            question_number,
            progress,
            prompt: Some(prompt),
        }
    }

    /// A question whose answer goes through the vagueness gate, with
    /// `clarify` as the state that collects a concrete example.
    pub fn checked(
        next: S,
        clarify: S,
        question_number: u8,
        progress: u8,
        display_name: &'static str,
        prompt: &'static str,
    ) -> Self {
        Self {
            clarify: Some(clarify),
            vagueness_check: true,
            ..Self::question(next, question_number, progress, display_name, prompt)
        }
    }

    /// `next` must be the parent's successor, written out explicitly.
    pub fn clarify(
        parent: S,
        next: S,
        progress: u8,
        display_name: &'static str,
        prompt: &'static str,
    ) -> Self {
        Self {
            role: StateRole::Clarify,
            next,
            clarify: None,
            parent: Some(parent),
            vagueness_check: false,
            display_name,
            question_number: 0,
            progress,
            prompt: Some(prompt),
        }
    }

    pub fn generating(next: S, progress: u8, display_name: &'static str) -> Self {
        Self {
            role: StateRole::Generating,
            prompt: None,
            progress,
            ..Self::entry(next, display_name)
        }
    }

    pub fn terminal(this: S, progress: u8, display_name: &'static str) -> Self {
        Self {
            role: StateRole::Terminal,
            progress,
            ..Self::entry(this, display_name)
        }
    }
}

/// A state of one interview workflow.
///
/// Implementors provide the table row; everything else derives from it.
/// Tags come from the enum's `IntoStaticStr`/`FromStr` impls and are what
/// snapshots store.
pub trait InterviewState:
    Copy
    + Eq
    + Hash
    + fmt::Debug
    + IntoEnumIterator
    + Into<&'static str>
    + FromStr
    + Send
    + Sync
    + 'static
{
    const INITIAL: Self;
    const FINALIZED: Self;
    const ABANDONED: Self;

    fn row(self) -> StateRow<Self>;

    fn tag(self) -> &'static str {
        self.into()
    }

    fn from_tag(tag: &str) -> Option<Self> {
        tag.parse().ok()
    }

    fn is_question(self) -> bool {
        self.row().role == StateRole::Question
    }

    fn is_clarify(self) -> bool {
        self.row().role == StateRole::Clarify
    }

    fn is_generating(self) -> bool {
        self.row().role == StateRole::Generating
    }

    fn is_terminal(self) -> bool {
        self.row().role == StateRole::Terminal
    }

    fn requires_vagueness_check(self) -> bool {
        self.row().vagueness_check
    }

    fn clarify_state(self) -> Option<Self> {
        self.row().clarify
    }

    fn parent_question_state(self) -> Option<Self> {
        self.row().parent
    }

    fn next_state(self) -> Self {
        self.row().next
    }

    fn display_name(self) -> &'static str {
        self.row().display_name
    }

    fn question_number(self) -> u8 {
        self.row().question_number
    }

    fn progress_percent(self) -> u8 {
        self.row().progress
    }

    fn prompt(self) -> Option<&'static str> {
        self.row().prompt
    }
}

/// Checks the structural rules every transition table must satisfy and
/// returns one message per broken rule.
pub fn audit_table<S: InterviewState>() -> Vec<String> {
    let mut problems = Vec::new();

    for terminal in [S::FINALIZED, S::ABANDONED] {
        if terminal.next_state() != terminal {
            problems.push(format!("{terminal:?} must map to itself"));
        }
        if !terminal.is_terminal() {
            problems.push(format!("{terminal:?} must be terminal"));
        }
    }
    if S::INITIAL.progress_percent() != 0 {
        problems.push("initial progress must be 0".to_string());
    }
    if S::FINALIZED.progress_percent() != 100 {
        problems.push("finalized progress must be 100".to_string());
    }
    if S::ABANDONED.progress_percent() != 0 {
        problems.push("abandoned progress must be 0".to_string());
    }

    for state in S::iter() {
        let row = state.row();
        if row.progress > 100 {
            problems.push(format!("{state:?} progress above 100"));
        }
        if state.is_terminal() && state != S::FINALIZED && state != S::ABANDONED {
            problems.push(format!("{state:?} is terminal but not finalized/abandoned"));
        }
        if !state.is_terminal() && row.next == state {
            problems.push(format!("{state:?} loops onto itself"));
        }
        if row.vagueness_check != row.clarify.is_some() {
            problems.push(format!("{state:?} vagueness check without clarify link"));
        }
        if let Some(clarify) = row.clarify {
            if clarify.parent_question_state() != Some(state) {
                problems.push(format!("{clarify:?} does not point back to {state:?}"));
            }
            if clarify.next_state() != row.next {
                problems.push(format!(
                    "{clarify:?} must continue where {state:?} continues"
                ));
            }
            if clarify.progress_percent() < row.progress {
                problems.push(format!("{clarify:?} progress below its parent"));
            }
        }
        if let Some(parent) = row.parent {
            if parent.clarify_state() != Some(state) {
                problems.push(format!("{parent:?} does not link to clarify {state:?}"));
            }
        }
        if state.is_clarify() != row.parent.is_some() {
            problems.push(format!("{state:?} clarify role without parent"));
        }
    }

    let mut seen = HashSet::new();
    let mut current = S::INITIAL;
    let mut last_progress = 0;
    while current != S::FINALIZED {
        if !seen.insert(current) {
            problems.push(format!("canonical path revisits {current:?}"));
            break;
        }
        if current.progress_percent() < last_progress {
            problems.push(format!("progress decreases at {current:?}"));
        }
        last_progress = current.progress_percent();
        current = current.next_state();
    }

    problems
}

/// Serde adapter storing a state as its tag. Unknown tags decode to the
/// workflow's initial state.
pub(crate) mod state_tag {
    use super::InterviewState;
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S, Ser>(state: &S, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
    where
        S: InterviewState,
        Ser: Serializer,
    {
        serializer.serialize_str(state.tag())
    }

    pub fn deserialize<'de, S, D>(deserializer: D) -> Result<S, D::Error>
    where
        S: InterviewState,
        D: Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(S::from_tag(&tag).unwrap_or(S::INITIAL))
    }
}
