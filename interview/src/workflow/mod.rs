//! The three interviews, each a transition table plus the accumulators that
//! turn answers into domain data.

mod quarterly;
mod quick;
mod setup;

pub use quarterly::BetEvaluation;
pub use quarterly::DirectionUpdate;
pub use quarterly::HealthTrend;
pub use quarterly::QuarterlyData;
pub use quarterly::QuarterlyReview;
pub use quarterly::QuarterlySeed;
pub use quarterly::TriggerStatus;
pub use quick::QuickAudit;
pub use quick::QuickAuditData;
pub use setup::SetupData;
pub use setup::SetupSeed;
pub use setup::SetupWizard;

use crate::error::InterviewError;
use crate::report::ReportRequest;
use crate::repository::EntityBatch;
use crate::session::SessionData;
use crate::session::SessionId;
use crate::session::WorkflowKind;
use crate::state::InterviewState;
use crate::store::SessionPayload;
use crate::transcript::Attribution;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

pub type WorkflowSession<W> = SessionData<<W as Workflow>::State, <W as Workflow>::Data>;

/// Binds a transition table to the data its answers build up.
pub trait Workflow: Sized + Send + Sync + 'static {
    type State: InterviewState;
    type Data: Clone + fmt::Debug + PartialEq + Default + Serialize + DeserializeOwned + Send + Sync;
    type Seed: Send;

    const KIND: WorkflowKind;

    fn initial_data(seed: Self::Seed) -> Self::Data;

    fn question_text(_session: &WorkflowSession<Self>, state: Self::State) -> String {
        state.prompt().unwrap_or(state.display_name()).to_string()
    }

    /// Progress shown while at `state`. Defaults to the table's figure.
    fn progress_percent(_session: &WorkflowSession<Self>, state: Self::State) -> u8 {
        state.progress_percent()
    }

    fn attribution(_session: &WorkflowSession<Self>, _state: Self::State) -> Attribution {
        Attribution::default()
    }

    /// Folds an accepted answer for `state` into the session. Returns
    /// warnings that do not block progress.
    fn accumulate(
        session: &mut WorkflowSession<Self>,
        state: Self::State,
        answer: &str,
    ) -> Result<Vec<String>, InterviewError>;

    /// Where to go once `answered` is resolved. The table successor unless a
    /// workflow loop applies.
    fn route(_session: &WorkflowSession<Self>, answered: Self::State) -> Self::State {
        answered.next_state()
    }

    fn report_request(session: &WorkflowSession<Self>) -> ReportRequest;

    fn entity_batch(session: &WorkflowSession<Self>, session_id: SessionId) -> EntityBatch;

    fn into_payload(session: WorkflowSession<Self>) -> SessionPayload;

    fn from_payload(payload: SessionPayload) -> Option<WorkflowSession<Self>>;
}

fn no_answer_expected<S: InterviewState>(state: S) -> InterviewError {
    InterviewError::InvalidSessionState(format!(
        "\"{}\" does not take answers",
        state.display_name()
    ))
}

pub(crate) fn parse_yes_no(field: &str, answer: &str) -> Result<bool, InterviewError> {
    let (word, _) = split_keyword(answer);
    match word.as_str() {
        "y" | "yes" | "yeah" | "yep" | "sure" => Ok(true),
        "n" | "no" | "nope" => Ok(false),
        _ => Err(InterviewError::invalid_field(field, "answer yes or no")),
    }
}

/// Non-empty trimmed items, one per line or `;`-separated part.
pub(crate) fn answer_items(answer: &str) -> Vec<String> {
    answer
        .split(['\n', ';'])
        .map(|item| item.trim().trim_start_matches(['-', '*']).trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercased first word (punctuation stripped) and the trimmed remainder.
pub(crate) fn split_keyword(answer: &str) -> (String, String) {
    let trimmed = answer.trim();
    let (first, rest) = trimmed
        .split_once(char::is_whitespace)
        .unwrap_or((trimmed, ""));
    let word = first
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    let rest = rest.trim_start_matches([',', ':', '-', '.', ' ']).trim();
    (word, rest.to_string())
}

pub(crate) fn is_none_answer(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().trim_end_matches('.'),
        "none" | "no" | "nothing" | "no change" | "no changes" | "skip" | "keep"
    )
}

fn non_empty(text: String) -> Option<String> {
    (!text.trim().is_empty()).then_some(text)
}

/// Report text for the latest answer to `state`, including the clarifying
/// example or a note that clarification was skipped.
pub(crate) fn answer_body<S: InterviewState, A>(session: &SessionData<S, A>, state: S) -> String {
    let Some(qa) = session.answers_for(state).last() else {
        return "_Not answered._".to_string();
    };
    let mut body = qa.answer.clone();
    if let Some(example) = &qa.concrete_example {
        body.push_str(&format!("\nExample: {example}"));
    } else if qa.skipped {
        body.push_str("\n_No concrete example given._");
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn yes_no_accepts_common_forms() {
        assert!(parse_yes_no("f", "Yes, please").expect("yes"));
        assert!(!parse_yes_no("f", "no.").expect("no"));
        assert!(parse_yes_no("f", "perhaps").is_err());
    }

    #[test]
    fn items_split_on_lines_and_semicolons() {
        assert_eq!(
            answer_items("- first\n\n second; third "),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn keyword_is_split_from_rationale() {
        assert_eq!(
            split_keyword("Appreciating: clients ask for it weekly"),
            ("appreciating".to_string(), "clients ask for it weekly".to_string())
        );
        assert_eq!(split_keyword("stable"), ("stable".to_string(), String::new()));
    }
}
