use crate::model::BoardRole;
use crate::state::InterviewState;
use crate::state::state_tag;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// One answered question in a session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct QuestionAnswer<S: InterviewState> {
    #[serde(with = "state_tag")]
    pub state: S,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub was_vague: bool,
    #[serde(default)]
    pub concrete_example: Option<String>,
    #[serde(default)]
    pub skipped: bool,
    /// Problem or board seat the answer is about, when the question repeats.
    #[serde(default)]
    pub context_index: Option<usize>,
    #[serde(default)]
    pub role: Option<BoardRole>,
    pub answered_at: DateTime<Utc>,
}

impl<S: InterviewState> QuestionAnswer<S> {
    pub fn new(state: S, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            state,
            question: question.into(),
            answer: answer.into(),
            was_vague: false,
            concrete_example: None,
            skipped: false,
            context_index: None,
            role: None,
            answered_at: Utc::now(),
        }
    }

    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.context_index = attribution.context_index;
        self.role = attribution.role;
        self
    }
}

/// Who or what a repeated question is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attribution {
    pub context_index: Option<usize>,
    pub role: Option<BoardRole>,
}
