use crate::repository::CreatedEntities;
use crate::state::InterviewState;
use crate::state::state_tag;
use crate::transcript::QuestionAnswer;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use strum::Display;
use strum::EnumIter;
use strum::EnumString;
use uuid::Uuid;

/// Times a person may skip past vagueness clarification in one session.
pub const MAX_VAGUENESS_SKIPS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowKind {
    QuickAudit,
    Setup,
    Quarterly,
}

/// Progress of one interview, persisted after every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "A: Serialize",
    deserialize = "A: Deserialize<'de> + Default"
))]
pub struct SessionData<S: InterviewState, A> {
    #[serde(with = "state_tag")]
    pub current_state: S,
    #[serde(default)]
    pub abstraction_mode: bool,
    #[serde(default)]
    pub vagueness_skip_count: u8,
    #[serde(default)]
    pub transcript: Vec<QuestionAnswer<S>>,
    #[serde(default)]
    pub workflow: A,
    #[serde(default)]
    pub output_markdown: Option<String>,
    #[serde(default)]
    pub created: CreatedEntities,
    pub created_at: DateTime<Utc>,
}

impl<S: InterviewState, A> SessionData<S, A> {
    pub fn new(workflow: A) -> Self {
        Self {
            current_state: S::INITIAL,
            abstraction_mode: false,
            vagueness_skip_count: 0,
            transcript: Vec::new(),
            workflow,
            output_markdown: None,
            created: CreatedEntities::default(),
            created_at: Utc::now(),
        }
    }

    pub fn can_skip(&self) -> bool {
        self.vagueness_skip_count < MAX_VAGUENESS_SKIPS
    }

    /// Counts a skip; refuses once the budget is spent.
    pub fn record_skip(&mut self) -> bool {
        if !self.can_skip() {
            return false;
        }
        self.vagueness_skip_count += 1;
        true
    }

    pub fn is_terminal(&self) -> bool {
        self.current_state.is_terminal()
    }

    /// Most recent transcript entry for `state`.
    pub fn last_answer_mut(&mut self, state: S) -> Option<&mut QuestionAnswer<S>> {
        self.transcript.iter_mut().rev().find(|qa| qa.state == state)
    }

    pub fn answers_for(&self, state: S) -> impl Iterator<Item = &QuestionAnswer<S>> {
        self.transcript.iter().filter(move |qa| qa.state == state)
    }
}
