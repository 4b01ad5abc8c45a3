//! The vagueness gate: decides whether an answer needs a concrete example
//! before the interview moves on.

use crate::session::WorkflowKind;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaguenessVerdict {
    pub is_vague: bool,
    pub concrete_example_suggestion: Option<String>,
}

impl VaguenessVerdict {
    pub fn concrete() -> Self {
        Self {
            is_vague: false,
            concrete_example_suggestion: None,
        }
    }

    pub fn vague(suggestion: impl Into<String>) -> Self {
        Self {
            is_vague: true,
            concrete_example_suggestion: Some(suggestion.into()),
        }
    }
}

/// What the gate is judging an answer against.
#[derive(Debug, Clone)]
pub struct GateContext {
    pub kind: WorkflowKind,
    pub state_tag: &'static str,
    pub question: String,
}

#[derive(Debug, Error)]
pub enum GateError {
    /// The capability is switched off or unreachable; the interview carries
    /// on without checking.
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// A single call failed; the same answer can be resubmitted.
    #[error("call failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait VaguenessGate: Send + Sync {
    async fn evaluate(
        &self,
        answer: &str,
        context: &GateContext,
    ) -> Result<VaguenessVerdict, GateError>;
}

const FILLER_WORDS: &[&str] = &[
    "things",
    "stuff",
    "various",
    "general",
    "generally",
    "lots",
    "etc",
    "stakeholders",
    "synergy",
    "strategy",
    "strategic",
    "alignment",
    "somehow",
    "maybe",
    "whatever",
    "everything",
    "improve",
    "better",
];

/// Local stand-in for the AI judge: too short, or leaning on filler words
/// without a single concrete number.
#[derive(Debug, Clone)]
pub struct HeuristicVaguenessGate {
    min_words: usize,
}

impl HeuristicVaguenessGate {
    pub fn new(min_words: usize) -> Self {
        Self { min_words }
    }

    pub fn judge(&self, answer: &str) -> VaguenessVerdict {
        let words: Vec<String> = answer
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_ascii_lowercase()
            })
            .filter(|w| !w.is_empty())
            .collect();
        if words.len() < self.min_words {
            return VaguenessVerdict::vague("Add detail: who was involved, what happened, and when.");
        }
        let has_number = answer.chars().any(|c| c.is_ascii_digit());
        let filler = words
            .iter()
            .find(|w| FILLER_WORDS.contains(&w.as_str()));
        match filler {
            Some(word) if !has_number => VaguenessVerdict::vague(format!(
                "\"{word}\" is doing a lot of work there. Name one specific case with a number, a date, or a person."
            )),
            _ => VaguenessVerdict::concrete(),
        }
    }
}

impl Default for HeuristicVaguenessGate {
    fn default() -> Self {
        Self::new(5)
    }
}

#[async_trait]
impl VaguenessGate for HeuristicVaguenessGate {
    async fn evaluate(
        &self,
        answer: &str,
        _context: &GateContext,
    ) -> Result<VaguenessVerdict, GateError> {
        Ok(self.judge(answer))
    }
}

/// A gate that is never reachable. Sessions run with it accept every answer
/// and flag the degradation.
#[derive(Debug, Clone, Default)]
pub struct UnavailableVaguenessGate;

#[async_trait]
impl VaguenessGate for UnavailableVaguenessGate {
    async fn evaluate(
        &self,
        _answer: &str,
        _context: &GateContext,
    ) -> Result<VaguenessVerdict, GateError> {
        Err(GateError::Unavailable(
            "vagueness checking is turned off".to_string(),
        ))
    }
}
