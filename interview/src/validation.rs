//! Domain rules checked while answers are collected and when entities are
//! edited later.

use crate::error::FieldViolation;
use crate::error::InterviewError;
use crate::model::Prediction;
use crate::model::PredictionStatus;
use crate::model::Problem;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

pub const MIN_PROBLEMS: usize = 3;
pub const MAX_PROBLEMS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationBand {
    /// 95-105: fine as is.
    Valid,
    /// 90-94 or 106-110: may proceed.
    Warning,
    /// Below 90 or above 110: must be fixed.
    Error,
}

pub fn validate_allocation(total: i32) -> AllocationBand {
    match total {
        95..=105 => AllocationBand::Valid,
        90..=94 | 106..=110 => AllocationBand::Warning,
        _ => AllocationBand::Error,
    }
}

pub fn allocation_message(band: AllocationBand, total: i32) -> String {
    match band {
        AllocationBand::Valid => format!("Your allocation adds up to {total}%."),
        AllocationBand::Warning if total < 100 => format!(
            "Your allocation adds up to {total}%. About {}% of your time is unaccounted for; you can continue or adjust.",
            100 - total
        ),
        AllocationBand::Warning => format!(
            "Your allocation adds up to {total}%, {}% more than your week holds; you can continue or adjust.",
            total - 100
        ),
        AllocationBand::Error => format!(
            "Your allocation adds up to {total}%. It needs to be between 90% and 110% before you continue."
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationCheck {
    pub total: i32,
    pub band: AllocationBand,
    pub message: String,
}

pub fn check_allocation(percentages: &[u8]) -> AllocationCheck {
    let total = percentages.iter().map(|p| i32::from(*p)).sum();
    let band = validate_allocation(total);
    AllocationCheck {
        total,
        band,
        message: allocation_message(band, total),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemField {
    Name,
    WhatBreaks,
    ScarcitySignals,
}

impl ProblemField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::WhatBreaks => "what_breaks",
            Self::ScarcitySignals => "scarcity_signals",
        }
    }

    fn message(self) -> &'static str {
        match self {
            Self::Name => "a problem needs a name",
            Self::WhatBreaks => "say what breaks if nobody solves it",
            Self::ScarcitySignals => {
                "give two scarcity signals, or explain why they are unknown"
            }
        }
    }
}

/// Fields that keep `problem` from being complete; empty when complete.
pub fn problem_violations(problem: &Problem) -> Vec<ProblemField> {
    let mut missing = Vec::new();
    if problem.name.trim().is_empty() {
        missing.push(ProblemField::Name);
    }
    if problem.what_breaks.trim().is_empty() {
        missing.push(ProblemField::WhatBreaks);
    }
    let signals = problem
        .scarcity_signals
        .iter()
        .filter(|s| !s.trim().is_empty())
        .count();
    let has_reason = problem
        .scarcity_unknown_reason
        .as_deref()
        .is_some_and(|r| !r.trim().is_empty());
    if signals < 2 && !has_reason {
        missing.push(ProblemField::ScarcitySignals);
    }
    missing
}

pub fn is_problem_complete(problem: &Problem) -> bool {
    problem_violations(problem).is_empty()
}

pub fn ensure_problem_complete(problem: &Problem) -> Result<(), InterviewError> {
    let missing = problem_violations(problem);
    if missing.is_empty() {
        return Ok(());
    }
    Err(InterviewError::ValidationFailed(
        missing
            .into_iter()
            .map(|field| FieldViolation::new(field.as_str(), field.message()))
            .collect(),
    ))
}

pub fn can_add_problem(count: usize) -> bool {
    count < MAX_PROBLEMS
}

pub fn can_remove_problem(count: usize) -> bool {
    count > MIN_PROBLEMS
}

pub fn validate_problem_count(count: usize) -> Result<(), InterviewError> {
    if (MIN_PROBLEMS..=MAX_PROBLEMS).contains(&count) {
        Ok(())
    } else {
        Err(InterviewError::invalid_field(
            "problems",
            format!("a portfolio needs {MIN_PROBLEMS} to {MAX_PROBLEMS} problems, found {count}"),
        ))
    }
}

// Rows and columns ordered open, correct, wrong, expired.
const PREDICTION_TRANSITIONS: [[bool; 4]; 4] = [
    [false, true, true, true],
    [false, false, false, false],
    [false, false, false, false],
    [false, true, true, true],
];

impl PredictionStatus {
    fn index(self) -> usize {
        match self {
            Self::Open => 0,
            Self::Correct => 1,
            Self::Wrong => 2,
            Self::Expired => 3,
        }
    }

    pub fn can_transition_to(self, to: Self) -> bool {
        PREDICTION_TRANSITIONS[self.index()][to.index()]
    }

    pub fn can_evaluate(self) -> bool {
        matches!(self, Self::Open | Self::Expired)
    }

    pub fn is_evaluated(self) -> bool {
        matches!(self, Self::Correct | Self::Wrong)
    }
}

impl Prediction {
    /// Moves the prediction to `to`, stamping the evaluation time when the
    /// outcome is known.
    pub fn evaluate(
        &mut self,
        to: PredictionStatus,
        at: DateTime<Utc>,
    ) -> Result<(), InterviewError> {
        if !self.status.can_transition_to(to) {
            return Err(InterviewError::invalid_field(
                "status",
                format!("a {} prediction cannot become {to}", self.status),
            ));
        }
        self.status = to;
        if to.is_evaluated() {
            self.evaluated_at = Some(at);
        }
        Ok(())
    }
}
