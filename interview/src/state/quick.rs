use super::InterviewState;
use super::StateRow;
use strum::EnumIter;
use strum::EnumString;
use strum::IntoStaticStr;

/// States of the five-question audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum QuickState {
    Initial,
    SensitivityGate,
    RoleContext,
    PaidProblems,
    PaidProblemsClarify,
    DirectionLoop,
    DirectionLoopClarify,
    AvoidedDecision,
    AvoidedDecisionClarify,
    ComfortWork,
    ComfortWorkClarify,
    Generating,
    Finalized,
    Abandoned,
}

impl InterviewState for QuickState {
    const INITIAL: Self = Self::Initial;
    const FINALIZED: Self = Self::Finalized;
    const ABANDONED: Self = Self::Abandoned;

    fn row(self) -> StateRow<Self> {
        match self {
            Self::Initial => StateRow::entry(Self::SensitivityGate, "Getting started"),
            // unnumbered: the audit itself is "question 1 of 5" onwards
            Self::SensitivityGate => StateRow::question(
                Self::RoleContext,
                0,
                5,
                "Sensitivity",
                "Before we start: should names and specifics be abstracted in your report? (yes/no)",
            ),
            Self::RoleContext => StateRow::question(
                Self::PaidProblems,
                1,
                15,
                "Role context",
                "What is your current role, and what are you actually paid to do day to day?",
            ),
            Self::PaidProblems => StateRow::checked(
                Self::DirectionLoop,
                Self::PaidProblemsClarify,
                2,
                30,
                "Paid problems",
                "Which problems are you paid to solve right now? Name two or three.",
            ),
            Self::PaidProblemsClarify => StateRow::clarify(
                Self::PaidProblems,
                Self::DirectionLoop,
                35,
                "Paid problems: example",
                "That sounds general. Describe one specific time you solved one of these problems.",
            ),
            Self::DirectionLoop => StateRow::checked(
                Self::AvoidedDecision,
                Self::DirectionLoopClarify,
                3,
                45,
                "Direction",
                "For each of those problems: is it becoming more or less valuable, and why?",
            ),
            Self::DirectionLoopClarify => StateRow::clarify(
                Self::DirectionLoop,
                Self::AvoidedDecision,
                50,
                "Direction: example",
                "Name one concrete signal you have seen that the value is changing.",
            ),
            Self::AvoidedDecision => StateRow::checked(
                Self::ComfortWork,
                Self::AvoidedDecisionClarify,
                4,
                60,
                "Avoided decision",
                "What decision have you been avoiding, and what has it cost you so far?",
            ),
            Self::AvoidedDecisionClarify => StateRow::clarify(
                Self::AvoidedDecision,
                Self::ComfortWork,
                65,
                "Avoided decision: example",
                "Name the specific decision and the last time you put it off.",
            ),
            Self::ComfortWork => StateRow::checked(
                Self::Generating,
                Self::ComfortWorkClarify,
                5,
                75,
                "Comfort work",
                "What work do you do because it feels productive rather than because it matters?",
            ),
            Self::ComfortWorkClarify => StateRow::clarify(
                Self::ComfortWork,
                Self::Generating,
                80,
                "Comfort work: example",
                "Give one example from the last two weeks.",
            ),
            Self::Generating => StateRow::generating(Self::Finalized, 95, "Writing your audit"),
            Self::Finalized => StateRow::terminal(Self::Finalized, 100, "Complete"),
            Self::Abandoned => StateRow::terminal(Self::Abandoned, 0, "Abandoned"),
        }
    }
}
