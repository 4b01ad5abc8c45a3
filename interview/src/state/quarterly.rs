use super::InterviewState;
use super::StateRow;
use strum::EnumIter;
use strum::EnumString;
use strum::IntoStaticStr;

/// States of the quarterly strategic review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum QuarterlyState {
    Initial,
    SensitivityGate,
    LastBetEvaluation,
    CommitmentsVsActual,
    CommitmentsVsActualClarify,
    AvoidedDecision,
    AvoidedDecisionClarify,
    ComfortWork,
    ComfortWorkClarify,
    PortfolioCheck,
    HealthTrend,
    ProtectionCheck,
    ProtectionCheckClarify,
    OpportunityCheck,
    OpportunityCheckClarify,
    BoardInterrogation,
    BoardInterrogationClarify,
    TriggerCheck,
    NextBet,
    NextBetClarify,
    Generating,
    Finalized,
    Abandoned,
}

impl InterviewState for QuarterlyState {
    const INITIAL: Self = Self::Initial;
    const FINALIZED: Self = Self::Finalized;
    const ABANDONED: Self = Self::Abandoned;

    fn row(self) -> StateRow<Self> {
        match self {
            Self::Initial => StateRow::entry(Self::SensitivityGate, "Getting started"),
            Self::SensitivityGate => StateRow::question(
                Self::LastBetEvaluation,
                0,
                2,
                "Sensitivity",
                "Before we start: should names and specifics be abstracted in your report? (yes/no)",
            ),
            Self::LastBetEvaluation => StateRow::question(
                Self::CommitmentsVsActual,
                1,
                8,
                "Last bet",
                "How did your last bet turn out? Start with correct, wrong, or expired, then explain.",
            ),
            Self::CommitmentsVsActual => StateRow::checked(
                Self::AvoidedDecision,
                Self::CommitmentsVsActualClarify,
                2,
                15,
                "Commitments vs actual",
                "What did you say you would do last quarter, and what did you actually do?",
            ),
            Self::CommitmentsVsActualClarify => StateRow::clarify(
                Self::CommitmentsVsActual,
                Self::AvoidedDecision,
                18,
                "Commitments: example",
                "Pick one commitment and describe exactly what happened to it.",
            ),
            Self::AvoidedDecision => StateRow::checked(
                Self::ComfortWork,
                Self::AvoidedDecisionClarify,
                3,
                24,
                "Avoided decision",
                "Which decision did you avoid this quarter?",
            ),
            Self::AvoidedDecisionClarify => StateRow::clarify(
                Self::AvoidedDecision,
                Self::ComfortWork,
                27,
                "Avoided decision: example",
                "Name the decision and the moment you chose not to make it.",
            ),
            Self::ComfortWork => StateRow::checked(
                Self::PortfolioCheck,
                Self::ComfortWorkClarify,
                4,
                33,
                "Comfort work",
                "What comfort work took time this quarter?",
            ),
            Self::ComfortWorkClarify => StateRow::clarify(
                Self::ComfortWork,
                Self::PortfolioCheck,
                36,
                "Comfort work: example",
                "Give one concrete example and roughly how long it took.",
            ),
            Self::PortfolioCheck => StateRow::question(
                Self::HealthTrend,
                5,
                42,
                "Portfolio check",
                "Has any problem changed direction? One line each as \"number: appreciating|depreciating|stable why\", or \"no change\".",
            ),
            Self::HealthTrend => StateRow::question(
                Self::ProtectionCheck,
                6,
                48,
                "Health trend",
                "Overall, is your portfolio improving, declining, or steady? Start with the word, then explain.",
            ),
            Self::ProtectionCheck => StateRow::checked(
                Self::OpportunityCheck,
                Self::ProtectionCheckClarify,
                7,
                54,
                "Protection",
                "What are you doing to protect the value of your appreciating work?",
            ),
            Self::ProtectionCheckClarify => StateRow::clarify(
                Self::ProtectionCheck,
                Self::OpportunityCheck,
                57,
                "Protection: example",
                "Describe one specific thing you did this quarter to protect it.",
            ),
            Self::OpportunityCheck => StateRow::checked(
                Self::BoardInterrogation,
                Self::OpportunityCheckClarify,
                8,
                62,
                "Opportunity",
                "What opportunity did you notice this quarter, and what did you do about it?",
            ),
            Self::OpportunityCheckClarify => StateRow::clarify(
                Self::OpportunityCheck,
                Self::BoardInterrogation,
                65,
                "Opportunity: example",
                "Name the opportunity and the one step you took or will take.",
            ),
            Self::BoardInterrogation => StateRow::checked(
                Self::TriggerCheck,
                Self::BoardInterrogationClarify,
                9,
                72,
                "Board interrogation",
                "Your board has a question for you.",
            ),
            Self::BoardInterrogationClarify => StateRow::clarify(
                Self::BoardInterrogation,
                Self::TriggerCheck,
                76,
                "Board interrogation: example",
                "The board wants evidence. Give one concrete example.",
            ),
            Self::TriggerCheck => StateRow::question(
                Self::NextBet,
                10,
                82,
                "Trigger check",
                "Have any of your re-setup triggers fired? List their numbers, or answer \"none\".",
            ),
            Self::NextBet => StateRow::checked(
                Self::Generating,
                Self::NextBetClarify,
                11,
                88,
                "Next bet",
                "Make one prediction for next quarter as \"<prediction> wrong if <condition>\".",
            ),
            Self::NextBetClarify => StateRow::clarify(
                Self::NextBet,
                Self::Generating,
                91,
                "Next bet: example",
                "Make it checkable: what exactly will you observe, and by when?",
            ),
            Self::Generating => StateRow::generating(Self::Finalized, 96, "Writing your review"),
            Self::Finalized => StateRow::terminal(Self::Finalized, 100, "Complete"),
            Self::Abandoned => StateRow::terminal(Self::Abandoned, 0, "Abandoned"),
        }
    }
}
