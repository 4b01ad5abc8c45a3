use super::InterviewState;
use super::StateRow;
use strum::EnumIter;
use strum::EnumString;
use strum::IntoStaticStr;

/// States of the portfolio and board setup wizard.
///
/// The problem block (`ProblemName` through `ProblemAddAnother`) is listed
/// once here; repeating it for further problems is a routing decision made by
/// the setup workflow on top of this table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SetupState {
    Initial,
    SensitivityGate,
    ProblemName,
    ProblemWhatBreaks,
    ProblemWhatBreaksClarify,
    ProblemScarcity,
    ProblemScarcityClarify,
    ProblemEvidence,
    ProblemDirection,
    ProblemAddAnother,
    TimeAllocation,
    HealthRisk,
    HealthRiskClarify,
    HealthOpportunity,
    HealthOpportunityClarify,
    BoardAnchoring,
    PersonaNaming,
    ResetupTriggers,
    Publishing,
    Finalized,
    Abandoned,
}

impl InterviewState for SetupState {
    const INITIAL: Self = Self::Initial;
    const FINALIZED: Self = Self::Finalized;
    const ABANDONED: Self = Self::Abandoned;

    fn row(self) -> StateRow<Self> {
        match self {
            Self::Initial => StateRow::entry(Self::SensitivityGate, "Getting started"),
            Self::SensitivityGate => StateRow::question(
                Self::ProblemName,
                0,
                2,
                "Sensitivity",
                "Before we start: should names and specifics be abstracted in your report? (yes/no)",
            ),
            Self::ProblemName => StateRow::question(
                Self::ProblemWhatBreaks,
                1,
                8,
                "Problem name",
                "Name a problem you are paid to solve.",
            ),
            Self::ProblemWhatBreaks => StateRow::checked(
                Self::ProblemScarcity,
                Self::ProblemWhatBreaksClarify,
                2,
                14,
                "What breaks",
                "If nobody solved this problem, what would break, and for whom?",
            ),
            Self::ProblemWhatBreaksClarify => StateRow::clarify(
                Self::ProblemWhatBreaks,
                Self::ProblemScarcity,
                16,
                "What breaks: example",
                "Describe one time it actually broke, or nearly did.",
            ),
            Self::ProblemScarcity => StateRow::checked(
                Self::ProblemEvidence,
                Self::ProblemScarcityClarify,
                3,
                20,
                "Scarcity signals",
                "Give two signals that this skill is scarce, one per line. If you honestly don't know, start with \"unknown:\" and say why.",
            ),
            Self::ProblemScarcityClarify => StateRow::clarify(
                Self::ProblemScarcity,
                Self::ProblemEvidence,
                22,
                "Scarcity: example",
                "Point to something concrete: a request, an offer, a rate, a shortage you saw.",
            ),
            Self::ProblemEvidence => StateRow::question(
                Self::ProblemDirection,
                4,
                27,
                "Evidence",
                "One line each: is AI getting cheaper at this? What does an error cost? How much trust does the work require?",
            ),
            Self::ProblemDirection => StateRow::question(
                Self::ProblemAddAnother,
                5,
                32,
                "Direction",
                "Is this problem appreciating, depreciating, or stable? Start with the word, then say why.",
            ),
            Self::ProblemAddAnother => StateRow::question(
                Self::TimeAllocation,
                6,
                38,
                "Another problem?",
                "Do you want to add another problem? (yes/no)",
            ),
            Self::TimeAllocation => StateRow::question(
                Self::HealthRisk,
                7,
                45,
                "Time allocation",
                "What percentage of your working time goes to each problem, in the order you listed them?",
            ),
            Self::HealthRisk => StateRow::checked(
                Self::HealthOpportunity,
                Self::HealthRiskClarify,
                8,
                52,
                "Portfolio risk",
                "Looking at the whole portfolio, what is the biggest risk?",
            ),
            Self::HealthRiskClarify => StateRow::clarify(
                Self::HealthRisk,
                Self::HealthOpportunity,
                55,
                "Portfolio risk: example",
                "What would the first sign of that risk look like in practice?",
            ),
            Self::HealthOpportunity => StateRow::checked(
                Self::BoardAnchoring,
                Self::HealthOpportunityClarify,
                9,
                60,
                "Portfolio opportunity",
                "Where is the biggest opportunity you are under-investing in?",
            ),
            Self::HealthOpportunityClarify => StateRow::clarify(
                Self::HealthOpportunity,
                Self::BoardAnchoring,
                63,
                "Portfolio opportunity: example",
                "Name one specific step that would test this opportunity.",
            ),
            Self::BoardAnchoring => StateRow::question(
                Self::PersonaNaming,
                10,
                70,
                "Board anchoring",
                "Anchor your board: one line per role as \"role: problem number\", or \"auto\".",
            ),
            Self::PersonaNaming => StateRow::question(
                Self::ResetupTriggers,
                11,
                78,
                "Personas",
                "Rename any board persona with \"role: New Name\", or answer \"keep\".",
            ),
            Self::ResetupTriggers => StateRow::question(
                Self::Publishing,
                12,
                86,
                "Re-setup triggers",
                "Besides the standard triggers, what event should make you redo this setup? Answer \"none\" to skip.",
            ),
            Self::Publishing => StateRow::generating(Self::Finalized, 95, "Publishing your board"),
            Self::Finalized => StateRow::terminal(Self::Finalized, 100, "Complete"),
            Self::Abandoned => StateRow::terminal(Self::Abandoned, 0, "Abandoned"),
        }
    }
}
