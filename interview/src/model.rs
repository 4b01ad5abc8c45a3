//! Durable domain entities collected by the interviews.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use strum::Display;
use strum::EnumIter;
use strum::EnumString;
use strum::IntoEnumIterator;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Direction {
    #[strum(to_string = "appreciating", serialize = "up")]
    Appreciating,
    #[strum(to_string = "depreciating", serialize = "down")]
    Depreciating,
    #[strum(to_string = "stable", serialize = "flat")]
    Stable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: Uuid,
    pub name: String,
    pub what_breaks: String,
    #[serde(default)]
    pub scarcity_signals: Vec<String>,
    #[serde(default)]
    pub scarcity_unknown_reason: Option<String>,
    #[serde(default)]
    pub evidence_ai_cheaper: Option<String>,
    #[serde(default)]
    pub evidence_error_cost: Option<String>,
    #[serde(default)]
    pub evidence_trust_required: Option<String>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub direction_rationale: Option<String>,
    /// Share of working time, 0-100.
    #[serde(default)]
    pub time_allocation_percent: u8,
}

impl Problem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            what_breaks: String::new(),
            scarcity_signals: Vec::new(),
            scarcity_unknown_reason: None,
            evidence_ai_cheaper: None,
            evidence_error_cost: None,
            evidence_trust_required: None,
            direction: None,
            direction_rationale: None,
            time_allocation_percent: 0,
        }
    }

    /// Name shown in reports; abstraction mode hides the real one.
    pub fn display_name(&self, index: usize, abstraction_mode: bool) -> String {
        if abstraction_mode {
            format!("Problem {}", index + 1)
        } else {
            self.name.clone()
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BoardRole {
    Accountability,
    MarketReality,
    Avoidance,
    LongTermPositioning,
    DevilsAdvocate,
    PortfolioDefender,
    OpportunityScout,
}

impl BoardRole {
    pub fn core() -> impl Iterator<Item = Self> {
        Self::iter().filter(|role| !role.is_growth())
    }

    pub fn is_growth(self) -> bool {
        matches!(self, Self::PortfolioDefender | Self::OpportunityScout)
    }

    /// Accepts "market reality", "Market-Reality" and "market_reality".
    pub fn parse_loose(text: &str) -> Option<Self> {
        let normalized: String = text
            .trim()
            .chars()
            .filter(|c| *c != '\'')
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        normalized.parse().ok()
    }

    pub fn default_persona(self) -> Persona {
        let (name, background, style, phrase) = match self {
            Self::Accountability => (
                "Maya Chen",
                "Former operations lead who tracked every commitment to the day.",
                "Direct and calm; asks for dates and receipts.",
                "What exactly did you say you would do?",
            ),
            Self::MarketReality => (
                "Raj Patel",
                "Recruiter turned labor-market analyst.",
                "Blunt; prices everything.",
                "Who is paying for this today, and how much?",
            ),
            Self::Avoidance => (
                "Elena Torres",
                "Executive coach focused on hard conversations.",
                "Warm but relentless.",
                "What are you not saying?",
            ),
            Self::LongTermPositioning => (
                "Walter Brooks",
                "Career strategist with a five-year horizon.",
                "Patient; thinks in compounding.",
                "Where does this leave you in five years?",
            ),
            Self::DevilsAdvocate => (
                "Sam Okafor",
                "Investor who made a living betting against consensus.",
                "Contrarian and precise.",
                "Make the case that you are wrong.",
            ),
            Self::PortfolioDefender => (
                "Grace Kim",
                "Risk manager who protects what already works.",
                "Careful; guards the downside.",
                "What would make this stop appreciating?",
            ),
            Self::OpportunityScout => (
                "Leo Alvarez",
                "Founder who spots adjacent openings early.",
                "Curious and fast.",
                "What is the adjacent move nobody is making?",
            ),
        };
        Persona {
            name: name.to_string(),
            background: background.to_string(),
            communication_style: style.to_string(),
            signature_phrase: phrase.to_string(),
        }
    }

    /// The demand this role makes of the problem it is anchored to.
    pub fn demand_for(self, problem_name: &str) -> String {
        match self {
            Self::Accountability => {
                format!("Show one shipped result on \"{problem_name}\" every quarter.")
            }
            Self::MarketReality => {
                format!("Prove someone would still pay for \"{problem_name}\" next year.")
            }
            Self::Avoidance => format!("Name the hard call you are dodging on \"{problem_name}\"."),
            Self::LongTermPositioning => {
                format!("Explain how \"{problem_name}\" compounds over five years.")
            }
            Self::DevilsAdvocate => {
                format!("Argue why \"{problem_name}\" is a worse bet than it looks.")
            }
            Self::PortfolioDefender => {
                format!("Protect the value of \"{problem_name}\" from erosion.")
            }
            Self::OpportunityScout => {
                format!("Find the adjacent opportunity next to \"{problem_name}\".")
            }
        }
    }

    /// Opening question this role asks in a quarterly review.
    pub fn interrogation(self) -> &'static str {
        match self {
            Self::Accountability => "Which commitment did you miss, and why?",
            Self::MarketReality => "What evidence from the market did you see this quarter?",
            Self::Avoidance => "What conversation did you avoid this quarter?",
            Self::LongTermPositioning => "What did you do this quarter that compounds?",
            Self::DevilsAdvocate => "What is the strongest case that your strategy is wrong?",
            Self::PortfolioDefender => "What threatened your appreciating work this quarter?",
            Self::OpportunityScout => "Which opportunity did you pass on, and should you have?",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub background: String,
    pub communication_style: String,
    pub signature_phrase: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardMember {
    pub id: Uuid,
    pub role: BoardRole,
    pub is_growth_role: bool,
    pub is_active: bool,
    #[serde(default)]
    pub anchored_problem_id: Option<Uuid>,
    #[serde(default)]
    pub anchored_demand: Option<String>,
    pub persona: Persona,
    pub original_persona: Persona,
}

impl BoardMember {
    pub fn seat(role: BoardRole, is_active: bool) -> Self {
        let persona = role.default_persona();
        Self {
            id: Uuid::new_v4(),
            role,
            is_growth_role: role.is_growth(),
            is_active,
            anchored_problem_id: None,
            anchored_demand: None,
            original_persona: persona.clone(),
            persona,
        }
    }

    pub fn anchor(&mut self, problem: &Problem) {
        self.anchored_problem_id = Some(problem.id);
        self.anchored_demand = Some(self.role.demand_for(&problem.name));
    }

    pub fn reset_persona(&mut self) {
        self.persona = self.original_persona.clone();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PortfolioHealth {
    pub appreciating_percent: u8,
    pub depreciating_percent: u8,
    pub stable_percent: u8,
    #[serde(default)]
    pub risk_statement: Option<String>,
    #[serde(default)]
    pub opportunity_statement: Option<String>,
}

impl PortfolioHealth {
    /// Direction mix weighted by time allocation. Falls back to counting
    /// problems when no time has been allocated yet.
    pub fn from_problems(problems: &[Problem]) -> Self {
        let allocated: u32 = problems
            .iter()
            .map(|p| u32::from(p.time_allocation_percent))
            .sum();
        let weight = |p: &Problem| {
            if allocated == 0 {
                1
            } else {
                u32::from(p.time_allocation_percent)
            }
        };
        let total: u32 = problems.iter().map(weight).sum();
        if total == 0 {
            return Self::default();
        }
        let share = |direction: Direction| -> u8 {
            let part: u32 = problems
                .iter()
                .filter(|p| p.direction == Some(direction))
                .map(weight)
                .sum();
            ((part * 100 + total / 2) / total) as u8
        };
        let appreciating_percent = share(Direction::Appreciating);
        let depreciating_percent = share(Direction::Depreciating).min(100 - appreciating_percent);
        Self {
            appreciating_percent,
            depreciating_percent,
            stable_percent: 100 - appreciating_percent - depreciating_percent,
            risk_statement: None,
            opportunity_statement: None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PredictionStatus {
    Open,
    Correct,
    Wrong,
    Expired,
}

/// A falsifiable bet made at the end of a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: Uuid,
    pub prediction: String,
    pub wrong_if: String,
    pub status: PredictionStatus,
    #[serde(default)]
    pub source_session_id: Option<Uuid>,
    #[serde(default)]
    pub evaluation_session_id: Option<Uuid>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl Prediction {
    pub fn open(prediction: impl Into<String>, wrong_if: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prediction: prediction.into(),
            wrong_if: wrong_if.into(),
            status: PredictionStatus::Open,
            source_session_id: None,
            evaluation_session_id: None,
            due_at: None,
            evaluated_at: None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TriggerType {
    QuarterlyReviewDue,
    RoleChange,
    ScopeChange,
    DirectionShift,
    AllocationDrift,
    UserDefined,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TriggerAction {
    FullResetup,
    UpdateProblem,
    UpdateBoard,
    RunQuarterlyReview,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: Uuid,
    pub trigger_type: TriggerType,
    pub description: String,
    pub condition: String,
    pub recommended_action: TriggerAction,
    pub is_met: bool,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

impl Trigger {
    pub fn new(
        trigger_type: TriggerType,
        description: impl Into<String>,
        condition: impl Into<String>,
        recommended_action: TriggerAction,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger_type,
            description: description.into(),
            condition: condition.into(),
            recommended_action,
            is_met: false,
            due_at: None,
        }
    }

    /// The standard set every setup creates.
    pub fn standard_set(review_due_at: DateTime<Utc>) -> Vec<Self> {
        let mut review = Self::new(
            TriggerType::QuarterlyReviewDue,
            "Quarterly review",
            "The review interval has passed",
            TriggerAction::RunQuarterlyReview,
        );
        review.due_at = Some(review_due_at);
        vec![
            review,
            Self::new(
                TriggerType::RoleChange,
                "Role change",
                "You changed role, team, or employer",
                TriggerAction::FullResetup,
            ),
            Self::new(
                TriggerType::ScopeChange,
                "Scope change",
                "Your responsibilities grew or shrank materially",
                TriggerAction::UpdateProblem,
            ),
            Self::new(
                TriggerType::DirectionShift,
                "Direction shift",
                "A problem changed direction since setup",
                TriggerAction::UpdateProblem,
            ),
            Self::new(
                TriggerType::AllocationDrift,
                "Allocation drift",
                "Your time allocation moved by more than 20 points",
                TriggerAction::UpdateBoard,
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn problem(direction: Direction, allocation: u8) -> Problem {
        Problem {
            direction: Some(direction),
            time_allocation_percent: allocation,
            ..Problem::named("p")
        }
    }

    #[test]
    fn health_is_weighted_by_allocation() {
        let problems = vec![
            problem(Direction::Appreciating, 50),
            problem(Direction::Depreciating, 30),
            problem(Direction::Stable, 20),
        ];
        let health = PortfolioHealth::from_problems(&problems);
        assert_eq!(
            (
                health.appreciating_percent,
                health.depreciating_percent,
                health.stable_percent
            ),
            (50, 30, 20)
        );
    }

    #[test]
    fn health_counts_problems_before_allocation() {
        let problems = vec![
            problem(Direction::Appreciating, 0),
            problem(Direction::Appreciating, 0),
            problem(Direction::Depreciating, 0),
        ];
        let health = PortfolioHealth::from_problems(&problems);
        assert_eq!(health.appreciating_percent, 67);
        assert_eq!(health.depreciating_percent, 33);
        assert_eq!(health.stable_percent, 0);
    }

    #[test]
    fn roles_parse_loosely_and_split_core_from_growth() {
        assert_eq!(
            BoardRole::parse_loose("Market Reality"),
            Some(BoardRole::MarketReality)
        );
        assert_eq!(
            BoardRole::parse_loose("devil's advocate"),
            Some(BoardRole::DevilsAdvocate)
        );
        assert_eq!(BoardRole::core().count(), 5);
        assert_eq!(BoardRole::iter().filter(|r| r.is_growth()).count(), 2);
    }

    #[test]
    fn persona_reset_restores_original() {
        let mut member = BoardMember::seat(BoardRole::Avoidance, true);
        member.persona.name = "Custom".into();
        member.reset_persona();
        assert_eq!(member.persona, BoardRole::Avoidance.default_persona());
    }

    #[test]
    fn direction_accepts_synonyms() {
        assert_eq!("UP".parse::<Direction>().ok(), Some(Direction::Appreciating));
        assert_eq!("flat".parse::<Direction>().ok(), Some(Direction::Stable));
    }
}
