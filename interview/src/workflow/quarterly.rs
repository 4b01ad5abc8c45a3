use super::Workflow;
use super::WorkflowSession;
use super::answer_body;
use super::answer_items;
use super::is_none_answer;
use super::no_answer_expected;
use super::non_empty;
use super::parse_yes_no;
use super::split_keyword;
use crate::error::FieldViolation;
use crate::error::InterviewError;
use crate::model::BoardMember;
use crate::model::Direction;
use crate::model::PortfolioHealth;
use crate::model::Prediction;
use crate::model::PredictionStatus;
use crate::model::Problem;
use crate::model::Trigger;
use crate::report::ReportRequest;
use crate::report::ReportSection;
use crate::repository::EntityBatch;
use crate::repository::Portfolio;
use crate::repository::PortfolioVersion;
use crate::session::SessionId;
use crate::session::WorkflowKind;
use crate::state::InterviewState;
use crate::state::QuarterlyState;
use crate::store::SessionPayload;
use crate::transcript::Attribution;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use strum::Display;
use strum::EnumString;
use uuid::Uuid;

/// The quarterly strategic review.
#[derive(Debug, Clone, Copy)]
pub struct QuarterlyReview;

/// What a review starts from: the committed portfolio.
#[derive(Debug, Clone, Default)]
pub struct QuarterlySeed {
    pub problems: Vec<Problem>,
    pub board: Vec<BoardMember>,
    pub triggers: Vec<Trigger>,
    pub last_bet: Option<Prediction>,
    pub health: Option<PortfolioHealth>,
    pub bet_horizon_days: i64,
}

impl QuarterlySeed {
    pub fn from_portfolio(portfolio: &Portfolio, bet_horizon_days: i64) -> Self {
        Self {
            problems: portfolio.problems.clone(),
            board: portfolio.board_members.clone(),
            triggers: portfolio.triggers.clone(),
            last_bet: portfolio.evaluable_prediction().cloned(),
            health: portfolio.health.clone(),
            bet_horizon_days,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum HealthTrend {
    #[strum(to_string = "improving", serialize = "better")]
    Improving,
    #[strum(to_string = "declining", serialize = "worse")]
    Declining,
    #[strum(to_string = "steady", serialize = "same")]
    Steady,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetEvaluation {
    pub prediction_id: Uuid,
    pub status: PredictionStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionUpdate {
    pub problem_id: Uuid,
    pub from: Option<Direction>,
    pub to: Direction,
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerStatus {
    pub trigger_id: Uuid,
    pub description: String,
    pub is_met: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterlyData {
    #[serde(default)]
    pub problems: Vec<Problem>,
    #[serde(default)]
    pub board: Vec<BoardMember>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub last_bet: Option<Prediction>,
    #[serde(default)]
    pub previous_health: Option<PortfolioHealth>,
    pub bet_horizon_days: i64,

    #[serde(default)]
    pub bet_evaluation: Option<BetEvaluation>,
    #[serde(default)]
    pub commitments: Option<String>,
    #[serde(default)]
    pub avoided_decision: Option<String>,
    #[serde(default)]
    pub comfort_work: Option<String>,
    #[serde(default)]
    pub direction_updates: Vec<DirectionUpdate>,
    #[serde(default)]
    pub health_trend: Option<HealthTrend>,
    #[serde(default)]
    pub health_trend_note: Option<String>,
    #[serde(default)]
    pub health: Option<PortfolioHealth>,
    #[serde(default)]
    pub protection: Option<String>,
    #[serde(default)]
    pub opportunity: Option<String>,
    /// Board members already questioned, in order.
    #[serde(default)]
    pub interrogated_members: Vec<Uuid>,
    #[serde(default)]
    pub trigger_statuses: Vec<TriggerStatus>,
    #[serde(default)]
    pub next_bet: Option<Prediction>,
}

impl Default for QuarterlyData {
    fn default() -> Self {
        QuarterlyReview::initial_data(QuarterlySeed {
            bet_horizon_days: 90,
            ..QuarterlySeed::default()
        })
    }
}

impl QuarterlyData {
    fn has_evaluable_bet(&self) -> bool {
        self.last_bet
            .as_ref()
            .is_some_and(|bet| bet.status.can_evaluate())
    }

    /// The next active board member still to be questioned.
    pub fn pending_member(&self) -> Option<&BoardMember> {
        self.board
            .iter()
            .find(|m| m.is_active && !self.interrogated_members.contains(&m.id))
    }

    fn evaluate_last_bet(&mut self, answer: &str) -> Result<(), InterviewError> {
        let (word, notes) = split_keyword(answer);
        let status = word.parse::<PredictionStatus>().ok().filter(|s| *s != PredictionStatus::Open);
        let Some(status) = status else {
            return Err(InterviewError::invalid_field(
                "bet_evaluation",
                "start with correct, wrong, or expired",
            ));
        };
        let bet = self.last_bet.as_mut().ok_or_else(|| {
            InterviewError::InvalidSessionState("there is no open bet to evaluate".to_string())
        })?;
        bet.evaluate(status, Utc::now())?;
        self.bet_evaluation = Some(BetEvaluation {
            prediction_id: bet.id,
            status,
            notes: non_empty(notes),
        });
        Ok(())
    }

    fn apply_direction_changes(&mut self, answer: &str) -> Result<(), InterviewError> {
        self.direction_updates.clear();
        if !is_none_answer(answer) {
            let mut violations = Vec::new();
            for line in answer_items(answer) {
                let parsed = line.split_once(':').and_then(|(number, rest)| {
                    let index = number.trim().parse::<usize>().ok()?.checked_sub(1)?;
                    let (word, rationale) = split_keyword(rest);
                    let direction = word.parse::<Direction>().ok()?;
                    Some((index, direction, rationale))
                });
                let Some((index, direction, rationale)) = parsed else {
                    violations.push(FieldViolation::new(
                        "direction",
                        format!("\"{line}\" should look like \"number: direction why\""),
                    ));
                    continue;
                };
                let Some(problem) = self.problems.get_mut(index) else {
                    violations.push(FieldViolation::new(
                        "direction",
                        format!("there is no problem {}", index + 1),
                    ));
                    continue;
                };
                if problem.direction == Some(direction) {
                    continue;
                }
                self.direction_updates.push(DirectionUpdate {
                    problem_id: problem.id,
                    from: problem.direction,
                    to: direction,
                    rationale: non_empty(rationale.clone()),
                });
                problem.direction = Some(direction);
                if !rationale.is_empty() {
                    problem.direction_rationale = Some(rationale);
                }
            }
            if !violations.is_empty() {
                return Err(InterviewError::ValidationFailed(violations));
            }
        }
        let mut health = PortfolioHealth::from_problems(&self.problems);
        if let Some(previous) = &self.previous_health {
            health.risk_statement = previous.risk_statement.clone();
            health.opportunity_statement = previous.opportunity_statement.clone();
        }
        self.health = Some(health);
        Ok(())
    }

    fn mark_triggers(&mut self, answer: &str) -> Result<(), InterviewError> {
        let mut met = Vec::new();
        if !is_none_answer(answer) {
            for token in answer
                .split(|c: char| c == ',' || c.is_whitespace() || c == ';')
                .filter(|t| !t.is_empty())
            {
                let index = token
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .filter(|i| *i < self.triggers.len())
                    .ok_or_else(|| {
                        InterviewError::invalid_field(
                            "triggers",
                            format!("\"{token}\" is not one of your trigger numbers"),
                        )
                    })?;
                met.push(index);
            }
        }
        for (index, trigger) in self.triggers.iter_mut().enumerate() {
            trigger.is_met = met.contains(&index);
        }
        self.trigger_statuses = self
            .triggers
            .iter()
            .map(|t| TriggerStatus {
                trigger_id: t.id,
                description: t.description.clone(),
                is_met: t.is_met,
            })
            .collect();
        Ok(())
    }

    fn make_next_bet(&mut self, answer: &str) -> Result<(), InterviewError> {
        let lowered = answer.to_ascii_lowercase();
        let split = lowered
            .find("wrong if")
            .map(|at| (answer[..at].trim(), answer[at + "wrong if".len()..].trim()));
        let Some((prediction, wrong_if)) = split.filter(|(p, w)| !p.is_empty() && !w.is_empty())
        else {
            return Err(InterviewError::invalid_field(
                "wrong_if",
                "state the bet as \"<prediction> wrong if <condition>\"",
            ));
        };
        let prediction = prediction.trim_end_matches([',', ';', '.', '-']).trim();
        let mut bet = Prediction::open(prediction, wrong_if);
        bet.due_at = Some(Utc::now() + Duration::days(self.bet_horizon_days));
        self.next_bet = Some(bet);
        Ok(())
    }
}

impl Workflow for QuarterlyReview {
    type State = QuarterlyState;
    type Data = QuarterlyData;
    type Seed = QuarterlySeed;

    const KIND: WorkflowKind = WorkflowKind::Quarterly;

    fn initial_data(seed: QuarterlySeed) -> QuarterlyData {
        QuarterlyData {
            problems: seed.problems,
            board: seed.board,
            triggers: seed.triggers,
            last_bet: seed.last_bet,
            previous_health: seed.health,
            bet_horizon_days: seed.bet_horizon_days,
            bet_evaluation: None,
            commitments: None,
            avoided_decision: None,
            comfort_work: None,
            direction_updates: Vec::new(),
            health_trend: None,
            health_trend_note: None,
            health: None,
            protection: None,
            opportunity: None,
            interrogated_members: Vec::new(),
            trigger_statuses: Vec::new(),
            next_bet: None,
        }
    }

    fn question_text(session: &WorkflowSession<Self>, state: QuarterlyState) -> String {
        let data = &session.workflow;
        let prompt = state.prompt().unwrap_or(state.display_name());
        match state {
            QuarterlyState::LastBetEvaluation => match &data.last_bet {
                Some(bet) => format!(
                    "Your last bet: \"{}\", wrong if {}.\n{prompt}",
                    bet.prediction, bet.wrong_if
                ),
                None => prompt.to_string(),
            },
            QuarterlyState::PortfolioCheck => {
                let listing = data
                    .problems
                    .iter()
                    .enumerate()
                    .map(|(i, p)| {
                        let direction = p.direction.map_or("unset".to_string(), |d| d.to_string());
                        format!(
                            "{}. {} ({direction})",
                            i + 1,
                            p.display_name(i, session.abstraction_mode)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("{prompt}\n{listing}")
            }
            QuarterlyState::BoardInterrogation => match data.pending_member() {
                Some(member) => {
                    let mut text = format!(
                        "{} ({}): {}",
                        member.persona.name,
                        member.role,
                        member.role.interrogation()
                    );
                    if let (Some(demand), false) = (&member.anchored_demand, session.abstraction_mode)
                    {
                        text.push_str(&format!("\nTheir standing demand: {demand}"));
                    }
                    text
                }
                None => prompt.to_string(),
            },
            QuarterlyState::TriggerCheck => {
                let listing = data
                    .triggers
                    .iter()
                    .enumerate()
                    .map(|(i, t)| format!("{}. {}: {}", i + 1, t.description, t.condition))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("{prompt}\n{listing}")
            }
            _ => prompt.to_string(),
        }
    }

    fn attribution(session: &WorkflowSession<Self>, state: QuarterlyState) -> Attribution {
        match state {
            QuarterlyState::BoardInterrogation | QuarterlyState::BoardInterrogationClarify => {
                Attribution {
                    context_index: Some(session.workflow.interrogated_members.len()),
                    role: session.workflow.pending_member().map(|m| m.role),
                }
            }
            _ => Attribution::default(),
        }
    }

    fn accumulate(
        session: &mut WorkflowSession<Self>,
        state: QuarterlyState,
        answer: &str,
    ) -> Result<Vec<String>, InterviewError> {
        let data = &mut session.workflow;
        let mut warnings = Vec::new();
        match state {
            QuarterlyState::SensitivityGate => {
                session.abstraction_mode = parse_yes_no("abstraction_mode", answer)?;
            }
            QuarterlyState::LastBetEvaluation => data.evaluate_last_bet(answer)?,
            QuarterlyState::CommitmentsVsActual => data.commitments = Some(answer.trim().to_string()),
            QuarterlyState::AvoidedDecision => {
                data.avoided_decision = Some(answer.trim().to_string());
            }
            QuarterlyState::ComfortWork => data.comfort_work = Some(answer.trim().to_string()),
            QuarterlyState::PortfolioCheck => data.apply_direction_changes(answer)?,
            QuarterlyState::HealthTrend => {
                let (word, note) = split_keyword(answer);
                let trend = word.parse::<HealthTrend>().map_err(|_| {
                    InterviewError::invalid_field(
                        "health_trend",
                        "start with improving, declining, or steady",
                    )
                })?;
                data.health_trend = Some(trend);
                data.health_trend_note = non_empty(note);
            }
            QuarterlyState::ProtectionCheck => data.protection = Some(answer.trim().to_string()),
            QuarterlyState::OpportunityCheck => {
                data.opportunity = Some(answer.trim().to_string());
            }
            QuarterlyState::BoardInterrogation => {
                let member = data.pending_member().map(|m| m.id).ok_or_else(|| {
                    InterviewError::InvalidSessionState(
                        "every board member has already been heard".to_string(),
                    )
                })?;
                data.interrogated_members.push(member);
            }
            QuarterlyState::TriggerCheck => {
                data.mark_triggers(answer)?;
                let fired = data.trigger_statuses.iter().filter(|t| t.is_met).count();
                if fired > 0 {
                    warnings.push(format!(
                        "{fired} trigger(s) fired; consider re-running setup after this review."
                    ));
                }
            }
            QuarterlyState::NextBet => data.make_next_bet(answer)?,
            QuarterlyState::Initial
            | QuarterlyState::CommitmentsVsActualClarify
            | QuarterlyState::AvoidedDecisionClarify
            | QuarterlyState::ComfortWorkClarify
            | QuarterlyState::ProtectionCheckClarify
            | QuarterlyState::OpportunityCheckClarify
            | QuarterlyState::BoardInterrogationClarify
            | QuarterlyState::NextBetClarify
            | QuarterlyState::Generating
            | QuarterlyState::Finalized
            | QuarterlyState::Abandoned => return Err(no_answer_expected(state)),
        }
        Ok(warnings)
    }

    fn route(session: &WorkflowSession<Self>, answered: QuarterlyState) -> QuarterlyState {
        let data = &session.workflow;
        let mut next = answered.next_state();
        if answered == QuarterlyState::BoardInterrogation && data.pending_member().is_some() {
            return QuarterlyState::BoardInterrogation;
        }
        if next == QuarterlyState::LastBetEvaluation && !data.has_evaluable_bet() {
            next = next.next_state();
        }
        if next == QuarterlyState::BoardInterrogation && data.pending_member().is_none() {
            next = next.next_state();
        }
        next
    }

    fn report_request(session: &WorkflowSession<Self>) -> ReportRequest {
        let data = &session.workflow;
        let abstract_names = session.abstraction_mode;
        let mut sections = Vec::new();

        if let (Some(bet), Some(evaluation)) = (&data.last_bet, &data.bet_evaluation) {
            let mut body = format!("\"{}\" was {}.", bet.prediction, evaluation.status);
            if let Some(notes) = &evaluation.notes {
                body.push_str(&format!("\n{notes}"));
            }
            sections.push(ReportSection::new("Last bet", body));
        }
        sections.push(ReportSection::new(
            "Commitments vs actual",
            answer_body(session, QuarterlyState::CommitmentsVsActual),
        ));
        sections.push(ReportSection::new(
            "Avoided decision",
            answer_body(session, QuarterlyState::AvoidedDecision),
        ));
        sections.push(ReportSection::new(
            "Comfort work",
            answer_body(session, QuarterlyState::ComfortWork),
        ));

        let mut portfolio = Vec::new();
        if data.direction_updates.is_empty() {
            portfolio.push("No problem changed direction.".to_string());
        }
        for update in &data.direction_updates {
            let Some(index) = data.problems.iter().position(|p| p.id == update.problem_id) else {
                continue;
            };
            let from = update.from.map_or("unset".to_string(), |d| d.to_string());
            portfolio.push(format!(
                "- {}: {from} -> {}",
                data.problems[index].display_name(index, abstract_names),
                update.to
            ));
        }
        if let Some(health) = &data.health {
            portfolio.push(format!(
                "Appreciating {}%, depreciating {}%, stable {}%.",
                health.appreciating_percent, health.depreciating_percent, health.stable_percent
            ));
        }
        if let Some(trend) = data.health_trend {
            let mut line = format!("You called the trend {trend}.");
            if let Some(note) = &data.health_trend_note {
                line.push_str(&format!(" {note}"));
            }
            portfolio.push(line);
        }
        sections.push(ReportSection::new("Portfolio", portfolio.join("\n")));

        sections.push(ReportSection::new(
            "Protection",
            answer_body(session, QuarterlyState::ProtectionCheck),
        ));
        sections.push(ReportSection::new(
            "Opportunity",
            answer_body(session, QuarterlyState::OpportunityCheck),
        ));

        let board = session
            .answers_for(QuarterlyState::BoardInterrogation)
            .map(|qa| {
                let role = qa.role.map_or("board".to_string(), |r| r.to_string());
                let mut line = format!("- {role}: {}", qa.answer);
                if let Some(example) = &qa.concrete_example {
                    line.push_str(&format!(" (example: {example})"));
                }
                line
            })
            .collect::<Vec<_>>();
        if !board.is_empty() {
            sections.push(ReportSection::new("Board interrogation", board.join("\n")));
        }

        let fired = data
            .trigger_statuses
            .iter()
            .filter(|t| t.is_met)
            .map(|t| format!("- {}", t.description))
            .collect::<Vec<_>>();
        sections.push(ReportSection::new(
            "Triggers",
            if fired.is_empty() {
                "No triggers fired.".to_string()
            } else {
                fired.join("\n")
            },
        ));

        if let Some(bet) = &data.next_bet {
            let due = bet
                .due_at
                .map(|d| format!(" Check by {}.", d.format("%Y-%m-%d")))
                .unwrap_or_default();
            sections.push(ReportSection::new(
                "Next bet",
                format!("{}\nWrong if {}.{due}", bet.prediction, bet.wrong_if),
            ));
        }

        ReportRequest {
            kind: Self::KIND,
            title: "Quarterly review".to_string(),
            abstraction_mode: session.abstraction_mode,
            sections,
        }
    }

    fn entity_batch(session: &WorkflowSession<Self>, session_id: SessionId) -> EntityBatch {
        let data = &session.workflow;
        let mut predictions = Vec::new();
        if let Some(bet) = data.last_bet.clone().filter(|_| data.bet_evaluation.is_some()) {
            predictions.push(Prediction {
                evaluation_session_id: Some(*session_id.as_uuid()),
                ..bet
            });
        }
        if let Some(bet) = data.next_bet.clone() {
            predictions.push(Prediction {
                source_session_id: Some(*session_id.as_uuid()),
                ..bet
            });
        }
        let health = data
            .health
            .clone()
            .unwrap_or_else(|| PortfolioHealth::from_problems(&data.problems));
        EntityBatch {
            problems: data.problems.clone(),
            predictions,
            triggers: data.triggers.clone(),
            portfolio_version: Some(PortfolioVersion {
                id: *session_id.as_uuid(),
                health,
                allocations: data
                    .problems
                    .iter()
                    .map(|p| (p.id, p.time_allocation_percent))
                    .collect(),
                created_at: session.created_at,
            }),
            ..EntityBatch::empty(session_id, Self::KIND)
        }
    }

    fn into_payload(session: WorkflowSession<Self>) -> SessionPayload {
        SessionPayload::Quarterly(session)
    }

    fn from_payload(payload: SessionPayload) -> Option<WorkflowSession<Self>> {
        match payload {
            SessionPayload::Quarterly(session) => Some(session),
            _ => None,
        }
    }
}
