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
use crate::model::BoardRole;
use crate::model::Direction;
use crate::model::PortfolioHealth;
use crate::model::Problem;
use crate::model::Trigger;
use crate::model::TriggerAction;
use crate::model::TriggerType;
use crate::report::ReportRequest;
use crate::report::ReportSection;
use crate::repository::EntityBatch;
use crate::repository::PortfolioVersion;
use crate::session::SessionId;
use crate::session::WorkflowKind;
use crate::state::InterviewState;
use crate::state::SetupState;
use crate::store::SessionPayload;
use crate::transcript::Attribution;
use crate::validation::AllocationBand;
use crate::validation::AllocationCheck;
use crate::validation::MAX_PROBLEMS;
use crate::validation::MIN_PROBLEMS;
use crate::validation::can_add_problem;
use crate::validation::can_remove_problem;
use crate::validation::check_allocation;
use crate::validation::ensure_problem_complete;
use crate::validation::validate_problem_count;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use strum::IntoEnumIterator;

/// The portfolio and board setup wizard.
#[derive(Debug, Clone, Copy)]
pub struct SetupWizard;

#[derive(Debug, Clone, Copy)]
pub struct SetupSeed {
    pub review_interval_days: i64,
}

impl Default for SetupSeed {
    fn default() -> Self {
        Self {
            review_interval_days: 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupData {
    #[serde(default)]
    pub problems: Vec<Problem>,
    #[serde(default)]
    pub wants_another_problem: bool,
    #[serde(default)]
    pub allocation_band: Option<AllocationBand>,
    #[serde(default)]
    pub health: Option<PortfolioHealth>,
    #[serde(default)]
    pub board: Vec<BoardMember>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    pub review_interval_days: i64,
}

impl Default for SetupData {
    fn default() -> Self {
        Self {
            problems: Vec::new(),
            wants_another_problem: false,
            allocation_band: None,
            health: None,
            board: Vec::new(),
            triggers: Vec::new(),
            review_interval_days: SetupSeed::default().review_interval_days,
        }
    }
}

impl SetupData {
    pub fn add_problem(&mut self, problem: Problem) -> Result<(), InterviewError> {
        if !can_add_problem(self.problems.len()) {
            return Err(InterviewError::invalid_field(
                "problems",
                "a portfolio holds at most 5 problems",
            ));
        }
        self.problems.push(problem);
        Ok(())
    }

    pub fn remove_problem(&mut self, index: usize) -> Result<Problem, InterviewError> {
        if index >= self.problems.len() {
            return Err(InterviewError::invalid_field(
                "problems",
                format!("there is no problem {}", index + 1),
            ));
        }
        if !can_remove_problem(self.problems.len()) {
            return Err(InterviewError::invalid_field(
                "problems",
                format!("a portfolio needs at least {MIN_PROBLEMS} problems"),
            ));
        }
        let removed = self.problems.remove(index);
        for member in &mut self.board {
            if member.anchored_problem_id == Some(removed.id) {
                member.anchored_problem_id = None;
                member.anchored_demand = None;
            }
        }
        self.recompute_health();
        Ok(removed)
    }

    fn current_problem_mut(&mut self) -> Result<&mut Problem, InterviewError> {
        self.problems.last_mut().ok_or_else(|| {
            InterviewError::InvalidSessionState("no problem is being described".to_string())
        })
    }

    /// Applies one percentage per problem, in listing order. Out-of-band
    /// totals are rejected without changing anything.
    pub fn set_allocations(&mut self, percentages: &[u8]) -> Result<AllocationCheck, InterviewError> {
        if percentages.len() != self.problems.len() {
            return Err(InterviewError::invalid_field(
                "allocation",
                format!(
                    "expected {} percentages, one per problem, got {}",
                    self.problems.len(),
                    percentages.len()
                ),
            ));
        }
        let check = check_allocation(percentages);
        if check.band == AllocationBand::Error {
            return Err(InterviewError::invalid_field("allocation", check.message));
        }
        for (problem, percent) in self.problems.iter_mut().zip(percentages) {
            problem.time_allocation_percent = *percent;
        }
        self.allocation_band = Some(check.band);
        self.recompute_health();
        Ok(check)
    }

    fn recompute_health(&mut self) {
        let mut fresh = PortfolioHealth::from_problems(&self.problems);
        if let Some(previous) = self.health.take() {
            fresh.risk_statement = previous.risk_statement;
            fresh.opportunity_statement = previous.opportunity_statement;
        }
        self.health = Some(fresh);
    }

    fn health_mut(&mut self) -> &mut PortfolioHealth {
        self.health
            .get_or_insert_with(|| PortfolioHealth::from_problems(&self.problems))
    }

    /// Problem indices by descending time allocation, ties in listing order.
    fn problems_by_allocation(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.problems.len()).collect();
        order.sort_by_key(|i| std::cmp::Reverse(self.problems[*i].time_allocation_percent));
        order
    }

    fn anchor_board(&mut self, answer: &str) -> Result<(), InterviewError> {
        let growth_active = self
            .problems
            .iter()
            .any(|p| p.direction == Some(Direction::Appreciating));
        let mut board: Vec<BoardMember> = BoardRole::iter()
            .map(|role| BoardMember::seat(role, !role.is_growth() || growth_active))
            .collect();

        if !answer.trim().eq_ignore_ascii_case("auto") {
            let mut violations = Vec::new();
            for line in answer_items(answer) {
                let Some((role_text, number)) = line.split_once(':') else {
                    violations.push(FieldViolation::new(
                        "board",
                        format!("\"{line}\" should look like \"role: problem number\""),
                    ));
                    continue;
                };
                let Some(role) = BoardRole::parse_loose(role_text) else {
                    violations.push(FieldViolation::new(
                        "board",
                        format!("unknown board role \"{}\"", role_text.trim()),
                    ));
                    continue;
                };
                let problem = number
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| self.problems.get(i));
                match (problem, board.iter_mut().find(|m| m.role == role)) {
                    (Some(problem), Some(member)) if member.is_active => member.anchor(problem),
                    (Some(_), _) => violations.push(FieldViolation::new(
                        "board",
                        format!("{role} is not on your board"),
                    )),
                    (None, _) => violations.push(FieldViolation::new(
                        "board",
                        format!("\"{}\" is not a problem number", number.trim()),
                    )),
                }
            }
            if !violations.is_empty() {
                return Err(InterviewError::ValidationFailed(violations));
            }
        }

        let order = self.problems_by_allocation();
        if !order.is_empty() {
            let unanchored = board
                .iter_mut()
                .filter(|m| m.is_active && m.anchored_problem_id.is_none());
            for (member, slot) in unanchored.zip(order.iter().cycle()) {
                member.anchor(&self.problems[*slot]);
            }
        }
        self.board = board;
        Ok(())
    }

    fn rename_personas(&mut self, answer: &str) -> Result<(), InterviewError> {
        if is_none_answer(answer) {
            return Ok(());
        }
        let mut violations = Vec::new();
        for line in answer_items(answer) {
            let renamed = line.split_once(':').and_then(|(role_text, name)| {
                let role = BoardRole::parse_loose(role_text)?;
                let name = name.trim();
                (!name.is_empty()).then_some((role, name))
            });
            let Some((role, name)) = renamed else {
                violations.push(FieldViolation::new(
                    "persona",
                    format!("\"{line}\" should look like \"role: New Name\""),
                ));
                continue;
            };
            match self.board.iter_mut().find(|m| m.role == role) {
                Some(member) => member.persona.name = name.to_string(),
                None => violations.push(FieldViolation::new(
                    "persona",
                    format!("{role} is not on your board"),
                )),
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(InterviewError::ValidationFailed(violations))
        }
    }

    fn set_triggers(&mut self, answer: &str, now: DateTime<Utc>) {
        let mut triggers =
            Trigger::standard_set(now + Duration::days(self.review_interval_days));
        if !is_none_answer(answer) {
            triggers.push(Trigger::new(
                TriggerType::UserDefined,
                "Your own trigger",
                answer.trim(),
                TriggerAction::FullResetup,
            ));
        }
        self.triggers = triggers;
    }
}

fn parse_scarcity(problem: &mut Problem, answer: &str) -> Result<(), InterviewError> {
    let lowered = answer.trim().to_lowercase();
    let unknown = ["unknown", "not sure", "don't know", "dont know", "i don't know"]
        .iter()
        .any(|prefix| lowered.starts_with(prefix));
    if unknown {
        let reason = answer
            .split_once(':')
            .map(|(_, reason)| reason.trim().to_string())
            .filter(|reason| !reason.is_empty())
            .unwrap_or_else(|| answer.trim().to_string());
        problem.scarcity_signals.clear();
        problem.scarcity_unknown_reason = Some(reason);
        return Ok(());
    }
    let signals = answer_items(answer);
    if signals.len() < 2 {
        return Err(InterviewError::invalid_field(
            "scarcity_signals",
            "give two scarcity signals, one per line, or start with \"unknown:\" and say why",
        ));
    }
    problem.scarcity_signals = signals;
    problem.scarcity_unknown_reason = None;
    Ok(())
}

fn parse_percentages(answer: &str) -> Result<Vec<u8>, InterviewError> {
    let mut values = Vec::new();
    for token in answer
        .split(|c: char| !c.is_ascii_digit())
        .filter(|t| !t.is_empty())
    {
        match token.parse::<u8>() {
            Ok(value) if value <= 100 => values.push(value),
            _ => {
                return Err(InterviewError::invalid_field(
                    "allocation",
                    format!("{token}% is not a valid share of your time"),
                ));
            }
        }
    }
    Ok(values)
}

impl Workflow for SetupWizard {
    type State = SetupState;
    type Data = SetupData;
    type Seed = SetupSeed;

    const KIND: WorkflowKind = WorkflowKind::Setup;

    fn initial_data(seed: SetupSeed) -> SetupData {
        SetupData {
            review_interval_days: seed.review_interval_days,
            ..SetupData::default()
        }
    }

    fn question_text(session: &WorkflowSession<Self>, state: SetupState) -> String {
        let prompt = state.prompt().unwrap_or(state.display_name());
        let problems = &session.workflow.problems;
        match state {
            SetupState::ProblemName => format!("Problem {}: {prompt}", problems.len() + 1),
            SetupState::ProblemWhatBreaks
            | SetupState::ProblemScarcity
            | SetupState::ProblemEvidence
            | SetupState::ProblemDirection => match problems.last() {
                Some(problem) => format!("{}: {prompt}", problem.name),
                None => prompt.to_string(),
            },
            SetupState::TimeAllocation | SetupState::BoardAnchoring => {
                let listing = problems
                    .iter()
                    .enumerate()
                    .map(|(i, p)| format!("{}. {}", i + 1, p.name))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("{prompt}\n{listing}")
            }
            _ => prompt.to_string(),
        }
    }

    fn attribution(session: &WorkflowSession<Self>, state: SetupState) -> Attribution {
        let count = session.workflow.problems.len();
        let context_index = match state {
            SetupState::ProblemName => Some(count),
            SetupState::ProblemWhatBreaks
            | SetupState::ProblemScarcity
            | SetupState::ProblemEvidence
            | SetupState::ProblemDirection
            | SetupState::ProblemAddAnother => count.checked_sub(1),
            _ => None,
        };
        Attribution {
            context_index,
            role: None,
        }
    }

    fn accumulate(
        session: &mut WorkflowSession<Self>,
        state: SetupState,
        answer: &str,
    ) -> Result<Vec<String>, InterviewError> {
        let data = &mut session.workflow;
        let mut warnings = Vec::new();
        match state {
            SetupState::SensitivityGate => {
                session.abstraction_mode = parse_yes_no("abstraction_mode", answer)?;
            }
            SetupState::ProblemName => {
                data.add_problem(Problem::named(answer.trim()))?;
                data.wants_another_problem = false;
            }
            SetupState::ProblemWhatBreaks => {
                data.current_problem_mut()?.what_breaks = answer.trim().to_string();
            }
            SetupState::ProblemScarcity => parse_scarcity(data.current_problem_mut()?, answer)?,
            SetupState::ProblemEvidence => {
                let mut items = answer_items(answer).into_iter();
                let problem = data.current_problem_mut()?;
                problem.evidence_ai_cheaper = items.next();
                problem.evidence_error_cost = items.next();
                problem.evidence_trust_required = items.next();
            }
            SetupState::ProblemDirection => {
                let (word, rationale) = split_keyword(answer);
                let direction = word.parse::<Direction>().map_err(|_| {
                    InterviewError::invalid_field(
                        "direction",
                        "start with appreciating, depreciating, or stable",
                    )
                })?;
                let problem = data.current_problem_mut()?;
                problem.direction = Some(direction);
                problem.direction_rationale = non_empty(rationale);
                ensure_problem_complete(problem)?;
            }
            SetupState::ProblemAddAnother => {
                data.wants_another_problem = parse_yes_no("add_another", answer)?;
            }
            SetupState::TimeAllocation => {
                let check = data.set_allocations(&parse_percentages(answer)?)?;
                if check.band == AllocationBand::Warning {
                    warnings.push(check.message);
                }
            }
            SetupState::HealthRisk => {
                data.health_mut().risk_statement = Some(answer.trim().to_string());
            }
            SetupState::HealthOpportunity => {
                data.health_mut().opportunity_statement = Some(answer.trim().to_string());
            }
            SetupState::BoardAnchoring => {
                validate_problem_count(data.problems.len())?;
                data.anchor_board(answer)?;
            }
            SetupState::PersonaNaming => data.rename_personas(answer)?,
            SetupState::ResetupTriggers => data.set_triggers(answer, Utc::now()),
            SetupState::Initial
            | SetupState::ProblemWhatBreaksClarify
            | SetupState::ProblemScarcityClarify
            | SetupState::HealthRiskClarify
            | SetupState::HealthOpportunityClarify
            | SetupState::Publishing
            | SetupState::Finalized
            | SetupState::Abandoned => return Err(no_answer_expected(state)),
        }
        Ok(warnings)
    }

    /// The problem block repeats, so its share of the bar is split across
    /// the most problems a portfolio can hold.
    fn progress_percent(session: &WorkflowSession<Self>, state: SetupState) -> u8 {
        let own = state.progress_percent();
        if !is_problem_block(state) {
            return own;
        }
        let start = u32::from(SetupState::ProblemName.progress_percent());
        let span = u32::from(SetupState::TimeAllocation.progress_percent()) - start;
        let collected = session.workflow.problems.len();
        let done = if state == SetupState::ProblemName {
            collected
        } else {
            collected.saturating_sub(1)
        };
        let done = done.min(MAX_PROBLEMS - 1) as u32;
        let step = u32::from(own) - start;
        (start + (done * span + step) / MAX_PROBLEMS as u32) as u8
    }

    fn route(session: &WorkflowSession<Self>, answered: SetupState) -> SetupState {
        let data = &session.workflow;
        let next = answered.next_state();
        match next {
            SetupState::ProblemAddAnother if data.problems.len() < MIN_PROBLEMS => {
                SetupState::ProblemName
            }
            SetupState::ProblemAddAnother if !can_add_problem(data.problems.len()) => {
                next.next_state()
            }
            SetupState::TimeAllocation
                if answered == SetupState::ProblemAddAnother && data.wants_another_problem =>
            {
                SetupState::ProblemName
            }
            _ => next,
        }
    }

    fn report_request(session: &WorkflowSession<Self>) -> ReportRequest {
        let data = &session.workflow;
        let abstract_names = session.abstraction_mode;
        let mut sections = Vec::new();

        for (index, problem) in data.problems.iter().enumerate() {
            let mut lines = vec![format!("What breaks: {}", problem.what_breaks)];
            match &problem.scarcity_unknown_reason {
                Some(reason) => lines.push(format!("Scarcity unknown: {reason}")),
                None => {
                    lines.push("Scarcity signals:".to_string());
                    lines.extend(problem.scarcity_signals.iter().map(|s| format!("- {s}")));
                }
            }
            for (label, value) in [
                ("AI getting cheaper", &problem.evidence_ai_cheaper),
                ("Cost of errors", &problem.evidence_error_cost),
                ("Trust required", &problem.evidence_trust_required),
            ] {
                if let Some(value) = value {
                    lines.push(format!("{label}: {value}"));
                }
            }
            if let Some(direction) = problem.direction {
                let why = problem.direction_rationale.as_deref().unwrap_or("no rationale given");
                lines.push(format!("Direction: {direction} ({why})"));
            }
            lines.push(format!("Time: {}%", problem.time_allocation_percent));
            sections.push(ReportSection::new(
                problem.display_name(index, abstract_names),
                lines.join("\n"),
            ));
        }

        if let Some(health) = &data.health {
            let mut body = format!(
                "Appreciating {}%, depreciating {}%, stable {}%.",
                health.appreciating_percent, health.depreciating_percent, health.stable_percent
            );
            if data.allocation_band == Some(AllocationBand::Warning) {
                body.push_str("\nYour time allocation does not quite add up to 100%.");
            }
            body.push_str(&format!("\nRisk: {}", answer_body(session, SetupState::HealthRisk)));
            body.push_str(&format!(
                "\nOpportunity: {}",
                answer_body(session, SetupState::HealthOpportunity)
            ));
            sections.push(ReportSection::new("Portfolio health", body));
        }

        let board = data
            .board
            .iter()
            .filter(|m| m.is_active)
            .map(|m| {
                let demand = m.anchored_demand.as_deref().unwrap_or("not anchored");
                let demand = if abstract_names {
                    match data.problems.iter().position(|p| Some(p.id) == m.anchored_problem_id) {
                        Some(i) => format!("anchored to Problem {}", i + 1),
                        None => "not anchored".to_string(),
                    }
                } else {
                    demand.to_string()
                };
                format!("- {} ({}): {demand}", m.role, m.persona.name)
            })
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(ReportSection::new("Your board", board));

        let triggers = data
            .triggers
            .iter()
            .map(|t| format!("- {}: {} ({})", t.description, t.condition, t.recommended_action))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(ReportSection::new("Re-setup triggers", triggers));

        ReportRequest {
            kind: Self::KIND,
            title: "Portfolio and board".to_string(),
            abstraction_mode: session.abstraction_mode,
            sections,
        }
    }

    fn entity_batch(session: &WorkflowSession<Self>, session_id: SessionId) -> EntityBatch {
        let data = &session.workflow;
        let health = data
            .health
            .clone()
            .unwrap_or_else(|| PortfolioHealth::from_problems(&data.problems));
        EntityBatch {
            problems: data.problems.clone(),
            board_members: data.board.clone(),
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
        SessionPayload::Setup(session)
    }

    fn from_payload(payload: SessionPayload) -> Option<WorkflowSession<Self>> {
        match payload {
            SessionPayload::Setup(session) => Some(session),
            _ => None,
        }
    }
}

fn is_problem_block(state: SetupState) -> bool {
    matches!(
        state,
        SetupState::ProblemName
            | SetupState::ProblemWhatBreaks
            | SetupState::ProblemWhatBreaksClarify
            | SetupState::ProblemScarcity
            | SetupState::ProblemScarcityClarify
            | SetupState::ProblemEvidence
            | SetupState::ProblemDirection
            | SetupState::ProblemAddAnother
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionData;
    use pretty_assertions::assert_eq;

    fn complete_problem(name: &str, direction: Direction) -> Problem {
        Problem {
            what_breaks: "Releases stall".into(),
            scarcity_signals: vec!["two recruiters called".into(), "rates up 20%".into()],
            direction: Some(direction),
            ..Problem::named(name)
        }
    }

    fn data_with(problems: usize) -> SetupData {
        let mut data = SetupData::default();
        for i in 0..problems {
            data.add_problem(complete_problem(&format!("P{i}"), Direction::Stable))
                .expect("room for problem");
        }
        data
    }

    #[test]
    fn scarcity_accepts_signals_or_unknown_reason() {
        let mut problem = Problem::named("Pricing");
        assert!(parse_scarcity(&mut problem, "only one signal").is_err());
        parse_scarcity(&mut problem, "rates rising\nthree offers this year").expect("signals");
        assert_eq!(problem.scarcity_signals.len(), 2);
        parse_scarcity(&mut problem, "Unknown: never checked the market").expect("reason");
        assert_eq!(
            problem.scarcity_unknown_reason.as_deref(),
            Some("never checked the market")
        );
        assert!(problem.scarcity_signals.is_empty());
    }

    #[test]
    fn allocation_band_gates_progress() {
        let mut data = data_with(3);
        let check = data.set_allocations(&[40, 40, 10]).expect("warning proceeds");
        assert_eq!(check.band, AllocationBand::Warning);
        let check = data.set_allocations(&[33, 33, 34]).expect("valid");
        assert_eq!(check.band, AllocationBand::Valid);
        assert!(data.set_allocations(&[20, 20, 20]).is_err());
        assert_eq!(data.problems[2].time_allocation_percent, 34);
        assert!(data.set_allocations(&[50, 50]).is_err());
    }

    #[test]
    fn problem_count_is_bounded_both_ways() {
        let mut data = data_with(5);
        assert!(data.add_problem(Problem::named("sixth")).is_err());
        data.remove_problem(0).expect("5 -> 4");
        data.remove_problem(0).expect("4 -> 3");
        assert!(data.remove_problem(0).is_err());
        assert_eq!(data.problems.len(), 3);
    }

    #[test]
    fn board_anchoring_parses_lines_and_fills_the_rest() {
        let mut data = data_with(3);
        data.problems[1].direction = Some(Direction::Appreciating);
        data.set_allocations(&[20, 50, 30]).expect("valid");
        data.anchor_board("market reality: 3").expect("anchor");

        assert_eq!(data.board.len(), 7);
        assert!(data.board.iter().all(|m| m.is_active));
        let market = data
            .board
            .iter()
            .find(|m| m.role == BoardRole::MarketReality)
            .expect("market reality seat");
        assert_eq!(market.anchored_problem_id, Some(data.problems[2].id));
        let accountability = &data.board[0];
        assert_eq!(accountability.anchored_problem_id, Some(data.problems[1].id));
        assert!(data.board.iter().all(|m| m.anchored_demand.is_some()));
    }

    #[test]
    fn growth_roles_sit_out_without_appreciating_problems() {
        let mut data = data_with(3);
        data.anchor_board("auto").expect("auto");
        let inactive: Vec<_> = data
            .board
            .iter()
            .filter(|m| !m.is_active)
            .map(|m| m.role)
            .collect();
        assert_eq!(
            inactive,
            vec![BoardRole::PortfolioDefender, BoardRole::OpportunityScout]
        );
        assert!(data.anchor_board("nobody: 1").is_err());
        assert!(data.anchor_board("avoidance: 9").is_err());
    }

    #[test]
    fn persona_rename_keeps_original() {
        let mut data = data_with(3);
        data.anchor_board("auto").expect("auto");
        data.rename_personas("avoidance: Aunt Ruth").expect("rename");
        let member = data
            .board
            .iter()
            .find(|m| m.role == BoardRole::Avoidance)
            .expect("avoidance seat");
        assert_eq!(member.persona.name, "Aunt Ruth");
        assert_eq!(member.original_persona.name, "Elena Torres");
    }

    #[test]
    fn problem_block_loops_until_three_and_stops_at_five() {
        let mut session: SessionData<SetupState, SetupData> = SessionData::new(data_with(1));
        assert_eq!(
            SetupWizard::route(&session, SetupState::ProblemDirection),
            SetupState::ProblemName
        );
        session.workflow = data_with(3);
        assert_eq!(
            SetupWizard::route(&session, SetupState::ProblemDirection),
            SetupState::ProblemAddAnother
        );
        session.workflow.wants_another_problem = true;
        assert_eq!(
            SetupWizard::route(&session, SetupState::ProblemAddAnother),
            SetupState::ProblemName
        );
        session.workflow = data_with(5);
        assert_eq!(
            SetupWizard::route(&session, SetupState::ProblemDirection),
            SetupState::TimeAllocation
        );
    }

    #[test]
    fn progress_never_moves_backwards_through_the_problem_loop() {
        let mut session: SessionData<SetupState, SetupData> = SessionData::new(SetupData::default());
        let block = [
            SetupState::ProblemWhatBreaks,
            SetupState::ProblemWhatBreaksClarify,
            SetupState::ProblemScarcity,
            SetupState::ProblemScarcityClarify,
            SetupState::ProblemEvidence,
            SetupState::ProblemDirection,
            SetupState::ProblemAddAnother,
        ];
        let mut seen = vec![SetupWizard::progress_percent(&session, SetupState::SensitivityGate)];
        for i in 0..MAX_PROBLEMS {
            seen.push(SetupWizard::progress_percent(&session, SetupState::ProblemName));
            session
                .workflow
                .add_problem(complete_problem(&format!("P{i}"), Direction::Stable))
                .expect("room for problem");
            for state in block {
                seen.push(SetupWizard::progress_percent(&session, state));
            }
        }
        seen.push(SetupWizard::progress_percent(&session, SetupState::TimeAllocation));

        assert_eq!(seen[1], SetupState::ProblemName.progress_percent());
        assert_eq!(seen.last().copied(), Some(SetupState::TimeAllocation.progress_percent()));
        for pair in seen.windows(2) {
            assert!(pair[0] <= pair[1], "progress went backwards: {seen:?}");
        }
    }

    #[test]
    fn triggers_include_user_defined_unless_none() {
        let mut data = SetupData::default();
        data.set_triggers("none", Utc::now());
        assert_eq!(data.triggers.len(), 5);
        data.set_triggers("I get promoted", Utc::now());
        assert_eq!(data.triggers.len(), 6);
        assert_eq!(data.triggers[5].trigger_type, TriggerType::UserDefined);
    }
}
