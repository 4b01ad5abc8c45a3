use super::Workflow;
use super::WorkflowSession;
use super::answer_body;
use super::answer_items;
use super::no_answer_expected;
use super::parse_yes_no;
use crate::error::InterviewError;
use crate::report::ReportRequest;
use crate::report::ReportSection;
use crate::repository::EntityBatch;
use crate::session::SessionId;
use crate::session::WorkflowKind;
use crate::state::QuickState;
use crate::store::SessionPayload;
use serde::Deserialize;
use serde::Serialize;

/// The five-question audit.
#[derive(Debug, Clone, Copy)]
pub struct QuickAudit;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuickAuditData {
    #[serde(default)]
    pub role_context: Option<String>,
    #[serde(default)]
    pub paid_problems: Vec<String>,
    #[serde(default)]
    pub direction_notes: Option<String>,
    #[serde(default)]
    pub avoided_decision: Option<String>,
    #[serde(default)]
    pub comfort_work: Option<String>,
}

impl Workflow for QuickAudit {
    type State = QuickState;
    type Data = QuickAuditData;
    type Seed = ();

    const KIND: WorkflowKind = WorkflowKind::QuickAudit;

    fn initial_data(_seed: ()) -> QuickAuditData {
        QuickAuditData::default()
    }

    fn accumulate(
        session: &mut WorkflowSession<Self>,
        state: QuickState,
        answer: &str,
    ) -> Result<Vec<String>, InterviewError> {
        let data = &mut session.workflow;
        match state {
            QuickState::SensitivityGate => {
                session.abstraction_mode = parse_yes_no("abstraction_mode", answer)?;
            }
            QuickState::RoleContext => data.role_context = Some(answer.to_string()),
            QuickState::PaidProblems => data.paid_problems = answer_items(answer),
            QuickState::DirectionLoop => data.direction_notes = Some(answer.to_string()),
            QuickState::AvoidedDecision => data.avoided_decision = Some(answer.to_string()),
            QuickState::ComfortWork => data.comfort_work = Some(answer.to_string()),
            QuickState::Initial
            | QuickState::PaidProblemsClarify
            | QuickState::DirectionLoopClarify
            | QuickState::AvoidedDecisionClarify
            | QuickState::ComfortWorkClarify
            | QuickState::Generating
            | QuickState::Finalized
            | QuickState::Abandoned => return Err(no_answer_expected(state)),
        }
        Ok(Vec::new())
    }

    fn report_request(session: &WorkflowSession<Self>) -> ReportRequest {
        let data = &session.workflow;
        let problems = if data.paid_problems.is_empty() {
            answer_body(session, QuickState::PaidProblems)
        } else {
            let mut body = data
                .paid_problems
                .iter()
                .enumerate()
                .map(|(i, problem)| {
                    if session.abstraction_mode {
                        format!("- Problem {}", i + 1)
                    } else {
                        format!("- {problem}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            if let Some(example) = session
                .answers_for(QuickState::PaidProblems)
                .last()
                .and_then(|qa| qa.concrete_example.as_deref())
            {
                body.push_str(&format!("\nExample: {example}"));
            }
            body
        };
        let vague = session.transcript.iter().filter(|qa| qa.was_vague).count();
        let clarity = format!(
            "{vague} answer(s) needed a concrete example; clarification was skipped {} time(s).",
            session.vagueness_skip_count
        );

        ReportRequest {
            kind: Self::KIND,
            title: "Quick audit".to_string(),
            abstraction_mode: session.abstraction_mode,
            sections: vec![
                ReportSection::new("Role", answer_body(session, QuickState::RoleContext)),
                ReportSection::new("Paid problems", problems),
                ReportSection::new("Direction", answer_body(session, QuickState::DirectionLoop)),
                ReportSection::new(
                    "Avoided decision",
                    answer_body(session, QuickState::AvoidedDecision),
                ),
                ReportSection::new("Comfort work", answer_body(session, QuickState::ComfortWork)),
                ReportSection::new("Clarity", clarity),
            ],
        }
    }

    fn entity_batch(_session: &WorkflowSession<Self>, session_id: SessionId) -> EntityBatch {
        EntityBatch::empty(session_id, Self::KIND)
    }

    fn into_payload(session: WorkflowSession<Self>) -> SessionPayload {
        SessionPayload::QuickAudit(session)
    }

    fn from_payload(payload: SessionPayload) -> Option<WorkflowSession<Self>> {
        match payload {
            SessionPayload::QuickAudit(session) => Some(session),
            _ => None,
        }
    }
}
