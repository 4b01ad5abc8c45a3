//! A governed interview engine: three interviews (quick audit, portfolio
//! setup, quarterly review) driven through static transition tables, with a
//! vagueness gate that asks for concrete examples before moving on.

mod config;
mod error;
mod gate;
mod layout;
mod model;
mod report;
mod repository;
mod runner;
mod session;
pub mod state;
mod store;
mod transcript;
pub mod validation;
pub mod workflow;

pub use config::InterviewConfig;
pub use error::FieldViolation;
pub use error::InterviewError;
pub use gate::GateContext;
pub use gate::GateError;
pub use gate::HeuristicVaguenessGate;
pub use gate::UnavailableVaguenessGate;
pub use gate::VaguenessGate;
pub use gate::VaguenessVerdict;
pub use layout::DataLayout;
pub use layout::write_atomic;
pub use model::BoardMember;
pub use model::BoardRole;
pub use model::Direction;
pub use model::Persona;
pub use model::PortfolioHealth;
pub use model::Prediction;
pub use model::PredictionStatus;
pub use model::Problem;
pub use model::Trigger;
pub use model::TriggerAction;
pub use model::TriggerType;
pub use report::MarkdownReportGenerator;
pub use report::ReportGenerator;
pub use report::ReportRequest;
pub use report::ReportSection;
pub use repository::CreatedEntities;
pub use repository::EntityBatch;
pub use repository::EntityRepository;
pub use repository::FileEntityRepository;
pub use repository::MemoryEntityRepository;
pub use repository::Portfolio;
pub use repository::PortfolioVersion;
pub use runner::Collaborators;
pub use runner::SessionLifecycle;
pub use runner::SessionRunner;
pub use runner::SessionView;
pub use runner::SubmitOutcome;
pub use session::MAX_VAGUENESS_SKIPS;
pub use session::SessionData;
pub use session::SessionId;
pub use session::WorkflowKind;
pub use store::FileSessionStore;
pub use store::MemorySessionStore;
pub use store::SessionPayload;
pub use store::SessionRecord;
pub use store::SessionStore;
pub use transcript::Attribution;
pub use transcript::QuestionAnswer;
