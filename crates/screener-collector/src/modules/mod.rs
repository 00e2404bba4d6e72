//! 펀더멘털 수집 모듈.

pub mod derived;
pub mod orchestrator;
pub mod prioritizer;
pub mod record_builder;
pub mod rotation;
pub mod scoring;
pub mod symbol_sync;
pub mod validation;

pub use derived::{compute_derived, Derived, DerivedMetrics, RawFinancials};
pub use orchestrator::{RunOrchestrator, ROTATION_WORKFLOW};
pub use prioritizer::{prioritize, try_prioritize, PriorityEntry, PriorityReason};
pub use record_builder::{assemble, RecordBuilder, SubResources};
pub use scoring::{ScoreComponent, ScoreLine, ScoringTable, Tier, MAX_COMPOSITE_SCORE};
pub use symbol_sync::{fetch_universe, parse_symbols};
pub use validation::{policy_for, FieldPolicy, QualityCollector};
