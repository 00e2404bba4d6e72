//! 도메인 모델.

pub mod record;
pub mod run_state;

pub use record::*;
pub use run_state::*;
