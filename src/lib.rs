//! FEXERJ rating calculator: replays a sequence of tournaments against a
//! persisted player roster, writing an updated roster snapshot and an audit
//! trail per tournament. The batch is resumable from any tournament boundary.

pub mod audit;
pub mod constants;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod identity;
pub mod policy;
pub mod roster;
pub mod runner;
pub mod tournaments;
