//! Project state persistence.
//!
//! The state manager stores the last completed [`IntegrationResult`] per
//! project so a restarted integrator resumes from known state rather than
//! from scratch.

pub mod fsync;
pub mod memory;
pub mod state_manager;

pub use memory::MemoryStateManager;
pub use state_manager::{FileStateManager, StateError, StateManager};
