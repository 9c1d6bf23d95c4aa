//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `HarvestState`: The states of the pagination state machine
//! - `StopReason`: Why a run ended
//! - `RetryReason`: Why a page is being fetched again

mod harvest_state;
mod stop_reason;

// Re-export main types
pub use harvest_state::{HarvestState, RetryReason};
pub use stop_reason::StopReason;
