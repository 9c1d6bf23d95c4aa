//! States of the pagination state machine
//!
//! The controller moves through these states one page at a time:
//!
//! ```text
//! Fetching(p) -> Extracting(p) -> Evaluating(p) -> Fetching(p + 1)
//!      |              |                |
//!      |              +-> Done         +-> Done
//!      +-> Retrying(p) -> Fetching(p)
//!      +-> Done
//! ```

use crate::record::Record;
use crate::state::StopReason;
use std::fmt;

/// Why a page is being fetched again
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// The endpoint host name could not be resolved
    NameResolution {
        /// Number of name-resolution retries so far for this page (1-based)
        retry: u32,
    },
}

/// A state of the harvest loop
#[derive(Debug, Clone, PartialEq)]
pub enum HarvestState {
    /// About to request `page`
    Fetching { page: u32 },

    /// Page body received, about to parse it
    Extracting { page: u32, body: String },

    /// Records parsed, about to append them and decide whether to continue
    Evaluating {
        page: u32,
        records: Vec<Record>,
        has_next_page: bool,
    },

    /// Waiting to fetch `page` again
    Retrying { page: u32, reason: RetryReason },

    /// The run is over
    Done(StopReason),
}

impl HarvestState {
    /// The state every run starts in
    pub fn initial() -> Self {
        Self::Fetching { page: 1 }
    }

    /// The page this state refers to, if any
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Fetching { page }
            | Self::Extracting { page, .. }
            | Self::Evaluating { page, .. }
            | Self::Retrying { page, .. } => Some(*page),
            Self::Done(_) => None,
        }
    }

    /// The stop reason, if the run is over
    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            Self::Done(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Short state name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fetching { .. } => "fetching",
            Self::Extracting { .. } => "extracting",
            Self::Evaluating { .. } => "evaluating",
            Self::Retrying { .. } => "retrying",
            Self::Done(_) => "done",
        }
    }
}

impl fmt::Display for HarvestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(reason) => write!(f, "done({})", reason),
            other => match other.page() {
                Some(page) => write!(f, "{}({})", other.name(), page),
                None => write!(f, "{}", other.name()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = HarvestState::initial();
        assert_eq!(state, HarvestState::Fetching { page: 1 });
        assert_eq!(state.page(), Some(1));
        assert_eq!(state.stop_reason(), None);
    }

    #[test]
    fn test_done_carries_stop_reason() {
        let state = HarvestState::Done(StopReason::NoNextPage);
        assert_eq!(state.page(), None);
        assert_eq!(state.stop_reason(), Some(StopReason::NoNextPage));
    }

    #[test]
    fn test_non_terminal_states_have_pages() {
        let states = [
            HarvestState::Fetching { page: 2 },
            HarvestState::Extracting {
                page: 2,
                body: String::new(),
            },
            HarvestState::Evaluating {
                page: 2,
                records: vec![],
                has_next_page: false,
            },
            HarvestState::Retrying {
                page: 2,
                reason: RetryReason::NameResolution { retry: 1 },
            },
        ];

        for state in states {
            assert_eq!(state.page(), Some(2));
            assert_eq!(state.stop_reason(), None);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(HarvestState::Fetching { page: 3 }.to_string(), "fetching(3)");
        assert_eq!(
            HarvestState::Done(StopReason::CapReached).to_string(),
            "done(cap_reached)"
        );
    }
}
