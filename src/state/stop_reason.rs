//! Terminal reasons for a harvest run
//!
//! A run always ends with exactly one of these. Only `FetchExhausted` marks a
//! premature stop; the records gathered before it are still returned.

use std::fmt;

/// Why a harvest run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The accumulator reached the configured record cap
    CapReached,

    /// A page contained no listings (end of results)
    NoItemsOnPage,

    /// The page had no next-page control, or it was disabled
    NoNextPage,

    /// A fetch failed with a non-recoverable error
    FetchExhausted,
}

impl StopReason {
    /// Returns true if the run ended normally (not on a fetch failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::FetchExhausted)
    }

    /// Returns true if the run ran out of results on the server side
    pub fn is_end_of_results(&self) -> bool {
        matches!(self, Self::NoItemsOnPage | Self::NoNextPage)
    }

    /// Converts the reason to its database/log code
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::CapReached => "cap_reached",
            Self::NoItemsOnPage => "no_items_on_page",
            Self::NoNextPage => "no_next_page",
            Self::FetchExhausted => "fetch_exhausted",
        }
    }

    /// Parses a reason from its database/log code
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "cap_reached" => Some(Self::CapReached),
            "no_items_on_page" => Some(Self::NoItemsOnPage),
            "no_next_page" => Some(Self::NoNextPage),
            "fetch_exhausted" => Some(Self::FetchExhausted),
            _ => None,
        }
    }

    /// Returns all stop reasons
    pub fn all_reasons() -> [Self; 4] {
        [
            Self::CapReached,
            Self::NoItemsOnPage,
            Self::NoNextPage,
            Self::FetchExhausted,
        ]
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_success() {
        assert!(StopReason::CapReached.is_success());
        assert!(StopReason::NoItemsOnPage.is_success());
        assert!(StopReason::NoNextPage.is_success());
        assert!(!StopReason::FetchExhausted.is_success());
    }

    #[test]
    fn test_is_end_of_results() {
        assert!(StopReason::NoItemsOnPage.is_end_of_results());
        assert!(StopReason::NoNextPage.is_end_of_results());
        assert!(!StopReason::CapReached.is_end_of_results());
        assert!(!StopReason::FetchExhausted.is_end_of_results());
    }

    #[test]
    fn test_roundtrip_db_string() {
        for reason in StopReason::all_reasons() {
            assert_eq!(StopReason::from_db_string(reason.to_db_string()), Some(reason));
        }
        assert_eq!(StopReason::from_db_string("invalid"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", StopReason::CapReached), "cap_reached");
        assert_eq!(format!("{}", StopReason::FetchExhausted), "fetch_exhausted");
    }
}
