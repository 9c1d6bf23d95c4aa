//! The harvested listing record
//!
//! Every field is a presentation string. A field whose source content could
//! not be located is set to [`SENTINEL`] instead of being left empty.

use serde::Serialize;

/// Placeholder for a field with no data
pub const SENTINEL: &str = "N/A";

/// One harvested search-result listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub title: String,
    pub price: String,
    pub url: String,
    pub description: String,
    #[serde(rename = "reviews")]
    pub review_count: String,
    pub rating: String,
    pub location: String,
    pub units_sold: String,
}

impl Record {
    /// A record with every field set to the sentinel
    pub fn empty() -> Self {
        Self {
            title: SENTINEL.to_string(),
            price: SENTINEL.to_string(),
            url: SENTINEL.to_string(),
            description: SENTINEL.to_string(),
            review_count: SENTINEL.to_string(),
            rating: SENTINEL.to_string(),
            location: SENTINEL.to_string(),
            units_sold: SENTINEL.to_string(),
        }
    }

    /// Field values in column order
    pub fn fields(&self) -> [&str; 8] {
        [
            &self.title,
            &self.price,
            &self.url,
            &self.description,
            &self.review_count,
            &self.rating,
            &self.location,
            &self.units_sold,
        ]
    }

    /// Returns true if no field carries real content
    pub fn is_all_sentinel(&self) -> bool {
        self.fields().iter().all(|f| is_sentinel(f))
    }
}

/// Returns true if `value` is the no-data placeholder
pub fn is_sentinel(value: &str) -> bool {
    value == SENTINEL
}
