//! Statistics over harvested records
//!
//! This module turns the free-text price and seller-rating fields into
//! numbers and aggregates them:
//! - Price range and mean
//! - Mean seller rating and a rating histogram
//! - Locations ranked by mean price

use crate::record::{is_sentinel, Record};
use crate::storage::Storage;
use crate::HarvestError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Number of buckets in the rating histogram (0-10%, 10-20%, ... 90-100%)
pub const RATING_BUCKETS: usize = 10;

/// Number of locations reported by mean price
pub const TOP_LOCATIONS: usize = 10;

/// Parses a listing price such as `"$1,299.99"` or `"$10.00 to $20.00"`
///
/// Currency signs and thousands separators are dropped. For ranges, the low
/// end is used. Returns `None` for the sentinel or anything unparseable.
pub fn clean_price(raw: &str) -> Option<f64> {
    if is_sentinel(raw) {
        return None;
    }

    let low = raw
        .split(" to ")
        .next()
        .and_then(|s| s.split('-').next())
        .unwrap_or(raw);

    low.replace(['$', ','], "").trim().parse::<f64>().ok()
}

fn rating_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+\.\d+)%").expect("valid rating regex"))
}

/// Extracts the positive-feedback percentage from seller info text
///
/// `"techseller (1,204) 99.5%"` gives `Some(99.5)`.
pub fn clean_rating(raw: &str) -> Option<f64> {
    rating_regex()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Mean price of the listings from one location
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPrice {
    pub location: String,
    pub mean_price: f64,
    pub listings: u64,
}

/// Aggregate statistics over a set of records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarvestStatistics {
    /// Total number of records
    pub total_records: u64,

    /// Records with a parseable price
    pub priced_records: u64,

    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub mean_price: Option<f64>,

    /// Records with a parseable seller rating
    pub rated_records: u64,

    pub mean_rating: Option<f64>,

    /// Up to ten locations, highest mean price first
    pub top_locations: Vec<LocationPrice>,

    /// Rated records per 10% bucket; 100% falls in the last bucket
    pub rating_histogram: [u64; RATING_BUCKETS],
}

impl HarvestStatistics {
    /// Computes statistics over `records`
    pub fn from_records(records: &[Record]) -> Self {
        let mut stats = Self {
            total_records: records.len() as u64,
            ..Self::default()
        };

        let prices: Vec<f64> = records.iter().filter_map(|r| clean_price(&r.price)).collect();
        stats.priced_records = prices.len() as u64;
        stats.min_price = prices.iter().copied().reduce(f64::min);
        stats.max_price = prices.iter().copied().reduce(f64::max);
        stats.mean_price = mean(&prices);

        let ratings: Vec<f64> = records.iter().filter_map(|r| clean_rating(&r.rating)).collect();
        stats.rated_records = ratings.len() as u64;
        stats.mean_rating = mean(&ratings);
        for rating in &ratings {
            stats.rating_histogram[rating_bucket(*rating)] += 1;
        }

        stats.top_locations = top_locations_by_price(records);
        stats
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn rating_bucket(rating: f64) -> usize {
    let bucket = (rating.clamp(0.0, 100.0) / 10.0).floor() as usize;
    bucket.min(RATING_BUCKETS - 1)
}

fn top_locations_by_price(records: &[Record]) -> Vec<LocationPrice> {
    let mut by_location: HashMap<&str, (f64, u64)> = HashMap::new();

    for record in records {
        if is_sentinel(&record.location) {
            continue;
        }
        if let Some(price) = clean_price(&record.price) {
            let entry = by_location.entry(record.location.as_str()).or_insert((0.0, 0));
            entry.0 += price;
            entry.1 += 1;
        }
    }

    let mut locations: Vec<LocationPrice> = by_location
        .into_iter()
        .map(|(location, (sum, count))| LocationPrice {
            location: location.to_string(),
            mean_price: sum / count as f64,
            listings: count,
        })
        .collect();

    // Ties broken by name so the order is stable
    locations.sort_by(|a, b| {
        b.mean_price
            .total_cmp(&a.mean_price)
            .then_with(|| a.location.cmp(&b.location))
    });
    locations.truncate(TOP_LOCATIONS);
    locations
}

/// Loads statistics over every stored record
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully computed statistics
/// * `Err(HarvestError)` - Failed to load records
pub fn load_statistics(storage: &dyn Storage) -> Result<HarvestStatistics, HarvestError> {
    let records = storage.load_records(None)?;
    Ok(HarvestStatistics::from_records(&records))
}

fn format_price(price: Option<f64>) -> String {
    price.map_or_else(|| "n/a".to_string(), |p| format!("${:.2}", p))
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", stats.total_records);
    println!("  Records with price: {}", stats.priced_records);
    println!("  Records with seller rating: {}", stats.rated_records);
    println!();

    println!("Prices:");
    println!("  Min:  {}", format_price(stats.min_price));
    println!("  Max:  {}", format_price(stats.max_price));
    println!("  Mean: {}", format_price(stats.mean_price));
    println!();

    if let Some(rating) = stats.mean_rating {
        println!("Mean seller rating: {:.2}%", rating);
        println!("Rating distribution:");
        for (i, count) in stats.rating_histogram.iter().enumerate() {
            if *count > 0 {
                println!("  {:>3}-{:<3}%: {}", i * 10, (i + 1) * 10, count);
            }
        }
        println!();
    }

    if !stats.top_locations.is_empty() {
        println!("Top locations by mean price:");
        for loc in &stats.top_locations {
            println!(
                "  {}: ${:.2} ({} listings)",
                loc.location, loc.mean_price, loc.listings
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(price: &str, rating: &str, location: &str) -> Record {
        Record {
            price: price.to_string(),
            rating: rating.to_string(),
            location: location.to_string(),
            ..Record::empty()
        }
    }

    #[test]
    fn test_clean_price() {
        assert_eq!(clean_price("$1,299.99"), Some(1299.99));
        assert_eq!(clean_price("$25.00"), Some(25.0));
        assert_eq!(clean_price("$10.00 to $20.00"), Some(10.0));
        assert_eq!(clean_price("$10.00-$20.00"), Some(10.0));
        assert_eq!(clean_price("N/A"), None);
        assert_eq!(clean_price("Free"), None);
        assert_eq!(clean_price(""), None);
    }

    #[test]
    fn test_clean_rating() {
        assert_eq!(clean_rating("techseller (1,204) 99.5%"), Some(99.5));
        assert_eq!(clean_rating("100.0% positive"), Some(100.0));
        assert_eq!(clean_rating("99%"), None);
        assert_eq!(clean_rating("N/A"), None);
    }

    #[test]
    fn test_rating_bucket_edges() {
        assert_eq!(rating_bucket(0.0), 0);
        assert_eq!(rating_bucket(9.9), 0);
        assert_eq!(rating_bucket(10.0), 1);
        assert_eq!(rating_bucket(99.9), 9);
        assert_eq!(rating_bucket(100.0), 9);
    }

    #[test]
    fn test_statistics_from_records() {
        let records = vec![
            record("$100.00", "a (1) 98.0%", "United States"),
            record("$300.00", "b (2) 99.5%", "United States"),
            record("$50.00", "N/A", "China"),
            record("N/A", "c (3) 45.5%", "N/A"),
        ];

        let stats = HarvestStatistics::from_records(&records);

        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.priced_records, 3);
        assert_eq!(stats.min_price, Some(50.0));
        assert_eq!(stats.max_price, Some(300.0));
        assert_eq!(stats.mean_price, Some(150.0));
        assert_eq!(stats.rated_records, 3);
        assert_eq!(stats.rating_histogram[9], 2);
        assert_eq!(stats.rating_histogram[4], 1);

        assert_eq!(stats.top_locations.len(), 2);
        assert_eq!(stats.top_locations[0].location, "United States");
        assert_eq!(stats.top_locations[0].mean_price, 200.0);
        assert_eq!(stats.top_locations[0].listings, 2);
        assert_eq!(stats.top_locations[1].location, "China");
    }

    #[test]
    fn test_statistics_of_nothing() {
        let stats = HarvestStatistics::from_records(&[]);
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.mean_price, None);
        assert_eq!(stats.mean_rating, None);
        assert!(stats.top_locations.is_empty());
    }

    #[test]
    fn test_top_locations_capped() {
        let records: Vec<Record> = (0..15)
            .map(|i| record(&format!("${}.00", i), "N/A", &format!("Place {}", i)))
            .collect();

        let stats = HarvestStatistics::from_records(&records);

        assert_eq!(stats.top_locations.len(), TOP_LOCATIONS);
        assert_eq!(stats.top_locations[0].location, "Place 14");
    }
}
