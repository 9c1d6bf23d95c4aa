//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of harvest runs,
//! including run metadata, price and rating statistics, and top locations.

use crate::output::summary::{OutputResult, RunSummary};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates a markdown summary of a harvest run
///
/// # Arguments
///
/// * `summary` - The run summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

fn price_cell(price: Option<f64>) -> String {
    price.map_or_else(|| "-".to_string(), |p| format!("${:.2}", p))
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let stats = &summary.statistics;
    let mut md = String::new();

    md.push_str("# Listing-Harvester Run Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!("- **Keyword**: {}\n", summary.keyword));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!("- **Duration**: {} seconds\n", duration));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    if let Some(reason) = &summary.stop_reason {
        md.push_str(&format!("- **Stop Reason**: {}\n", reason));
    }
    md.push_str(&format!("- **Records Collected**: {}\n", summary.run_records));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    // Overall statistics
    md.push_str("## Stored Records\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Total Records | {} |\n", stats.total_records));
    md.push_str(&format!("| With Price | {} |\n", stats.priced_records));
    md.push_str(&format!("| Min Price | {} |\n", price_cell(stats.min_price)));
    md.push_str(&format!("| Max Price | {} |\n", price_cell(stats.max_price)));
    md.push_str(&format!("| Mean Price | {} |\n", price_cell(stats.mean_price)));
    md.push_str(&format!("| With Seller Rating | {} |\n", stats.rated_records));
    if let Some(rating) = stats.mean_rating {
        md.push_str(&format!("| Mean Seller Rating | {:.2}% |\n", rating));
    }
    md.push('\n');

    if stats.rated_records > 0 {
        md.push_str("## Seller Rating Distribution\n\n");
        md.push_str("| Rating | Records |\n");
        md.push_str("|--------|---------|\n");
        for (i, count) in stats.rating_histogram.iter().enumerate() {
            md.push_str(&format!("| {}-{}% | {} |\n", i * 10, (i + 1) * 10, count));
        }
        md.push('\n');
    }

    if !stats.top_locations.is_empty() {
        md.push_str("## Top Locations by Mean Price\n\n");
        md.push_str("| Location | Mean Price | Listings |\n");
        md.push_str("|----------|------------|----------|\n");
        for loc in &stats.top_locations {
            md.push_str(&format!(
                "| {} | ${:.2} | {} |\n",
                loc.location, loc.mean_price, loc.listings
            ));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::stats::LocationPrice;

    fn create_test_summary() -> RunSummary {
        let mut summary = RunSummary::new();
        summary.run_id = 1;
        summary.keyword = "gaming laptop".to_string();
        summary.started_at = "2024-01-01T00:00:00Z".to_string();
        summary.finished_at = Some("2024-01-01T00:05:00Z".to_string());
        summary.duration_seconds = Some(300);
        summary.status = "completed".to_string();
        summary.stop_reason = Some("cap_reached".to_string());
        summary.config_hash = "abc123".to_string();
        summary.run_records = 250;
        summary.statistics.total_records = 1250;
        summary.statistics.priced_records = 1200;
        summary.statistics.mean_price = Some(812.5);
        summary
    }

    #[test]
    fn test_format_markdown_summary() {
        let markdown = format_markdown_summary(&create_test_summary());

        assert!(markdown.contains("# Listing-Harvester Run Summary"));
        assert!(markdown.contains("- **Keyword**: gaming laptop"));
        assert!(markdown.contains("- **Stop Reason**: cap_reached"));
        assert!(markdown.contains("| Total Records | 1250 |"));
        assert!(markdown.contains("| Mean Price | $812.50 |"));
        assert!(markdown.contains("| Min Price | - |"));
    }

    #[test]
    fn test_markdown_optional_sections() {
        let mut summary = create_test_summary();
        let markdown = format_markdown_summary(&summary);
        assert!(!markdown.contains("Seller Rating Distribution"));
        assert!(!markdown.contains("Top Locations"));

        summary.statistics.rated_records = 3;
        summary.statistics.rating_histogram[9] = 3;
        summary.statistics.top_locations = vec![LocationPrice {
            location: "United States".to_string(),
            mean_price: 999.0,
            listings: 4,
        }];
        let markdown = format_markdown_summary(&summary);

        assert!(markdown.contains("| 90-100% | 3 |"));
        assert!(markdown.contains("| United States | $999.00 | 4 |"));
    }

    #[test]
    fn test_generate_markdown_summary_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("summary.md");

        generate_markdown_summary(&create_test_summary(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Listing-Harvester Run Summary"));
    }
}
