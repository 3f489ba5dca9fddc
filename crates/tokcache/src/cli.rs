//! Output formatting for CLI commands
//!
//! Human output uses comfy-table; `--json` output is serde JSON.

use comfy_table::{Cell, Color, ContentArrangement, Row, Table};
use std::path::Path;
use tokcache_core::{CacheEntry, CacheStats, SearchHit};

// ============================================================================
// Formatters
// ============================================================================

/// Stats summary (human)
pub fn format_stats(stats: &CacheStats, path: &Path) -> String {
    let mut lines = vec![];
    lines.push("tokcache - Cache Statistics".to_string());
    lines.push("===========================".to_string());
    lines.push(format!("Store:             {}", path.display()));
    lines.push(String::new());
    lines.push(format!("Entries:           {}", format_number(stats.total_entries)));
    lines.push(format!("Hits (persisted):  {}", format_number(stats.total_hits)));
    lines.push(format!("Misses (session):  {}", format_number(stats.total_misses)));
    lines.push(format!("Hit rate:          {:.1}%", stats.hit_rate * 100.0));
    lines.push(String::new());
    lines.push(format!(
        "Original size:     {}",
        format_size(stats.total_original_size)
    ));
    lines.push(format!(
        "Compressed size:   {}",
        format_size(stats.total_compressed_size)
    ));
    lines.push(format!(
        "Compression ratio: {:.1}%",
        stats.compression_ratio * 100.0
    ));
    lines.push(format!("Saved:             {}", format_size(stats.saved_bytes())));

    if stats.vector_count > 0 || stats.semantic_hits > 0 {
        lines.push(String::new());
        lines.push(format!("Vectors:           {}", stats.vector_count));
        lines.push(format!("Semantic hits:     {}", stats.semantic_hits));
    }

    lines.join("\n")
}

/// Entries as table (human) or JSON
pub fn format_entries(entries: &[CacheEntry], json: bool) -> String {
    if json {
        return serde_json::to_string_pretty(entries).unwrap_or_else(|_| "[]".to_string());
    }

    if entries.is_empty() {
        return "No entries.".to_string();
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Key").fg(Color::Cyan),
        Cell::new("Hits").fg(Color::Cyan),
        Cell::new("Original").fg(Color::Cyan),
        Cell::new("Compressed").fg(Color::Cyan),
        Cell::new("Created").fg(Color::Cyan),
        Cell::new("Last access").fg(Color::Cyan),
        Cell::new("Preview").fg(Color::Cyan),
    ]);

    for entry in entries {
        let key = truncate(&entry.key, 40);
        let hits = entry.hit_count.to_string();
        let original = format_size(entry.original_size);
        let compressed = format_size(entry.compressed_size);
        let created = entry.created_at.format("%Y-%m-%d %H:%M").to_string();
        let accessed = entry.last_accessed_at.format("%Y-%m-%d %H:%M:%S").to_string();
        let preview = truncate(&entry.value.replace('\n', " "), 30);

        table.add_row(Row::from(vec![
            &key,
            &hits,
            &original,
            &compressed,
            &created,
            &accessed,
            &preview,
        ]));
    }

    table.to_string()
}

/// Semantic candidates as table (human) or JSON
pub fn format_search_hits(hits: &[SearchHit], json: bool) -> String {
    if json {
        return serde_json::to_string_pretty(hits).unwrap_or_else(|_| "[]".to_string());
    }

    if hits.is_empty() {
        return "No similar keys above the threshold.".to_string();
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Rank").fg(Color::Cyan),
        Cell::new("Similarity").fg(Color::Cyan),
        Cell::new("Key").fg(Color::Cyan),
    ]);

    for (rank, hit) in hits.iter().enumerate() {
        table.add_row(Row::from(vec![
            (rank + 1).to_string(),
            format!("{:.4}", hit.similarity),
            truncate(&hit.id, 60),
        ]));
    }

    table.to_string()
}

// ============================================================================
// Utilities
// ============================================================================

pub fn format_size(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1}MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1_024 {
        format!("{:.1}KB", bytes as f64 / 1_024.0)
    } else {
        format!("{}B", bytes)
    }
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max - 1).collect::<String>() + "…"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(key: &str, hits: u64) -> CacheEntry {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
        CacheEntry {
            key: key.to_string(),
            value: "payload\nsecond line".to_string(),
            compressed_size: 512,
            original_size: 2048,
            hit_count: hits,
            created_at: ts,
            last_accessed_at: ts,
        }
    }

    fn stats() -> CacheStats {
        CacheStats {
            total_entries: 1_500,
            total_hits: 42,
            total_misses: 8,
            hit_rate: 0.84,
            total_compressed_size: 1_048_576,
            total_original_size: 4_194_304,
            compression_ratio: 0.25,
            semantic_hits: 0,
            vector_count: 0,
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(2048), "2.0KB");
        assert_eq!(format_size(3 * 1_048_576), "3.0MB");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_500), "1.50K");
        assert_eq!(format_number(2_000_000), "2.00M");
    }

    #[test]
    fn test_truncate_unicode() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("日本語のテキスト", 4), "日本語…");
    }

    #[test]
    fn test_format_stats() {
        let output = format_stats(&stats(), Path::new("/tmp/cache.db"));
        assert!(output.contains("/tmp/cache.db"));
        assert!(output.contains("1.50K"));
        assert!(output.contains("84.0%"));
        assert!(output.contains("25.0%"));
        assert!(output.contains("Saved:             3.0MB"));
        assert!(!output.contains("Vectors"));

        let semantic = CacheStats {
            vector_count: 3,
            ..stats()
        };
        assert!(format_stats(&semantic, Path::new("x")).contains("Vectors:           3"));
    }

    #[test]
    fn test_format_entries_empty() {
        assert_eq!(format_entries(&[], false), "No entries.");
        assert_eq!(format_entries(&[], true), "[]");
    }

    #[test]
    fn test_format_entries_table() {
        let output = format_entries(&[entry("greeting", 7)], false);
        assert!(output.contains("greeting"));
        assert!(output.contains("2.0KB"));
        assert!(output.contains("2026-03-01 12:30"));
        assert!(output.contains("payload second line"));
    }

    #[test]
    fn test_format_entries_json() {
        let output = format_entries(&[entry("greeting", 7)], true);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["key"], "greeting");
        assert_eq!(parsed[0]["hit_count"], 7);
    }

    #[test]
    fn test_format_search_hits() {
        assert!(format_search_hits(&[], false).starts_with("No similar keys"));

        let hits = vec![
            SearchHit {
                id: "get user information".to_string(),
                similarity: 0.91234,
            },
            SearchHit {
                id: "list users".to_string(),
                similarity: 0.7,
            },
        ];
        let output = format_search_hits(&hits, false);
        assert!(output.contains("0.9123"));
        assert!(output.contains("list users"));

        let parsed: serde_json::Value =
            serde_json::from_str(&format_search_hits(&hits, true)).unwrap();
        assert_eq!(parsed[1]["id"], "list users");
    }
}
