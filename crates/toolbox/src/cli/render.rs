//! # Output Rendering
//!
//! Every renderer takes the data a handler produced plus the [`OutputMode`]
//! and returns the full text to print. In JSON mode the data is serialized as
//! is; in text mode it is laid out in aligned columns using the styles from
//! [`super::styles`].
//!
//! Column widths are measured with `unicode-width` so names with wide
//! characters still line up.

use super::setup::OutputMode;
use super::styles;
use serde::Serialize;
use std::fmt::Write as _;
use std::time::Duration;
use toolboxapp::games::{Game, GameStats};
use toolboxapp::migration::{MigrationMarker, MigrationResult};
use toolboxapp::prefs::Preferences;
use toolboxapp::quota::{QuotaType, QuotaWarning, StorageReport};
use toolboxapp::records::academic::AcademicResource;
use toolboxapp::records::identity::IdentityProfile;
use unicode_width::UnicodeWidthStr;

pub const LABEL_WIDTH: usize = 20;
pub const TIME_WIDTH: usize = 16;
const NAME_WIDTH: usize = 26;
const EMAIL_WIDTH: usize = 30;
const CATEGORY_WIDTH: usize = 12;
const URL_WIDTH: usize = 40;

type RenderResult = serde_json::Result<String>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView<'a> {
    pub data_dir: String,
    pub load_source: &'static str,
    pub persistence_enabled: bool,
    pub needs_migration: bool,
    pub migration: Option<MigrationMarker>,
    pub storage: &'a StorageReport,
    pub warning: Option<&'a QuotaWarning>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GameStatsView<'a> {
    game: Game,
    #[serde(flatten)]
    stats: &'a GameStats,
    average_score: f64,
}

#[derive(Debug, Serialize)]
struct MessageView<'a> {
    message: &'a str,
}

pub fn json<T: Serialize + ?Sized>(value: &T) -> RenderResult {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

pub fn render_message(message: &str, mode: OutputMode) -> RenderResult {
    if mode.is_json() {
        return json(&MessageView { message });
    }
    Ok(format!("{}\n", styles::success().apply_to(message)))
}

pub fn render_status(view: &StatusView<'_>, now_ms: i64, mode: OutputMode) -> RenderResult {
    if mode.is_json() {
        return json(view);
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", styles::heading().apply_to("Toolbox"));
    out.push_str(&field("Data directory", &view.data_dir));
    out.push_str(&field("Loaded from", view.load_source));
    let persistence = if view.persistence_enabled {
        "enabled".to_string()
    } else {
        styles::warning()
            .apply_to("disabled (changes are kept in memory only)")
            .to_string()
    };
    out.push_str(&field("Persistence", &persistence));

    let migration = match (&view.migration, view.needs_migration) {
        (_, true) => styles::accent().apply_to("pending").to_string(),
        (Some(marker), false) => format!(
            "{} {}",
            if marker.completed {
                "completed"
            } else {
                "incomplete"
            },
            styles::muted().apply_to(format!(
                "({} items, {})",
                marker.migrated_items,
                format_time_ago(now_ms, marker.timestamp).trim()
            ))
        ),
        (None, false) => "not needed".to_string(),
    };
    out.push_str(&field("Migration", &migration));

    out.push('\n');
    out.push_str(&storage_lines(view.storage));
    if let Some(warning) = view.warning {
        out.push_str(&warning_line(warning));
    }
    Ok(out)
}

pub fn render_storage(
    report: &StorageReport,
    warning: Option<&QuotaWarning>,
    prefs: &Preferences,
    mode: OutputMode,
) -> RenderResult {
    if mode.is_json() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct StorageView<'a> {
            #[serde(flatten)]
            report: &'a StorageReport,
            settings: &'a toolboxapp::prefs::StorageSettings,
            warning: Option<&'a QuotaWarning>,
        }
        return json(&StorageView {
            report,
            settings: &prefs.storage,
            warning,
        });
    }

    let mut out = storage_lines(report);
    let storage = &prefs.storage;
    out.push_str(&field(
        "Warning threshold",
        &format!("{}%", storage.warning_threshold),
    ));
    let custom = if storage.use_custom_quota {
        format!("{} (in use)", format_bytes(storage.custom_quota))
    } else {
        styles::muted()
            .apply_to(format!("{} (off)", format_bytes(storage.custom_quota)))
            .to_string()
    };
    out.push_str(&field("Custom quota", &custom));
    if let Some(warning) = warning {
        out.push_str(&warning_line(warning));
    }
    Ok(out)
}

fn storage_lines(report: &StorageReport) -> String {
    let mut out = String::new();
    let structured = &report.structured;
    let structured_line = match structured.quota_type {
        QuotaType::Unknown => styles::muted().apply_to("unknown").to_string(),
        quota_type => {
            let text = format!(
                "{} of {} ({:.1}%, {})",
                format_bytes(structured.usage),
                format_bytes(structured.quota),
                structured.percentage,
                if quota_type == QuotaType::Custom {
                    "custom"
                } else {
                    "estimated"
                }
            );
            if structured.is_over_quota {
                styles::warning().apply_to(text).to_string()
            } else {
                text
            }
        }
    };
    out.push_str(&field("Structured store", &structured_line));
    out.push_str(&field(
        "Flat-key store",
        &format!(
            "{} of {} ({:.1}%)",
            format_bytes(report.flat.usage),
            format_bytes(report.flat.quota),
            report.flat.percentage
        ),
    ));
    out
}

fn warning_line(warning: &QuotaWarning) -> String {
    format!(
        "\n{}\n",
        styles::warning().apply_to(format!(
            "Storage is {:.1}% full (threshold {}%). Consider exporting and clearing old data.",
            warning.percentage, warning.threshold
        ))
    )
}

pub fn render_preferences(prefs: &Preferences, now_ms: i64, mode: OutputMode) -> RenderResult {
    if mode.is_json() {
        return json(prefs);
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", styles::heading().apply_to("Favorites"));
    out.push_str(&list_or_none(&prefs.favorite_tools));

    let _ = writeln!(out, "\n{}", styles::heading().apply_to("Recently used"));
    if prefs.usage_history.is_empty() {
        let _ = writeln!(out, "  {}", styles::muted().apply_to("none"));
    }
    for entry in &prefs.usage_history {
        let name = pad_to_width(&truncate_to_width(&entry.tool_id, NAME_WIDTH), NAME_WIDTH);
        let _ = writeln!(
            out,
            "  {} {:>4}x {}",
            name,
            entry.usage_count,
            styles::muted().apply_to(format_time_ago(now_ms, entry.last_used))
        );
    }

    let _ = writeln!(out, "\n{}", styles::heading().apply_to("Search history"));
    out.push_str(&list_or_none(&prefs.search_history));

    let _ = writeln!(out, "\n{}", styles::heading().apply_to("Layout"));
    out.push_str(&field(
        "Density",
        &format!("{:?}", prefs.layout.density).to_lowercase(),
    ));
    out.push_str(&field("Grid columns", &prefs.layout.grid_columns.to_string()));

    let settings = &prefs.settings;
    let _ = writeln!(out, "\n{}", styles::heading().apply_to("Display"));
    out.push_str(&field("Show favorites", &on_off(settings.show_favorites)));
    out.push_str(&field("Show recent tools", &on_off(settings.show_recent_tools)));
    out.push_str(&field(
        "Show search history",
        &on_off(settings.show_search_history),
    ));
    out.push_str(&field("Show news sidebar", &on_off(settings.show_news_sidebar)));
    out.push_str(&field(
        "History limits",
        &format!(
            "{} tools, {} searches",
            settings.max_history_items, settings.max_search_history
        ),
    ));
    Ok(out)
}

pub fn render_favorites(prefs: &Preferences, mode: OutputMode) -> RenderResult {
    if mode.is_json() {
        return json(&prefs.favorite_tools);
    }
    Ok(list_or_none(&prefs.favorite_tools))
}

pub fn render_migration(result: &MigrationResult, mode: OutputMode) -> RenderResult {
    if mode.is_json() {
        return json(result);
    }

    if result.skipped {
        return Ok(format!(
            "{}\n",
            styles::muted().apply_to("Nothing to migrate.")
        ));
    }

    let mut out = String::new();
    let summary = format!(
        "Migrated {} items ({}).",
        result.migrated_items,
        format_bytes(result.total_size)
    );
    if result.success {
        let _ = writeln!(out, "{}", styles::success().apply_to(summary));
    } else {
        let _ = writeln!(out, "{}", styles::accent().apply_to(summary));
    }
    for key in &result.migrated_keys {
        let _ = writeln!(out, "  {}", key);
    }
    if !result.errors.is_empty() {
        let _ = writeln!(
            out,
            "{}",
            styles::warning().apply_to(format!("{} items failed:", result.errors.len()))
        );
        for error in &result.errors {
            let _ = writeln!(
                out,
                "  {} {}",
                error.key,
                styles::muted().apply_to(&error.reason)
            );
        }
    }
    Ok(out)
}

pub fn render_identities(
    profiles: &[IdentityProfile],
    show_ssn: bool,
    mode: OutputMode,
) -> RenderResult {
    if mode.is_json() {
        return json(profiles);
    }
    if profiles.is_empty() {
        return Ok(format!("{}\n", styles::muted().apply_to("No identities.")));
    }

    let mut out = String::new();
    for profile in profiles {
        let name = pad_to_width(
            &truncate_to_width(&profile.full_name(), NAME_WIDTH),
            NAME_WIDTH,
        );
        let email = pad_to_width(&truncate_to_width(&profile.email, EMAIL_WIDTH), EMAIL_WIDTH);
        let ssn = if show_ssn {
            profile.ssn.clone()
        } else {
            mask_ssn(&profile.ssn)
        };
        let _ = writeln!(
            out,
            "{} {:<3} {} {}",
            name,
            styles::accent().apply_to(&profile.address.state_abbreviation),
            email,
            styles::muted().apply_to(ssn)
        );
    }
    Ok(out)
}

pub fn render_resources(resources: &[AcademicResource], mode: OutputMode) -> RenderResult {
    if mode.is_json() {
        return json(resources);
    }
    if resources.is_empty() {
        return Ok(format!("{}\n", styles::muted().apply_to("No resources.")));
    }

    let mut out = String::new();
    for resource in resources {
        let name = pad_to_width(&truncate_to_width(&resource.name, NAME_WIDTH), NAME_WIDTH);
        let category = pad_to_width(
            &truncate_to_width(&resource.category, CATEGORY_WIDTH),
            CATEGORY_WIDTH,
        );
        let url = truncate_to_width(&resource.url, URL_WIDTH);
        let _ = write!(out, "{} {} {}", name, styles::label().apply_to(category), url);
        if !resource.tags.is_empty() {
            let _ = write!(
                out,
                " {}",
                styles::muted().apply_to(format!("[{}]", resource.tags.join(", ")))
            );
        }
        out.push('\n');
    }
    Ok(out)
}

pub fn render_game_stats(stats: &[(Game, GameStats)], now_ms: i64, mode: OutputMode) -> RenderResult {
    if mode.is_json() {
        let views: Vec<GameStatsView<'_>> = stats
            .iter()
            .map(|(game, stats)| GameStatsView {
                game: *game,
                stats,
                average_score: stats.average_score(),
            })
            .collect();
        return json(&views);
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        styles::heading().apply_to(format!(
            "{:<12} {:>6} {:>6} {:>8} {:>8} {:>width$}",
            "GAME",
            "PLAYED",
            "WON",
            "BEST",
            "AVG",
            "LAST",
            width = TIME_WIDTH
        ))
    );
    for (game, stats) in stats {
        let _ = writeln!(
            out,
            "{:<12} {:>6} {:>6} {:>8} {:>8.1} {}",
            game.to_string(),
            stats.games_played,
            stats.games_won,
            stats.best_score,
            stats.average_score(),
            styles::muted().apply_to(format_time_ago(now_ms, stats.last_played))
        );
    }
    Ok(out)
}

fn field(label: &str, value: &str) -> String {
    format!(
        "{} {}\n",
        styles::label().apply_to(pad_to_width(&format!("{label}:"), LABEL_WIDTH)),
        value
    )
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        return format!("  {}\n", styles::muted().apply_to("none"));
    }
    items.iter().map(|item| format!("  {item}\n")).collect()
}

fn on_off(value: bool) -> String {
    let text = if value { "on" } else { "off" };
    text.to_string()
}

/// Show only the last four digits.
fn mask_ssn(ssn: &str) -> String {
    let digits: Vec<char> = ssn.chars().filter(char::is_ascii_digit).collect();
    let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();
    format!("***-**-{tail}")
}

fn pad_to_width(s: &str, width: usize) -> String {
    let current = s.width();
    if current >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - current))
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthChar;

    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    let limit = max_width.saturating_sub(1);
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > limit {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push('…');
    result
}

fn format_time_ago(now_ms: i64, then_ms: i64) -> String {
    if then_ms <= 0 {
        return format!("{:>width$}", "never", width = TIME_WIDTH);
    }
    let elapsed = Duration::from_millis(now_ms.saturating_sub(then_ms).max(0) as u64);
    let time_str = timeago::Formatter::new().convert(elapsed);
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolboxapp::clock::HOUR_MS;
    use toolboxapp::quota::{FlatUsage, QuotaInfo};

    fn plain(s: &str) -> String {
        console::strip_ansi_codes(s).to_string()
    }

    fn report() -> StorageReport {
        StorageReport {
            structured: QuotaInfo {
                usage: 900,
                quota: 1000,
                percentage: 90.0,
                quota_type: QuotaType::Custom,
                is_over_quota: false,
            },
            flat: FlatUsage {
                usage: 2048,
                quota: 5 * 1024 * 1024,
                percentage: 0.04,
            },
        }
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("exactly10c", 10), "exactly10c");
        assert_eq!(truncate_to_width("this is too long", 8), "this is…");
        assert_eq!(truncate_to_width("日本語テキスト", 7), "日本語…");
    }

    #[test]
    fn test_pad_to_width_counts_wide_chars() {
        assert_eq!(pad_to_width("ab", 4), "ab  ");
        assert_eq!(pad_to_width("日本", 6), "日本  ");
        assert_eq!(pad_to_width("toolong", 3), "toolong");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(10 * 1024 * 1024 * 1024), "10.0 GB");
    }

    #[test]
    fn test_format_time_ago() {
        let now = 100 * HOUR_MS;
        assert_eq!(format_time_ago(now, 0).trim(), "never");
        assert_eq!(format_time_ago(now, now - 2 * HOUR_MS).trim(), "2 hours ago");
        assert_eq!(format_time_ago(now, now - HOUR_MS).len(), TIME_WIDTH);
    }

    #[test]
    fn test_mask_ssn() {
        assert_eq!(mask_ssn("123-45-6789"), "***-**-6789");
        assert_eq!(mask_ssn("12"), "***-**-12");
    }

    #[test]
    fn identities_mask_ssn_unless_shown() {
        let profile = IdentityProfile {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            ssn: "123-45-6789".to_string(),
            ..Default::default()
        };
        let masked = plain(&render_identities(&[profile.clone()], false, OutputMode::Text).unwrap());
        assert!(masked.contains("Ada Lovelace"));
        assert!(masked.contains("***-**-6789"));
        assert!(!masked.contains("123-45"));

        let shown = plain(&render_identities(&[profile], true, OutputMode::Text).unwrap());
        assert!(shown.contains("123-45-6789"));
    }

    #[test]
    fn json_mode_serializes_data() {
        let prefs = Preferences {
            favorite_tools: vec!["json-formatter".to_string()],
            ..Default::default()
        };
        let out = render_preferences(&prefs, 0, OutputMode::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["favoriteTools"][0], "json-formatter");
    }

    #[test]
    fn storage_text_shows_both_stores_and_warning() {
        let warning = QuotaWarning {
            percentage: 90.0,
            threshold: 80,
            usage: 900,
            quota: 1000,
        };
        let out = plain(
            &render_storage(&report(), Some(&warning), &Preferences::default(), OutputMode::Text)
                .unwrap(),
        );
        assert!(out.contains("900 B of 1000 B (90.0%, custom)"));
        assert!(out.contains("2.0 KB of 5.0 MB"));
        assert!(out.contains("Storage is 90.0% full"));
        assert!(out.contains("Warning threshold:"));
    }

    #[test]
    fn game_stats_json_includes_average() {
        let stats = GameStats {
            games_played: 4,
            games_won: 1,
            best_score: 40,
            total_score: 100,
            last_played: 5,
        };
        let out = render_game_stats(&[(Game::Snake, stats)], 10, OutputMode::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["game"], "snake");
        assert_eq!(value[0]["gamesPlayed"], 4);
        assert_eq!(value[0]["averageScore"], 25.0);
    }

    #[test]
    fn skipped_migration_says_nothing_to_do() {
        let result = MigrationResult {
            success: true,
            skipped: true,
            ..Default::default()
        };
        let out = plain(&render_migration(&result, OutputMode::Text).unwrap());
        assert_eq!(out.trim(), "Nothing to migrate.");
    }
}
