//! # Command Handlers
//!
//! One function per command. A handler calls into the [`Toolbox`] facade,
//! hands the result to a renderer, and returns the text to print. Handlers
//! never print themselves; `commands::run` does that once at the end.
//!
//! [`Toolbox`]: toolboxapp::Toolbox

use super::render::{self, StatusView};
use super::setup::OutputMode;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use toolboxapp::export::{self, CsvRecord, ExportFormat};
use toolboxapp::games::Game;
use toolboxapp::init::ToolboxContext;
use toolboxapp::prefs::model::{Density, LayoutPatch, StoragePatch};

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn status(ctx: &mut ToolboxContext, mode: OutputMode) -> Result<String> {
    let check = ctx.toolbox.preferences_mut().refresh_storage()?;
    let migrator = ctx.toolbox.migrator();
    let prefs = ctx.toolbox.preferences();
    let (needs_migration, migration) = if prefs.persistence_enabled() {
        (migrator.needs_migration()?, migrator.marker()?)
    } else {
        (false, None)
    };

    let view = StatusView {
        data_dir: ctx.data_dir.display().to_string(),
        load_source: prefs.source().map_or("not loaded", |s| s.as_str()),
        persistence_enabled: prefs.persistence_enabled(),
        needs_migration,
        migration,
        storage: &check.report,
        warning: check.warning.as_ref(),
    };
    Ok(render::render_status(&view, now_ms(), mode)?)
}

pub fn migrate(ctx: &mut ToolboxContext, mode: OutputMode) -> Result<String> {
    let result = ctx
        .toolbox
        .migrator()
        .migrate()
        .context("Migration aborted")?;
    Ok(render::render_migration(&result, mode)?)
}

pub fn restore(ctx: &mut ToolboxContext, yes: bool, mode: OutputMode) -> Result<String> {
    if !yes {
        bail!("restore overwrites the current flat-key data; run again with --yes to confirm");
    }
    let restored = ctx.toolbox.migrator().restore_pre_migration_data()?;
    Ok(render::render_message(
        &format!("Restored {} items from the pre-migration snapshot.", restored),
        mode,
    )?)
}

pub fn prefs_show(ctx: &mut ToolboxContext, mode: OutputMode) -> Result<String> {
    let prefs = ctx.toolbox.preferences().preferences();
    Ok(render::render_preferences(prefs, now_ms(), mode)?)
}

pub fn prefs_export(
    ctx: &mut ToolboxContext,
    file: Option<&Path>,
    mode: OutputMode,
) -> Result<String> {
    let snapshot = ctx.toolbox.preferences().export_snapshot()?;
    match file {
        Some(path) => {
            write_file(path, &snapshot)?;
            Ok(render::render_message(
                &format!("Exported preferences to {}", path.display()),
                mode,
            )?)
        }
        None => Ok(format!("{snapshot}\n")),
    }
}

pub fn prefs_import(ctx: &mut ToolboxContext, file: &Path, mode: OutputMode) -> Result<String> {
    let blob = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    if !ctx.toolbox.preferences_mut().import_snapshot(&blob) {
        bail!("{} is not a valid preferences export", file.display());
    }
    Ok(render::render_message(
        &format!("Imported preferences from {}", file.display()),
        mode,
    )?)
}

pub fn prefs_reset(ctx: &mut ToolboxContext, mode: OutputMode) -> Result<String> {
    ctx.toolbox.preferences_mut().clear_all()?;
    Ok(render::render_message("Preferences reset to defaults.", mode)?)
}

pub fn favorite_add(ctx: &mut ToolboxContext, tool_id: &str, mode: OutputMode) -> Result<String> {
    ctx.toolbox.preferences_mut().add_favorite(tool_id)?;
    Ok(render::render_message(
        &format!("Added {} to favorites", tool_id),
        mode,
    )?)
}

pub fn favorite_remove(
    ctx: &mut ToolboxContext,
    tool_id: &str,
    mode: OutputMode,
) -> Result<String> {
    if !ctx.toolbox.preferences().preferences().is_favorite(tool_id) {
        bail!("{} is not a favorite", tool_id);
    }
    ctx.toolbox.preferences_mut().remove_favorite(tool_id)?;
    Ok(render::render_message(
        &format!("Removed {} from favorites", tool_id),
        mode,
    )?)
}

pub fn favorite_list(ctx: &mut ToolboxContext, mode: OutputMode) -> Result<String> {
    Ok(render::render_favorites(
        ctx.toolbox.preferences().preferences(),
        mode,
    )?)
}

pub fn usage_record(ctx: &mut ToolboxContext, tool_id: &str, mode: OutputMode) -> Result<String> {
    let prefs = ctx.toolbox.preferences_mut().record_usage(tool_id)?;
    let count = prefs.usage_of(tool_id).map_or(0, |u| u.usage_count);
    Ok(render::render_message(
        &format!("Recorded use of {} ({} total)", tool_id, count),
        mode,
    )?)
}

pub fn search_add(ctx: &mut ToolboxContext, term: &[String], mode: OutputMode) -> Result<String> {
    let term = term.join(" ");
    if term.trim().is_empty() {
        bail!("search term is empty");
    }
    ctx.toolbox.preferences_mut().add_search_history(&term)?;
    Ok(render::render_message(
        &format!("Added \"{}\" to search history", term.trim()),
        mode,
    )?)
}

pub fn search_clear(ctx: &mut ToolboxContext, mode: OutputMode) -> Result<String> {
    ctx.toolbox.preferences_mut().clear_search_history()?;
    Ok(render::render_message("Search history cleared.", mode)?)
}

pub fn layout_set(
    ctx: &mut ToolboxContext,
    density: Option<Density>,
    columns: Option<u8>,
    mode: OutputMode,
) -> Result<String> {
    if density.is_none() && columns.is_none() {
        bail!("nothing to change; pass --density and/or --columns");
    }
    let prefs = ctx.toolbox.preferences_mut().update_layout(LayoutPatch {
        density,
        grid_columns: columns,
    })?;
    let layout = prefs.layout.clone();
    Ok(render::render_message(
        &format!(
            "Layout: {} density, {} columns",
            format!("{:?}", layout.density).to_lowercase(),
            layout.grid_columns
        ),
        mode,
    )?)
}

pub fn storage(
    ctx: &mut ToolboxContext,
    threshold: Option<u8>,
    quota: Option<u64>,
    custom: Option<bool>,
    mode: OutputMode,
) -> Result<String> {
    if threshold.is_some() || quota.is_some() || custom.is_some() {
        ctx.toolbox.preferences_mut().update_storage(StoragePatch {
            custom_quota: quota,
            use_custom_quota: custom,
            warning_threshold: threshold,
            last_warning_time: None,
        })?;
    }
    let check = ctx.toolbox.preferences_mut().refresh_storage()?;
    Ok(render::render_storage(
        &check.report,
        check.warning.as_ref(),
        ctx.toolbox.preferences().preferences(),
        mode,
    )?)
}

pub fn identities_list(
    ctx: &mut ToolboxContext,
    state: Option<&str>,
    mode: OutputMode,
) -> Result<String> {
    let identities = ctx.toolbox.identities();
    let profiles = match state {
        Some(state) => identities.by_state(state)?,
        None => identities.get_all()?,
    };
    let show_ssn = identities.settings()?.show_ssn;
    Ok(render::render_identities(&profiles, show_ssn, mode)?)
}

pub fn identities_export(
    ctx: &mut ToolboxContext,
    file: Option<&Path>,
    format: Option<ExportFormat>,
    mode: OutputMode,
) -> Result<String> {
    let profiles = ctx.toolbox.identities().get_all()?;
    write_export(&profiles, "identities", file, format, mode)
}

pub fn resources_list(
    ctx: &mut ToolboxContext,
    category: Option<&str>,
    mode: OutputMode,
) -> Result<String> {
    let resources = ctx.toolbox.resources();
    let list = match category {
        Some(category) => resources.by_category(category)?,
        None => resources.get_all()?,
    };
    Ok(render::render_resources(&list, mode)?)
}

pub fn resources_search(
    ctx: &mut ToolboxContext,
    query: &[String],
    mode: OutputMode,
) -> Result<String> {
    let found = ctx.toolbox.resources().search(&query.join(" "))?;
    Ok(render::render_resources(&found, mode)?)
}

pub fn resources_export(
    ctx: &mut ToolboxContext,
    file: Option<&Path>,
    format: Option<ExportFormat>,
    mode: OutputMode,
) -> Result<String> {
    let resources = ctx.toolbox.resources().get_all()?;
    write_export(&resources, "resources", file, format, mode)
}

pub fn game_stats(ctx: &mut ToolboxContext, game: Option<Game>, mode: OutputMode) -> Result<String> {
    let games: Vec<Game> = match game {
        Some(game) => vec![game],
        None => Game::ALL.to_vec(),
    };
    let store = ctx.toolbox.games();
    let stats = games
        .into_iter()
        .map(|game| Ok((game, store.stats(game)?)))
        .collect::<toolboxapp::Result<Vec<_>>>()?;
    Ok(render::render_game_stats(&stats, now_ms(), mode)?)
}

/// Explicit `--format` wins, then the file extension, then JSON.
fn resolve_format(file: Option<&Path>, format: Option<ExportFormat>) -> ExportFormat {
    format.unwrap_or_else(|| file.map_or(ExportFormat::Json, ExportFormat::from_filename))
}

fn write_export<T: Serialize + CsvRecord>(
    records: &[T],
    what: &str,
    file: Option<&Path>,
    format: Option<ExportFormat>,
    mode: OutputMode,
) -> Result<String> {
    let body = export::render(records, resolve_format(file, format))?;
    match file {
        Some(path) => {
            write_file(path, &body)?;
            Ok(render::render_message(
                &format!("Exported {} {} to {}", records.len(), what, path.display()),
                mode,
            )?)
        }
        None => Ok(body),
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_format_beats_extension() {
        assert_eq!(
            resolve_format(Some(Path::new("out.json")), Some(ExportFormat::Csv)),
            ExportFormat::Csv
        );
    }

    #[test]
    fn extension_picks_format() {
        assert_eq!(
            resolve_format(Some(Path::new("out.csv")), None),
            ExportFormat::Csv
        );
        assert_eq!(resolve_format(None, None), ExportFormat::Json);
    }
}
