//! # Dispatch
//!
//! `run` is the whole CLI lifecycle:
//!
//! 1. Parse arguments.
//! 2. Set up logging on stderr: `warn` by default, `debug` with `-v`;
//!    `RUST_LOG` overrides both.
//! 3. Resolve the data directory and build the filesystem-backed toolbox.
//! 4. Load preferences (skipped for `migrate` and `restore`).
//! 5. Run the handler and print what it returns.

use super::handlers;
use super::setup::{
    parse_cli, Commands, FavoriteCommands, GameCommands, IdentityCommands, LayoutCommands,
    PrefsCommands, ResourceCommands, SearchCommands, UsageCommands, OutputMode,
};
use anyhow::Result;
use log::{debug, LevelFilter};
use toolboxapp::init::{initialize, ToolboxContext};

pub fn run() -> Result<()> {
    let cli = parse_cli();
    init_logging(cli.verbose);

    let mut ctx = initialize(cli.data.clone())?;
    debug!("Data directory: {}", ctx.data_dir.display());

    let command = cli.command.unwrap_or(Commands::Status);
    if !matches!(command, Commands::Migrate | Commands::Restore { .. }) {
        let source = ctx.toolbox.start();
        debug!("Preferences loaded from {}", source.as_str());
    }

    let output = dispatch(&mut ctx, command, cli.output)?;
    print!("{}", output);
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}

fn dispatch(ctx: &mut ToolboxContext, command: Commands, mode: OutputMode) -> Result<String> {
    match command {
        Commands::Status => handlers::status(ctx, mode),
        Commands::Migrate => handlers::migrate(ctx, mode),
        Commands::Restore { yes } => handlers::restore(ctx, yes, mode),
        Commands::Prefs { action } => match action {
            PrefsCommands::Show => handlers::prefs_show(ctx, mode),
            PrefsCommands::Export { file } => handlers::prefs_export(ctx, file.as_deref(), mode),
            PrefsCommands::Import { file } => handlers::prefs_import(ctx, &file, mode),
            PrefsCommands::Reset => handlers::prefs_reset(ctx, mode),
        },
        Commands::Favorite { action } => match action {
            FavoriteCommands::Add { tool_id } => handlers::favorite_add(ctx, &tool_id, mode),
            FavoriteCommands::Remove { tool_id } => handlers::favorite_remove(ctx, &tool_id, mode),
            FavoriteCommands::List => handlers::favorite_list(ctx, mode),
        },
        Commands::Usage { action } => match action {
            UsageCommands::Record { tool_id } => handlers::usage_record(ctx, &tool_id, mode),
        },
        Commands::Search { action } => match action {
            SearchCommands::Add { term } => handlers::search_add(ctx, &term, mode),
            SearchCommands::Clear => handlers::search_clear(ctx, mode),
        },
        Commands::Layout { action } => match action {
            LayoutCommands::Set { density, columns } => {
                handlers::layout_set(ctx, density, columns, mode)
            }
        },
        Commands::Storage {
            threshold,
            quota,
            custom,
        } => handlers::storage(ctx, threshold, quota, custom, mode),
        Commands::Identities { action } => match action {
            IdentityCommands::List { state } => {
                handlers::identities_list(ctx, state.as_deref(), mode)
            }
            IdentityCommands::Export { file, format } => {
                handlers::identities_export(ctx, file.as_deref(), format, mode)
            }
        },
        Commands::Resources { action } => match action {
            ResourceCommands::List { category } => {
                handlers::resources_list(ctx, category.as_deref(), mode)
            }
            ResourceCommands::Search { query } => handlers::resources_search(ctx, &query, mode),
            ResourceCommands::Export { file, format } => {
                handlers::resources_export(ctx, file.as_deref(), format, mode)
            }
        },
        Commands::Games { action } => match action {
            GameCommands::Stats { game } => handlers::game_stats(ctx, game, mode),
        },
    }
}
