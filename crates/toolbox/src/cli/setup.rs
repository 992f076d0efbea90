use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use toolboxapp::export::ExportFormat;
use toolboxapp::games::Game;
use toolboxapp::prefs::model::Density;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    pub fn is_json(self) -> bool {
        self == OutputMode::Json
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "toolbox",
    bin_name = "toolbox",
    version,
    disable_help_subcommand = true
)]
#[command(about = "Inspect and maintain toolbox preferences and stored records", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Data directory (default: $TOOLBOX_DATA, then the OS data directory)
    #[arg(long, global = true, value_name = "DIR", help_heading = "Options")]
    pub data: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,

    /// Output format
    #[arg(
        short,
        long,
        global = true,
        value_enum,
        default_value_t = OutputMode::Text,
        help_heading = "Options"
    )]
    pub output: OutputMode,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show load source, migration state and storage usage
    #[command(display_order = 1)]
    Status,

    /// Migrate legacy flat-key data into the structured store
    #[command(display_order = 2)]
    Migrate,

    /// Put the flat-key store back as it was before migration
    #[command(display_order = 3)]
    Restore {
        /// Confirm overwriting current flat-key data
        #[arg(long)]
        yes: bool,
    },

    /// Show, export, import or reset preferences
    #[command(display_order = 10)]
    Prefs {
        #[command(subcommand)]
        action: PrefsCommands,
    },

    /// Manage favorite tools
    #[command(alias = "fav", display_order = 11)]
    Favorite {
        #[command(subcommand)]
        action: FavoriteCommands,
    },

    /// Record tool usage
    #[command(display_order = 12)]
    Usage {
        #[command(subcommand)]
        action: UsageCommands,
    },

    /// Manage search history
    #[command(display_order = 13)]
    Search {
        #[command(subcommand)]
        action: SearchCommands,
    },

    /// Change the layout
    #[command(display_order = 14)]
    Layout {
        #[command(subcommand)]
        action: LayoutCommands,
    },

    /// Show storage usage, optionally changing quota settings first
    #[command(display_order = 15)]
    Storage {
        /// Warning threshold in percent (0-100)
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,

        /// Custom quota in bytes
        #[arg(long, value_name = "BYTES")]
        quota: Option<u64>,

        /// Whether the custom quota replaces the estimated one
        #[arg(long, value_name = "BOOL")]
        custom: Option<bool>,
    },

    /// Generated identity profiles
    #[command(display_order = 20)]
    Identities {
        #[command(subcommand)]
        action: IdentityCommands,
    },

    /// Saved academic resources
    #[command(display_order = 21)]
    Resources {
        #[command(subcommand)]
        action: ResourceCommands,
    },

    /// Game statistics
    #[command(display_order = 22)]
    Games {
        #[command(subcommand)]
        action: GameCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum PrefsCommands {
    /// Show the current preferences
    Show,

    /// Write preferences as JSON to a file (or stdout)
    Export {
        /// Target file; prints to stdout when omitted
        file: Option<PathBuf>,
    },

    /// Replace preferences with a previously exported file
    Import { file: PathBuf },

    /// Reset every preference to its default
    Reset,
}

#[derive(Subcommand, Debug)]
pub enum FavoriteCommands {
    /// Mark a tool as favorite
    Add { tool_id: String },

    /// Unmark a favorite tool
    #[command(alias = "rm")]
    Remove { tool_id: String },

    /// List favorite tools
    #[command(alias = "ls")]
    List,
}

#[derive(Subcommand, Debug)]
pub enum UsageCommands {
    /// Record one use of a tool
    Record { tool_id: String },
}

#[derive(Subcommand, Debug)]
pub enum SearchCommands {
    /// Add a term to the search history
    Add {
        /// Search term words (joined with spaces)
        #[arg(required = true, trailing_var_arg = true)]
        term: Vec<String>,
    },

    /// Clear the search history
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum LayoutCommands {
    /// Set density and/or grid columns
    Set {
        /// compact, standard or spacious
        #[arg(long)]
        density: Option<Density>,

        /// Number of grid columns
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=12))]
        columns: Option<u8>,
    },
}

#[derive(Subcommand, Debug)]
pub enum IdentityCommands {
    /// List stored identities
    #[command(alias = "ls")]
    List {
        /// Only identities in this state (abbreviation, e.g. CA)
        #[arg(long)]
        state: Option<String>,
    },

    /// Export identities as JSON or CSV
    Export {
        /// Target file; format follows the extension unless --format is given
        file: Option<PathBuf>,

        /// json or csv
        #[arg(long)]
        format: Option<ExportFormat>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ResourceCommands {
    /// List saved resources
    #[command(alias = "ls")]
    List {
        /// Only resources in this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Search name, description and tags
    Search {
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },

    /// Export resources as JSON or CSV
    Export {
        /// Target file; format follows the extension unless --format is given
        file: Option<PathBuf>,

        /// json or csv
        #[arg(long)]
        format: Option<ExportFormat>,
    },
}

#[derive(Subcommand, Debug)]
pub enum GameCommands {
    /// Show statistics for one game or all of them
    Stats {
        /// snake, tetris, 2048 or minesweeper
        game: Option<Game>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn naked_invocation_has_no_command() {
        let cli = Cli::try_parse_from(["toolbox"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.output, OutputMode::Text);
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli =
            Cli::try_parse_from(["toolbox", "prefs", "show", "--data", "/tmp/x", "-v", "-o", "json"])
                .unwrap();
        assert_eq!(cli.data, Some(PathBuf::from("/tmp/x")));
        assert!(cli.verbose);
        assert!(cli.output.is_json());
    }

    #[test]
    fn storage_flags_parse() {
        let cli = Cli::try_parse_from([
            "toolbox",
            "storage",
            "--threshold",
            "90",
            "--quota",
            "1024",
            "--custom",
            "false",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Storage {
                threshold,
                quota,
                custom,
            }) => {
                assert_eq!(threshold, Some(90));
                assert_eq!(quota, Some(1024));
                assert_eq!(custom, Some(false));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn threshold_over_100_is_rejected() {
        assert!(Cli::try_parse_from(["toolbox", "storage", "--threshold", "150"]).is_err());
    }

    #[test]
    fn typed_arguments_parse() {
        let cli = Cli::try_parse_from(["toolbox", "games", "stats", "2048"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Games {
                action: GameCommands::Stats {
                    game: Some(Game::Merge2048)
                }
            })
        ));

        let cli = Cli::try_parse_from(["toolbox", "layout", "set", "--density", "compact"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Layout {
                action: LayoutCommands::Set {
                    density: Some(Density::Compact),
                    columns: None
                }
            })
        ));
    }
}
