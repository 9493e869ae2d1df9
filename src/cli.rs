use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pipup",
    about = "pipup - keep pinned Python requirements up to date",
    version,
    author
)]
pub struct Cli {
    /// Path to the project directory (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    pub path: String,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Update pinned requirements, lock files and runtime pins
    Update {
        /// Deliver the changes as a pull request and merge it once checks pass
        #[arg(short, long, requires = "repository")]
        merge: bool,

        /// GitHub repository the project belongs to (OWNER/NAME)
        #[arg(short, long, value_name = "OWNER/NAME")]
        repository: Option<String>,

        /// Exit successfully even when required checks reject the pull request
        #[arg(long)]
        allow_rejected: bool,
    },

    /// Show available updates without writing anything
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_requires_repository() {
        assert!(Cli::try_parse_from(["pipup", "update", "--merge"]).is_err());

        let cli = Cli::try_parse_from([
            "pipup",
            "--path",
            "/tmp/project",
            "update",
            "--merge",
            "--repository",
            "acme/widget",
        ])
        .unwrap();
        assert_eq!(cli.path, "/tmp/project");
        match cli.command {
            Commands::Update {
                merge,
                repository,
                allow_rejected,
            } => {
                assert!(merge);
                assert_eq!(repository.as_deref(), Some("acme/widget"));
                assert!(!allow_rejected);
            }
            Commands::Check => panic!("expected update"),
        }
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["pipup", "check", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Check));
    }
}
