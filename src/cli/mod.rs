//! Command-line interface for the campus backend.

use clap::{Parser, Subcommand};

/// Campus events backend: accounts, events and recommendations over HTTP.
#[derive(Parser)]
#[command(name = "campus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API (default)
    Serve,

    /// Apply database migrations and exit
    Migrate,

    /// Assign a role to an existing account
    GrantRole {
        /// Email of the account
        email: String,

        /// Role name, e.g. Organizer or Assessor
        role: String,
    },

    /// Add an indicator to the reference data
    AddIndicator {
        /// Display name of the indicator
        name: String,

        /// Mark the indicator as a negative interest
        #[arg(long)]
        negative: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_parses() {
        let cli = Cli::try_parse_from(["campus"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn grant_role_takes_email_and_role() {
        let cli = Cli::try_parse_from(["campus", "grant-role", "a@example.com", "Assessor"]).unwrap();
        match cli.command {
            Some(Commands::GrantRole { email, role }) => {
                assert_eq!(email, "a@example.com");
                assert_eq!(role, "Assessor");
            }
            _ => panic!("expected grant-role"),
        }
    }

    #[test]
    fn add_indicator_negative_flag() {
        let cli = Cli::try_parse_from(["campus", "add-indicator", "Late hours", "--negative"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::AddIndicator { negative: true, .. })
        ));
    }
}
