use crate::store::{DEFAULT_GIST_API_URL, DEFAULT_GIST_FILE};
use clap::{Arg, ArgAction, Command};

pub const ARG_GIST_ID: &str = "gist-id";
pub const ARG_GITHUB_TOKEN: &str = "github-token";
pub const ARG_GIST_FILE: &str = "gist-file";
pub const ARG_GIST_API_URL: &str = "gist-api-url";
pub const ARG_MEMORY_STORE: &str = "memory-store";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GIST_ID)
                .long(ARG_GIST_ID)
                .help("ID of the gist holding the data file")
                .env("GIST_ID"),
        )
        .arg(
            Arg::new(ARG_GITHUB_TOKEN)
                .long(ARG_GITHUB_TOKEN)
                .help("GitHub token with the gist scope")
                .env("GITHUB_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_GIST_FILE)
                .long(ARG_GIST_FILE)
                .help("Name of the data file inside the gist")
                .env("GIST_FILE")
                .default_value(DEFAULT_GIST_FILE),
        )
        .arg(
            Arg::new(ARG_GIST_API_URL)
                .long(ARG_GIST_API_URL)
                .help("Base URL of the GitHub REST API")
                .env("GIST_API_URL")
                .default_value(DEFAULT_GIST_API_URL),
        )
        .arg(
            Arg::new(ARG_MEMORY_STORE)
                .long(ARG_MEMORY_STORE)
                .help("Keep the document in memory instead of a gist (local development)")
                .env("PROPLUGIN_MEMORY_STORE")
                .action(ArgAction::SetTrue),
        )
}
