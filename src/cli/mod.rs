pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_BROWSE_LIMIT: usize = 2;

#[derive(Parser)]
#[command(name = "gator")]
#[command(about = "A terminal RSS aggregator", long_about = None)]
pub struct Cli {
    /// Path to the config file (default: ~/.config/gator/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a user and log in as them
    Register {
        /// Name of the new user
        name: String,
    },
    /// Switch the current user
    Login {
        /// Name of an existing user
        name: String,
    },
    /// List all users
    Users,
    /// Delete all users, their feeds, follows and posts
    Reset,
    /// Add a feed and follow it
    #[command(name = "addfeed")]
    AddFeed {
        /// Display name of the feed
        name: String,
        /// URL of the RSS feed
        url: String,
    },
    /// List all feeds with their owners
    Feeds,
    /// Follow an existing feed
    Follow {
        /// URL of the feed to follow
        url: String,
    },
    /// List the feeds the current user follows
    Following,
    /// Stop following a feed
    Unfollow {
        /// URL of the feed to unfollow
        url: String,
    },
    /// Poll feeds continuously until interrupted
    Agg {
        /// Time between requests (e.g. "30s", "1m", "1h"); defaults to the config value
        interval: Option<String>,
    },
    /// Show recent posts from followed feeds
    Browse {
        /// Number of posts to show
        #[arg(default_value_t = DEFAULT_BROWSE_LIMIT)]
        limit: usize,
    },
}
