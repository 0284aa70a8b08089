use clap::{Parser, Subcommand};

/// Feedstore — multi-tenant sensor feed repository
#[derive(Parser)]
#[command(name = "feedstore", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Port to bind
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Manage OAuth2 client applications
    Client {
        #[command(subcommand)]
        command: ClientCommands,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage feeds
    Feed {
        #[command(subcommand)]
        command: FeedCommands,
    },
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Register a new OAuth2 client
    Create {
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        secret: String,
    },
    /// List registered clients
    List,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user directly (bypasses signup)
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        display_name: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum FeedCommands {
    /// Register a feed for a user; prints both generated API keys
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        user_id: i64,
        #[arg(long, default_value = "false")]
        public: bool,
    },
}
