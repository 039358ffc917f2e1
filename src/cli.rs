use clap::{Parser, Subcommand};

/// gigboard — task-marketplace backend
#[derive(Parser)]
#[command(name = "gigboard", version, about)]
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

    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage task categories
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },

    /// Notification maintenance
    Notification {
        #[command(subcommand)]
        command: NotificationCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create an account
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// "employer" or "worker"
        #[arg(long, default_value = "worker")]
        role: String,
        #[arg(long)]
        password: String,
    },
    /// List active accounts
    List,
    /// Deactivate an account
    Deactivate {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Add a category
    Add {
        #[arg(long)]
        name: String,
    },
    /// List categories
    List,
}

#[derive(Subcommand)]
pub enum NotificationCommands {
    /// Purge read notifications older than the retention window now
    Purge {
        /// Override the configured retention window (days)
        #[arg(long)]
        days: Option<u32>,
    },
}
