//! Relay CLI - operator tool for the Relay broker

mod api;
mod commands;
mod error;

use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use api::ApiClient;

#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(author, version, about = "Relay broker operator CLI")]
struct Cli {
    /// Server URL (defaults to RELAY_SERVER_URL or http://localhost:8000)
    #[arg(long)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check server health
    Status,

    /// List pending messages for an interface
    Messages {
        /// Interface name
        #[arg(short, long)]
        interface: String,

        /// Restrict to one subscriber adapter
        #[arg(short, long)]
        subscriber: Option<String>,

        /// Max messages to list
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Show one message with its subscriptions
    Message {
        /// Message id
        message_id: Uuid,
    },

    /// Retry an errored subscription
    Retry {
        /// Subscription id
        subscription_id: Uuid,
    },

    /// List configured adapter instances
    Instances {
        /// Filter by interface name
        #[arg(short, long)]
        interface: Option<String>,
    },

    /// Show orchestrator status for one instance
    InstanceStatus {
        /// Instance guid
        instance_guid: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = match cli.server {
        Some(server) => ApiClient::new(server)?,
        None => ApiClient::from_env()?,
    };

    match cli.command {
        Command::Status => commands::status(&client).await?,
        Command::Messages {
            interface,
            subscriber,
            limit,
        } => commands::messages(&client, &interface, subscriber.as_deref(), limit).await?,
        Command::Message { message_id } => commands::message(&client, message_id).await?,
        Command::Retry { subscription_id } => commands::retry(&client, subscription_id).await?,
        Command::Instances { interface } => {
            commands::instances(&client, interface.as_deref()).await?
        },
        Command::InstanceStatus { instance_guid } => {
            commands::instance_status(&client, instance_guid).await?
        },
    }

    Ok(())
}
