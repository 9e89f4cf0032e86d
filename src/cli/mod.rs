use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod keygen;
pub mod migrate;
pub mod send;
pub mod serve;

#[derive(Subcommand)]
enum Command {
    /// Migrate the db schema
    Migrate {},
    /// Run the API server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "3030")]
        port: String,
    },
    /// Generate a fresh VAPID keypair and print it
    Keygen {},
    /// Send a notification from the command line
    Send {
        /// Target user; omit with --broadcast to reach everyone
        #[arg(long)]
        user_id: Option<String>,
        /// Send to every subscription in the store
        #[arg(long, action, default_value = "false")]
        broadcast: bool,
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: String,
        /// Deep link opened when the notification is clicked
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    // Handle each sub command
    match args.command {
        Some(Command::Migrate {}) => {
            migrate::run().await?;
        }
        Some(Command::Serve { host, port }) => {
            serve::run(host, port).await;
        }
        Some(Command::Keygen {}) => {
            keygen::run();
        }
        Some(Command::Send {
            user_id,
            broadcast,
            title,
            message,
            url,
        }) => {
            send::run(user_id, broadcast, title, message, url).await?;
        }
        None => {}
    }

    Ok(())
}
