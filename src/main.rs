//! notary-client
//!
//! Talks to a notary over the encrypted request/reply channel.
//!
//! ```text
//! notary-client [--config client.toml] ping           --server notary.json --nym <id>
//! notary-client [--config client.toml] request-number --server notary.json --nym <id>
//! notary-client basket-id <basket file>
//! ```

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use notary_client::basket::Basket;
use notary_client::client::{ReplyInbox, ServerConnection};
use notary_client::config::{self, settings, watcher::ConfigWatcher, ClientConfig};
use notary_client::contract::{Identifier, Message, ServerContract};
use notary_client::envelope;
use notary_client::identity::{FileNymStore, Identity, PersistentNym};
use notary_client::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "notary-client")]
#[command(about = "Client for notary servers", long_about = None)]
struct Cli {
    /// TOML configuration file. Watched for transport setting changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the notary answers
    Ping(Target),
    /// Fetch the next request number and store it on the Nym
    RequestNumber(Target),
    /// Print the content id of a basket contract
    BasketId { file: PathBuf },
}

#[derive(Args)]
struct Target {
    /// Server contract (JSON)
    #[arg(short, long)]
    server: PathBuf,

    /// Nym id (hex). Created in the Nym directory if missing.
    #[arg(short, long)]
    nym: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ClientConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("notary-client v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    settings::store(config.transport);
    let _watcher = match &cli.config {
        Some(path) => Some(ConfigWatcher::new(path).run()?),
        None => None,
    };

    match cli.command {
        Commands::Ping(target) => {
            let (server, mut nym) = open_target(&config, &target)?;
            let request_num = nym.nym().request_number(server.id()).unwrap_or(1);
            let message = Message::ping_notary(nym.nym_id().clone(), server.id().clone(), request_num);
            let reply = exchange(&server, &mut nym, &message).await?;
            println!("{} success={}", reply.command, reply.success);
        }
        Commands::RequestNumber(target) => {
            let (server, mut nym) = open_target(&config, &target)?;
            let message = Message::get_request_number(nym.nym_id().clone(), server.id().clone());
            let reply = exchange(&server, &mut nym, &message).await?;
            match nym.nym().request_number(server.id()) {
                Some(number) if reply.success => println!("request number: {number}"),
                _ => println!("{} success={}", reply.command, reply.success),
            }
        }
        Commands::BasketId { file } => {
            let basket = load_basket(&file)?;
            println!("{}", basket.calculate_contract_id());
        }
    }

    Ok(())
}

fn open_target(
    config: &ClientConfig,
    target: &Target,
) -> Result<(ServerContract, PersistentNym<FileNymStore>), Box<dyn Error>> {
    let server = ServerContract::load_json(&target.server)?;
    let nym_id: Identifier = target.nym.parse()?;
    let store = FileNymStore::new(&config.storage.nym_dir)?;
    let nym = PersistentNym::load_or_create(store, &nym_id)?;
    Ok((server, nym))
}

async fn exchange(
    server: &ServerContract,
    nym: &mut PersistentNym<FileNymStore>,
    message: &Message,
) -> Result<Message, Box<dyn Error>> {
    let mut connection = ServerConnection::new(server, ReplyInbox::new())?;
    connection.send(server, nym, message).await?;
    let reply = connection
        .processor_mut()
        .take()
        .pop()
        .ok_or("notary sent no reply")?;
    Ok(reply)
}

/// Basket contract text, bare or armored.
fn load_basket(path: &Path) -> Result<Basket, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let text = if text.trim_start().starts_with('<') {
        text
    } else {
        envelope::unwrap_bookended(&text)?
    };
    Ok(Basket::from_xml(&text)?)
}
