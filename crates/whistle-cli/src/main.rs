//! Whistle command-line client
//!
//! Drives the Whistle messaging core against a local vault: create a
//! vault, compose messages to verified recipients, inspect conversations
//! and run the sending queue one tick at a time. A few desk-side helpers
//! make it possible to produce replies for local testing.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use whistle_core::{
    ClientConfig, ClientConfigBuilder, CoreError, DeliveryStatus, InlineFeedback, Message,
    RecipientId, RecipientKey, SealedBoxEncryptor, SendFeedback, StaticKeyProvider,
    VerifiedPublicKeys, WhistleClient,
};
use whistle_crypto::{Hint, KeyPair, PublicKey};
use whistle_protocol::{seal_envelope, PaddedCompressedString};

/// Whistle secure messaging client
#[derive(Parser, Debug)]
#[command(name = "whistle")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to data directory
    #[arg(short, long, env = "WHISTLE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Vault passphrase
    #[arg(long, env = "WHISTLE_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Verified recipient as `id:display name:hex key` (repeat the flag for
    /// more; the environment variable holds one)
    #[arg(
        short,
        long = "recipient",
        env = "WHISTLE_RECIPIENT",
        value_parser = parse_recipient
    )]
    recipients: Vec<RecipientKey>,

    /// Sending queue slots for a new vault
    #[arg(long, env = "WHISTLE_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "WHISTLE_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Log format (plain, json)
    #[arg(long, env = "WHISTLE_LOG_FORMAT", default_value = "plain")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new vault
    Init,

    /// Print the user's public messaging key
    Whoami,

    /// Compose a message to a verified recipient
    Send {
        /// Recipient id
        #[arg(long)]
        to: RecipientId,

        /// Message text
        message: String,
    },

    /// Show active and inactive conversations
    Inbox,

    /// Delivery status of a queued message
    Status {
        /// Hint printed by `send`, in hex
        hint: String,
    },

    /// Take the next payload from the sending queue
    Tick {
        /// Write the payload here instead of printing it as hex
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Read dead-drop envelopes from files
    Ingest {
        /// Envelope files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Delete the vault and everything in it
    Delete,

    /// Generate a desk key pair for testing
    Keygen,

    /// Seal a reply from a desk to a user, for testing
    Reply {
        /// Sending desk id
        #[arg(long)]
        desk: RecipientId,

        /// Desk secret key in hex
        #[arg(long, env = "WHISTLE_DESK_SECRET", hide_env_values = true)]
        desk_secret: String,

        /// User public key in hex
        #[arg(long)]
        to: String,

        /// Where to write the envelope
        #[arg(long)]
        out: PathBuf,

        /// Message text
        message: String,
    },
}

/// Parse `id:display name:hex key`.
fn parse_recipient(s: &str) -> std::result::Result<RecipientKey, String> {
    let mut parts = s.splitn(3, ':');
    let (Some(id), Some(name), Some(key)) = (parts.next(), parts.next(), parts.next()) else {
        return Err("expected id:display name:hex key".into());
    };
    let id = RecipientId::new(id.trim()).map_err(|e| e.to_string())?;
    let key = PublicKey::from_hex(key.trim()).map_err(|e| e.to_string())?;
    Ok(RecipientKey::new(id, name.trim(), key))
}

fn setup_logging(log_level: &str, log_format: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("sled=warn".parse()?);

    match log_format.to_lowercase().as_str() {
        "json" => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set subscriber")?;
        }
        _ => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set subscriber")?;
        }
    }

    Ok(())
}

/// Build client configuration from CLI arguments
fn build_config(args: &Args) -> Result<ClientConfig> {
    let mut builder = ClientConfigBuilder::new();
    if let Some(dir) = &args.data_dir {
        builder = builder.with_data_dir(dir.clone());
    }
    if let Some(capacity) = args.queue_capacity {
        builder = builder.with_queue_capacity(capacity);
    }
    builder.build_validated().context("Invalid configuration")
}

fn passphrase(args: &Args) -> Result<&[u8]> {
    args.passphrase
        .as_deref()
        .map(str::as_bytes)
        .context("A passphrase is required (--passphrase or WHISTLE_PASSPHRASE)")
}

async fn open_client(args: &Args) -> Result<WhistleClient> {
    let config = build_config(args)?;
    let verified: VerifiedPublicKeys = args.recipients.iter().cloned().collect();
    debug!(recipients = verified.len(), "Loaded verified recipients");

    WhistleClient::with_collaborators(
        config,
        Arc::new(StaticKeyProvider::new(verified)),
        Arc::new(SealedBoxEncryptor),
    )
    .await
    .context("Failed to initialize client")
}

/// User-facing text for a failed send.
fn send_failure(err: &CoreError) -> &'static str {
    match err.feedback() {
        SendFeedback::Inline(InlineFeedback::EmptyMessage) => "The message is empty",
        SendFeedback::Inline(InlineFeedback::MessageTooLong) => "The message is too long",
        SendFeedback::Inline(InlineFeedback::InvalidCharacter) => {
            "The message contains an invalid character"
        }
        SendFeedback::Inline(InlineFeedback::RecipientUnavailable) => {
            "This recipient cannot be messaged right now"
        }
        SendFeedback::Generic => "The message could not be sent",
    }
}

async fn print_inbox(client: &WhistleClient) -> Result<()> {
    let inbox = client.inbox().await;
    if inbox.is_empty() {
        println!("No messages");
        return Ok(());
    }

    if let Some(active) = &inbox.active {
        println!(
            "Active: {} (updated {})",
            active.recipient,
            active.last_updated.format("%Y-%m-%d %H:%M:%S")
        );
        for message in active.ordered() {
            let time = message.timestamp().format("%H:%M:%S");
            match message {
                Message::Incoming { text, .. } => println!("  {time} > {text}"),
                Message::Outbound { text, hint, .. } => {
                    let status = match client.message_status(hint).await? {
                        DeliveryStatus::Pending => "pending",
                        DeliveryStatus::Sent => "sent",
                    };
                    println!("  {time} < {text} [{status}]");
                }
            }
        }
    }

    for conversation in inbox.inactive.iter().flatten() {
        let updated = conversation
            .last_updated()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!(
            "Inactive: {} ({} messages, last {})",
            conversation.recipient,
            conversation.messages.len(),
            updated
        );
    }
    Ok(())
}

async fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::Keygen => {
            let keys = KeyPair::generate();
            println!("secret: {}", hex::encode(*keys.secret_bytes()));
            println!("public: {}", keys.public_key().to_hex());
            return Ok(());
        }
        Command::Reply {
            desk,
            desk_secret,
            to,
            out,
            message,
        } => {
            let secret = hex::decode(desk_secret).context("Desk secret is not hex")?;
            let desk_keys = KeyPair::from_secret_bytes(&secret).context("Invalid desk secret")?;
            let user = PublicKey::from_hex(to).context("Invalid user key")?;
            let body = PaddedCompressedString::new(message).context("Invalid message")?;
            let envelope = seal_envelope(&user, desk_keys.public_key(), Some(desk), &body)
                .context("Failed to seal reply")?;
            std::fs::write(out, envelope.to_bytes()).context("Failed to write envelope")?;
            println!("Wrote {}", out.display());
            return Ok(());
        }
        _ => {}
    }

    let client = open_client(args).await?;
    let passphrase = passphrase(args)?;

    if let Command::Init = args.command {
        client
            .create_vault(passphrase)
            .await
            .context("Failed to create vault")?;
        println!("Vault created at {}", client.config().vault_path().display());
        println!("public: {}", client.user_public_key().await?.to_hex());
        client.shutdown().await?;
        return Ok(());
    }

    client
        .unlock(passphrase)
        .await
        .context("Unable to unlock")?;

    let outcome = run_unlocked(args, &client).await;
    client.shutdown().await?;
    outcome
}

async fn run_unlocked(args: &Args, client: &WhistleClient) -> Result<()> {
    match &args.command {
        Command::Whoami => {
            println!("{}", client.user_public_key().await?.to_hex());
        }
        Command::Send { to, message } => match client.send_message(to, message).await {
            Ok(sent) => {
                let hint = sent.hint().map(Hint::to_hex).unwrap_or_default();
                println!("Queued, hint {hint}");
            }
            Err(e) => bail!(send_failure(&e)),
        },
        Command::Inbox => print_inbox(client).await?,
        Command::Status { hint } => {
            let hint = Hint::from_hex(hint).context("Invalid hint")?;
            let status = client.message_status(&hint).await?;
            println!("{status:?}");
        }
        Command::Tick { out } => {
            let payload = client.dequeue_for_sending().await?;
            match out {
                Some(path) => {
                    std::fs::write(path, &payload).context("Failed to write payload")?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{}", hex::encode(&payload)),
            }
        }
        Command::Ingest { files } => {
            let mut envelopes = Vec::with_capacity(files.len());
            for file in files {
                envelopes.push(
                    std::fs::read(file)
                        .with_context(|| format!("Failed to read {}", file.display()))?,
                );
            }
            let added = client.ingest_dead_drop(envelopes, Utc::now()).await?;
            println!("{added} new message(s)");
        }
        Command::Delete => {
            client.delete_vault().await.context("Failed to delete vault")?;
            println!("Vault deleted");
        }
        Command::Init | Command::Keygen | Command::Reply { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, &args.log_format)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        recipients = args.recipients.len(),
        "Starting whistle"
    );

    run(&args).await
}
