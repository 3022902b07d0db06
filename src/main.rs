#![deny(dead_code)]
use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use log::{error, info, LevelFilter};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;
use tokio::time::{timeout_at, Duration, Instant};

mod utils;

use tenantline::chat::{ExpiryHorizon, Inbox, SessionEvent};
use tenantline::clock::{Clock, SystemClock};
use tenantline::config::{load_config, set_config_path_override};
use tenantline::models::Sender;
use tenantline::runtime::SessionDriver;
use tenantline::seed::seed_conversations;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Expire {
    #[value(name = "1h")]
    OneHour,
    #[value(name = "24h")]
    OneDay,
    #[value(name = "7d")]
    SevenDays,
}

impl From<Expire> for ExpiryHorizon {
    fn from(e: Expire) -> Self {
        match e {
            Expire::OneHour => ExpiryHorizon::OneHour,
            Expire::OneDay => ExpiryHorizon::OneDay,
            Expire::SevenDays => ExpiryHorizon::SevenDays,
        }
    }
}

/// Command line arguments for the tenantline chat demo
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Tenantline: simulated property-management chat with delivery receipts.",
    long_about = "Runs the inbox over demo conversations, opens one, sends a message and \
    prints every lifecycle event (status changes, typing, replies) as it happens."
)]
struct Args {
    /// Path to a JSON config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write logs here instead of tenantline.log
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Filter the conversation list by participant or property name
    #[arg(long)]
    search: Option<String>,

    /// Open the first conversation matching this query
    #[arg(long)]
    conversation: Option<String>,

    /// Text to send once the conversation is open
    #[arg(long)]
    send: Option<String>,

    /// Make the sent message disappear after this long
    #[arg(long, value_enum)]
    expire: Option<Expire>,

    /// Send as a masked (sensitive) message
    #[arg(long)]
    masked: bool,

    /// Give up waiting for a reply after this many seconds
    #[arg(long, default_value_t = 15)]
    timeout_secs: u64,

    /// Wrap message bodies at this width
    #[arg(long, default_value_t = 60)]
    width: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_file_path = args.log_file.clone().unwrap_or_else(|| PathBuf::from("tenantline.log"));
    utils::setup_logging(log_file_path.to_str(), LevelFilter::Debug)?;
    info!("Tenantline starting up");
    info!("Logging to file: {}", log_file_path.display());

    if let Some(ref path) = args.config {
        set_config_path_override(path.clone());
        info!("Config path overridden to: {}", path.display());
    }
    let config = load_config(None)?;
    let show_read_status = config.show_read_status;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let inbox = Inbox::new(seed_conversations(clock.now()), config.clone(), clock);

    let query = args.search.as_deref().unwrap_or("");
    println!("Conversations ({} unread):", inbox.unread_total());
    for conversation in inbox.search(query) {
        println!(
            "  {:<22} {:<26} unread: {}",
            conversation.participant.name,
            conversation.property_name().unwrap_or("-"),
            conversation.unread
        );
    }

    let target = inbox
        .search(args.conversation.as_deref().unwrap_or(query))
        .first()
        .map(|c| c.id.clone())
        .ok_or_else(|| anyhow!("No conversation matches the given query"))?;

    let inbox = Arc::new(TokioMutex::new(inbox));
    let mut events = inbox.lock().await.open(&target)?;

    {
        let guard = inbox.lock().await;
        if let Some(session) = guard.active() {
            println!("\n--- {} ---", session.conversation().participant.name);
            for message in session.messages() {
                println!("{}", utils::render_message(message, show_read_status, args.width));
            }
        }
    }

    let driver = SessionDriver::spawn(inbox.clone());

    let sent = match args.send.as_deref() {
        Some(text) => {
            let mut guard = inbox.lock().await;
            let session = guard.active_mut().ok_or_else(|| anyhow!("Conversation closed unexpectedly"))?;
            let result = match (args.expire, args.masked) {
                (Some(expire), _) => {
                    let horizon = ExpiryHorizon::from(expire);
                    if !config.expiry_horizons.contains(&horizon) {
                        return Err(anyhow!("Expiry of {} is not enabled in the config", horizon.label()));
                    }
                    session.send_expiring_text(text, horizon)
                }
                (None, true) => session.send_masked_text(text),
                (None, false) => session.send_text(text),
            };
            match result {
                Ok(id) => Some(id),
                Err(e) => {
                    error!("Send failed: {}", e);
                    None
                }
            }
        }
        None => None,
    };

    let deadline = Instant::now() + Duration::from_secs(args.timeout_secs);
    loop {
        let event = match timeout_at(deadline, events.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(_) => {
                info!("Timed out waiting for conversation events");
                break;
            }
        };

        match event {
            SessionEvent::MessageAdded(message) => {
                println!("{}", utils::render_message(&message, show_read_status, args.width));
                if message.sender == Sender::Peer && sent.is_some() {
                    break;
                }
            }
            SessionEvent::StatusChanged { id, status } => {
                println!("    {} -> {}", short_id(&id), utils::status_marker(status.display(show_read_status)));
                if sent.as_deref() == Some(id.as_str()) && !config.auto_reply && status.next().is_none() {
                    break;
                }
            }
            SessionEvent::MessageUpdated(message) => {
                println!("{}", utils::render_message(&message, show_read_status, args.width));
            }
            SessionEvent::MessageRemoved { id } => println!("    {} expired", short_id(&id)),
            SessionEvent::TypingChanged(true) => println!("    typing..."),
            SessionEvent::TypingChanged(false) => {}
            SessionEvent::Notice(notice) => println!("!!  {}", notice.text),
            SessionEvent::Disposed => break,
        }
    }

    driver.shutdown().await?;
    info!("Tenantline shutting down");
    Ok(())
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
