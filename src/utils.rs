use anyhow::Result;
use chrono::{DateTime, Local};
use log::{LevelFilter, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use tenantline::models::{DeliveryStatus, Message, Sender};

// File-or-stdout logger plus small formatting helpers for the demo binary.

pub struct SimpleLogger {
    log_file: Option<Mutex<std::fs::File>>,
}

impl SimpleLogger {
    pub fn new(log_file_path: Option<&str>) -> Result<Self> {
        let log_file = match log_file_path {
            Some(path) => Some(Mutex::new(OpenOptions::new().create(true).append(true).open(path)?)),
            None => None,
        };

        Ok(SimpleLogger { log_file })
    }
}

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now: DateTime<Local> = Local::now();
            let log_message = format!(
                "[{}] {} [{}:{}] {}\n",
                now.format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            );

            if let Some(file) = &self.log_file {
                if let Ok(mut file) = file.lock() {
                    let _ = file.write_all(log_message.as_bytes());
                }
            } else {
                print!("{}", log_message);
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.log_file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        } else {
            let _ = std::io::stdout().flush();
        }
    }
}

pub fn setup_logging(log_file: Option<&str>, level: LevelFilter) -> Result<()> {
    let logger = SimpleLogger::new(log_file)?;
    log::set_boxed_logger(Box::new(logger)).map(|()| log::set_max_level(level))?;

    log::info!("Logging initialized at level: {}", level);
    log::info!("App version: {} ({})", env!("CARGO_PKG_VERSION"), env!("CARGO_PKG_NAME"));

    Ok(())
}

pub fn status_marker(status: DeliveryStatus) -> &'static str {
    match status {
        DeliveryStatus::Sending => "…",
        DeliveryStatus::Sent => "✓",
        DeliveryStatus::Delivered => "✓✓",
        DeliveryStatus::Read => "✓✓ read",
    }
}

/// One message as a wrapped, printable block.
pub fn render_message(message: &Message, show_read_status: bool, width: usize) -> String {
    let who = match message.sender {
        Sender::Me => "You",
        Sender::Peer => "Them",
    };
    let body = if let Some(voice) = &message.voice {
        format!("[voice clip {:.1}s]", voice.duration.as_secs_f32())
    } else if let Some(attachment) = &message.attachment {
        format!("[{:?}: {}]", attachment.kind, attachment.name)
    } else {
        message.display_body().to_string()
    };
    let header = format!("{} {}", message.created_at.with_timezone(&Local).format("%H:%M:%S"), who);
    let status = match message.sender {
        Sender::Me => format!(" {}", status_marker(message.status.display(show_read_status))),
        Sender::Peer => String::new(),
    };
    let wrapped = textwrap::fill(&body, width.max(20));
    format!("{}{}\n{}", header, status, textwrap::indent(&wrapped, "    "))
}
