use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use msgcomm::channel::Message;
use msgcomm::grammar;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    worker: &'a str,
    tag: Option<&'static str>,
    size: usize,
    payload: String,
    timestamp: String,
}

#[derive(Serialize)]
struct DeliveryOutput<'a> {
    worker: &'a str,
    host: &'a str,
    port: u16,
    sent: usize,
    undelivered: usize,
    timestamp: String,
}

/// Print one received message.
pub fn print_message(message: &Message, worker: &str, format: OutputFormat) {
    let payload = message.to_text();
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                worker,
                tag: tag_of(&payload),
                size: message.len(),
                payload: payload_preview(message.as_bytes()),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["WORKER", "TAG", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    worker.to_string(),
                    tag_of(&payload).unwrap_or("-").to_string(),
                    message.len().to_string(),
                    payload_preview(message.as_bytes()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "worker={} size={} payload={}",
                worker,
                message.len(),
                payload_preview(message.as_bytes())
            );
        }
        OutputFormat::Raw => {
            let mut line = message.as_bytes().to_vec();
            line.push(b'\n');
            print_raw(&line);
        }
    }
}

/// Print the outcome of a send run.
pub fn print_delivery(
    worker: &str,
    host: &str,
    port: u16,
    sent: usize,
    undelivered: usize,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = DeliveryOutput {
                worker,
                host,
                port,
                sent,
                undelivered,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["WORKER", "DESTINATION", "SENT", "UNDELIVERED"])
                .add_row(vec![
                    worker.to_string(),
                    format!("{host}:{port}"),
                    sent.to_string(),
                    undelivered.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("worker={worker} destination={host}:{port} sent={sent} undelivered={undelivered}");
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn tag_of(payload: &str) -> Option<&'static str> {
    [
        grammar::SHUTDOWN,
        grammar::CONSUMER_PROCESS_RESULTS,
        grammar::CONSUMER,
        grammar::PRODUCER,
        grammar::CONTROL,
    ]
    .into_iter()
    .find(|tag| grammar::is_message_type(payload, tag))
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
