use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use beerpong_protocol::{DecodeEvent, DispatchError};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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
struct EventOutput<'a> {
    event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dropped_bytes: Option<usize>,
    timestamp: String,
}

#[derive(Serialize)]
struct ReadingOutput<'a> {
    event: &'static str,
    reading: Option<&'a [i64]>,
}

pub fn print_event(event: &DecodeEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = event_output(event);
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let out = event_output(event);
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["EVENT", "COMMAND", "ARGS", "DETAIL"])
                .add_row(vec![
                    out.event.to_string(),
                    out.command.unwrap_or("-").to_string(),
                    out.args.map(|a| a.join(", ")).unwrap_or_else(|| "-".to_string()),
                    detail(&out),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => match event {
            DecodeEvent::Dispatched(command) => println!("dispatched {command}"),
            DecodeEvent::Rejected { command, error } => {
                println!("rejected {command} ({})", error_kind(error))
            }
            DecodeEvent::Overflow {
                dropped_fragments,
                dropped_bytes,
            } => println!("overflow dropped {dropped_fragments} fragments ({dropped_bytes} bytes)"),
        },
    }
}

pub fn print_reading(reading: Option<&[i64]>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReadingOutput {
                event: "reading",
                reading,
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
                .set_header(vec!["SENSOR", "VALUE"]);
            for (index, value) in reading.unwrap_or_default().iter().enumerate() {
                table.add_row(vec![index.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => match reading {
            Some(values) => println!("reading {values:?}"),
            None => println!("reading <none>"),
        },
    }
}

fn event_output(event: &DecodeEvent) -> EventOutput<'_> {
    let timestamp = now_unix_seconds();
    match event {
        DecodeEvent::Dispatched(command) => EventOutput {
            event: "dispatched",
            command: Some(&command.name),
            args: Some(&command.args),
            error: None,
            dropped_bytes: None,
            timestamp,
        },
        DecodeEvent::Rejected { command, error } => EventOutput {
            event: "rejected",
            command: Some(&command.name),
            args: Some(&command.args),
            error: Some(error.to_string()),
            dropped_bytes: None,
            timestamp,
        },
        DecodeEvent::Overflow { dropped_bytes, .. } => EventOutput {
            event: "overflow",
            command: None,
            args: None,
            error: None,
            dropped_bytes: Some(*dropped_bytes),
            timestamp,
        },
    }
}

fn detail(out: &EventOutput<'_>) -> String {
    if let Some(error) = &out.error {
        return error.clone();
    }
    match out.dropped_bytes {
        Some(bytes) => format!("{bytes} bytes dropped"),
        None => "-".to_string(),
    }
}

fn error_kind(error: &DispatchError) -> &'static str {
    match error {
        DispatchError::UnknownCommand { .. } => "unrecognized command",
        DispatchError::InvalidArgument { .. } => "invalid argument",
        DispatchError::Rejected { .. } => "rejected by handler",
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use beerpong_protocol::Command;

    use super::*;

    #[test]
    fn dispatched_event_serializes_command() {
        let event = DecodeEvent::Dispatched(Command::new(
            "sensor",
            vec!["1".to_string(), "2".to_string()],
        ));
        let value = serde_json::to_value(event_output(&event)).unwrap();
        assert_eq!(value["event"], "dispatched");
        assert_eq!(value["command"], "sensor");
        assert_eq!(value["args"], serde_json::json!(["1", "2"]));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn overflow_event_has_no_command() {
        let event = DecodeEvent::Overflow {
            dropped_fragments: 2,
            dropped_bytes: 40,
        };
        let out = event_output(&event);
        assert_eq!(detail(&out), "40 bytes dropped");
        let value = serde_json::to_value(out).unwrap();
        assert_eq!(value["event"], "overflow");
        assert!(value.get("command").is_none());
    }
}
