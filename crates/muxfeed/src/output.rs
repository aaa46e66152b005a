use std::io::{IsTerminal, Write};

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

/// One decoded frame, as listed by `inspect`.
#[derive(Debug, Serialize)]
pub struct FrameRow {
    pub index: usize,
    pub kind: &'static str,
    pub stream_id: u32,
    pub initiator: &'static str,
    pub fin: bool,
    pub payload_size: usize,
    pub detail: String,
}

pub fn print_frames(rows: &[FrameRow], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for row in rows {
                println!(
                    "{}",
                    serde_json::to_string(row).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "KIND", "STREAM", "FIN", "SIZE", "DETAIL"]);
            for row in rows {
                table.add_row(vec![
                    row.index.to_string(),
                    row.kind.to_string(),
                    format!("{} ({})", row.stream_id, row.initiator),
                    if row.fin { "yes" } else { "" }.to_string(),
                    row.payload_size.to_string(),
                    row.detail.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                println!(
                    "#{} {} stream={} ({}) fin={} size={} {}",
                    row.index,
                    row.kind,
                    row.stream_id,
                    row.initiator,
                    row.fin,
                    row.payload_size,
                    row.detail
                );
            }
        }
    }
}

/// Print a single JSON/pretty/table summary of key-value pairs.
pub fn print_summary<T: Serialize>(summary: &T, pairs: &[(&str, String)], format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (key, value) in pairs {
                table.add_row(vec![key.to_string(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
            println!("{}", line.join(" "));
        }
    }
}

pub fn payload_preview(payload: &[u8]) -> String {
    const MAX_PREVIEW: usize = 48;
    match std::str::from_utf8(payload) {
        Ok(text) if text.len() <= MAX_PREVIEW => text.escape_debug().to_string(),
        Ok(_) | Err(_) => format!("<{} bytes>", payload.len()),
    }
}

pub fn write_raw(out: &mut impl Write, data: &[u8]) -> std::io::Result<()> {
    out.write_all(data)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn previews_short_text_only() {
        assert_eq!(payload_preview(b"hi\n"), "hi\\n");
        assert_eq!(payload_preview(&[0xff, 0xfe]), "<2 bytes>");
        assert_eq!(payload_preview(&[b'a'; 64]), "<64 bytes>");
    }
}
