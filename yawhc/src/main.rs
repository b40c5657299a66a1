use std::{io::Read, path::PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use yawh::Handshake;

mod probe;

/// WebSocket handshake inspector
///
/// Prints the upgrade request yawh would send, validates server responses
/// and probes live servers.
///
/// Examples:
///   yawhc request wss://example.com/feed -H "Origin: https://example.com"
///   yawhc validate response.txt --key dGhlIHNhbXBsZSBub25jZQ==
///   yawhc probe ws://127.0.0.1:9001/ --timeout 2s
#[derive(Parser)]
#[command(author, version)]
struct Cli {
    /// Log request generation and response validation to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Request(RequestCmd),
    Validate(ValidateCmd),
    Probe(probe::Cmd),
}

/// Print the upgrade request for a URL.
#[derive(Args)]
#[command(alias = "r")]
struct RequestCmd {
    /// Extra header to send, as "Field: value". Can be repeated.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// The WebSocket URL (ws:// or wss://)
    url: String,
}

/// Validate a raw response header block read from a file or stdin.
#[derive(Args)]
#[command(alias = "v")]
struct ValidateCmd {
    /// Key sent with the request. When set, the upgrade headers are verified too.
    #[arg(short, long)]
    key: Option<String>,

    /// File holding the response. Reads stdin when omitted.
    file: Option<PathBuf>,
}

fn main() {
    let args = Cli::parse();
    if let Err(err) = run(args) {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}

fn run(args: Cli) -> anyhow::Result<()> {
    if args.verbose {
        simple_logger::init_with_level(log::Level::Debug)?;
    }

    match args.command {
        Commands::Request(cmd) => request(cmd),
        Commands::Validate(cmd) => validate(cmd),
        Commands::Probe(cmd) => probe::run(cmd),
    }
}

fn request(cmd: RequestCmd) -> anyhow::Result<()> {
    let mut handshake = Handshake::new(&cmd.url)?;
    for (field, value) in cmd.headers {
        handshake.add_header(field, value);
    }

    println!("> connect {}", handshake.remote_address());
    print!("{}", String::from_utf8_lossy(&handshake.generate_request()));
    Ok(())
}

fn validate(cmd: ValidateCmd) -> anyhow::Result<()> {
    let mut buffer = Vec::new();
    match &cmd.file {
        Some(path) => {
            buffer = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            std::io::stdin().read_to_end(&mut buffer)?;
        }
    }

    // files edited by hand usually lose their carriage returns
    if !buffer.windows(2).any(|window| window == b"\r\n") {
        buffer = String::from_utf8_lossy(&buffer)
            .replace('\n', "\r\n")
            .into_bytes();
    }

    let headers = yawh::response::parse(&buffer)?;
    if let Some(key) = &cmd.key {
        yawh::verify_response(&headers, key)?;
    }

    for (field, value) in headers.lines() {
        println!("{field}: {value}");
    }
    Ok(())
}

fn parse_header(input: &str) -> Result<(String, String), String> {
    let (field, value) = input
        .split_once(':')
        .ok_or_else(|| format!("expected \"Field: value\", got {input:?}"))?;

    let field = field.trim();
    if field.is_empty() {
        return Err(format!("empty header name in {input:?}"));
    }

    Ok((field.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Origin: https://example.com").unwrap(),
            ("Origin".to_string(), "https://example.com".to_string())
        );
        assert_eq!(
            parse_header("X-Empty:").unwrap(),
            ("X-Empty".to_string(), String::new())
        );
        assert!(parse_header("no separator").is_err());
        assert!(parse_header(": value").is_err());
    }
}
