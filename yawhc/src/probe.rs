use std::{sync::Arc, time::Duration};

use clap::Args;
use tokio::{net::TcpStream, runtime, time::timeout};
use tokio_rustls::{
    rustls::{self, pki_types::ServerName},
    TlsConnector,
};
use yawh::{Handshake, Options};

/// Open a connection and perform the opening handshake against a live server.
///
/// Plain TCP is used for ws:// and TLS for wss:// URLs. The response headers are
/// printed once the server switches protocols.
#[derive(Args)]
#[command(alias = "p")]
pub struct Cmd {
    /// Maximum duration to wait for the connection and for the handshake.
    /// Accepts human-readable formats like "5s", "1m", "500ms".
    #[arg(short, long, value_parser = humantime::parse_duration, default_value = "5s")]
    timeout: Duration,

    /// Extra header to send, as "Field: value". Can be repeated.
    #[arg(short = 'H', long = "header", value_parser = super::parse_header)]
    headers: Vec<(String, String)>,

    /// Accept any 101 response, without checking the upgrade headers.
    #[arg(long)]
    no_verify: bool,

    /// The WebSocket URL to connect to (ws:// or wss://)
    url: String,
}

pub fn run(cmd: Cmd) -> anyhow::Result<()> {
    let runtime = runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(probe(cmd))
}

async fn probe(cmd: Cmd) -> anyhow::Result<()> {
    let mut handshake = Handshake::new(&cmd.url)?;
    for (field, value) in cmd.headers {
        handshake.add_header(field, value);
    }

    let mut options = Options::default();
    if cmd.no_verify {
        options = options.without_verification();
    }

    let stream = timeout(cmd.timeout, TcpStream::connect(handshake.remote_address())).await??;
    println!("> Connected to {}", handshake.remote_address());

    let response = if handshake.is_encrypted() {
        // IPv6 literals keep their brackets in the URL host
        let host = handshake.host().trim_start_matches('[').trim_end_matches(']');
        let domain = ServerName::try_from(host.to_string())?;
        let mut stream = timeout(cmd.timeout, tls_connector()?.connect(domain, stream)).await??;
        timeout(cmd.timeout, handshake.perform_with_options(&mut stream, options)).await??
    } else {
        let mut stream = stream;
        timeout(cmd.timeout, handshake.perform_with_options(&mut stream, options)).await??
    };

    println!("> Switched protocols");
    for (field, value) in response.headers.lines() {
        println!("{field}: {value}");
    }
    if !response.remaining.is_empty() {
        println!("> {} bytes of frame data already received", response.remaining.len());
    }

    Ok(())
}

/// Creates a TLS connector trusting the webpki roots.
/// If the crypto provider hasn't been set, [*ring*](https://github.com/briansmith/ring) will be used.
fn tls_connector() -> anyhow::Result<TlsConnector> {
    let mut root_cert_store = rustls::RootCertStore::empty();
    root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::ring::default_provider()));

    let mut config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();
    config.alpn_protocols = vec!["http/1.1".into()];

    Ok(TlsConnector::from(Arc::new(config)))
}
