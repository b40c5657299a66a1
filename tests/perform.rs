use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use yawh::{accept_key, Handshake, HandshakeError, Options};

/// Reads the upgrade request from the client side of the pipe.
async fn read_request(server: &mut DuplexStream) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        if server.read(&mut byte).await? == 0 {
            anyhow::bail!("client closed before sending the request");
        }
        buf.push(byte[0]);
    }
    Ok(String::from_utf8(buf)?)
}

fn request_key(request: &str) -> anyhow::Result<String> {
    request
        .split("\r\n")
        .find_map(|line| line.strip_prefix("Sec-Websocket-Key: "))
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("request has no key"))
}

#[tokio::test]
async fn test_perform_switches_protocols() -> anyhow::Result<()> {
    let (mut client, mut server) = duplex(4096);

    let server = tokio::spawn(async move {
        let request = read_request(&mut server).await?;
        let key = request_key(&request)?;
        let mut response = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: {}\r\n\
             Set-Cookie: a=1\r\n\
             Set-Cookie: b=2\r\n\r\n",
            accept_key(&key)
        )
        .into_bytes();
        // a text frame sent right behind the response
        response.extend_from_slice(b"\x81\x02hi");
        server.write_all(&response).await?;
        anyhow::Ok(request)
    });

    let mut handshake = Handshake::new("ws://localhost:9001/chat?room=1")?;
    handshake.add_header("Origin", "http://localhost");
    let response = handshake.perform(&mut client).await?;

    assert_eq!(response.headers.get_first("upgrade"), Some("websocket"));
    assert_eq!(
        response.headers.get("set-cookie"),
        Some(&["a=1".to_string(), "b=2".to_string()][..])
    );
    assert_eq!(&response.remaining[..], b"\x81\x02hi");

    let request = server.await??;
    assert!(request.starts_with("GET /chat?room=1 HTTP/1.1\r\n"));
    assert!(request.ends_with("host: localhost:9001\r\nOrigin: http://localhost\r\n\r\n"));
    Ok(())
}

#[tokio::test]
async fn test_perform_rejected_status() -> anyhow::Result<()> {
    let (mut client, mut server) = duplex(4096);

    tokio::spawn(async move {
        read_request(&mut server).await?;
        server
            .write_all(b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\n\r\n")
            .await?;
        anyhow::Ok(())
    });

    let handshake = Handshake::new("ws://localhost/")?;
    let err = handshake.perform(&mut client).await.unwrap_err();
    assert!(
        matches!(err, HandshakeError::InvalidStatusLine(ref line) if line == "HTTP/1.1 403 Forbidden")
    );
    Ok(())
}

#[tokio::test]
async fn test_perform_verifies_accept_key() -> anyhow::Result<()> {
    let response = b"HTTP/1.1 101 Switching Protocols\r\n\
                     Upgrade: websocket\r\n\
                     Connection: Upgrade\r\n\
                     Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n";

    let (mut client, mut server) = duplex(4096);
    tokio::spawn(async move {
        read_request(&mut server).await?;
        server.write_all(response).await?;
        anyhow::Ok(())
    });

    let err = Handshake::new("ws://localhost/")?
        .perform(&mut client)
        .await
        .unwrap_err();
    assert!(matches!(err, HandshakeError::InvalidAcceptKey));

    // the same reply passes once verification is turned off
    let (mut client, mut server) = duplex(4096);
    tokio::spawn(async move {
        read_request(&mut server).await?;
        server.write_all(response).await?;
        anyhow::Ok(())
    });

    let response = Handshake::new("ws://localhost/")?
        .perform_with_options(&mut client, Options::default().without_verification())
        .await?;
    assert_eq!(response.headers.len(), 3);
    assert!(response.remaining.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_perform_header_limit() -> anyhow::Result<()> {
    let (mut client, mut server) = duplex(4096);

    tokio::spawn(async move {
        read_request(&mut server).await?;
        server
            .write_all(b"HTTP/1.1 101 Switching Protocols\r\n")
            .await?;
        for _ in 0..64 {
            server.write_all(b"X-Padding: aaaaaaaaaaaaaaaa\r\n").await?;
        }
        anyhow::Ok(())
    });

    let err = Handshake::new("ws://localhost/")?
        .perform_with_options(&mut client, Options::default().with_max_header_size(512))
        .await
        .unwrap_err();
    assert!(matches!(err, HandshakeError::HeaderTooLarge));
    Ok(())
}

#[tokio::test]
async fn test_perform_connection_closed() -> anyhow::Result<()> {
    let (mut client, mut server) = duplex(4096);

    tokio::spawn(async move {
        read_request(&mut server).await?;
        server
            .write_all(b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: web")
            .await?;
        drop(server);
        anyhow::Ok(())
    });

    let err = Handshake::new("ws://localhost/")?
        .perform(&mut client)
        .await
        .unwrap_err();
    assert!(matches!(err, HandshakeError::ConnectionClosed));
    Ok(())
}

#[tokio::test]
async fn test_perform_response_split_across_reads() -> anyhow::Result<()> {
    let (mut client, mut server) = duplex(4096);

    tokio::spawn(async move {
        let request = read_request(&mut server).await?;
        let key = request_key(&request)?;
        let mut response = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: {}\r\n\
             X-Chunked: yes\r\n\r\n",
            accept_key(&key)
        )
        .into_bytes();
        response.extend_from_slice(b"\x89\x00");

        // the terminator lands across several writes
        for chunk in response.chunks(3) {
            server.write_all(chunk).await?;
            server.flush().await?;
            tokio::task::yield_now().await;
        }
        anyhow::Ok(())
    });

    let response = Handshake::new("ws://localhost/")?
        .perform(&mut client)
        .await?;

    assert_eq!(response.headers.get_first("upgrade"), Some("websocket"));
    assert_eq!(response.headers.get_first("connection"), Some("Upgrade"));
    assert_eq!(response.headers.get_first("x-chunked"), Some("yes"));
    assert_eq!(response.headers.len(), 4);
    // bytes behind the header block may or may not have arrived yet
    assert!(b"\x89\x00".starts_with(&response.remaining[..]));
    Ok(())
}
