//! Integration tests for the WebSocket transport.
//!
//! A real listener on an OS-assigned port, a real `tokio-tungstenite`
//! client on the other end.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio::io::AsyncWriteExt;
    use tokio_tungstenite::tungstenite::Message;
    use typerace_transport::{
        Connection, Frame, Incoming, Transport, TransportError, WebSocketConnection,
        WebSocketTransport,
    };

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on port 0 and returns the server and client ends of one
    /// connection.
    async fn pair() -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        let server = tokio::spawn(async move {
            let incoming = transport.accept().await.expect("should accept");
            incoming.upgrade().await.expect("should upgrade")
        });

        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("accept task");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_send_and_receive() {
        let (conn, mut client) = pair().await;
        assert!(conn.peer_addr().ip().is_loopback());

        conn.send(br#"{"event":"restart"}"#).await.expect("send");
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "utf-8 payloads go out as text frames");
        assert_eq!(msg.into_data().as_ref(), br#"{"event":"restart"}"#);

        client
            .send(Message::text(r#"{"event":"leave"}"#.to_string()))
            .await
            .unwrap();
        let received = conn.recv().await.expect("recv").expect("frame");
        assert_eq!(received, Frame::Data(br#"{"event":"leave"}"#.to_vec()));

        conn.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_websocket_binary_for_non_utf8() {
        let (conn, mut client) = pair().await;

        conn.send(&[0xff, 0xfe]).await.expect("send");
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
    }

    #[tokio::test]
    async fn test_upgraded_connections_get_distinct_ids() {
        let (a, _ca) = pair().await;
        let (b, _cb) = pair().await;
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_pending() {
        let (conn, mut client) = pair().await;
        let conn = Arc::new(conn);

        let reader = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The reader holds the stream half; writes must still go through.
        tokio::time::timeout(Duration::from_secs(1), conn.send(b"broadcast"))
            .await
            .expect("send must not wait on the pending recv")
            .expect("send");
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"broadcast");

        client.send(Message::Close(None)).await.unwrap();
        let result = reader.await.unwrap().expect("recv should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_ping_and_pong_surface_as_keepalive() {
        let (conn, mut client) = pair().await;

        client.send(Message::Ping(b"hi".to_vec().into())).await.unwrap();
        let frame = conn.recv().await.expect("recv").expect("frame");
        assert_eq!(frame, Frame::Keepalive);

        client.send(Message::Pong(Vec::new().into())).await.unwrap();
        let frame = conn.recv().await.expect("recv").expect("frame");
        assert_eq!(frame, Frame::Keepalive);

        // The payload frame behind them still arrives.
        client.send(Message::text("after".to_string())).await.unwrap();
        let frame = conn.recv().await.expect("recv").expect("frame");
        assert_eq!(frame, Frame::Data(b"after".to_vec()));
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (conn, mut client) = pair().await;

        client.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_silent_peer_times_out_without_blocking_accept() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .unwrap()
            .with_handshake_timeout(Duration::from_millis(100));
        let addr = transport.local_addr().unwrap();

        // Connects over TCP and never sends the upgrade request.
        let _silent = tokio::net::TcpStream::connect(addr).await.unwrap();
        let stalled = transport.accept().await.unwrap();
        let stalled = tokio::spawn(stalled.upgrade());

        // A well-behaved client is still accepted meanwhile.
        let server = tokio::spawn(async move {
            transport.accept().await.unwrap().upgrade().await
        });
        let (_client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        assert!(server.await.unwrap().is_ok());

        let result = stalled.await.unwrap();
        assert!(matches!(result, Err(TransportError::HandshakeTimeout(_))));
    }

    #[tokio::test]
    async fn test_garbage_handshake_fails() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        let mut raw = tokio::net::TcpStream::connect(addr).await.unwrap();
        raw.write_all(b"hello there\r\n\r\n").await.unwrap();

        let incoming = transport.accept().await.unwrap();
        let result = incoming.upgrade().await;
        assert!(matches!(result, Err(TransportError::HandshakeFailed(_))));
    }
}
