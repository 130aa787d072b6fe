use std::collections::HashSet;
use std::ops::Add;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::Instant;

use shoal_core::address::Address;
use shoal_core::memd::client::Client;
use shoal_core::memd::codec::HEADER_SIZE;
use shoal_core::memd::connection::{ConnectOptions, ConnectionType, TcpConnection};
use shoal_core::memd::dispatcher::{Dispatcher, DispatcherOptions};
use shoal_core::memd::error::CancellationErrorKind;
use shoal_core::memd::magic::Magic;
use shoal_core::memd::opcode::OpCode;
use shoal_core::memd::packet::RequestPacket;

struct ReceivedRequest {
    opcode: u8,
    opaque: u32,
}

async fn read_request(stream: &mut TcpStream) -> Option<ReceivedRequest> {
    let mut header = [0u8; HEADER_SIZE];
    stream.read_exact(&mut header).await.ok()?;

    let opcode = header[1];
    let total_body_len = u32::from_be_bytes(header[8..12].try_into().unwrap()) as usize;
    let opaque = u32::from_be_bytes(header[12..16].try_into().unwrap());

    let mut body = vec![0u8; total_body_len];
    stream.read_exact(&mut body).await.ok()?;

    Some(ReceivedRequest { opcode, opaque })
}

// A success response whose value is the request's opaque, so the test can
// verify responses land with the matching waiter.
fn encode_response(req: &ReceivedRequest) -> Vec<u8> {
    let mut resp = Vec::with_capacity(HEADER_SIZE + 4);
    resp.push(0x81);
    resp.push(req.opcode);
    resp.extend_from_slice(&0u16.to_be_bytes()); // key length
    resp.push(0); // extras length
    resp.push(0); // datatype
    resp.extend_from_slice(&0u16.to_be_bytes()); // status
    resp.extend_from_slice(&4u32.to_be_bytes()); // total body length
    resp.extend_from_slice(&req.opaque.to_be_bytes());
    resp.extend_from_slice(&0u64.to_be_bytes()); // cas
    resp.extend_from_slice(&req.opaque.to_be_bytes());
    resp
}

async fn connect_client(port: u16) -> Client {
    let conn = TcpConnection::connect(
        &Address {
            host: "127.0.0.1".to_string(),
            port,
        },
        ConnectOptions {
            deadline: Instant::now().add(Duration::from_secs(5)),
            tcp_keep_alive_time: Duration::from_secs(10),
        },
    )
    .await
    .expect("failed to connect to test server");

    // The read-close notification is unused here; a failed send is logged
    // and otherwise harmless.
    let (on_read_close_tx, _on_read_close_rx) = oneshot::channel();

    Client::new(
        ConnectionType::Tcp(conn),
        DispatcherOptions {
            unsolicited_packet_handler: Arc::new(|_packet| Box::pin(async {})),
            orphan_handler: None,
            on_read_close_tx,
            disable_decompression: false,
            id: "test-client".to_string(),
        },
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn responses_match_waiters_regardless_of_order() {
    const NUM_REQUESTS: usize = 8;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut stream, _addr) = listener.accept().await.unwrap();

        let mut requests = vec![];
        for _ in 0..NUM_REQUESTS {
            requests.push(read_request(&mut stream).await.unwrap());
        }

        let opaques: Vec<u32> = requests.iter().map(|r| r.opaque).collect();

        // Answer in reverse arrival order; the client must not care.
        for req in requests.iter().rev() {
            stream.write_all(&encode_response(req)).await.unwrap();
        }
        stream.flush().await.unwrap();

        // Hold the socket open until the client is done reading.
        tokio::time::sleep(Duration::from_millis(500)).await;
        opaques
    });

    let client = connect_client(port).await;

    let mut ops = vec![];
    for i in 0..NUM_REQUESTS {
        let key = format!("key-{i}");
        let op = client
            .dispatch(
                RequestPacket::new(Magic::Req, OpCode::Get, 0)
                    .vbucket_id(0)
                    .key(key.as_bytes()),
                None,
            )
            .await
            .expect("dispatch failed");
        ops.push(op);
    }

    let mut seen_opaques = HashSet::new();
    for mut op in ops {
        let resp = op.recv().await.expect("expected a response");
        let packet = resp.packet();

        // Each waiter gets the response carrying its own opaque.
        assert_eq!(
            packet.value.as_deref(),
            Some(packet.opaque.to_be_bytes().as_slice())
        );
        seen_opaques.insert(packet.opaque);
    }

    assert_eq!(seen_opaques.len(), NUM_REQUESTS);

    let server_opaques = server.await.unwrap();
    let server_set: HashSet<u32> = server_opaques.iter().copied().collect();
    assert_eq!(
        server_set.len(),
        NUM_REQUESTS,
        "opaques on the wire must be unique"
    );
    assert_eq!(server_set, seen_opaques);

    client.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pending_requests_drain_on_disconnect() {
    const NUM_REQUESTS: usize = 6;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut stream, _addr) = listener.accept().await.unwrap();

        for _ in 0..NUM_REQUESTS {
            read_request(&mut stream).await.unwrap();
        }

        // Drop the socket with every request outstanding.
        drop(stream);
    });

    let client = connect_client(port).await;

    let mut ops = vec![];
    for i in 0..NUM_REQUESTS {
        let key = format!("key-{i}");
        let op = client
            .dispatch(
                RequestPacket::new(Magic::Req, OpCode::Get, 0)
                    .vbucket_id(0)
                    .key(key.as_bytes()),
                None,
            )
            .await
            .expect("dispatch failed");
        ops.push(op);
    }

    server.await.unwrap();

    // Every pending request completes exactly once, with a retriable
    // lost-connection error.
    for mut op in ops {
        let err = op.recv().await.expect_err("expected a drain error");
        assert!(err.is_cancellation_error());
        assert_eq!(
            err.cancellation_kind(),
            Some(CancellationErrorKind::ClosedInFlight)
        );
    }
}
