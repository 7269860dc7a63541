use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;
use headserve::{Address, Server};

const HEAD_REQUEST: &[u8] = b"HEAD / HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n";

const EXPECTED: &[u8] = b"HTTP/1.1 200 OK\r\n\
    Content-Type: text/plain\r\n\
    Content-Length: 100\r\n\
    Last-Modified: Thu, 28 Jul 2016 05:37:47 GMT\r\n\
    Connection: keep-alive\r\n\
    ETag: \"57999a2b-2\"\r\n\
    Accept-Ranges: bytes\r\n\
    \r\n";

fn spawn() -> SocketAddr {
    let server = Server::bind(&Address::new("127.0.0.1", Some(0))).unwrap();
    let address = server.local_addr();
    thread::spawn(move || server.run());
    address
}

fn connect(address: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(address).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream
}

// reads until `count` complete response heads have arrived
fn read_heads(stream: &mut TcpStream, count: usize) -> Vec<u8> {
    let mut received = Vec::new();
    let mut chunk = [0u8; 1024];
    while received.windows(4).filter(|w| *w == b"\r\n\r\n").count() < count {
        let size = stream.read(&mut chunk).unwrap();
        assert_ne!(size, 0, "connection closed after {:?}", String::from_utf8_lossy(&received));
        received.extend_from_slice(&chunk[..size]);
    }
    received
}

fn assert_nothing_more(stream: &mut TcpStream) {
    stream.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    let mut chunk = [0u8; 16];
    match stream.read(&mut chunk) {
        Err(e) => assert!(matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)),
        Ok(size) => panic!("unexpected {} bytes after the head", size),
    }
}

fn assert_closed(stream: &mut TcpStream) {
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).unwrap();
    assert!(rest.is_empty());
}

#[test]
fn head_returns_the_canned_headers_without_a_body() {
    let mut stream = connect(spawn());
    stream.write_all(HEAD_REQUEST).unwrap();
    assert_eq!(read_heads(&mut stream, 1), EXPECTED);
    assert_nothing_more(&mut stream);
}

#[test]
fn keep_alive_connection_serves_repeated_requests() {
    let mut stream = connect(spawn());
    for _ in 0..3 {
        stream.write_all(HEAD_REQUEST).unwrap();
        assert_eq!(read_heads(&mut stream, 1), EXPECTED);
    }
}

#[test]
fn separate_connections_get_identical_responses() {
    let address = spawn();
    let responses: Vec<_> = (0..3)
        .map(|_| {
            let mut stream = connect(address);
            stream.write_all(b"HEAD /anything?x=1 HTTP/1.0\r\n\r\n").unwrap();
            read_heads(&mut stream, 1)
        })
        .collect();
    assert!(responses.iter().all(|r| r == EXPECTED));
}

#[test]
fn pipelined_requests_are_answered_in_order() {
    let mut stream = connect(spawn());
    let mut requests = HEAD_REQUEST.to_vec();
    requests.extend_from_slice(HEAD_REQUEST);
    stream.write_all(&requests).unwrap();
    assert_eq!(read_heads(&mut stream, 2), [EXPECTED, EXPECTED].concat());
}

#[test]
fn request_split_across_writes() {
    let mut stream = connect(spawn());
    let (first, second) = HEAD_REQUEST.split_at(7);
    stream.write_all(first).unwrap();
    stream.flush().unwrap();
    thread::sleep(Duration::from_millis(50));
    stream.write_all(second).unwrap();
    assert_eq!(read_heads(&mut stream, 1), EXPECTED);
}

#[test]
fn connection_close_is_honored() {
    let mut stream = connect(spawn());
    stream.write_all(b"HEAD / HTTP/1.1\r\nConnection: close\r\n\r\n").unwrap();
    assert_eq!(read_heads(&mut stream, 1), EXPECTED);
    assert_closed(&mut stream);
}

#[test]
fn get_is_not_implemented() {
    let mut stream = connect(spawn());
    stream.write_all(b"GET / HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n").unwrap();
    let response = read_heads(&mut stream, 1);
    assert!(response.starts_with(b"HTTP/1.1 501 Not Implemented\r\n"));
    assert_closed(&mut stream);
}

#[test]
fn malformed_request_is_rejected() {
    let mut stream = connect(spawn());
    stream.write_all(b"nonsense\r\n\r\n").unwrap();
    let response = read_heads(&mut stream, 1);
    assert!(response.starts_with(b"HTTP/1.1 400 Bad Request\r\n"));
    assert_closed(&mut stream);
}

#[test]
fn server_survives_a_rejected_client() {
    let address = spawn();
    let mut bad = connect(address);
    bad.write_all(b"HEAD / HTTP/2.0\r\n\r\n").unwrap();
    assert!(read_heads(&mut bad, 1).starts_with(b"HTTP/1.1 505 "));

    let mut good = connect(address);
    good.write_all(HEAD_REQUEST).unwrap();
    assert_eq!(read_heads(&mut good, 1), EXPECTED);
}

#[test]
fn idle_connection_does_not_block_others() {
    let address = spawn();
    let _idle = connect(address);
    let mut stream = connect(address);
    stream.write_all(HEAD_REQUEST).unwrap();
    assert_eq!(read_heads(&mut stream, 1), EXPECTED);
}

#[test]
fn client_that_never_reads_is_pushed_back() {
    let mut stream = connect(spawn());
    stream.set_write_timeout(Some(Duration::from_millis(500))).unwrap();

    let batch = HEAD_REQUEST.repeat(4096);
    let total = 64 * 1024 * 1024;
    let mut accepted = 0;
    while accepted < total {
        match stream.write(&batch) {
            Ok(size) => accepted += size,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => break,
            Err(e) => panic!("write failed: {}", e),
        }
    }
    assert!(accepted < total, "server swallowed {} bytes without being read", accepted);

    // still serving once the client catches up
    assert!(read_heads(&mut stream, 3).starts_with(&[EXPECTED, EXPECTED, EXPECTED].concat()));
}

#[test]
fn large_pipelined_batch_is_answered_in_full() {
    let address = spawn();
    let mut reader = connect(address);
    let mut writer = reader.try_clone().unwrap();
    let count = 20_000;

    let sender = thread::spawn(move || {
        writer.write_all(&HEAD_REQUEST.repeat(count)).unwrap();
    });

    let mut received = 0;
    let mut chunk = vec![0u8; 64 * 1024];
    while received < count * EXPECTED.len() {
        let size = reader.read(&mut chunk).unwrap();
        assert_ne!(size, 0);
        received += size;
    }
    sender.join().unwrap();
    assert_eq!(received, count * EXPECTED.len());
    assert_nothing_more(&mut reader);
}
