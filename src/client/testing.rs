//! Scripted HTTP responders for exercising the turn driver in tests
//!
//! A tiny hand-rolled HTTP/1.1 server over `tokio::net::TcpListener`: each
//! request pops the next script and plays it back as a chunked response. One
//! chunk per script piece keeps HTTP chunk boundaries under test control,
//! which is exactly what the frame decoder has to be robust against.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

/// What to play back for one request.
pub(crate) enum Script {
    /// Stream the pieces as individual chunks, then end the body cleanly.
    Stream(Vec<&'static str>),
    /// Stream the pieces, then stall without ending the body.
    StreamStall(Vec<&'static str>),
    /// Stream the pieces, then drop the connection without the terminal
    /// chunk, so the body ends in a transport error.
    StreamAbort(Vec<&'static str>),
    /// Plain status response with a fixed body.
    Status(u16, &'static str),
}

/// Serve one script per request, in order. Returns the base URL.
pub(crate) async fn serve(scripts: Vec<Script>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let scripts = Arc::new(Mutex::new(scripts.into_iter().collect::<VecDeque<_>>()));

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let scripts = scripts.clone();
            tokio::spawn(handle_connection(stream, scripts));
        }
    });

    format!("http://{addr}")
}

pub(crate) async fn serve_script(streams: Vec<Vec<&'static str>>) -> String {
    serve(streams.into_iter().map(Script::Stream).collect()).await
}

pub(crate) async fn serve_script_stalling(pieces: Vec<&'static str>) -> String {
    serve(vec![Script::StreamStall(pieces)]).await
}

pub(crate) async fn serve_status(status: u16, body: &'static str) -> String {
    serve(vec![Script::Status(status, body)]).await
}

async fn handle_connection(mut stream: TcpStream, scripts: Arc<Mutex<VecDeque<Script>>>) {
    // Serve requests sequentially; reqwest reuses pooled connections.
    while read_request(&mut stream).await {
        let script = scripts.lock().await.pop_front();
        let Some(script) = script else {
            let _ = stream
                .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n")
                .await;
            continue;
        };
        match script {
            Script::Stream(pieces) => {
                play_stream(&mut stream, &pieces).await;
                let _ = stream.write_all(b"0\r\n\r\n").await;
                let _ = stream.flush().await;
            }
            Script::StreamStall(pieces) => {
                play_stream(&mut stream, &pieces).await;
                tokio::time::sleep(Duration::from_secs(600)).await;
                return;
            }
            Script::StreamAbort(pieces) => {
                play_stream(&mut stream, &pieces).await;
                return;
            }
            Script::Status(status, body) => {
                let head = format!(
                    "HTTP/1.1 {status} X\r\ncontent-length: {}\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.flush().await;
            }
        }
    }
}

async fn play_stream(stream: &mut TcpStream, pieces: &[&str]) {
    let _ = stream
        .write_all(
            b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n",
        )
        .await;
    for piece in pieces {
        let chunk = format!("{:x}\r\n{piece}\r\n", piece.len());
        let _ = stream.write_all(chunk.as_bytes()).await;
        let _ = stream.flush().await;
    }
}

/// Read one request (headers plus content-length body). Returns false once
/// the peer has gone away.
async fn read_request(stream: &mut TcpStream) -> bool {
    let mut buf: Vec<u8> = Vec::new();
    let mut tmp = [0u8; 1024];
    let header_end = loop {
        match stream.read(&mut tmp).await {
            Ok(0) | Err(_) => return false,
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
        }
        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length: usize = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);

    let mut remaining = content_length.saturating_sub(buf.len() - header_end);
    while remaining > 0 {
        match stream.read(&mut tmp).await {
            Ok(0) | Err(_) => return false,
            Ok(n) => remaining = remaining.saturating_sub(n),
        }
    }
    true
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
