// Integration Test Utilities
//
// A canned-reply HTTP server on 127.0.0.1 for exercising the Web API client
// without a real CRM organization.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

/// One canned HTTP reply
#[derive(Debug, Clone)]
pub struct Reply {
    pub status_line: &'static str,
    pub body: String,
}

impl Reply {
    pub fn new(status_line: &'static str, body: impl Into<String>) -> Self {
        Self {
            status_line,
            body: body.into(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status_line,
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}

/// A request as received by the server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// e.g. `POST /api/data/v9.2/ExportSolution HTTP/1.1`
    pub request_line: String,
    /// Header lines, names lowercased
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Server answering one connection per reply, in order
pub struct CannedServer {
    pub url: String,
    handle: JoinHandle<Vec<RecordedRequest>>,
}

impl CannedServer {
    pub fn start(replies: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let mut recorded = Vec::new();
            for reply in replies {
                let (mut stream, _) = listener.accept().unwrap();
                recorded.push(read_request(&mut stream));
                stream.write_all(&reply.to_bytes()).unwrap();
                stream.flush().unwrap();
            }
            recorded
        });
        Self { url, handle }
    }

    /// Connection string pointing at this server
    pub fn connection_string(&self) -> String {
        format!("Url={};AccessToken=test-token;Timeout=5", self.url)
    }

    /// Wait for every reply to be served and return what was received
    pub fn finish(self) -> Vec<RecordedRequest> {
        self.handle.join().unwrap()
    }
}

/// A localhost port with nothing listening on it
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn read_request(stream: &mut TcpStream) -> RecordedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let (head_end, content_length) = loop {
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).into_owned();
            let length = head
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            break (pos + 4, length);
        }
    };
    while buf.len() < head_end + content_length {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf[..head_end - 4]).into_owned();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    let body = String::from_utf8_lossy(&buf[head_end..]).into_owned();

    RecordedRequest {
        request_line,
        headers,
        body,
    }
}
