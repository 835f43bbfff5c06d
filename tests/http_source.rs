//! HttpSource tests against a loopback HTTP stub.

use geosite2abp::{pipeline, Config, Error, HttpSource, RuleSource};
use reqwest::blocking::Client;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

/// Read a request up to the end of its headers.
fn read_request(stream: &mut TcpStream) -> String {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
        if request.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    String::from_utf8_lossy(&request).into_owned()
}

/// Serve one response per connection, in order, returning a URL template
/// and the request lines seen.
fn serve(
    responses: Vec<(&'static str, &'static str)>,
) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            seen.push(request.lines().next().unwrap_or_default().to_string());
        }
        seen
    });

    (format!("http://{}/data/{{it}}", addr), handle)
}

/// Serve a single response, returning a URL template and the request line.
fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
    let (template, handle) = serve(vec![(status, body)]);
    let handle = thread::spawn(move || handle.join().unwrap().remove(0));
    (template, handle)
}

fn source_for(template: String, timeout: Duration) -> HttpSource {
    let config = Config {
        community_url: template,
        ..Config::default()
    };
    let client = Client::builder().no_proxy().timeout(timeout).build().unwrap();
    HttpSource::with_client(config, client)
}

#[test]
fn test_fetch_success() {
    let (template, server) = serve_once("200 OK", "google.com\nfull:www.google.com\n");
    let source = source_for(template, Duration::from_secs(5));

    let text = source.fetch("google").unwrap();
    assert_eq!(text, "google.com\nfull:www.google.com\n");
    assert_eq!(server.join().unwrap(), "GET /data/google HTTP/1.1");
}

#[test]
fn test_fetch_not_found() {
    let (template, server) = serve_once("404 Not Found", "404: Not Found");
    let source = source_for(template, Duration::from_secs(5));

    match source.fetch("no-such-list") {
        Err(Error::Fetch { identifier, reason }) => {
            assert_eq!(identifier, "no-such-list");
            assert!(reason.contains("404"));
        }
        other => panic!("expected fetch error, got {:?}", other),
    }
    server.join().unwrap();
}

#[test]
fn test_fetch_empty_body() {
    let (template, server) = serve_once("200 OK", "");
    let source = source_for(template, Duration::from_secs(5));

    assert!(matches!(source.fetch("empty"), Err(Error::Fetch { .. })));
    server.join().unwrap();
}

#[test]
fn test_fetch_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        thread::sleep(Duration::from_secs(2));
        drop(stream);
    });

    let source = source_for(
        format!("http://{}/data/{{it}}", addr),
        Duration::from_millis(300),
    );

    match source.fetch("slow") {
        Err(Error::Fetch { reason, .. }) => assert!(reason.contains("timed out")),
        other => panic!("expected timeout, got {:?}", other),
    }
    server.join().unwrap();
}

#[test]
fn test_run_with_404_writes_no_file() {
    let (template, server) = serve_once("404 Not Found", "");
    let source = source_for(template.clone(), Duration::from_secs(5));
    let config = Config {
        community_url: template,
        ..Config::default()
    };
    let dir = tempdir().unwrap();
    let out = dir.path().join("test.txt");

    let result = pipeline::run(&["unknown-tag"], &config, &source, &out);
    assert!(matches!(result, Err(Error::Fetch { .. })));
    assert!(!out.exists());
    server.join().unwrap();
}

#[test]
fn test_include_fetched_from_root_template() {
    // win-update is a release list by name, but inside a community list it
    // must come from the community data directory.
    let (template, server) = serve(vec![
        ("200 OK", "microsoft.com\ninclude:win-update\n"),
        ("200 OK", "update.microsoft.com\n"),
    ]);
    let config = Config {
        community_url: template,
        release_url: "http://127.0.0.1:9/release/{it}.txt".to_string(),
        ..Config::default()
    };
    let client = Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let source = HttpSource::with_client(config.clone(), client);
    let dir = tempdir().unwrap();
    let out = dir.path().join("test.txt");

    let conversion = pipeline::run(&["microsoft"], &config, &source, &out).unwrap();

    assert_eq!(
        server.join().unwrap(),
        vec!["GET /data/microsoft HTTP/1.1", "GET /data/win-update HTTP/1.1"]
    );
    assert!(conversion.aggregate.contains("update.microsoft.com"));
    assert_eq!(conversion.lists[0].includes, vec!["win-update"]);
}
