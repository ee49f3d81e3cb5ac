// tests/reload_server.rs

mod common;
use crate::common::builders::ProjectTree;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use assetpipe::config::ServerSection;
use assetpipe::server::reload::RELOAD_SCRIPT_TAG;
use assetpipe::server::{inject_reload_script, start_server, ReloadHub, ReloadMessage};
use assetpipe::task::{CompletionSink, FileOutcome, FileReport, TaskReport};

type TestResult = Result<(), Box<dyn Error>>;

fn report(task: &str, files: Vec<FileReport>) -> TaskReport {
    TaskReport {
        task: task.to_string(),
        files,
        cancelled: false,
    }
}

fn written(source: &str, outputs: &[&str]) -> FileReport {
    FileReport {
        source: PathBuf::from(source),
        outcome: FileOutcome::Written(outputs.iter().map(PathBuf::from).collect()),
    }
}

#[tokio::test]
async fn completion_reaches_every_subscriber() -> TestResult {
    let hub = ReloadHub::new("build");
    let mut first = hub.subscribe();
    let mut second = hub.subscribe();
    assert_eq!(hub.client_count(), 2);

    hub.task_completed(&report(
        "sass",
        vec![written("src/sass/main.sass", &["build/css/main.css", "build/css/main.css.map"])],
    ));

    let expected = ReloadMessage::Reload {
        task: "sass".into(),
        paths: vec!["css/main.css".into(), "css/main.css.map".into()],
    };
    assert_eq!(first.recv().await?, expected);
    assert_eq!(second.recv().await?, expected);
    Ok(())
}

#[tokio::test]
async fn runs_that_write_nothing_do_not_reload() {
    let hub = ReloadHub::new("build");
    let mut rx = hub.subscribe();

    hub.task_completed(&report("js", Vec::new()));
    hub.task_completed(&report(
        "js",
        vec![FileReport {
            source: PathBuf::from("src/js/app.js"),
            outcome: FileOutcome::Unchanged,
        }],
    ));

    assert!(rx.try_recv().is_err());
}

#[test]
fn broadcast_without_clients_is_harmless() {
    let hub = ReloadHub::new("build");
    let delivered = hub.broadcast(ReloadMessage::Reload {
        task: "html".into(),
        paths: vec!["index.html".into()],
    });
    assert_eq!(delivered, 0);
}

#[test]
fn reload_message_serializes_with_a_type_tag() {
    let msg = ReloadMessage::Reload {
        task: "sass".into(),
        paths: vec!["css/main.css".into()],
    };
    let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "type": "reload", "task": "sass", "paths": ["css/main.css"] })
    );
}

#[test]
fn script_goes_before_the_last_body_end_tag() {
    let html = "<html><body><p>hi</p></BODY></html>";
    assert_eq!(
        inject_reload_script(html),
        format!("<html><body><p>hi</p>{RELOAD_SCRIPT_TAG}</BODY></html>")
    );
}

#[test]
fn script_is_appended_to_fragments() {
    assert_eq!(
        inject_reload_script("<p>partial</p>"),
        format!("<p>partial</p>{RELOAD_SCRIPT_TAG}")
    );
}

#[test]
fn script_is_injected_once() {
    let once = inject_reload_script("<body></body>");
    assert_eq!(inject_reload_script(&once), once);
}

async fn http_get(addr: SocketAddr, path: &str) -> Result<String, Box<dyn Error>> {
    let mut stream = TcpStream::connect(addr).await?;
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(String::from_utf8_lossy(&response).into_owned())
}

fn local_server() -> ServerSection {
    ServerSection {
        host: "127.0.0.1".into(),
        port: 0,
        tunnel: false,
        ..ServerSection::default()
    }
}

#[tokio::test]
async fn server_serves_build_root_with_reload_client() -> TestResult {
    init_tracing();
    let tree = ProjectTree::new()
        .file("build/index.html", "<html><body>home</body></html>")
        .file("build/css/main.css", ".a{color:red}");

    let cancel = CancellationToken::new();
    let handle = start_server(
        &local_server(),
        tree.path().join("build"),
        ReloadHub::new("build"),
        cancel.clone(),
    )
    .await?;

    let page = with_timeout(http_get(handle.addr, "/index.html")).await?;
    assert!(page.starts_with("HTTP/1.1 200"), "{page}");
    assert!(page.contains(&format!("home{RELOAD_SCRIPT_TAG}</body>")), "{page}");

    let css = with_timeout(http_get(handle.addr, "/css/main.css")).await?;
    assert!(css.contains(".a{color:red}"));
    assert!(!css.contains(RELOAD_SCRIPT_TAG));

    let client = with_timeout(http_get(handle.addr, "/__livereload.js")).await?;
    assert!(client.contains("application/javascript"));
    assert!(client.contains("/__livereload"));

    let missing = with_timeout(http_get(handle.addr, "/nope.html")).await?;
    assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");

    cancel.cancel();
    with_timeout(handle.task).await?;
    Ok(())
}

#[tokio::test]
async fn occupied_port_is_a_config_error() -> TestResult {
    let blocker = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let port = blocker.local_addr()?.port();

    let cfg = ServerSection {
        port,
        ..local_server()
    };
    let result = start_server(&cfg, "build", ReloadHub::new("build"), CancellationToken::new()).await;

    match result {
        Err(assetpipe::errors::PipelineError::Config(msg)) => assert!(msg.contains("cannot bind")),
        other => panic!("Expected Config error, got: {:?}", other.map(|h| h.addr)),
    }
    Ok(())
}
