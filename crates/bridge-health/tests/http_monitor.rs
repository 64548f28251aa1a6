//! End-to-end tests against a real HTTP health endpoint.
//!
//! Each test serves canned responses from a hyper server on an ephemeral
//! port and drives the prober, the monitor and the ingest notifier through
//! real TCP connections.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bridge_core::{BridgeConfig, IngestConfig, JournalEntry, ProbeResult, Verdict};
use bridge_health::{HttpProber, IngestNotifier, Monitor, Notifier, http_probe};
use bridge_journal::JournalStore;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A request as seen by the test server.
#[derive(Debug)]
struct Seen {
    method: String,
    path: String,
    body: Bytes,
}

/// Serve `replies` in order (repeating the last one) and report every request.
async fn serve(replies: Vec<(u16, &'static str)>) -> (SocketAddr, mpsc::UnboundedReceiver<Seen>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let replies = Arc::new(Mutex::new(VecDeque::from(replies)));
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let replies = replies.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let svc = service_fn(move |req: Request<Incoming>| {
                    let replies = replies.clone();
                    let tx = tx.clone();
                    async move {
                        let method = req.method().to_string();
                        let path = req.uri().path().to_string();
                        let body = req.into_body().collect().await?.to_bytes();
                        let _ = tx.send(Seen { method, path, body });

                        let (status, body) = {
                            let mut replies = replies.lock().unwrap();
                            if replies.len() > 1 {
                                replies.pop_front().unwrap()
                            } else {
                                *replies.front().unwrap()
                            }
                        };
                        Ok::<_, hyper::Error>(
                            Response::builder()
                                .status(status)
                                .header("content-type", "application/json")
                                .body(Full::new(Bytes::from(body)))
                                .unwrap(),
                        )
                    }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), svc)
                    .await;
            });
        }
    });

    (addr, rx)
}

fn config_for(addr: SocketAddr, dir: &tempfile::TempDir) -> BridgeConfig {
    BridgeConfig {
        endpoint_base_url: format!("http://{addr}"),
        poll_interval_secs: 0.02,
        request_timeout_secs: 1.0,
        journal_path: dir.path().join("algo_memory.json"),
        ..Default::default()
    }
}

#[tokio::test]
async fn probe_reads_availability_flag() {
    let (addr, mut seen) = serve(vec![(200, r#"{"db_available": true, "round": 7}"#)]).await;

    let url = format!("http://{addr}/health");
    let result = http_probe(&url, "db_available", Duration::from_secs(1)).await;

    assert_eq!(result, ProbeResult::available(true));
    let req = seen.recv().await.unwrap();
    assert_eq!(req.method, "GET");
    assert_eq!(req.path, "/health");
}

#[tokio::test]
async fn probe_reports_unavailable() {
    let (addr, _seen) = serve(vec![(200, r#"{"db_available": false}"#)]).await;
    let url = format!("http://{addr}/health");
    let result = http_probe(&url, "db_available", Duration::from_secs(1)).await;
    assert_eq!(result, ProbeResult::available(false));
}

#[tokio::test]
async fn probe_non_2xx_is_failure() {
    let (addr, _seen) = serve(vec![(503, r#"{"db_available": true}"#)]).await;
    let url = format!("http://{addr}/health");
    let result = http_probe(&url, "db_available", Duration::from_secs(1)).await;
    assert_eq!(result, ProbeResult::failed("unexpected status 503"));
}

#[tokio::test]
async fn probe_malformed_body_is_failure() {
    let (addr, _seen) = serve(vec![(200, "pulse is steady")]).await;
    let url = format!("http://{addr}/health");
    let result = http_probe(&url, "db_available", Duration::from_secs(1)).await;
    assert!(result.error_message().unwrap().starts_with("malformed body"));
}

#[tokio::test]
async fn monitor_records_alternating_endpoint_states() {
    let (addr, _seen) = serve(vec![
        (200, r#"{"db_available": true}"#),
        (500, r#"{"error": "db down"}"#),
        (200, r#"{"db_available": true}"#),
    ])
    .await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(addr, &dir);
    config.validate().unwrap();
    let mut monitor = Monitor::from_config(&config);

    let verdicts: Vec<Verdict> = {
        let mut out = Vec::new();
        for _ in 0..3 {
            out.push(monitor.run_once().await.entry.verdict);
        }
        out
    };
    assert_eq!(
        verdicts,
        [Verdict::Healthy, Verdict::Unhealthy, Verdict::Healthy]
    );

    let journal = JournalStore::new(&config.journal_path).load().unwrap();
    assert_eq!(journal.len(), 3);
    assert_eq!(
        journal[1].raw_result.error_message(),
        Some("unexpected status 500")
    );
    assert!(journal.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

#[tokio::test]
async fn monitor_against_dead_endpoint_keeps_recording() {
    let dir = tempfile::tempdir().unwrap();
    let journal = JournalStore::new(dir.path().join("journal.json"));
    let prober = HttpProber::new(
        "http://127.0.0.1:1/health",
        "db_available",
        Duration::from_millis(500),
    );
    let mut monitor = Monitor::new(Arc::new(prober), journal.clone(), Duration::from_millis(10));

    monitor.run_once().await;
    monitor.run_once().await;

    let entries = journal.load().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.verdict == Verdict::Unhealthy));
}

#[tokio::test]
async fn ingest_notifier_posts_entry_json() {
    let (addr, mut seen) = serve(vec![(201, "{}")]).await;
    let dir = tempfile::tempdir().unwrap();
    let config = BridgeConfig {
        ingest: Some(IngestConfig {
            url: format!("http://{addr}/memories"),
        }),
        ..config_for(addr, &dir)
    };
    config.validate().unwrap();
    let notifier = IngestNotifier::new(config.ingest.unwrap().url, Duration::from_secs(1));

    let entry = JournalEntry::new(
        chrono::Utc::now(),
        Verdict::Unhealthy,
        ProbeResult::failed("timeout"),
    );
    notifier.notify(entry.clone()).await.unwrap();

    let req = seen.recv().await.unwrap();
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/memories");
    let posted: JournalEntry = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(posted, entry);
}

#[tokio::test]
async fn ingest_notifier_rejects_error_status() {
    let (addr, _seen) = serve(vec![(500, "{}")]).await;
    let notifier = IngestNotifier::new(format!("http://{addr}/memories"), Duration::from_secs(1));
    let entry = JournalEntry::new(
        chrono::Utc::now(),
        Verdict::Healthy,
        ProbeResult::available(true),
    );
    let err = notifier.notify(entry).await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn monitor_run_loop_polls_until_shutdown() {
    let (addr, _seen) = serve(vec![(200, r#"{"db_available": true}"#)]).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(addr, &dir);
    let monitor = Monitor::from_config(&config);
    let (tx, rx) = tokio::sync::watch::channel(false);

    let handle = tokio::spawn(monitor.run(rx));
    tokio::time::sleep(Duration::from_millis(150)).await;
    tx.send(true).unwrap();
    handle.await.unwrap().unwrap();

    let entries = JournalStore::new(&config.journal_path).load().unwrap();
    assert!(entries.len() >= 2, "expected several cycles, got {}", entries.len());
    assert!(entries.iter().all(|e| e.verdict == Verdict::Healthy));
}
