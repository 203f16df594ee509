//! End-to-end pipeline scenarios
//!
//! The pool is driven through a channel-fed stub consumer and posts into a
//! raw-TCP HTTP sink stub that records bodies, counts hits, and tracks how
//! many requests overlap.

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use dustdevil_config::Config;
use dustdevil_engine::{
    Commit, Consumer, Dispatcher, EngineError, Pool, PostError, Transport,
};
use dustdevil_wire::{MetricBatch, MetricElastic};

/// The canonical happy-path batch payload
const WIRE_SAMPLE: &str = r#"{"host_id":7,"protocol":1,"data":[{"time":"2020-01-01T00:00:00Z","float_metrics":[{"metric":"cpu","subtype":"","value":0.5}],"int_metrics":[],"string_metrics":[]}]}"#;

// =============================================================================
// HTTP sink stub
// =============================================================================

#[derive(Default)]
struct SinkState {
    bodies: Mutex<Vec<Vec<u8>>>,
    hits: AtomicUsize,
    concurrent: AtomicUsize,
    max_concurrent: AtomicUsize,
}

impl SinkState {
    fn bodies(&self) -> Vec<Vec<u8>> {
        self.bodies.lock().unwrap().clone()
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }
}

/// Start a sink answering every request with `status` after `delay`
async fn spawn_sink(status: u16, delay: Duration) -> (String, Arc<SinkState>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind sink stub");
    let addr = listener.local_addr().expect("failed to get sink addr");
    let state = Arc::new(SinkState::default());

    let accept_state = Arc::clone(&state);
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let state = Arc::clone(&accept_state);
            tokio::spawn(async move {
                serve_request(socket, state, status, delay).await;
            });
        }
    });

    (format!("http://{}/metrics", addr), state)
}

async fn serve_request(
    mut socket: TcpStream,
    state: Arc<SinkState>,
    status: u16,
    delay: Duration,
) {
    let Some(body) = read_request(&mut socket).await else {
        return;
    };

    let now = state.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_concurrent.fetch_max(now, Ordering::SeqCst);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    state.concurrent.fetch_sub(1, Ordering::SeqCst);

    state.hits.fetch_add(1, Ordering::SeqCst);
    state.bodies.lock().unwrap().push(body);

    let reason = match status {
        200 => "OK",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        status, reason
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Minimal HTTP/1.1 request reader: headers, then a Content-Length body
async fn read_request(socket: &mut TcpStream) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let headers_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let headers = String::from_utf8_lossy(&buf[..headers_end]).to_string();
    let content_length = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    let body_start = headers_end + 4;
    while buf.len() < body_start + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(buf[body_start..body_start + content_length].to_vec())
}

// =============================================================================
// Consumer stub
// =============================================================================

struct StubMessage {
    partition: i32,
    offset: i64,
    host_id: i64,
    payload: &'static str,
}

struct StubConsumer {
    messages: Vec<StubMessage>,
    commit_tx: mpsc::Sender<Commit>,
}

#[async_trait]
impl Consumer for StubConsumer {
    async fn run(
        self,
        dispatcher: Dispatcher,
        shutdown: CancellationToken,
        _death: mpsc::Sender<EngineError>,
    ) {
        for m in self.messages {
            let msg = Transport::new(
                "metrics",
                m.partition,
                m.offset,
                m.host_id,
                Some(m.payload.as_bytes().to_vec()),
                self.commit_tx.clone(),
            );
            if dispatcher.dispatch(msg).await.is_err() {
                return;
            }
        }

        // the real consumer stays up until asked to stop
        shutdown.cancelled().await;
    }
}

// =============================================================================
// Harness
// =============================================================================

fn pool_config(endpoint: &str, extra: &str) -> Arc<Config> {
    let toml = format!(
        r#"
[forwarder]
endpoint = "{endpoint}"
workers = 2
handler_queue_length = 16
request_timeout = 2000
retry_count = 0
retry_min_wait_time = 1
retry_max_wait_time = 10
{extra}
"#
    );
    Arc::new(Config::from_str(&toml).expect("test config must be valid"))
}

struct Run {
    runner: tokio::task::JoinHandle<Result<(), EngineError>>,
    shutdown: CancellationToken,
    commit_rx: mpsc::Receiver<Commit>,
}

fn start_pool(config: Arc<Config>, messages: Vec<StubMessage>) -> Run {
    let (commit_tx, commit_rx) = mpsc::channel(64);
    let consumer = StubConsumer {
        messages,
        commit_tx,
    };

    let pool = Pool::new(config);
    let shutdown = CancellationToken::new();
    let runner = tokio::spawn(pool.run(consumer, shutdown.clone()));

    Run {
        runner,
        shutdown,
        commit_rx,
    }
}

async fn expect_commits(rx: &mut mpsc::Receiver<Commit>, count: usize) -> Vec<Commit> {
    let mut commits = Vec::with_capacity(count);
    for _ in 0..count {
        let commit = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("commit must arrive in time")
            .expect("commit channel closed early");
        commits.push(commit);
    }
    commits
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_happy_path_batch_forwards_and_commits() {
    let (endpoint, sink) = spawn_sink(200, Duration::ZERO).await;
    let config = pool_config(&endpoint, "");

    let mut run = start_pool(
        Arc::clone(&config),
        vec![StubMessage {
            partition: 2,
            offset: 17,
            host_id: 7,
            payload: WIRE_SAMPLE,
        }],
    );

    let commits = expect_commits(&mut run.commit_rx, 1).await;
    assert_eq!(
        commits[0],
        Commit {
            topic: "metrics".to_string(),
            partition: 2,
            offset: 17,
        }
    );

    run.shutdown.cancel();
    run.runner
        .await
        .unwrap()
        .expect("pool must shut down cleanly");

    // the sink received the identical body, exactly once
    let bodies = sink.bodies();
    assert_eq!(bodies.len(), 1);
    assert_eq!(String::from_utf8_lossy(&bodies[0]), WIRE_SAMPLE);
}

#[tokio::test]
async fn test_strip_string_metrics_on_outbound_body() {
    let (endpoint, sink) = spawn_sink(200, Duration::ZERO).await;
    let config = pool_config(&endpoint, "strip_string_metrics = true");

    const WITH_STRINGS: &str = r#"{"host_id":7,"protocol":1,"data":[{"time":"2020-01-01T00:00:00Z","float_metrics":[{"metric":"cpu","subtype":"","value":0.5}],"int_metrics":[],"string_metrics":[{"metric":"x","subtype":"","value":"y"}]}]}"#;

    let mut run = start_pool(
        config,
        vec![StubMessage {
            partition: 0,
            offset: 1,
            host_id: 7,
            payload: WITH_STRINGS,
        }],
    );

    expect_commits(&mut run.commit_rx, 1).await;
    run.shutdown.cancel();
    run.runner.await.unwrap().unwrap();

    let bodies = sink.bodies();
    assert_eq!(bodies.len(), 1);

    let batch: MetricBatch = serde_json::from_slice(&bodies[0]).unwrap();
    assert!(batch.data.iter().all(|d| d.string_metrics.is_empty()));
    // the float metric survived
    assert_eq!(batch.data[0].float_metrics.len(), 1);
}

#[tokio::test]
async fn test_split_reassembly_releases_one_batch() {
    let (endpoint, sink) = spawn_sink(200, Duration::ZERO).await;
    let config = pool_config(
        &endpoint,
        "input_format = \"split\"\nrelease_interval = 200",
    );

    let fragments = vec![
        StubMessage {
            partition: 0,
            offset: 1,
            host_id: 42,
            payload: r#"{"host_id":42,"ts":"2020-01-01T00:00:00Z","path":"a","type":"real","tags":["t1"],"val":{"flp":1.5}}"#,
        },
        StubMessage {
            partition: 0,
            offset: 2,
            host_id: 42,
            payload: r#"{"host_id":42,"ts":"2020-01-01T00:00:00Z","path":"b","type":"integer","tags":[],"val":{"int":9}}"#,
        },
        StubMessage {
            partition: 0,
            offset: 3,
            host_id: 42,
            payload: r#"{"host_id":42,"ts":"2020-01-01T00:00:00Z","path":"c","type":"string","tags":["t2"],"val":{"str":"hi"}}"#,
        },
    ];

    let mut run = start_pool(config, fragments);

    // all three fragments commit once the release cycle forwarded the batch
    let mut commits = expect_commits(&mut run.commit_rx, 3).await;
    commits.sort_by_key(|c| c.offset);
    assert_eq!(
        commits.iter().map(|c| c.offset).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    run.shutdown.cancel();
    run.runner.await.unwrap().unwrap();

    let bodies = sink.bodies();
    assert_eq!(bodies.len(), 1, "one release, one batch");

    let batch: MetricBatch = serde_json::from_slice(&bodies[0]).unwrap();
    assert_eq!(batch.host_id, 42);
    assert_eq!(batch.protocol, 1);
    assert_eq!(batch.data.len(), 1);

    let data = &batch.data[0];
    assert_eq!(data.float_metrics.len(), 1);
    assert_eq!(data.float_metrics[0].metric, "a");
    assert_eq!(data.float_metrics[0].subtype, "t1");
    assert_eq!(data.float_metrics[0].value, 1.5);
    assert_eq!(data.int_metrics.len(), 1);
    assert_eq!(data.int_metrics[0].metric, "b");
    assert_eq!(data.int_metrics[0].subtype, "");
    assert_eq!(data.int_metrics[0].value, 9);
    assert_eq!(data.string_metrics.len(), 1);
    assert_eq!(data.string_metrics[0].metric, "c");
    assert_eq!(data.string_metrics[0].subtype, "t2");
    assert_eq!(data.string_metrics[0].value, "hi");
}

#[tokio::test]
async fn test_split_with_strip_commits_string_fragment_without_forwarding() {
    let (endpoint, sink) = spawn_sink(200, Duration::ZERO).await;
    let config = pool_config(
        &endpoint,
        "input_format = \"split\"\nrelease_interval = 200\nstrip_string_metrics = true",
    );

    let fragments = vec![
        // string fragment first: it must commit without waiting for a release
        StubMessage {
            partition: 0,
            offset: 3,
            host_id: 42,
            payload: r#"{"host_id":42,"ts":"2020-01-01T00:00:00Z","path":"c","type":"string","tags":["t2"],"val":{"str":"hi"}}"#,
        },
        StubMessage {
            partition: 0,
            offset: 1,
            host_id: 42,
            payload: r#"{"host_id":42,"ts":"2020-01-01T00:00:00Z","path":"a","type":"real","tags":["t1"],"val":{"flp":1.5}}"#,
        },
        StubMessage {
            partition: 0,
            offset: 2,
            host_id: 42,
            payload: r#"{"host_id":42,"ts":"2020-01-01T00:00:00Z","path":"b","type":"integer","tags":[],"val":{"int":9}}"#,
        },
    ];

    let mut run = start_pool(config, fragments);

    let mut commits = expect_commits(&mut run.commit_rx, 3).await;
    commits.sort_by_key(|c| c.offset);
    assert_eq!(
        commits.iter().map(|c| c.offset).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    run.shutdown.cancel();
    run.runner.await.unwrap().unwrap();

    let bodies = sink.bodies();
    assert_eq!(bodies.len(), 1);

    let batch: MetricBatch = serde_json::from_slice(&bodies[0]).unwrap();
    assert!(batch.data.iter().all(|d| d.string_metrics.is_empty()));
    assert_eq!(batch.data[0].float_metrics.len(), 1);
    assert_eq!(batch.data[0].int_metrics.len(), 1);
}

#[tokio::test]
async fn test_elastic_mode_posts_flat_documents() {
    let (endpoint, sink) = spawn_sink(200, Duration::ZERO).await;
    let config = pool_config(&endpoint, "forward_elastic = true");

    const TWO_METRICS: &str = r#"{"host_id":7,"protocol":1,"data":[{"time":"2020-01-01T00:00:00Z","float_metrics":[{"metric":"cpu","subtype":"","value":0.5}],"int_metrics":[{"metric":"mem","subtype":"","value":1024}],"string_metrics":[]}]}"#;

    let mut run = start_pool(
        config,
        vec![StubMessage {
            partition: 0,
            offset: 5,
            host_id: 7,
            payload: TWO_METRICS,
        }],
    );

    // one commit for the whole message, after every document went through
    let commits = expect_commits(&mut run.commit_rx, 1).await;
    assert_eq!(commits[0].offset, 5);

    run.shutdown.cancel();
    run.runner.await.unwrap().unwrap();

    let bodies = sink.bodies();
    assert_eq!(bodies.len(), 2, "one POST per flattened document");

    let mut docs: Vec<MetricElastic> = bodies
        .iter()
        .map(|b| serde_json::from_slice(b).unwrap())
        .collect();
    docs.sort_by(|a, b| a.metric.cmp(&b.metric));
    assert_eq!(docs[0].metric, "cpu");
    assert_eq!(docs[0].value_type, "real");
    assert_eq!(docs[1].metric, "mem");
    assert_eq!(docs[1].value_type, "integer");
    assert!(docs.iter().all(|d| d.host_id == 7));
}

#[tokio::test]
async fn test_elastic_mode_with_strip_has_no_string_documents() {
    let (endpoint, sink) = spawn_sink(200, Duration::ZERO).await;
    let config = pool_config(
        &endpoint,
        "forward_elastic = true\nstrip_string_metrics = true",
    );

    const WITH_STRINGS: &str = r#"{"host_id":7,"protocol":1,"data":[{"time":"2020-01-01T00:00:00Z","float_metrics":[{"metric":"cpu","subtype":"","value":0.5}],"int_metrics":[],"string_metrics":[{"metric":"os","subtype":"","value":"linux"}]}]}"#;

    let mut run = start_pool(
        config,
        vec![StubMessage {
            partition: 0,
            offset: 1,
            host_id: 7,
            payload: WITH_STRINGS,
        }],
    );

    expect_commits(&mut run.commit_rx, 1).await;
    run.shutdown.cancel();
    run.runner.await.unwrap().unwrap();

    // stripping happens before the conversion: only the float document
    let bodies = sink.bodies();
    assert_eq!(bodies.len(), 1);
    let doc: MetricElastic = serde_json::from_slice(&bodies[0]).unwrap();
    assert_eq!(doc.value_type, "real");
}

#[tokio::test]
async fn test_persistent_503_is_fatal_and_commits_nothing() {
    let (endpoint, sink) = spawn_sink(503, Duration::ZERO).await;
    let config = pool_config(&endpoint, "");

    let mut run = start_pool(
        config,
        vec![StubMessage {
            partition: 0,
            offset: 1,
            host_id: 7,
            payload: WIRE_SAMPLE,
        }],
    );

    // the pool dies on its own: no external cancellation
    let result = tokio::time::timeout(Duration::from_secs(10), run.runner)
        .await
        .expect("pool must die on a failing sink")
        .unwrap();

    match result {
        Err(EngineError::Post(PostError::Status { status })) => assert_eq!(status, 503),
        other => panic!("expected a status error, got {:?}", other),
    }

    // no commit was emitted for the failed message
    assert!(run.commit_rx.try_recv().is_err());
    assert!(sink.hits() >= 1);
}

#[tokio::test]
async fn test_concurrency_never_exceeds_limit() {
    let (endpoint, sink) = spawn_sink(200, Duration::from_millis(100)).await;
    let config = pool_config(&endpoint, "concurrency_limit = 2");

    let messages = (0..10)
        .map(|i| StubMessage {
            partition: i,
            offset: i as i64,
            host_id: 7,
            payload: WIRE_SAMPLE,
        })
        .collect();

    let mut run = start_pool(config, messages);

    expect_commits(&mut run.commit_rx, 10).await;
    run.shutdown.cancel();
    run.runner.await.unwrap().unwrap();

    assert_eq!(sink.hits(), 10);
    assert!(
        sink.max_concurrent() <= 2,
        "observed {} overlapping requests",
        sink.max_concurrent()
    );
}

#[tokio::test]
async fn test_shutdown_drains_queued_messages() {
    let (endpoint, sink) = spawn_sink(200, Duration::from_millis(50)).await;
    let config = pool_config(&endpoint, "concurrency_limit = 1\nworkers = 1");

    let messages = (0..5)
        .map(|i| StubMessage {
            partition: 0,
            offset: i,
            host_id: 7,
            payload: WIRE_SAMPLE,
        })
        .collect();

    let mut run = start_pool(config, messages);

    // let processing begin, then request shutdown while messages are queued
    while sink.hits() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    run.shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(10), run.runner)
        .await
        .expect("drain must finish")
        .unwrap()
        .expect("clean shutdown");

    // every queued message was processed and committed before exit
    assert_eq!(sink.hits(), 5);
    let commits = expect_commits(&mut run.commit_rx, 5).await;
    assert_eq!(commits.len(), 5);
}
