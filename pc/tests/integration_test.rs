//! Integration tests for preemption coordination
//!
//! These tests run whole worker groups in-process and drive the HTTP client
//! against a minimal fake master.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use preemption::{
    Config, ControlPlane, DistributedContext, HttpControlPlane, LocalContext, LocalGroup, PreemptMode, Preemption,
    PreemptionCoordinator, PreemptionError, SignalError, WatcherConfig, create_preemption,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// =============================================================================
// Helpers
// =============================================================================

/// Master that answers polls from a script and then holds every later poll open
struct ScriptedMaster {
    script: Mutex<VecDeque<bool>>,
    polls: AtomicUsize,
    acks: AtomicUsize,
}

impl ScriptedMaster {
    fn new(script: Vec<bool>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            polls: AtomicUsize::new(0),
            acks: AtomicUsize::new(0),
        })
    }

    fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn acks(&self) -> usize {
        self.acks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlPlane for ScriptedMaster {
    async fn get_preemption(&self, _: &str, _: u64, _: Duration) -> Result<bool, SignalError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(preempt) => Ok(preempt),
            None => std::future::pending().await,
        }
    }

    async fn ack_preemption(&self, _: &str) -> Result<(), SignalError> {
        self.acks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Build a coordinator per rank; the chief talks to `chief_master`, the rest to `worker_master`
fn coordinators(
    group: Vec<LocalContext>,
    chief_master: Arc<ScriptedMaster>,
    worker_master: Arc<ScriptedMaster>,
    mode: PreemptMode,
) -> Vec<(Arc<LocalContext>, PreemptionCoordinator)> {
    group
        .into_iter()
        .map(|ctx| {
            let ctx = Arc::new(ctx);
            let master: Arc<dyn ControlPlane> = if ctx.is_chief() {
                chief_master.clone()
            } else {
                worker_master.clone()
            };
            let coordinator = PreemptionCoordinator::new(master, "alloc-1", ctx.clone(), mode, WatcherConfig::default());
            (ctx, coordinator)
        })
        .collect()
}

// =============================================================================
// Worker group tests
// =============================================================================

#[tokio::test]
async fn test_workers_ask_chief_fans_out_decision() {
    let chief_master = ScriptedMaster::new(vec![true]);
    let worker_master = ScriptedMaster::new(vec![]);
    let group = coordinators(
        LocalGroup::new(4),
        chief_master.clone(),
        worker_master.clone(),
        PreemptMode::WorkersAskChief,
    );

    let handles: Vec<_> = group
        .into_iter()
        .map(|(ctx, mut coordinator)| {
            tokio::spawn(async move {
                coordinator.start().unwrap();
                let out = coordinator.should_preempt(true).await.unwrap();
                coordinator.close().await;
                (ctx.rank(), out, ctx.broadcast_count())
            })
        })
        .collect();

    let results = tokio::time::timeout(Duration::from_secs(5), futures::future::join_all(handles))
        .await
        .expect("all ranks should finish the step");

    for result in results {
        let (rank, out, broadcasts) = result.unwrap();
        assert!(out, "rank {} should see the chief's decision", rank);
        assert_eq!(broadcasts, 1);
    }
    assert_eq!(chief_master.polls(), 1);
    assert_eq!(chief_master.acks(), 1);
    assert_eq!(worker_master.polls(), 0);
    assert_eq!(worker_master.acks(), 0);
}

#[tokio::test]
async fn test_workers_ask_chief_lockstep_over_many_steps() {
    let chief_master = ScriptedMaster::new(vec![false, false, true]);
    let worker_master = ScriptedMaster::new(vec![]);
    let group = coordinators(
        LocalGroup::new(3),
        chief_master.clone(),
        worker_master.clone(),
        PreemptMode::WorkersAskChief,
    );

    let handles: Vec<_> = group
        .into_iter()
        .map(|(_, mut coordinator)| {
            tokio::spawn(async move {
                coordinator.start().unwrap();
                let mut decisions = Vec::new();
                for _ in 0..20 {
                    decisions.push(coordinator.should_preempt(true).await.unwrap());
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
                coordinator.close().await;
                decisions
            })
        })
        .collect();

    let results: Vec<Vec<bool>> = tokio::time::timeout(Duration::from_secs(5), futures::future::join_all(handles))
        .await
        .expect("all ranks should finish")
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    for decisions in &results[1..] {
        assert_eq!(decisions, &results[0]);
    }
    // Once true, always true
    let first_true = results[0]
        .iter()
        .position(|d| *d)
        .expect("chief should observe the preemption signal");
    assert!(results[0][first_true..].iter().all(|d| *d));
    assert_eq!(results[0].last(), Some(&true));
    assert_eq!(chief_master.acks(), 1);
    assert_eq!(worker_master.polls(), 0);
}

#[tokio::test]
async fn test_chief_only_worker_call_fails_without_broadcast() {
    let chief_master = ScriptedMaster::new(vec![false]);
    let worker_master = ScriptedMaster::new(vec![]);
    let mut group = coordinators(LocalGroup::new(2), chief_master, worker_master.clone(), PreemptMode::ChiefOnly);

    let (ctx, mut worker) = group.remove(1);
    worker.start().unwrap();
    let err = worker.should_preempt(true).await.unwrap_err();

    assert!(matches!(err, PreemptionError::ChiefOnly { rank: 1 }));
    assert!(err.to_string().contains("rank=1"));
    assert_eq!(ctx.broadcast_count(), 0);
    assert_eq!(worker_master.polls(), 0);
}

#[tokio::test]
async fn test_null_coordinator_keeps_broadcast_parity() {
    let config = Config {
        managed: false,
        ..Default::default()
    };

    let handles: Vec<_> = LocalGroup::new(4)
        .into_iter()
        .map(|ctx| {
            let ctx = Arc::new(ctx);
            let mut preemption = create_preemption(&config, ctx.clone()).unwrap();
            tokio::spawn(async move {
                preemption.start().unwrap();
                let mut decisions = Vec::new();
                for _ in 0..3 {
                    decisions.push(preemption.should_preempt(true).await.unwrap());
                }
                preemption.acknowledge_preemption_signal().await.unwrap();
                preemption.close().await;
                (decisions, ctx.broadcast_count())
            })
        })
        .collect();

    let results = tokio::time::timeout(Duration::from_secs(5), futures::future::join_all(handles))
        .await
        .expect("null coordinators must not deadlock");

    for result in results {
        let (decisions, broadcasts) = result.unwrap();
        assert_eq!(decisions, vec![false, false, false]);
        assert_eq!(broadcasts, 3);
    }
}

// =============================================================================
// HTTP client tests
// =============================================================================

/// Minimal HTTP/1.1 master: answers each request with `respond(request_head)`
async fn fake_master<F>(respond: F) -> (String, Arc<Mutex<Vec<String>>>)
where
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let seen = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let seen = seen.clone();
            let respond = respond.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&buf).to_string();
                let (status, body) = respond(&head);
                seen.lock().unwrap().push(head);

                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}", addr), requests)
}

#[tokio::test]
async fn test_http_get_preemption() {
    let (url, requests) = fake_master(|_| (200, r#"{"preempt": true}"#.to_string())).await;
    let client = HttpControlPlane::new(url, Some("tok".to_string())).unwrap();

    let preempt = client
        .get_preemption("alloc-9", 0, Duration::from_secs(10))
        .await
        .unwrap();
    assert!(preempt);

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let head = requests[0].to_lowercase();
    assert!(head.starts_with("get /api/v1/allocations/alloc-9/signals/preemption?timeout_seconds=0 "));
    assert!(head.contains("authorization: bearer tok"));
}

#[tokio::test]
async fn test_http_ack_preemption() {
    let (url, requests) = fake_master(|_| (200, "{}".to_string())).await;
    let client = HttpControlPlane::new(url, None).unwrap();

    client.ack_preemption("alloc-9").await.unwrap();

    let requests = requests.lock().unwrap();
    assert!(requests[0].starts_with("POST /api/v1/allocations/alloc-9/signals/ack_preemption "));
}

#[tokio::test]
async fn test_http_error_status() {
    let (url, _) = fake_master(|_| (404, "allocation not found".to_string())).await;
    let client = HttpControlPlane::new(url, None).unwrap();

    let err = client
        .get_preemption("missing", 0, Duration::from_secs(10))
        .await
        .unwrap_err();
    match err {
        SignalError::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "allocation not found");
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_timeout_is_classified() {
    // Accepts connections but never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let client = HttpControlPlane::new(format!("http://{}", addr), None).unwrap();
    let err = client
        .get_preemption("alloc", 60, Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {:?}", err);
}

#[tokio::test]
async fn test_coordinator_over_http_acks_once() {
    let (url, requests) = fake_master(|head| {
        if head.starts_with("POST") {
            (200, "{}".to_string())
        } else {
            (200, r#"{"preempt": true}"#.to_string())
        }
    })
    .await;

    let master = Arc::new(HttpControlPlane::new(url, None).unwrap());
    let dist = Arc::new(LocalGroup::single());
    let mut coordinator =
        PreemptionCoordinator::new(master, "alloc-3", dist, PreemptMode::WorkersAskChief, WatcherConfig::default());
    coordinator.start().unwrap();

    for _ in 0..3 {
        assert!(coordinator.should_preempt(true).await.unwrap());
    }
    coordinator.close().await;

    let requests = requests.lock().unwrap();
    let acks = requests.iter().filter(|r| r.starts_with("POST")).count();
    let polls = requests.iter().filter(|r| r.starts_with("GET")).count();
    assert_eq!(acks, 1);
    assert_eq!(polls, 1);
}
