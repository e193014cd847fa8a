use passman_core::codec::{decode, encode};
use passman_core::protocol::{GetRequest, OpResult};
use passman_core::{Dispatcher, Entry, Envelope, Request, Response, VaultClient, VaultError, VaultServer, VaultStore};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

struct Harness {
    _dir: TempDir,
    socket: PathBuf,
    client: VaultClient,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn start() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("passmand.sock");
    let store = Arc::new(VaultStore::open(&dir.path().join("passman.db")).unwrap());
    let server = VaultServer::new(socket.clone(), Arc::new(Dispatcher::new(store)));
    let listener = server.bind().unwrap();
    let task = tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    Harness {
        client: VaultClient::new(socket.clone()),
        socket,
        _dir: dir,
        task,
    }
}

async fn raw_exchange(socket: &PathBuf, bytes: &[u8]) -> Vec<u8> {
    let mut stream = UnixStream::connect(socket).await.unwrap();
    stream.write_all(bytes).await.unwrap();
    stream.shutdown().await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    out
}

#[tokio::test(flavor = "multi_thread")]
async fn full_lifecycle_over_socket() {
    let h = start().await;
    let c = &h.client;

    c.add(Entry::new("github", "alice", "p1").with_notes("work")).await.unwrap();

    let all = c.list(None).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].service, "github");
    assert_eq!(all[0].username, "alice");
    assert_eq!(all[0].password, "p1");
    assert_eq!(all[0].notes.as_deref(), Some("work"));

    c.update("github", "alice", "p2", Some(String::new())).await.unwrap();
    let got = c.get("github", "alice").await.unwrap();
    assert_eq!(got.password, "p2");
    assert_eq!(got.notes.as_deref(), Some(""));

    c.delete("github", "alice").await.unwrap();
    assert!(matches!(
        c.get("github", "alice").await,
        Err(VaultError::NotFound { .. })
    ));
    // idempotent
    c.delete("github", "alice").await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_same_key() {
    let h = start().await;
    let first = h.client.clone();
    let second = h.client.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { first.add(Entry::new("x", "y", "one")).await }),
        tokio::spawn(async move { second.add(Entry::new("x", "y", "two")).await }),
    );
    let results = [a.unwrap(), b.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    match failure {
        VaultError::Rejected(msg) => assert!(msg.contains("already exists")),
        other => panic!("unexpected error {other:?}"),
    }

    let rows = h.client.list(Some("x".into())).await.unwrap();
    assert_eq!(rows.iter().filter(|e| e.service == "x" && e.username == "y").count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_adds_one_winner() {
    let h = start().await;
    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let client = h.client.clone();
            tokio::spawn(async move { client.add(Entry::new("race", "key", format!("pw{i}"))).await })
        })
        .collect();
    let mut wins = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(h.client.list(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn list_order_and_filter() {
    let h = start().await;
    for (service, user) in [("mail", "bob"), ("github", "alice"), ("gitlab", "carol")] {
        h.client.add(Entry::new(service, user, "pw")).await.unwrap();
    }
    let services: Vec<_> = h
        .client
        .list(Some(String::new()))
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.service)
        .collect();
    assert_eq!(services, vec!["mail", "github", "gitlab"]);

    let git: Vec<_> = h
        .client
        .list(Some("git".into()))
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.username)
        .collect();
    assert_eq!(git, vec!["alice", "carol"]);
}

#[tokio::test]
async fn update_missing_is_rejected() {
    let h = start().await;
    let err = h.client.update("nope", "nobody", "pw", None).await.unwrap_err();
    assert!(matches!(err, VaultError::Rejected(_)));
}

#[tokio::test]
async fn lock_blocks_until_unlocked() {
    let h = start().await;
    h.client.add(Entry::new("a", "b", "c")).await.unwrap();
    h.client.lock("master").await.unwrap();

    assert!(matches!(
        h.client.add(Entry::new("d", "e", "f")).await,
        Err(VaultError::Rejected(msg)) if msg == "vault is locked"
    ));
    // Get has no error-carrying shape: the daemon hangs up
    assert!(matches!(
        h.client.get("a", "b").await,
        Err(VaultError::UnexpectedResponse(_))
    ));
    assert!(h.client.unlock("wrong").await.is_err());

    h.client.unlock("master").await.unwrap();
    assert_eq!(h.client.get("a", "b").await.unwrap().password, "c");
}

#[tokio::test]
async fn malformed_bytes_get_no_reply() {
    let h = start().await;
    assert!(raw_exchange(&h.socket, b"garbage\n").await.is_empty());
    assert!(raw_exchange(&h.socket, br#"{"kind":"request","body":{"type":"export","payload":{}}}"#).await.is_empty());
    // the daemon keeps serving
    h.client.add(Entry::new("still", "alive", "")).await.unwrap();
}

#[tokio::test]
async fn empty_connection_is_harmless() {
    let h = start().await;
    assert!(raw_exchange(&h.socket, b"").await.is_empty());
    assert!(h.client.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn raw_envelope_round_trip() {
    let h = start().await;
    let req = Envelope::Request(Request::Get(GetRequest {
        service: "none".into(),
        username: "none".into(),
    }));
    let out = raw_exchange(&h.socket, &encode(&req).unwrap()).await;
    match decode(&out).unwrap() {
        Envelope::Response(Response::GetResult(r)) => assert!(!r.found),
        other => panic!("unexpected {other:?}"),
    }

    let bogus = Envelope::Response(Response::AddResult(OpResult::ok()));
    assert!(raw_exchange(&h.socket, &encode(&bogus).unwrap()).await.is_empty());
}

#[tokio::test]
async fn bind_replaces_stale_socket_file() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("passmand.sock");
    std::fs::write(&socket, b"stale").unwrap();
    let store = Arc::new(VaultStore::open_in_memory().unwrap());
    let server = VaultServer::new(socket.clone(), Arc::new(Dispatcher::new(store)));
    let _listener = server.bind().unwrap();

    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(&socket).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
