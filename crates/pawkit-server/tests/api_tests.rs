//! End-to-end tests: the real client engine against the real server
//!
//! Each test binds the axum router on an ephemeral port and drives it with
//! the pawkit-core `ApiClient`/`SyncService`, so both sides of the wire
//! contract are exercised together.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use pawkit_core::api::ApiClient;
use pawkit_core::db::{Database, MetaStore, RecordStore};
use pawkit_core::models::{Card, DeviceSession, RecordKind};
use pawkit_core::sync::{SyncService, SyncStatus};
use pawkit_server::routes::{app_router, AppState};
use pawkit_server::store::SyncStore;
use pawkit_server::AppConfig;

const WS: &str = "ws-1";
const TOKEN: &str = "secret-token";

async fn spawn_server() -> String {
    let config = Arc::new(AppConfig {
        bind_addr: String::new(),
        db_path: None,
        workspace_tokens: HashMap::from([(WS.to_string(), TOKEN.to_string())]),
        session_ttl: Duration::from_secs(90),
        rate_limit_window: Duration::from_secs(60),
        write_rate_limit_per_window: 240,
    });

    let db = Arc::new(Database::open_in_memory().await.unwrap());
    let state = AppState::new(config, SyncStore::new(db));
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{addr}")
}

async fn client_service(base_url: &str) -> (Arc<Database>, SyncService) {
    let db = Arc::new(Database::open_in_memory().await.unwrap());
    let client = ApiClient::new(base_url, TOKEN).unwrap();
    let service = SyncService::new(Arc::clone(&db), client, WS);
    (db, service)
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_card_lands_on_server_with_same_id() {
    let base_url = spawn_server().await;
    let (_db, svc) = client_service(&base_url).await;

    let record = svc
        .create(Card::url("Example", "https://example.com"))
        .await
        .unwrap();
    assert_eq!(svc.pending_count().await.unwrap(), 1);

    let report = svc.process_queue().await.unwrap();
    assert_eq!(report.sent, 1);
    assert_eq!(svc.pending_count().await.unwrap(), 0);
    assert_eq!(svc.status(), SyncStatus::Idle);

    // The server holds the card under the client-generated id
    let client = ApiClient::new(&base_url, TOKEN).unwrap();
    let on_server = client.pull_since(RecordKind::Card, 0).await.unwrap();
    assert_eq!(on_server.len(), 1);
    assert_eq!(on_server[0].id, record.id);
    assert_eq!(on_server[0].data["url"], "https://example.com");
}

#[tokio::test(flavor = "multi_thread")]
async fn queue_replay_matches_direct_application() {
    // Applying create, update, update through the queue must land the
    // same final record as the last direct write.
    let base_url = spawn_server().await;
    let (_db, svc) = client_service(&base_url).await;

    let record = svc.create(Card::note("Doc", "v1")).await.unwrap();
    svc.update(record.id, Card::note("Doc", "v2")).await.unwrap();
    let last = svc.update(record.id, Card::note("Doc", "v3")).await.unwrap();
    assert_eq!(svc.pending_count().await.unwrap(), 3);

    let report = svc.process_queue().await.unwrap();
    assert_eq!(report.sent, 3);

    let client = ApiClient::new(&base_url, TOKEN).unwrap();
    let on_server = client.pull_since(RecordKind::Card, 0).await.unwrap();
    assert_eq!(on_server.len(), 1);
    assert_eq!(on_server[0].data["notes"], "v3");
    assert_eq!(on_server[0].updated_at, last.updated_at);
}

#[tokio::test(flavor = "multi_thread")]
async fn second_device_receives_changes_via_delta_sync() {
    let base_url = spawn_server().await;
    let (_db_a, device_a) = client_service(&base_url).await;
    let (db_b, device_b) = client_service(&base_url).await;

    let record = device_a
        .create(Card::url("Shared", "https://example.com/shared"))
        .await
        .unwrap();
    device_a.process_queue().await.unwrap();

    let report = device_b.delta_sync().await.unwrap();
    assert_eq!(report.merged, 1);
    assert_eq!(report.checkpoint, record.updated_at);
    assert_eq!(
        MetaStore::new(db_b.connection()).checkpoint(WS).await.unwrap(),
        record.updated_at
    );

    let local = RecordStore::new(db_b.connection())
        .get(RecordKind::Card, &record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(local.data["title"], "Shared");
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_delete_propagates_to_trash() {
    let base_url = spawn_server().await;
    let (_db_a, device_a) = client_service(&base_url).await;
    let (db_b, device_b) = client_service(&base_url).await;

    let record = device_a.create(Card::note("Trash me", "x")).await.unwrap();
    device_a.process_queue().await.unwrap();
    device_b.delta_sync().await.unwrap();

    device_a.delete(RecordKind::Card, record.id).await.unwrap();
    device_a.process_queue().await.unwrap();
    device_b.delta_sync().await.unwrap();

    let store = RecordStore::new(db_b.connection());
    let local = store.get(RecordKind::Card, &record.id).await.unwrap().unwrap();
    assert!(local.deleted, "tombstone must propagate");
    assert!(store.list(RecordKind::Card, WS, 10).await.unwrap().is_empty());
    assert_eq!(store.list_trashed(RecordKind::Card, WS, 10).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn queued_edit_resurrects_remotely_deleted_record() {
    // Device B edits while offline; device A deletes first. B's edit is
    // newer, so once B drains, the record is undeleted server-side.
    let base_url = spawn_server().await;
    let (_db_a, device_a) = client_service(&base_url).await;
    let (_db_b, device_b) = client_service(&base_url).await;

    let record = device_a.create(Card::note("Contested", "v1")).await.unwrap();
    device_a.process_queue().await.unwrap();
    device_b.delta_sync().await.unwrap();

    // A deletes and syncs; B edits afterwards (strictly newer timestamp)
    device_a.delete(RecordKind::Card, record.id).await.unwrap();
    device_a.process_queue().await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    device_b
        .update(record.id, Card::note("Contested", "v2 from B"))
        .await
        .unwrap();
    device_b.process_queue().await.unwrap();

    let client = ApiClient::new(&base_url, TOKEN).unwrap();
    let on_server = client.pull_since(RecordKind::Card, 0).await.unwrap();
    assert_eq!(on_server.len(), 1);
    assert!(!on_server[0].deleted, "newer edit must resurrect the record");
    assert_eq!(on_server[0].data["notes"], "v2 from B");
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_token_gets_401_and_suspends_client() {
    let base_url = spawn_server().await;

    let db = Arc::new(Database::open_in_memory().await.unwrap());
    let client = ApiClient::new(&base_url, "wrong-token").unwrap();
    let svc = SyncService::new(db, client, WS);

    svc.create(Card::url("Example", "https://example.com"))
        .await
        .unwrap();

    let report = svc.process_queue().await.unwrap();
    assert!(report.auth_required);
    assert!(svc.is_suspended());
    // Entry preserved for after re-auth
    assert_eq!(svc.pending_count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn heartbeat_registers_active_session() {
    let base_url = spawn_server().await;
    let client = ApiClient::new(&base_url, TOKEN).unwrap();

    let session = DeviceSession::new("device-1", "session-1", "Laptop", "pawkit-cli", "linux");
    client.heartbeat(&session).await.unwrap();

    let active = client.active_sessions().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].session_id, "session-1");
    assert_eq!(active[0].device_name, "Laptop");
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_resource_is_rejected_not_retried() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base_url}/api/widgets"))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
