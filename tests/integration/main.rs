//! Integration tests for the offline agent

use async_trait::async_trait;
use offline_agent::cache::{CacheStore, MemoryCacheStore};
use offline_agent::config::Config;
use offline_agent::fetch::Fetcher;
use offline_agent::host::{AnalyticsSink, ClientHost};
use offline_agent::lifecycle::LifecycleState;
use offline_agent::notify::Notification;
use offline_agent::request::{Method, Request, RequestKey, RequestMode, Response};
use offline_agent::{Agent, AgentError, AgentResult, Event, EventOutcome};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

const SCOPE: &str = "https://portal.test/";

fn url(path: &str) -> Url {
    Url::parse(SCOPE).unwrap().join(path).unwrap()
}

fn key(path: &str) -> RequestKey {
    RequestKey::get(&url(path))
}

/// Serves registered URLs; unknown URLs and offline mode fail at transport
#[derive(Default)]
struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Response>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    fn with_routes(routes: &[(&str, &str)]) -> Arc<Self> {
        let fetcher = Self::default();
        {
            let mut map = fetcher.routes.lock().unwrap();
            for (path, body) in routes {
                let body = body.to_string();
                map.insert(
                    url(path).to_string(),
                    Response::ok(body).with_header("Content-Type", "text/plain"),
                );
            }
        }
        Arc::new(fetcher)
    }

    fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> AgentResult<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(AgentError::network(request.url.as_str(), "offline"));
        }
        self.routes
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| AgentError::network(request.url.as_str(), "connection reset"))
    }
}

/// Store operation, with the partition it touched when there is one
#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Keys,
    Has(String),
    Delete(String),
    MatchAny,
    MatchIn(String),
    Put(String),
    PutAll(String),
    EntriesIn(String),
}

/// Memory store that records every call and can refuse chosen deletions
#[derive(Default)]
struct RecordingStore {
    inner: MemoryCacheStore,
    ops: Mutex<Vec<Op>>,
    undeletable: HashSet<String>,
}

impl RecordingStore {
    async fn seeded(names: &[&str], undeletable: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryCacheStore::with_partitions(names.iter().copied()).await,
            ops: Mutex::new(Vec::new()),
            undeletable: undeletable.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn record(&self, op: Op) {
        self.ops.lock().unwrap().push(op);
    }

    fn take_ops(&self) -> Vec<Op> {
        std::mem::take(&mut *self.ops.lock().unwrap())
    }
}

#[async_trait]
impl CacheStore for RecordingStore {
    async fn keys(&self) -> AgentResult<Vec<String>> {
        self.record(Op::Keys);
        self.inner.keys().await
    }

    async fn has(&self, partition: &str) -> AgentResult<bool> {
        self.record(Op::Has(partition.to_string()));
        self.inner.has(partition).await
    }

    async fn delete(&self, partition: &str) -> AgentResult<bool> {
        self.record(Op::Delete(partition.to_string()));
        if self.undeletable.contains(partition) {
            return Err(AgentError::Store(format!("{} is locked", partition)));
        }
        self.inner.delete(partition).await
    }

    async fn match_any(&self, key: &RequestKey) -> AgentResult<Option<Response>> {
        self.record(Op::MatchAny);
        self.inner.match_any(key).await
    }

    async fn match_in(&self, partition: &str, key: &RequestKey) -> AgentResult<Option<Response>> {
        self.record(Op::MatchIn(partition.to_string()));
        self.inner.match_in(partition, key).await
    }

    async fn put(&self, partition: &str, key: RequestKey, response: Response) -> AgentResult<()> {
        self.record(Op::Put(partition.to_string()));
        self.inner.put(partition, key, response).await
    }

    async fn put_all(
        &self,
        partition: &str,
        entries: Vec<(RequestKey, Response)>,
    ) -> AgentResult<()> {
        self.record(Op::PutAll(partition.to_string()));
        self.inner.put_all(partition, entries).await
    }

    async fn entries_in(&self, partition: &str) -> AgentResult<Vec<RequestKey>> {
        self.record(Op::EntriesIn(partition.to_string()));
        self.inner.entries_in(partition).await
    }
}

#[derive(Default)]
struct RecordingHost {
    claims: AtomicUsize,
    windows: Mutex<Vec<Url>>,
    shown: Mutex<Vec<Notification>>,
    closed: Mutex<Vec<u64>>,
}

#[async_trait]
impl ClientHost for RecordingHost {
    async fn claim_clients(&self) -> AgentResult<()> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> AgentResult<()> {
        self.windows.lock().unwrap().push(url.clone());
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> AgentResult<()> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn close_notification(&self, id: u64) -> AgentResult<()> {
        self.closed.lock().unwrap().push(id);
        Ok(())
    }
}

#[derive(Default)]
struct CountingAnalytics {
    flushes: AtomicUsize,
}

#[async_trait]
impl AnalyticsSink for CountingAnalytics {
    async fn flush(&self) -> AgentResult<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn config(manifest: &[&str]) -> Config {
    let mut config = Config::default();
    config.scope.url = SCOPE.to_string();
    config.cache.family_prefix = "family-".to_string();
    config.cache.version = "v2-current".to_string();
    config.cache.media_partition = "media".to_string();
    config.manifest.assets = manifest.iter().map(|s| s.to_string()).collect();
    config
}

struct Harness {
    agent: Agent,
    store: Arc<RecordingStore>,
    fetcher: Arc<ScriptedFetcher>,
    host: Arc<RecordingHost>,
    analytics: Arc<CountingAnalytics>,
}

impl Harness {
    fn new(config: &Config, store: Arc<RecordingStore>, fetcher: Arc<ScriptedFetcher>) -> Self {
        let host = Arc::new(RecordingHost::default());
        let analytics = Arc::new(CountingAnalytics::default());
        let agent = Agent::new(
            config,
            store.clone(),
            fetcher.clone(),
            host.clone(),
            analytics.clone(),
        )
        .unwrap();
        Self {
            agent,
            store,
            fetcher,
            host,
            analytics,
        }
    }

    async fn fetch(&self, request: Request) -> EventOutcome {
        self.agent.dispatch(Event::Fetch(request)).await.unwrap()
    }
}

fn body_of(outcome: EventOutcome) -> Response {
    match outcome {
        EventOutcome::Respond(response) => response,
        other => panic!("expected a response, got {:?}", other),
    }
}

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn scenario_a_install_and_activate() {
        let store = RecordingStore::seeded(&[], &[]).await;
        let fetcher = ScriptedFetcher::with_routes(&[("./", "<html>"), ("./manifest.json", "{}")]);
        let h = Harness::new(&config(&["./", "./manifest.json"]), store, fetcher);

        assert_eq!(
            h.agent.dispatch(Event::Install).await.unwrap(),
            EventOutcome::Handled
        );
        assert_eq!(h.agent.lifecycle().state(), LifecycleState::Waiting);
        assert!(h.agent.lifecycle().ready_to_activate());

        h.agent.dispatch(Event::Activate).await.unwrap();

        assert_eq!(h.agent.lifecycle().state(), LifecycleState::Active);
        assert_eq!(h.store.inner.entries_in("family-v2-current").await.unwrap().len(), 2);
        assert_eq!(h.host.claims.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scenario_b_missing_asset_aborts_install() {
        let store = RecordingStore::seeded(&["family-v1"], &[]).await;
        let fetcher = ScriptedFetcher::with_routes(&[("./", "<html>")]);
        let h = Harness::new(&config(&["./", "./missing.js"]), store, fetcher);

        let err = h.agent.dispatch(Event::Install).await.unwrap_err();

        assert!(matches!(err, AgentError::InstallBatchFailure { .. }));
        assert!(err.to_string().contains("missing.js"));
        assert_eq!(h.agent.lifecycle().state(), LifecycleState::Redundant);
        assert!(!h.store.inner.has("family-v2-current").await.unwrap());
        // Previous version keeps serving
        assert!(h.store.inner.has("family-v1").await.unwrap());
        assert!(h.agent.dispatch(Event::Activate).await.is_err());
        assert_eq!(h.host.claims.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn scenario_f_only_stale_family_deleted() {
        let store =
            RecordingStore::seeded(&["family-v1", "family-v2-current", "media"], &[]).await;
        let fetcher = ScriptedFetcher::with_routes(&[("./", "<html>")]);
        let h = Harness::new(&config(&["./"]), store, fetcher);

        h.agent.dispatch(Event::Install).await.unwrap();
        h.agent.dispatch(Event::Activate).await.unwrap();

        assert_eq!(
            h.store.inner.keys().await.unwrap(),
            vec!["family-v2-current", "media"]
        );
    }

    #[tokio::test]
    async fn p1_install_is_idempotent() {
        let store = RecordingStore::seeded(&[], &[]).await;
        let fetcher = ScriptedFetcher::with_routes(&[("./", "<html>"), ("./manifest.json", "{}")]);
        let cfg = config(&["./", "./manifest.json", "./"]);

        let first = Harness::new(&cfg, store.clone(), fetcher.clone());
        first.agent.dispatch(Event::Install).await.unwrap();
        first.agent.dispatch(Event::Install).await.unwrap();

        let second = Harness::new(&cfg, store.clone(), fetcher);
        second.agent.dispatch(Event::Install).await.unwrap();

        assert_eq!(
            store.inner.entries_in("family-v2-current").await.unwrap(),
            vec![key("./"), key("./manifest.json")]
        );
    }

    #[tokio::test]
    async fn p2_one_live_version_after_activate() {
        let store = RecordingStore::seeded(
            &["family-v0", "media", "family-v1", "other-app-v1"],
            &[],
        )
        .await;
        let fetcher = ScriptedFetcher::with_routes(&[("./", "<html>")]);
        let h = Harness::new(&config(&["./"]), store, fetcher);

        h.agent.dispatch(Event::Install).await.unwrap();
        h.agent.dispatch(Event::Activate).await.unwrap();

        let keys = h.store.inner.keys().await.unwrap();
        let family: Vec<&String> = keys.iter().filter(|k| k.starts_with("family-")).collect();
        assert_eq!(family, vec!["family-v2-current"]);
        assert_eq!(keys.iter().filter(|k| *k == "media").count(), 1);
        assert!(keys.contains(&"other-app-v1".to_string()));
    }

    #[tokio::test]
    async fn delete_failure_does_not_block_cleanup_or_claim() {
        let store = RecordingStore::seeded(&["family-v0", "family-v1"], &["family-v0"]).await;
        let fetcher = ScriptedFetcher::with_routes(&[("./", "<html>")]);
        let h = Harness::new(&config(&["./"]), store, fetcher);
        h.agent.dispatch(Event::Install).await.unwrap();

        let report = h.agent.lifecycle().activate().await.unwrap();

        assert_eq!(report.failed, vec!["family-v0"]);
        assert_eq!(report.deleted, vec!["family-v1"]);
        assert_eq!(h.agent.lifecycle().state(), LifecycleState::Active);
        assert_eq!(h.host.claims.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_reinstall_keeps_existing_partition() {
        let store = RecordingStore::seeded(&[], &[]).await;
        let fetcher = ScriptedFetcher::with_routes(&[("./", "<html>")]);
        let h = Harness::new(&config(&["./"]), store, fetcher);
        h.agent.dispatch(Event::Install).await.unwrap();

        h.fetcher.go_offline();
        assert!(h.agent.dispatch(Event::Install).await.is_err());

        assert_eq!(
            h.store.inner.entries_in("family-v2-current").await.unwrap(),
            vec![key("./")]
        );
    }

    #[tokio::test]
    async fn redundant_version_cannot_reinstall() {
        let store = RecordingStore::seeded(&["family-v1"], &[]).await;
        let fetcher = ScriptedFetcher::with_routes(&[("./", "<html>")]);
        let h = Harness::new(&config(&["./", "./missing.js"]), store, fetcher);
        assert!(h.agent.dispatch(Event::Install).await.is_err());

        // Network recovers; the failed version must still never go live
        h.fetcher
            .routes
            .lock()
            .unwrap()
            .insert(url("./missing.js").to_string(), Response::ok("js"));

        let err = h.agent.dispatch(Event::Install).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidTransition { .. }));
        assert!(h.agent.dispatch(Event::Activate).await.is_err());

        assert_eq!(h.agent.lifecycle().state(), LifecycleState::Redundant);
        assert_eq!(h.store.inner.keys().await.unwrap(), vec!["family-v1"]);
        assert_eq!(h.host.claims.load(Ordering::SeqCst), 0);
    }
}

mod fetch_tests {
    use super::*;

    #[tokio::test]
    async fn scenario_c_media_cached_on_demand() {
        let store = RecordingStore::seeded(&[], &[]).await;
        let fetcher = ScriptedFetcher::with_routes(&[("./song.mp3", "ID3-audio-bytes")]);
        let h = Harness::new(&config(&[]), store, fetcher);

        let first = body_of(h.fetch(Request::get(url("./song.mp3"))).await);
        assert_eq!(first.body, "ID3-audio-bytes");
        assert_eq!(h.fetcher.calls(), 1);
        assert_eq!(
            h.store.inner.entries_in("media").await.unwrap(),
            vec![key("./song.mp3")]
        );

        let second = body_of(h.fetch(Request::get(url("./song.mp3"))).await);
        assert_eq!(second, first);
        assert_eq!(h.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn scenario_d_media_offline() {
        let store = RecordingStore::seeded(&[], &[]).await;
        let fetcher = ScriptedFetcher::with_routes(&[]);
        fetcher.go_offline();
        let h = Harness::new(&config(&[]), store, fetcher);

        let response = body_of(h.fetch(Request::get(url("./song.mp3"))).await);

        assert_eq!(response.status, 503);
        assert_eq!(response.body, "Audio unavailable offline");
        assert_eq!(h.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn scenario_e_offline_navigation_gets_root_document() {
        let store = RecordingStore::seeded(&[], &[]).await;
        let fetcher = ScriptedFetcher::with_routes(&[("./", "<html>app shell</html>")]);
        let h = Harness::new(&config(&["./"]), store, fetcher);
        h.agent.dispatch(Event::Install).await.unwrap();
        h.agent.dispatch(Event::Activate).await.unwrap();
        h.fetcher.go_offline();

        let response = body_of(h.fetch(Request::navigate(url("/some/deep/route"))).await);

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "<html>app shell</html>");
    }

    #[tokio::test]
    async fn offline_subresource_gets_generic_503() {
        let store = RecordingStore::seeded(&[], &[]).await;
        let fetcher = ScriptedFetcher::with_routes(&[]);
        fetcher.go_offline();
        let h = Harness::new(&config(&[]), store, fetcher);

        let response = body_of(h.fetch(Request::get(url("./app.js"))).await);

        assert_eq!(response.status, 503);
        assert_eq!(response.status_text, "Service Unavailable");
        assert_eq!(response.body, "Offline");
    }

    #[tokio::test]
    async fn p3_cache_hit_skips_network() {
        let store = RecordingStore::seeded(&[], &[]).await;
        let stored = Response::new(200, "OK", vec![0u8, 159, 146, 150])
            .with_header("ETag", "\"abc\"");
        store
            .inner
            .put("family-v1", key("./three.min.js"), stored.clone())
            .await
            .unwrap();
        let fetcher = ScriptedFetcher::with_routes(&[("./three.min.js", "fresh")]);
        let h = Harness::new(&config(&[]), store, fetcher);

        let response = body_of(h.fetch(Request::get(url("./three.min.js"))).await);

        assert_eq!(response, stored);
        assert_eq!(h.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn network_fill_is_visible_to_next_read() {
        let store = RecordingStore::seeded(&[], &[]).await;
        let fetcher = ScriptedFetcher::with_routes(&[("./app.js", "console.log(1)")]);
        let h = Harness::new(&config(&[]), store, fetcher);

        h.fetch(Request::get(url("./app.js"))).await;
        h.fetch(Request::get(url("./app.js"))).await;

        assert_eq!(h.fetcher.calls(), 1);
        assert_eq!(
            h.store.inner.entries_in("family-v2-current").await.unwrap(),
            vec![key("./app.js")]
        );
    }

    #[tokio::test]
    async fn p4_media_never_touches_primary() {
        let store = RecordingStore::seeded(&[], &[]).await;
        let fetcher = ScriptedFetcher::with_routes(&[("./audio.track1.ogg", "ogg")]);
        let h = Harness::new(&config(&[]), store, fetcher);

        h.fetch(Request::get(url("./audio.track1.ogg"))).await;
        h.fetch(Request::get(url("./audio.track1.ogg"))).await;

        let ops = h.store.take_ops();
        assert!(!ops.is_empty());
        for op in ops {
            match op {
                Op::MatchIn(p) | Op::Put(p) => assert_eq!(p, "media"),
                other => panic!("unexpected store access: {:?}", other),
            }
        }
        assert!(!h.store.inner.has("family-v2-current").await.unwrap());
    }

    #[tokio::test]
    async fn p5_bypass_never_touches_store() {
        let store = RecordingStore::seeded(&[], &[]).await;
        let fetcher = ScriptedFetcher::with_routes(&[("./api/score", "ok")]);
        let h = Harness::new(&config(&[]), store, fetcher);

        let post = Request::new(Method::Post, url("./api/score"), RequestMode::Cors);
        let foreign = Request::get(Url::parse("https://tracker.example/song.mp3").unwrap());

        assert_eq!(h.fetch(post).await, EventOutcome::Passthrough);
        assert_eq!(h.fetch(foreign).await, EventOutcome::Passthrough);
        assert!(h.store.take_ops().is_empty());
        assert_eq!(h.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn allow_listed_cdn_is_cached() {
        let store = RecordingStore::seeded(&[], &[]).await;
        let fetcher = ScriptedFetcher::default();
        let cdn = Url::parse("https://cdn.jsdelivr.net/npm/three@0.128.0/build/three.min.js")
            .unwrap();
        fetcher
            .routes
            .lock()
            .unwrap()
            .insert(cdn.to_string(), Response::ok("three"));
        let h = Harness::new(&config(&[]), store, Arc::new(fetcher));

        body_of(h.fetch(Request::get(cdn.clone())).await);

        assert_eq!(
            h.store.inner.entries_in("family-v2-current").await.unwrap(),
            vec![RequestKey::get(&cdn)]
        );
    }
}

mod event_tests {
    use super::*;
    use serde_json::json;

    fn harness() -> Harness {
        let store = Arc::new(RecordingStore::default());
        Harness::new(&config(&["./"]), store, ScriptedFetcher::with_routes(&[("./", "<html>")]))
    }

    #[tokio::test]
    async fn skip_waiting_message() {
        let h = harness();
        let outcome = h
            .agent
            .dispatch(Event::Message(json!({"type": "SKIP_WAITING"})))
            .await
            .unwrap();
        assert_eq!(outcome, EventOutcome::Handled);
        assert!(h.agent.lifecycle().skip_waiting_requested());
        assert_eq!(h.agent.lifecycle().state(), LifecycleState::Parsed);
        assert!(!h.agent.lifecycle().ready_to_activate());
    }

    #[tokio::test]
    async fn unknown_and_malformed_messages_are_ignored() {
        let h = harness();
        for message in [json!({"type": "RELOAD"}), json!(42), json!({"data": 1})] {
            let outcome = h.agent.dispatch(Event::Message(message)).await.unwrap();
            assert_eq!(outcome, EventOutcome::Ignored);
        }
        assert_eq!(h.agent.lifecycle().state(), LifecycleState::Parsed);
        assert!(!h.agent.lifecycle().skip_waiting_requested());
    }

    #[tokio::test]
    async fn push_shows_notification() {
        let h = harness();

        h.agent
            .dispatch(Event::Push {
                data: Some("New mix available".to_string()),
            })
            .await
            .unwrap();
        h.agent.dispatch(Event::Push { data: None }).await.unwrap();

        let shown = h.host.shown.lock().unwrap();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].body, "New mix available");
        assert_eq!(shown[1].body, "613 Portal Update");
        assert_eq!(shown[1].vibrate, vec![100, 50, 100]);
    }

    #[tokio::test]
    async fn notification_click_opens_root() {
        let h = harness();

        h.agent
            .dispatch(Event::NotificationClick { id: 1 })
            .await
            .unwrap();

        assert_eq!(*h.host.closed.lock().unwrap(), vec![1]);
        assert_eq!(*h.host.windows.lock().unwrap(), vec![url("./")]);
    }

    #[tokio::test]
    async fn analytics_sync() {
        let h = harness();

        let handled = h
            .agent
            .dispatch(Event::Sync {
                tag: "sync-analytics".to_string(),
            })
            .await
            .unwrap();
        let ignored = h
            .agent
            .dispatch(Event::Sync {
                tag: "sync-outbox".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(handled, EventOutcome::Handled);
        assert_eq!(ignored, EventOutcome::Ignored);
        assert_eq!(h.analytics.flushes.load(Ordering::SeqCst), 1);
    }
}
