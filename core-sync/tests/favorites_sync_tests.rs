//! Integration tests for the favorites sync pass
//!
//! These tests drive `FavoritesSync` end to end against in-memory stores and
//! a scripted HTTP client serving loved-track pages:
//! - Matching and favorite writes across pages
//! - Idempotent re-runs
//! - Per-user failure isolation
//! - Cancellation and the resulting status
//! - Rejection of a concurrent pass
//! - Events published on the bus

use async_trait::async_trait;
use bridge_traits::{
    accounts::{AccountOptions, AccountStore, ScrobbleAccount, SessionKey},
    error::{BridgeError, Result as BridgeResult},
    http::{HttpClient, HttpRequest, HttpResponse},
    library::{LibraryStore, LocalArtist, LocalSong, ARTIST_IDENTITY_PROVIDER},
    user_data::UserDataStore,
    NoopProgress,
};
use bytes::Bytes;
use core_runtime::config::ScrobbleApiConfig;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_scrobble::{FetchStop, LovedTracksFetcher, ScrobbleClient};
use core_sync::{FavoritesSync, SyncError, SyncOutcome, SyncState};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Fakes
// ============================================================================

/// Serves `user.getLovedTracks` pages keyed by (username, page)
#[derive(Default)]
struct ScriptedHttp {
    pages: HashMap<(String, u32), String>,
    requests: Mutex<Vec<String>>,
    cancel_after_page: Option<(u32, CancellationToken)>,
}

impl ScriptedHttp {
    fn with_page(mut self, user: &str, page: u32, body: String) -> Self {
        self.pages.insert((user.to_string(), page), body);
        self
    }

    fn cancelling_after(mut self, page: u32, token: CancellationToken) -> Self {
        self.cancel_after_page = Some((page, token));
        self
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.url.clone());

        let user = query_param(&request.url, "user").unwrap_or_default();
        let page: u32 = query_param(&request.url, "page")
            .and_then(|p| p.parse().ok())
            .unwrap_or(1);

        if let Some((after, token)) = &self.cancel_after_page {
            if page == *after {
                token.cancel();
            }
        }

        let body = self
            .pages
            .get(&(user, page))
            .cloned()
            .unwrap_or_else(|| empty_page(page));

        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(body),
        })
    }
}

struct FixedAccounts(Vec<ScrobbleAccount>);

#[async_trait]
impl AccountStore for FixedAccounts {
    async fn list_accounts(&self) -> BridgeResult<Vec<ScrobbleAccount>> {
        Ok(self.0.clone())
    }
}

/// Holds `list_accounts` until released, keeping a pass in `Running`
struct GatedAccounts {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl AccountStore for GatedAccounts {
    async fn list_accounts(&self) -> BridgeResult<Vec<ScrobbleAccount>> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Vec::new())
    }
}

struct BrokenAccounts;

#[async_trait]
impl AccountStore for BrokenAccounts {
    async fn list_accounts(&self) -> BridgeResult<Vec<ScrobbleAccount>> {
        Err(BridgeError::StoreError("accounts unavailable".to_string()))
    }
}

#[derive(Default)]
struct MemoryLibrary {
    artists: Vec<LocalArtist>,
    songs: HashMap<String, Vec<LocalSong>>,
    failing_users: HashSet<String>,
}

impl MemoryLibrary {
    fn with_artist(mut self, id: &str, name: &str, identity: Option<&str>, songs: &[(&str, &str)]) -> Self {
        let mut provider_ids = HashMap::new();
        if let Some(identity) = identity {
            provider_ids.insert(ARTIST_IDENTITY_PROVIDER.to_string(), identity.to_string());
        }
        self.artists.push(LocalArtist {
            id: id.to_string(),
            name: name.to_string(),
            provider_ids,
        });
        self.songs.insert(
            id.to_string(),
            songs
                .iter()
                .map(|(song_id, title)| LocalSong {
                    id: song_id.to_string(),
                    name: title.to_string(),
                    artist_identity: identity.map(str::to_string),
                })
                .collect(),
        );
        self
    }

    fn failing_for(mut self, user_id: &str) -> Self {
        self.failing_users.insert(user_id.to_string());
        self
    }
}

#[async_trait]
impl LibraryStore for MemoryLibrary {
    async fn list_artists(&self, user_id: &str) -> BridgeResult<Vec<LocalArtist>> {
        if self.failing_users.contains(user_id) {
            return Err(BridgeError::StoreError(format!("library locked for {user_id}")));
        }
        Ok(self.artists.clone())
    }

    async fn list_songs(&self, artist_id: &str, _user_id: &str) -> BridgeResult<Vec<LocalSong>> {
        Ok(self.songs.get(artist_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct MemoryUserData {
    favorites: Mutex<HashSet<(String, String)>>,
    writes: Mutex<Vec<(String, String, bool)>>,
}

impl MemoryUserData {
    fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    fn is_marked(&self, user_id: &str, item_id: &str) -> bool {
        self.favorites
            .lock()
            .unwrap()
            .contains(&(user_id.to_string(), item_id.to_string()))
    }
}

#[async_trait]
impl UserDataStore for MemoryUserData {
    async fn is_favorite(&self, user_id: &str, item_id: &str) -> BridgeResult<bool> {
        Ok(self.is_marked(user_id, item_id))
    }

    async fn set_favorite(&self, user_id: &str, item_id: &str, favorite: bool) -> BridgeResult<()> {
        self.writes
            .lock()
            .unwrap()
            .push((user_id.to_string(), item_id.to_string(), favorite));
        let key = (user_id.to_string(), item_id.to_string());
        let mut favorites = self.favorites.lock().unwrap();
        if favorite {
            favorites.insert(key);
        } else {
            favorites.remove(&key);
        }
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn account(user_id: &str, remote: &str, key: Option<&str>, sync: bool) -> ScrobbleAccount {
    ScrobbleAccount {
        user_id: user_id.to_string(),
        display_name: user_id.to_string(),
        remote_username: remote.to_string(),
        session_key: key.map(SessionKey::new),
        options: AccountOptions {
            sync_favorites: sync,
        },
    }
}

fn page(user: &str, page: u32, total_pages: u32, tracks: &[(&str, &str, &str)]) -> String {
    let tracks: Vec<String> = tracks
        .iter()
        .map(|(name, artist, mbid)| {
            format!(r#"{{"name":"{name}","artist":{{"name":"{artist}","mbid":"{mbid}"}}}}"#)
        })
        .collect();
    format!(
        r#"{{"lovedtracks":{{"track":[{}],"@attr":{{"user":"{user}","page":"{page}","totalPages":"{total_pages}","perPage":"50","total":"{}"}}}}}}"#,
        tracks.join(","),
        tracks.len()
    )
}

fn empty_page(page: u32) -> String {
    format!(
        r#"{{"lovedtracks":{{"track":[],"@attr":{{"user":"","page":"{page}","totalPages":"0","perPage":"50","total":"0"}}}}}}"#
    )
}

fn build_sync(
    http: Arc<ScriptedHttp>,
    accounts: Arc<dyn AccountStore>,
    library: Arc<MemoryLibrary>,
    user_data: Arc<MemoryUserData>,
) -> FavoritesSync {
    let config = ScrobbleApiConfig::new("test-key", "test-secret");
    let client = ScrobbleClient::new(http, config).unwrap();
    FavoritesSync::new(
        LovedTracksFetcher::new(Arc::new(client)),
        accounts,
        library,
        user_data,
    )
}

fn beatles_library() -> MemoryLibrary {
    MemoryLibrary::default().with_artist(
        "artist-beatles",
        "The Beatles",
        Some("abc"),
        &[("song-yesterday", "Yesterday"), ("song-help", "Help!")],
    )
}

fn two_page_http() -> ScriptedHttp {
    ScriptedHttp::default()
        .with_page(
            "alice_fm",
            1,
            page("alice_fm", 1, 2, &[("Yesterday", "The Beatles", "abc")]),
        )
        .with_page(
            "alice_fm",
            2,
            page("alice_fm", 2, 2, &[("Heroes", "David Bowie", "bowie")]),
        )
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_end_to_end_marks_matching_song() {
    let http = Arc::new(two_page_http());
    let user_data = Arc::new(MemoryUserData::default());
    let sync = build_sync(
        Arc::clone(&http),
        Arc::new(FixedAccounts(vec![account("alice", "alice_fm", Some("sk-1"), true)])),
        Arc::new(beatles_library()),
        Arc::clone(&user_data),
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let progress = move |p: f64| recorder.lock().unwrap().push(p);

    let outcome = sync.run(&CancellationToken::new(), &progress).await.unwrap();

    assert!(!outcome.is_cancelled());
    assert_eq!(*seen.lock().unwrap(), vec![50.0, 100.0]);
    assert_eq!(http.request_count(), 2);
    assert_eq!(user_data.write_count(), 1);
    assert!(user_data.is_marked("alice", "song-yesterday"));
    assert!(!user_data.is_marked("alice", "song-help"));

    let report = outcome.report();
    assert_eq!(report.users.len(), 1);
    assert_eq!(report.users[0].remote_tracks, 2);
    assert_eq!(report.users[0].fetch_stop, Some(FetchStop::Completed));
    assert_eq!(report.tracks_matched(), 1);
    assert_eq!(sync.state(), SyncState::Idle);
    assert!(!sync.is_syncing());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let user_data = Arc::new(MemoryUserData::default());
    let sync = build_sync(
        Arc::new(two_page_http()),
        Arc::new(FixedAccounts(vec![account("alice", "alice_fm", Some("sk-1"), true)])),
        Arc::new(beatles_library()),
        Arc::clone(&user_data),
    );
    let cancel = CancellationToken::new();

    sync.run(&cancel, &NoopProgress).await.unwrap();
    let second = sync.run(&cancel, &NoopProgress).await.unwrap();

    assert_eq!(user_data.write_count(), 1);
    let user = &second.report().users[0];
    assert_eq!(user.matched, 1);
    assert_eq!(user.already_favorite, 1);
    assert_eq!(user.favorites_written, 0);
}

#[tokio::test]
async fn test_fuzzy_names_match_within_artist_only() {
    let http = ScriptedHttp::default().with_page(
        "alice_fm",
        1,
        page(
            "alice_fm",
            1,
            1,
            &[
                ("dont stop me now", "Queen", "queen-id"),
                ("Help", "Someone Else", "other-id"),
            ],
        ),
    );
    let library = MemoryLibrary::default()
        .with_artist("artist-queen", "Queen", Some("queen-id"), &[("song-dsmn", "Don't Stop Me Now")])
        .with_artist("artist-beatles", "The Beatles", Some("abc"), &[("song-help", "Help!")])
        .with_artist("artist-anon", "Unknown", None, &[("song-anon", "Help")]);
    let user_data = Arc::new(MemoryUserData::default());
    let sync = build_sync(
        Arc::new(http),
        Arc::new(FixedAccounts(vec![account("alice", "alice_fm", Some("sk-1"), true)])),
        Arc::new(library),
        Arc::clone(&user_data),
    );

    sync.run(&CancellationToken::new(), &NoopProgress).await.unwrap();

    assert!(user_data.is_marked("alice", "song-dsmn"));
    assert!(!user_data.is_marked("alice", "song-help"));
    assert!(!user_data.is_marked("alice", "song-anon"));
    assert_eq!(user_data.write_count(), 1);
}

#[tokio::test]
async fn test_user_failure_does_not_stop_other_users() {
    let http = ScriptedHttp::default()
        .with_page("bob_fm", 1, page("bob_fm", 1, 1, &[("Yesterday", "The Beatles", "abc")]))
        .with_page("alice_fm", 1, page("alice_fm", 1, 1, &[("Yesterday", "The Beatles", "abc")]));
    let user_data = Arc::new(MemoryUserData::default());
    let sync = build_sync(
        Arc::new(http),
        Arc::new(FixedAccounts(vec![
            account("bob", "bob_fm", Some("sk-b"), true),
            account("alice", "alice_fm", Some("sk-a"), true),
        ])),
        Arc::new(beatles_library().failing_for("bob")),
        Arc::clone(&user_data),
    );

    let outcome = sync.run(&CancellationToken::new(), &NoopProgress).await.unwrap();

    let report = outcome.report();
    assert_eq!(report.failed_users, vec!["bob".to_string()]);
    assert_eq!(report.users.len(), 1);
    assert_eq!(report.users[0].user_id, "alice");
    assert!(user_data.is_marked("alice", "song-yesterday"));
    assert!(!user_data.is_marked("bob", "song-yesterday"));
    assert_eq!(sync.state(), SyncState::Idle);
}

#[tokio::test]
async fn test_progress_is_sliced_per_user() {
    let http = ScriptedHttp::default()
        .with_page("alice_fm", 1, page("alice_fm", 1, 1, &[("Yesterday", "The Beatles", "abc")]))
        .with_page("bob_fm", 1, page("bob_fm", 1, 2, &[("Help!", "The Beatles", "abc")]))
        .with_page("bob_fm", 2, page("bob_fm", 2, 2, &[("Heroes", "David Bowie", "bowie")]));
    let sync = build_sync(
        Arc::new(http),
        Arc::new(FixedAccounts(vec![
            account("alice", "alice_fm", Some("sk-a"), true),
            account("bob", "bob_fm", Some("sk-b"), true),
        ])),
        Arc::new(beatles_library()),
        Arc::new(MemoryUserData::default()),
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let progress = move |p: f64| recorder.lock().unwrap().push(p);

    sync.run(&CancellationToken::new(), &progress).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![50.0, 75.0, 100.0]);
}

#[tokio::test]
async fn test_no_eligible_users_is_a_quiet_success() {
    let http = Arc::new(ScriptedHttp::default());
    let sync = build_sync(
        Arc::clone(&http),
        Arc::new(FixedAccounts(vec![
            account("no-key", "nokey_fm", None, true),
            account("blank-key", "blank_fm", Some("  "), true),
            account("opted-out", "out_fm", Some("sk"), false),
        ])),
        Arc::new(beatles_library()),
        Arc::new(MemoryUserData::default()),
    );

    let outcome = sync.run(&CancellationToken::new(), &NoopProgress).await.unwrap();

    assert!(matches!(outcome, SyncOutcome::Completed(_)));
    assert!(outcome.report().users.is_empty());
    assert_eq!(http.request_count(), 0);
    assert_eq!(sync.state(), SyncState::Idle);
}

#[tokio::test]
async fn test_user_without_loved_tracks() {
    let http = Arc::new(ScriptedHttp::default());
    let user_data = Arc::new(MemoryUserData::default());
    let sync = build_sync(
        Arc::clone(&http),
        Arc::new(FixedAccounts(vec![account("alice", "alice_fm", Some("sk-1"), true)])),
        Arc::new(beatles_library()),
        Arc::clone(&user_data),
    );

    let outcome = sync.run(&CancellationToken::new(), &NoopProgress).await.unwrap();

    let user = &outcome.report().users[0];
    assert_eq!(user.remote_tracks, 0);
    assert_eq!(user.fetch_stop, Some(FetchStop::EmptyPage));
    assert_eq!(user.matched, 0);
    assert_eq!(http.request_count(), 1);
    assert_eq!(user_data.write_count(), 0);
}

#[tokio::test]
async fn test_cancellation_mid_fetch() {
    let cancel = CancellationToken::new();
    let http = Arc::new(two_page_http().cancelling_after(1, cancel.clone()));
    let user_data = Arc::new(MemoryUserData::default());
    let sync = build_sync(
        Arc::clone(&http),
        Arc::new(FixedAccounts(vec![
            account("alice", "alice_fm", Some("sk-a"), true),
            account("bob", "bob_fm", Some("sk-b"), true),
        ])),
        Arc::new(beatles_library()),
        Arc::clone(&user_data),
    );

    let outcome = sync.run(&cancel, &NoopProgress).await.unwrap();

    assert!(outcome.is_cancelled());
    assert_eq!(http.request_count(), 1);
    assert_eq!(user_data.write_count(), 0);
    assert_eq!(outcome.report().users[0].fetch_stop, Some(FetchStop::Cancelled));
    assert_eq!(sync.state(), SyncState::Cancelled);
    assert!(!sync.is_syncing());

    // A cancelled status does not block the next pass
    let rerun = sync.run(&CancellationToken::new(), &NoopProgress).await.unwrap();
    assert!(!rerun.is_cancelled());
    assert_eq!(sync.state(), SyncState::Idle);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let http = Arc::new(two_page_http());
    let sync = build_sync(
        Arc::clone(&http),
        Arc::new(FixedAccounts(vec![account("alice", "alice_fm", Some("sk-1"), true)])),
        Arc::new(beatles_library()),
        Arc::new(MemoryUserData::default()),
    );

    let outcome = sync.run(&cancel, &NoopProgress).await.unwrap();

    assert!(outcome.is_cancelled());
    assert_eq!(http.request_count(), 0);
    assert_eq!(sync.state(), SyncState::Cancelled);
}

#[tokio::test]
async fn test_concurrent_pass_is_rejected() {
    let accounts = Arc::new(GatedAccounts {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let sync = build_sync(
        Arc::new(ScriptedHttp::default()),
        Arc::clone(&accounts) as Arc<dyn AccountStore>,
        Arc::new(MemoryLibrary::default()),
        Arc::new(MemoryUserData::default()),
    );
    let cancel = CancellationToken::new();

    let first = sync.run(&cancel, &NoopProgress);
    let second = async {
        accounts.entered.notified().await;
        assert!(sync.is_syncing());
        let rejected = sync.run(&cancel, &NoopProgress).await;
        accounts.release.notify_one();
        rejected
    };

    let (first, second) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert!(matches!(second, Err(SyncError::SyncInProgress)));
    assert_eq!(sync.state(), SyncState::Idle);
}

#[tokio::test]
async fn test_account_store_failure_resets_status() {
    let sync = build_sync(
        Arc::new(ScriptedHttp::default()),
        Arc::new(BrokenAccounts),
        Arc::new(MemoryLibrary::default()),
        Arc::new(MemoryUserData::default()),
    );

    let result = sync.run(&CancellationToken::new(), &NoopProgress).await;

    assert!(matches!(result, Err(SyncError::Store(_))));
    assert_eq!(sync.state(), SyncState::Idle);
}

#[tokio::test]
async fn test_events_are_published() {
    let bus = Arc::new(EventBus::new(64));
    let mut receiver = bus.subscribe();
    let sync = build_sync(
        Arc::new(two_page_http()),
        Arc::new(FixedAccounts(vec![account("alice", "alice_fm", Some("sk-1"), true)])),
        Arc::new(beatles_library()),
        Arc::new(MemoryUserData::default()),
    )
    .with_event_bus(Arc::clone(&bus));

    sync.run(&CancellationToken::new(), &NoopProgress).await.unwrap();

    let mut events = Vec::new();
    while let Ok(CoreEvent::Sync(event)) = receiver.try_recv() {
        events.push(event);
    }

    assert!(matches!(events.first(), Some(SyncEvent::Started { users: 1, .. })));
    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            SyncEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![50, 100]);
    assert!(events
        .iter()
        .any(|e| matches!(e, SyncEvent::UserCompleted { matched: 1, .. })));
    assert!(matches!(
        events.last(),
        Some(SyncEvent::Completed { users_processed: 1, tracks_matched: 1, .. })
    ));
}
