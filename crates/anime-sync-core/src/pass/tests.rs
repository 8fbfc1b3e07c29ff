use super::*;
use crate::gateway::DecliningGateway;
use crate::test_support::{FakeCatalogList, FakeTrakt};
use anime_sync_config::CredentialStore;
use anime_sync_models::{timestamp, SeasonToken, WatchProgress};
use chrono::{Duration, TimeZone};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use tempfile::TempDir;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn configured() -> Config {
    let mut config = Config::default();
    config.trakt.client_id = "client".to_string();
    config.trakt.client_secret = "secret".to_string();
    config
}

fn seed_token(paths: &PathManager, refresh: Option<&str>) {
    let mut store = CredentialStore::new(paths.credentials_file());
    store.set_trakt_access_token("saved".to_string());
    if let Some(refresh) = refresh {
        store.set_trakt_refresh_token(refresh.to_string());
    }
    store.set_trakt_token_expires(now() + Duration::days(30));
    store.save().unwrap();
}

fn show(slug: &str, title: &str, tvdb: &str, seasons: &[u32], updated: &str) -> WatchedItem {
    WatchedItem {
        external_id: slug.to_string(),
        title: title.to_string(),
        cross_ref_id: Some(tvdb.to_string()),
        last_updated_at: timestamp::parse(updated),
        progress: WatchProgress::Show {
            seasons: seasons.iter().map(|s| (*s, BTreeSet::from([1, 2]))).collect(),
        },
    }
}

fn movie(slug: &str, title: &str, tmdb: &str) -> WatchedItem {
    WatchedItem {
        external_id: slug.to_string(),
        title: title.to_string(),
        cross_ref_id: Some(tmdb.to_string()),
        last_updated_at: timestamp::parse("2024-02-01T08:00:00.000Z"),
        progress: WatchProgress::Movie { watched: true },
    }
}

struct Fixture {
    dir: TempDir,
    trakt: Arc<FakeTrakt>,
    list: Arc<FakeCatalogList>,
}

impl Fixture {
    fn new() -> Self {
        let trakt = FakeTrakt::new()
            .with_token("saved")
            .with_refresh("r0")
            .with_genres("frieren", &["anime", "fantasy"])
            .with_genres("the-office", &["comedy"])
            .with_genres("obscure-ova", &["anime"])
            .with_genres("spirited-away-2001", &["anime", "family"])
            .with_genres("heat-1995", &["crime"]);
        trakt.set_shows(vec![
            show("frieren", "Frieren", "424536", &[1], "2024-02-10T20:15:00.000Z"),
            show("the-office", "The Office", "73244", &[1, 2], "2024-01-05T10:00:00.000Z"),
            show("obscure-ova", "Obscure OVA", "999999", &[1], "2024-01-20T10:00:00.000Z"),
        ]);
        trakt.set_movies(vec![
            movie("spirited-away-2001", "Spirited Away", "129"),
            movie("heat-1995", "Heat", "949"),
        ]);

        let list = FakeCatalogList::new(json!([
            { "mal_id": 52991, "thetvdb_id": 424536 },
            { "mal_id": 199, "themoviedb_id": 129 },
            { "mal_id": 1, "thetvdb_id": "76885" },
        ]));

        let fixture = Self {
            dir: TempDir::new().unwrap(),
            trakt: Arc::new(trakt),
            list: Arc::new(list),
        };
        seed_token(&fixture.paths(), Some("r0"));
        fixture
    }

    fn paths(&self) -> PathManager {
        PathManager::with_base(self.dir.path().to_path_buf())
    }

    fn pass(&self, config: Config) -> ReconciliationPass {
        let trakt: Arc<dyn TrackingService> = self.trakt.clone();
        let list: Arc<dyn CatalogListSource> = self.list.clone();
        ReconciliationPass::new(config, self.paths(), trakt, list).with_clock(now)
    }

    fn read(&self, path: std::path::PathBuf) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }
}

#[tokio::test]
async fn test_full_pass_writes_all_stores() {
    let fixture = Fixture::new();
    let summary = fixture
        .pass(configured())
        .run(&mut DecliningGateway, &NoopObserver)
        .await
        .unwrap();

    assert_eq!(summary.catalog, CatalogFreshness::Refreshed);
    assert_eq!(summary.catalog_date, now().date_naive());
    assert_eq!(summary.shows.inspected, 3);
    assert_eq!(summary.shows.anime, 2);
    assert_eq!(summary.shows.other, 1);
    assert_eq!(summary.movies.anime, 1);
    assert_eq!(summary.movies.other, 1);
    assert!(!summary.reauthenticated);

    // obscure-ova has no catalog entry and the gateway declines
    assert!(matches!(
        summary.warnings.as_slice(),
        [ReconcileWarning::MissingCrossRef { external_id, .. }] if external_id == "obscure-ova"
    ));

    let paths = fixture.paths();
    let shows_cache = fixture.read(paths.shows_cache_file());
    assert_eq!(shows_cache["other"], json!(["the-office"]));
    assert_eq!(shows_cache["anime"]["frieren"]["lastUpdatedAt"], "2024-02-10T20:15:00.000Z");

    let movies_cache = fixture.read(paths.movies_cache_file());
    assert_eq!(movies_cache["other"], json!(["heat-1995"]));

    let shows_mapping = fixture.read(paths.shows_mapping_file());
    assert_eq!(shows_mapping["frieren"]["candidateCatalogIds"], json!(["52991"]));
    assert_eq!(shows_mapping["frieren"]["mappings"], json!({ "52991": [1] }));
    assert_eq!(shows_mapping["obscure-ova"]["candidateCatalogIds"], json!([]));
    assert_eq!(shows_mapping["obscure-ova"]["ignore"], false);
    assert!(shows_mapping.get("the-office").is_none());

    let movies_mapping = fixture.read(paths.movies_mapping_file());
    assert_eq!(movies_mapping["spirited-away-2001"]["candidateCatalogIds"], json!(["199"]));

    let catalog = fixture.read(paths.anime_list_file());
    assert_eq!(catalog["date"], "2024-03-01");
}

#[tokio::test]
async fn test_second_pass_skips_unchanged_items() {
    let fixture = Fixture::new();
    let mut pass = fixture.pass(configured());
    pass.run(&mut DecliningGateway, &NoopObserver).await.unwrap();
    let first_mapping = fixture.read(fixture.paths().shows_mapping_file());
    let calls_after_first = fixture.trakt.genre_calls().len();

    let summary = pass.run(&mut DecliningGateway, &NoopObserver).await.unwrap();

    assert_eq!(summary.catalog, CatalogFreshness::Cached);
    assert_eq!(fixture.list.calls(), 1);
    assert_eq!(summary.shows.skipped, 3);
    assert_eq!(summary.movies.skipped, 2);
    assert_eq!(fixture.trakt.genre_calls().len(), calls_after_first);
    assert_eq!(fixture.read(fixture.paths().shows_mapping_file()), first_mapping);
}

#[tokio::test]
async fn test_new_watch_data_extends_mapping() {
    let fixture = Fixture::new();
    let mut pass = fixture.pass(configured());
    pass.run(&mut DecliningGateway, &NoopObserver).await.unwrap();

    fixture.trakt.set_shows(vec![show(
        "frieren",
        "Frieren",
        "424536",
        &[1, 2],
        "2024-02-20T20:15:00.000Z",
    )]);
    let summary = pass.run(&mut DecliningGateway, &NoopObserver).await.unwrap();
    assert_eq!(summary.shows.inspected, 1);

    let mapping = ConversionStore::new(fixture.paths().shows_mapping_file(), fixture.paths().movies_mapping_file())
        .load()
        .unwrap();
    let frieren = &mapping.shows["frieren"];
    assert_eq!(frieren.seasons_observed, BTreeSet::from([1, 2]));
    assert_eq!(
        frieren.mappings,
        BTreeMap::from([(
            "52991".to_string(),
            BTreeSet::from([SeasonToken::Season(1), SeasonToken::Season(2)])
        )])
    );
    // Items that left the watch feed keep their entries
    assert!(mapping.shows.contains_key("obscure-ova"));
}

#[tokio::test]
async fn test_force_refresh_reinspects_other_items() {
    let fixture = Fixture::new();
    let mut pass = fixture.pass(configured());
    pass.run(&mut DecliningGateway, &NoopObserver).await.unwrap();

    let mut pass = fixture.pass(configured()).with_options(PassOptions {
        force_refresh: true,
        refresh_catalog: false,
    });
    let summary = pass.run(&mut DecliningGateway, &NoopObserver).await.unwrap();
    assert_eq!(summary.shows.inspected, 3);
    assert_eq!(summary.movies.inspected, 2);
    assert_eq!(summary.catalog, CatalogFreshness::Cached);
}

#[tokio::test]
async fn test_session_renewed_once_mid_pass() {
    let fixture = Fixture::new();
    fixture.trakt.revoke_at_genre_call(2);

    let summary = fixture
        .pass(configured())
        .run(&mut DecliningGateway, &NoopObserver)
        .await
        .unwrap();

    assert!(summary.reauthenticated);
    assert_eq!(fixture.trakt.refreshes(), 1);
    assert_eq!(summary.shows.processed, 3);
    assert_eq!(summary.shows.inspected, 3);
}

#[tokio::test]
async fn test_unrecoverable_auth_failure_leaves_stores_untouched() {
    let fixture = Fixture::new();
    // Only an access token, no refresh token, and nobody to authorize
    std::fs::remove_file(fixture.paths().credentials_file()).unwrap();
    seed_token(&fixture.paths(), None);
    fixture.trakt.revoke_at_genre_call(1);

    let err = fixture
        .pass(configured())
        .run(&mut DecliningGateway, &NoopObserver)
        .await
        .unwrap_err();

    assert!(err.is_auth());
    assert!(!fixture.paths().shows_cache_file().exists());
    assert!(!fixture.paths().shows_mapping_file().exists());
    // The list was downloaded, but it is only written with the other stores
    assert_eq!(fixture.list.calls(), 1);
    assert!(!fixture.paths().anime_list_file().exists());
}

#[tokio::test]
async fn test_unlistable_feed_degrades_to_warning() {
    let fixture = Fixture::new();
    fixture.trakt.fail_listing(MediaKind::Movie);

    let summary = fixture
        .pass(configured())
        .run(&mut DecliningGateway, &NoopObserver)
        .await
        .unwrap();

    assert!(summary.movies.unavailable);
    assert_eq!(summary.movies.processed, 0);
    assert!(!summary.shows.unavailable);
    assert_eq!(summary.shows.inspected, 3);
    assert_eq!(fixture.trakt.genre_calls(), ["frieren", "the-office", "obscure-ova"]);

    let paths = fixture.paths();
    let shows_mapping = fixture.read(paths.shows_mapping_file());
    assert_eq!(shows_mapping["frieren"]["mappings"], json!({ "52991": [1] }));
    assert!(paths.shows_cache_file().exists());
    assert!(paths.anime_list_file().exists());
}

#[tokio::test]
async fn test_unlistable_feed_keeps_its_stored_state() {
    let fixture = Fixture::new();
    let mut pass = fixture.pass(configured());
    pass.run(&mut DecliningGateway, &NoopObserver).await.unwrap();
    let paths = fixture.paths();
    let movies_cache = fixture.read(paths.movies_cache_file());
    let movies_mapping = fixture.read(paths.movies_mapping_file());

    fixture.trakt.fail_listing(MediaKind::Movie);
    fixture.trakt.set_shows(vec![show(
        "frieren",
        "Frieren",
        "424536",
        &[1, 2],
        "2024-02-20T20:15:00.000Z",
    )]);
    let summary = pass.run(&mut DecliningGateway, &NoopObserver).await.unwrap();

    assert!(summary.movies.unavailable);
    assert_eq!(summary.shows.inspected, 1);
    assert_eq!(fixture.read(paths.movies_cache_file()), movies_cache);
    assert_eq!(fixture.read(paths.movies_mapping_file()), movies_mapping);
    let shows_mapping = fixture.read(paths.shows_mapping_file());
    assert_eq!(shows_mapping["frieren"]["mappings"], json!({ "52991": [1, 2] }));
}

#[tokio::test]
async fn test_missing_client_credentials() {
    struct Supplies;

    impl ResolutionGateway for Supplies {
        fn prompt_manual_ids(&mut self, _title: &str) -> Option<Vec<String>> {
            None
        }

        fn prompt_ignore(&mut self, _title: &str) -> bool {
            false
        }

        fn prompt_credentials(&mut self) -> Option<TraktCredentials> {
            Some(TraktCredentials {
                client_id: " client ".to_string(),
                client_secret: "secret".to_string(),
            })
        }

        fn prompt_authorization_code(&mut self, _authorize_url: &str) -> Option<String> {
            None
        }
    }

    let fixture = Fixture::new();
    let err = fixture
        .pass(Config::default())
        .run(&mut DecliningGateway, &NoopObserver)
        .await
        .unwrap_err();
    assert!(err.is_auth());

    fixture
        .pass(Config::default())
        .run(&mut Supplies, &NoopObserver)
        .await
        .unwrap();
    let saved = Config::load_from_file(&fixture.paths().config_file()).unwrap();
    assert_eq!(saved.trakt.client_id, "client");
}

#[tokio::test]
async fn test_catalog_failure_without_cache_is_fatal() {
    let fixture = Fixture::new();
    fixture.list.go_offline();

    let err = fixture
        .pass(configured())
        .run(&mut DecliningGateway, &NoopObserver)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::FetchFailed(_)));
    // Fails before any genre lookups
    assert!(fixture.trakt.genre_calls().is_empty());
}

#[tokio::test]
async fn test_stale_catalog_used_when_download_fails() {
    let fixture = Fixture::new();
    fixture
        .pass(configured())
        .with_clock(|| Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
        .run(&mut DecliningGateway, &NoopObserver)
        .await
        .unwrap();
    fixture.list.go_offline();

    let summary = fixture
        .pass(configured())
        .run(&mut DecliningGateway, &NoopObserver)
        .await
        .unwrap();
    assert_eq!(summary.catalog, CatalogFreshness::Stale);
    assert_eq!(summary.catalog_date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    assert_eq!(fixture.list.calls(), 2);
}
