//! Library-level tests for the ingestion pipeline against a real SQLite
//! database in a temp directory.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempfile::TempDir;

use snapshot_loader::config::{load_config, Config};
use snapshot_loader::error::LoaderError;
use snapshot_loader::ingest::Loader;
use snapshot_loader::models::{
    CanonicalRecord, Label, ProcessStatus, Provider, StatusCounts, TrackingEntry,
};
use snapshot_loader::store::sqlite::SqliteStore;
use snapshot_loader::store::{Claim, Store, RELEASED_BY_OPERATOR};

const JIRA_HEADER: &str = "manager_id,projects,assignee,label,employeeID,issue,env,user_story,point,sprint";
const GITHUB_HEADER: &str =
    "manager_id,projects,assignee,label,devloper_id,issue,environment,user_story,point,sprint";
const CLICKUP_HEADER: &str =
    "owner_id,project,tag,label,worker_id,task,pr_env,user_story,day,currant_sprint";

struct TestEnv {
    tmp: TempDir,
    config: Config,
    store: Arc<SqliteStore>,
}

impl TestEnv {
    fn intake(&self, provider: Provider) -> PathBuf {
        self.config.intake.provider_dir(provider)
    }

    fn write(&self, provider: Provider, filename: &str, content: &str) -> PathBuf {
        let dir = self.intake(provider);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(filename);
        fs::write(&path, content).unwrap();
        path
    }

    fn loader(&self) -> Loader {
        Loader::new(self.store.clone(), &self.config)
    }

    fn loader_with(&self, store: Arc<dyn Store>) -> Loader {
        Loader::new(store, &self.config)
    }

    async fn entry(&self, provider: Provider, filename: &str) -> TrackingEntry {
        self.store
            .entry(provider, filename)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("no entry for {}/{}", provider, filename))
    }
}

async fn setup(extra: &str) -> TestEnv {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    let config_path = root.join("loader.toml");
    fs::write(
        &config_path,
        format!(
            r#"[db]
path = "{root}/data/loader.sqlite"

[intake]
root = "{root}/intake"
{extra}
"#,
            root = root.display(),
            extra = extra
        ),
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    let store = SqliteStore::open(&config.db.path).await.unwrap();

    TestEnv {
        tmp,
        config,
        store: Arc::new(store),
    }
}

fn jira_file(rows: &[&str]) -> String {
    let mut out = String::from(JIRA_HEADER);
    for row in rows {
        out.push('\n');
        out.push_str(row);
    }
    out.push('\n');
    out
}

fn jira_row(n: usize, label: &str, point: &str) -> String {
    format!("m{n},Apollo,dev{n},{label},e{n},ISS-{n},prod,US-{n},{point},S1")
}

#[tokio::test]
async fn jira_file_keeps_known_labels_and_skips_unknown() {
    let env = setup("").await;
    let name = "jira_2024_08_22T13_30_00";
    env.write(
        Provider::Jira,
        name,
        &jira_file(&[&jira_row(1, "Bug", "5"), &jira_row(2, "nope", "3")]),
    );

    let loader = env.loader();
    let stored = loader.scan_provider(Provider::Jira).await.unwrap();
    assert_eq!(stored, 1);

    let entry = env.entry(Provider::Jira, name).await;
    assert_eq!(entry.status, ProcessStatus::Success);
    assert_eq!(entry.records_processed, 1);
    assert!(entry.error_message.is_none());
    assert_eq!(entry.content_sha256.as_deref().map(str::len), Some(64));

    let records = env.store.records(Provider::Jira).await.unwrap();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.label, Some(Label::Bug));
    assert_eq!(r.owner_id.as_deref(), Some("m1"));
    assert_eq!(r.project.as_deref(), Some("Apollo"));
    assert_eq!(r.tag.as_deref(), Some("dev1"));
    assert_eq!(r.developer_id.as_deref(), Some("e1"));
    assert_eq!(r.task_number.as_deref(), Some("ISS-1"));
    assert_eq!(r.environment.as_deref(), Some("prod"));
    assert_eq!(r.task_point, 5);
    assert_eq!(r.sprint.as_deref(), Some("S1"));
    assert_eq!(r.provider, Provider::Jira);

    // A second scan finds nothing new and stores nothing.
    assert_eq!(loader.scan_provider(Provider::Jira).await.unwrap(), 0);
    assert_eq!(env.store.records(Provider::Jira).await.unwrap().len(), 1);
    assert_eq!(
        env.store.statistics(Provider::Jira).await.unwrap(),
        StatusCounts {
            success: 1,
            failed: 0,
            processing: 0
        }
    );
}

#[tokio::test]
async fn reprocessing_a_loaded_file_is_a_duplicate() {
    let env = setup("").await;
    let path = env.write(
        Provider::Jira,
        "jira_2024_08_22T13_30_00",
        &jira_file(&[&jira_row(1, "enhancement", "2")]),
    );

    let loader = env.loader();
    assert_eq!(loader.process_file(Provider::Jira, &path).await.unwrap(), 1);

    let err = loader.process_file(Provider::Jira, &path).await.unwrap_err();
    assert!(matches!(err, LoaderError::DuplicateFile { .. }), "got {err:?}");
    assert_eq!(env.store.records(Provider::Jira).await.unwrap().len(), 1);
}

#[tokio::test]
async fn record_cap_keeps_the_first_rows() {
    let env = setup("\n[loader]\nmax_records_per_file = 2\n").await;
    let rows: Vec<String> = (1..=3).map(|n| jira_row(n, "bug", "1")).collect();
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    env.write(Provider::Jira, "jira_2024_08_22T13_30_00", &jira_file(&refs));

    let stored = env.loader().scan_provider(Provider::Jira).await.unwrap();
    assert_eq!(stored, 2);

    let entry = env.entry(Provider::Jira, "jira_2024_08_22T13_30_00").await;
    assert_eq!(entry.status, ProcessStatus::Success);
    assert_eq!(entry.records_processed, 2);

    let owners: Vec<_> = env
        .store
        .records(Provider::Jira)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.owner_id.unwrap())
        .collect();
    assert_eq!(owners, vec!["m1", "m2"]);
}

#[tokio::test]
async fn record_cap_exactly_met_keeps_everything() {
    let env = setup("\n[loader]\nmax_records_per_file = 2\n").await;
    env.write(
        Provider::Jira,
        "jira_2024_08_22T13_30_00",
        &jira_file(&[&jira_row(1, "bug", "1"), &jira_row(2, "", "1")]),
    );

    assert_eq!(env.loader().scan_provider(Provider::Jira).await.unwrap(), 2);
}

#[tokio::test]
async fn bad_points_default_to_zero() {
    let env = setup("").await;
    env.write(
        Provider::Jira,
        "jira_2024_08_22T13_30_00",
        &jira_file(&[&jira_row(1, "bug", "abc"), &jira_row(2, "bug", ""), &jira_row(3, "bug", "8")]),
    );

    env.loader().scan_provider(Provider::Jira).await.unwrap();
    let points: Vec<i32> = env
        .store
        .records(Provider::Jira)
        .await
        .unwrap()
        .iter()
        .map(|r| r.task_point)
        .collect();
    assert_eq!(points, vec![0, 0, 8]);
}

#[tokio::test]
async fn header_only_file_succeeds_with_zero_records() {
    let env = setup("").await;
    env.write(Provider::Jira, "jira_2024_08_22T13_30_00", &jira_file(&[]));

    assert_eq!(env.loader().scan_provider(Provider::Jira).await.unwrap(), 0);
    let entry = env.entry(Provider::Jira, "jira_2024_08_22T13_30_00").await;
    assert_eq!(entry.status, ProcessStatus::Success);
    assert_eq!(entry.records_processed, 0);
}

#[tokio::test]
async fn malformed_file_fails_then_reprocesses_once_fixed() {
    let env = setup("").await;
    let name = "jira_2024_08_22T13_30_00";
    env.write(
        Provider::Jira,
        name,
        &jira_file(&[&jira_row(1, "bug", "1"), "too,few,columns"]),
    );

    let loader = env.loader();
    let err = loader.scan_provider(Provider::Jira).await.unwrap_err();
    assert!(matches!(err, LoaderError::ParseFailure { .. }), "got {err:?}");

    let entry = env.entry(Provider::Jira, name).await;
    assert_eq!(entry.status, ProcessStatus::Failed);
    assert!(entry.error_message.unwrap().contains(name));
    assert!(env.store.records(Provider::Jira).await.unwrap().is_empty());

    // The failed entry is re-opened on the next scan.
    env.write(Provider::Jira, name, &jira_file(&[&jira_row(1, "bug", "1")]));
    assert_eq!(loader.scan_provider(Provider::Jira).await.unwrap(), 1);

    let entry = env.entry(Provider::Jira, name).await;
    assert_eq!(entry.status, ProcessStatus::Success);
    assert!(entry.error_message.is_none());
    assert_eq!(env.store.statistics(Provider::Jira).await.unwrap().total(), 1);
}

#[tokio::test]
async fn lenient_mode_continues_past_a_failed_file() {
    let env = setup("\n[loader]\nfailure_mode = \"lenient\"\n").await;
    env.write(
        Provider::Jira,
        "jira_2024_08_22T13_30_00",
        &jira_file(&["broken"]),
    );
    env.write(
        Provider::Jira,
        "jira_2024_08_23T13_30_00",
        &jira_file(&[&jira_row(1, "bug", "1"), &jira_row(2, "question", "2")]),
    );

    let stored = env.loader().scan_provider(Provider::Jira).await.unwrap();
    assert_eq!(stored, 2);

    assert_eq!(
        env.entry(Provider::Jira, "jira_2024_08_22T13_30_00").await.status,
        ProcessStatus::Failed
    );
    assert_eq!(
        env.entry(Provider::Jira, "jira_2024_08_23T13_30_00").await.status,
        ProcessStatus::Success
    );
}

#[tokio::test]
async fn strict_mode_stops_at_the_first_failed_file() {
    let env = setup("").await;
    env.write(
        Provider::Jira,
        "jira_2024_08_22T13_30_00",
        &jira_file(&["broken"]),
    );
    env.write(
        Provider::Jira,
        "jira_2024_08_23T13_30_00",
        &jira_file(&[&jira_row(1, "bug", "1")]),
    );

    assert!(env.loader().scan_provider(Provider::Jira).await.is_err());
    assert!(env
        .store
        .entry(Provider::Jira, "jira_2024_08_23T13_30_00")
        .await
        .unwrap()
        .is_none());
}

/// Delegates to SQLite with injectable faults.
struct FaultyStore {
    inner: Arc<SqliteStore>,
    /// Every `commit_records` fails.
    fail_commit: bool,
    /// `has_succeeded` always answers `false`, as if another scan finished
    /// the file after this one looked.
    hide_successes: bool,
    /// `has_succeeded` fails for this provider.
    fail_lookups_for: Option<Provider>,
}

impl FaultyStore {
    fn over(inner: Arc<SqliteStore>) -> Self {
        Self {
            inner,
            fail_commit: false,
            hide_successes: false,
            fail_lookups_for: None,
        }
    }

    fn sqlite(&self) -> &SqliteStore {
        &self.inner
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn has_succeeded(&self, provider: Provider, filename: &str) -> Result<bool> {
        if self.fail_lookups_for == Some(provider) {
            bail!("database is locked");
        }
        if self.hide_successes {
            return Ok(false);
        }
        self.sqlite().has_succeeded(provider, filename).await
    }

    async fn claim(
        &self,
        provider: Provider,
        filename: &str,
        content_sha256: Option<&str>,
    ) -> Result<Claim> {
        self.sqlite().claim(provider, filename, content_sha256).await
    }

    async fn commit_records(
        &self,
        entry: &TrackingEntry,
        records: &[CanonicalRecord],
    ) -> Result<TrackingEntry> {
        if self.fail_commit {
            bail!("disk full");
        }
        self.sqlite().commit_records(entry, records).await
    }

    async fn finalize_success(
        &self,
        entry: &TrackingEntry,
        record_count: u64,
    ) -> Result<TrackingEntry> {
        self.sqlite().finalize_success(entry, record_count).await
    }

    async fn finalize_failure(&self, entry: &TrackingEntry, error: &str) -> Result<TrackingEntry> {
        self.sqlite().finalize_failure(entry, error).await
    }

    async fn release(&self, provider: Provider, filename: &str) -> Result<Option<TrackingEntry>> {
        self.sqlite().release(provider, filename).await
    }

    async fn statistics(&self, provider: Provider) -> Result<StatusCounts> {
        self.sqlite().statistics(provider).await
    }

    async fn latest(&self, provider: Provider) -> Result<Option<TrackingEntry>> {
        self.sqlite().latest(provider).await
    }

    async fn stale_processing(
        &self,
        provider: Provider,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<TrackingEntry>> {
        self.sqlite().stale_processing(provider, older_than).await
    }

    async fn entry(&self, provider: Provider, filename: &str) -> Result<Option<TrackingEntry>> {
        self.sqlite().entry(provider, filename).await
    }

    async fn records(&self, provider: Provider) -> Result<Vec<CanonicalRecord>> {
        self.sqlite().records(provider).await
    }
}

async fn storage_failure_case(extra: &str) -> (TestEnv, Result<u64, LoaderError>) {
    let env = setup(extra).await;
    let path = env.write(
        Provider::Jira,
        "jira_2024_08_22T13_30_00",
        &jira_file(&[&jira_row(1, "bug", "1"), &jira_row(2, "bug", "2")]),
    );
    let loader = env.loader_with(Arc::new(FaultyStore {
        fail_commit: true,
        ..FaultyStore::over(env.store.clone())
    }));
    let result = loader.process_file(Provider::Jira, &path).await;
    (env, result)
}

#[tokio::test]
async fn storage_failure_in_strict_mode_propagates() {
    let (env, result) = storage_failure_case("").await;
    let err = result.unwrap_err();
    assert!(matches!(err, LoaderError::StorageFailure { .. }), "got {err:?}");

    let entry = env.entry(Provider::Jira, "jira_2024_08_22T13_30_00").await;
    assert_eq!(entry.status, ProcessStatus::Failed);
    assert!(entry.error_message.unwrap().contains("disk full"));
    assert!(env.store.records(Provider::Jira).await.unwrap().is_empty());
}

#[tokio::test]
async fn storage_failure_in_lenient_mode_returns_zero() {
    let (env, result) = storage_failure_case("\n[loader]\nfailure_mode = \"lenient\"\n").await;
    assert_eq!(result.unwrap(), 0);

    let entry = env.entry(Provider::Jira, "jira_2024_08_22T13_30_00").await;
    assert_eq!(entry.status, ProcessStatus::Failed);
    assert!(env.store.records(Provider::Jira).await.unwrap().is_empty());
}

#[tokio::test]
async fn stuck_file_is_skipped_until_released() {
    let env = setup("").await;
    let name = "jira_2024_08_22T13_30_00";
    env.write(Provider::Jira, name, &jira_file(&[&jira_row(1, "bug", "1")]));

    // Simulate a crash after claiming.
    let claim = env.store.claim(Provider::Jira, name, None).await.unwrap();
    assert!(matches!(claim, Claim::Acquired(_)));

    let loader = env.loader();
    assert_eq!(loader.scan_provider(Provider::Jira).await.unwrap(), 0);
    assert_eq!(env.entry(Provider::Jira, name).await.status, ProcessStatus::Processing);

    let path = env.intake(Provider::Jira).join(name);
    let err = loader.process_file(Provider::Jira, &path).await.unwrap_err();
    assert!(matches!(err, LoaderError::StuckProcessing { .. }), "got {err:?}");

    let released = env.store.release(Provider::Jira, name).await.unwrap().unwrap();
    assert_eq!(released.status, ProcessStatus::Failed);
    assert_eq!(released.error_message.as_deref(), Some(RELEASED_BY_OPERATOR));

    assert_eq!(loader.scan_provider(Provider::Jira).await.unwrap(), 1);
    assert_eq!(env.entry(Provider::Jira, name).await.status, ProcessStatus::Success);
}

#[tokio::test]
async fn release_rejects_terminal_and_unknown_entries() {
    let env = setup("").await;
    let name = "jira_2024_08_22T13_30_00";
    env.write(Provider::Jira, name, &jira_file(&[&jira_row(1, "bug", "1")]));
    env.loader().scan_provider(Provider::Jira).await.unwrap();

    assert!(env.store.release(Provider::Jira, name).await.is_err());
    assert!(env
        .store
        .release(Provider::Jira, "jira_2030_01_01T00_00_00")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn finalize_is_idempotent_for_the_same_status() {
    let env = setup("").await;
    let Claim::Acquired(entry) = env
        .store
        .claim(Provider::GitHub, "github_2024_01_01T00_00_00", None)
        .await
        .unwrap()
    else {
        panic!("expected claim");
    };

    let first = env.store.finalize_success(&entry, 7).await.unwrap();
    let second = env.store.finalize_success(&entry, 7).await.unwrap();
    assert_eq!(first.status, ProcessStatus::Success);
    assert_eq!(second.records_processed, 7);

    assert!(env.store.finalize_failure(&entry, "late error").await.is_err());
    assert!(matches!(
        env.store
            .claim(Provider::GitHub, "github_2024_01_01T00_00_00", None)
            .await
            .unwrap(),
        Claim::AlreadySucceeded(_)
    ));
}

#[tokio::test]
async fn scan_all_visits_enabled_providers_in_fixed_order() {
    let env = setup("providers = [\"jira\", \"github\"]").await;
    env.write(
        Provider::Jira,
        "jira_2024_08_22T13_30_00",
        &jira_file(&[&jira_row(1, "bug", "1")]),
    );
    env.write(
        Provider::GitHub,
        "github_2024_08_22T13_30_00",
        &format!(
            "{}\nm1,Apollo,alice,enhancement,d1,42,staging,US-1,3,S2\nm2,Apollo,bob,duplicate,d2,43,staging,US-2,1,S2\n",
            GITHUB_HEADER
        ),
    );
    env.write(
        Provider::ClickUp,
        "clickup_2024_08_22T13_30_00",
        &format!("{}\no1,Zeus,t1,bug,w1,T-1,prod,US-9,4,S3\n", CLICKUP_HEADER),
    );

    let total = env.loader().scan_all().await.unwrap();
    assert_eq!(total, 3);

    let github = env.entry(Provider::GitHub, "github_2024_08_22T13_30_00").await;
    let jira = env.entry(Provider::Jira, "jira_2024_08_22T13_30_00").await;
    assert!(github.id < jira.id, "github must be scanned before jira");

    assert_eq!(env.store.statistics(Provider::ClickUp).await.unwrap().total(), 0);

    let github_records = env.store.records(Provider::GitHub).await.unwrap();
    assert_eq!(github_records[0].label, Some(Label::Enhancement));
    assert_eq!(github_records[0].developer_id.as_deref(), Some("d1"));
    assert_eq!(github_records[1].label, Some(Label::Duplicate));
}

/// A broken github snapshot (scanned first) next to a good jira one.
async fn broken_github_good_jira(extra: &str) -> TestEnv {
    let env = setup(extra).await;
    env.write(
        Provider::GitHub,
        "github_2024_08_22T13_30_00",
        &format!("{}\nbroken\n", GITHUB_HEADER),
    );
    env.write(
        Provider::Jira,
        "jira_2024_08_22T13_30_00",
        &jira_file(&[&jira_row(1, "bug", "1")]),
    );
    env
}

#[tokio::test]
async fn scan_all_in_strict_mode_stops_at_a_failed_provider() {
    let env = broken_github_good_jira("").await;

    let err = env.loader().scan_all().await.unwrap_err();
    assert!(matches!(err, LoaderError::ParseFailure { .. }), "got {err:?}");

    assert_eq!(
        env.entry(Provider::GitHub, "github_2024_08_22T13_30_00").await.status,
        ProcessStatus::Failed
    );
    assert!(env
        .store
        .entry(Provider::Jira, "jira_2024_08_22T13_30_00")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn scan_all_in_lenient_mode_moves_on_to_the_next_provider() {
    let env = broken_github_good_jira("\n[loader]\nfailure_mode = \"lenient\"\n").await;

    assert_eq!(env.loader().scan_all().await.unwrap(), 1);

    assert_eq!(
        env.entry(Provider::GitHub, "github_2024_08_22T13_30_00").await.status,
        ProcessStatus::Failed
    );
    let jira = env.entry(Provider::Jira, "jira_2024_08_22T13_30_00").await;
    assert_eq!(jira.status, ProcessStatus::Success);
    assert_eq!(jira.records_processed, 1);
}

#[tokio::test]
async fn file_finished_after_the_scan_looked_is_skipped_in_strict_mode() {
    let env = setup("").await;
    env.write(
        Provider::Jira,
        "jira_2024_08_22T13_30_00",
        &jira_file(&[&jira_row(1, "bug", "1")]),
    );
    assert_eq!(env.loader().scan_provider(Provider::Jira).await.unwrap(), 1);

    env.write(
        Provider::Jira,
        "jira_2024_08_23T13_30_00",
        &jira_file(&[&jira_row(2, "bug", "2")]),
    );

    // The scan and the pre-claim check both miss the first file's success,
    // so only the claim sees it.
    let loader = env.loader_with(Arc::new(FaultyStore {
        hide_successes: true,
        ..FaultyStore::over(env.store.clone())
    }));
    assert_eq!(loader.scan_provider(Provider::Jira).await.unwrap(), 1);

    let first = env.entry(Provider::Jira, "jira_2024_08_22T13_30_00").await;
    assert_eq!(first.status, ProcessStatus::Success);
    assert_eq!(first.records_processed, 1);
    assert_eq!(
        env.entry(Provider::Jira, "jira_2024_08_23T13_30_00").await.status,
        ProcessStatus::Success
    );
    assert_eq!(env.store.records(Provider::Jira).await.unwrap().len(), 2);
}

#[tokio::test]
async fn ledger_lookup_failure_is_a_ledger_error() {
    let env = broken_github_good_jira("").await;
    let loader = env.loader_with(Arc::new(FaultyStore {
        fail_lookups_for: Some(Provider::GitHub),
        ..FaultyStore::over(env.store.clone())
    }));

    let err = loader.pending(Provider::GitHub).await.unwrap_err();
    assert!(matches!(err, LoaderError::Ledger(_)), "got {err:?}");

    let err = loader.scan_all().await.unwrap_err();
    assert!(matches!(err, LoaderError::Ledger(_)), "got {err:?}");
    assert!(env
        .store
        .entry(Provider::Jira, "jira_2024_08_22T13_30_00")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn ledger_lookup_failure_in_lenient_mode_skips_the_provider() {
    let env = broken_github_good_jira("\n[loader]\nfailure_mode = \"lenient\"\n").await;
    let loader = env.loader_with(Arc::new(FaultyStore {
        fail_lookups_for: Some(Provider::GitHub),
        ..FaultyStore::over(env.store.clone())
    }));

    assert_eq!(loader.scan_all().await.unwrap(), 1);
    assert_eq!(
        env.entry(Provider::Jira, "jira_2024_08_22T13_30_00").await.status,
        ProcessStatus::Success
    );
    assert!(env
        .store
        .entry(Provider::GitHub, "github_2024_08_22T13_30_00")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn concurrent_scans_of_one_provider_load_each_file_once() {
    let env = setup("").await;
    for day in 1..=3 {
        env.write(
            Provider::Jira,
            &format!("jira_2024_08_0{}T00_00_00", day),
            &jira_file(&[&jira_row(day, "bug", "1")]),
        );
    }

    let loader = env.loader();
    let (a, b) = tokio::join!(
        loader.scan_provider(Provider::Jira),
        loader.scan_provider(Provider::Jira)
    );
    assert_eq!(a.unwrap() + b.unwrap(), 3);
    assert_eq!(env.store.records(Provider::Jira).await.unwrap().len(), 3);
    assert_eq!(env.store.statistics(Provider::Jira).await.unwrap().success, 3);
}

#[tokio::test]
async fn clickup_mapping_reads_its_own_columns() {
    let env = setup("").await;
    env.write(
        Provider::ClickUp,
        "clickup_2024_08_22T13_30_00",
        &format!(
            "{}\no1,Zeus,t1,Help Wanted,w1,T-1,prod,US-9,4,S3\n",
            CLICKUP_HEADER
        ),
    );

    env.loader().scan_provider(Provider::ClickUp).await.unwrap();
    let records = env.store.records(Provider::ClickUp).await.unwrap();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.label, Some(Label::HelpWanted));
    assert_eq!(r.tag.as_deref(), Some("t1"));
    assert_eq!(r.developer_id.as_deref(), Some("w1"));
    assert_eq!(r.task_number.as_deref(), Some("T-1"));
    assert_eq!(r.task_point, 4);
    assert_eq!(r.sprint.as_deref(), Some("S3"));
}

#[tokio::test]
async fn pending_lists_files_without_loading_them() {
    let env = setup("").await;
    env.write(
        Provider::Jira,
        "jira_2024_08_22T13_30_00",
        &jira_file(&[&jira_row(1, "bug", "1")]),
    );
    env.write(Provider::Jira, "README.txt", "not a snapshot");

    let pending = env.loader().pending(Provider::Jira).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].filename, "jira_2024_08_22T13_30_00");
    assert!(pending[0].path.starts_with(env.tmp.path()));
    assert_eq!(env.store.statistics(Provider::Jira).await.unwrap().total(), 0);
}
