//! Shared test helpers: bundle and container fixtures, fake capabilities, and
//! orchestrator construction over a temporary database.

use crate::config::Config;
use crate::container::ZipContainerReader;
use crate::importer::Importer;
use crate::notify::Notifier;
use crate::orchestrator::{Capabilities, ImportOrchestrator};
use crate::probe::PackageProbe;
use crate::types::{
    BundleEntry, DrainSummary, ImportJobId, ImportOutcome, ImportSignal, QueueSnapshot,
};
use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

// --- fixtures ---

/// Write a zip archive holding the given `(name, contents)` members
pub(crate) fn write_zip(path: &Path, members: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for (name, contents) in members {
        writer
            .start_file(*name, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap();
}

/// One tar entry: a file with contents, or a directory
pub(crate) enum TarItem<'a> {
    File(&'a str, &'a [u8]),
    Dir(&'a str),
}

/// Uncompressed tar stream of `items`, terminated by two zero blocks
pub(crate) fn tar_bytes(items: &[TarItem<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    for item in items {
        let (name, contents, typeflag) = match item {
            TarItem::File(name, contents) => (*name, *contents, b'0'),
            TarItem::Dir(name) => (*name, &[][..], b'5'),
        };
        out.extend_from_slice(&tar_header(name, contents.len() as u64, typeflag));
        out.extend_from_slice(contents);
        let rem = contents.len() % 512;
        if rem != 0 {
            out.extend(std::iter::repeat_n(0u8, 512 - rem));
        }
    }
    out.extend_from_slice(&[0u8; 1024]);
    out
}

fn tar_header(name: &str, size: u64, typeflag: u8) -> [u8; 512] {
    let mut header = [0u8; 512];
    header[..name.len()].copy_from_slice(name.as_bytes());
    header[100..108].copy_from_slice(b"0000644\0");
    header[108..116].copy_from_slice(b"0000000\0");
    header[116..124].copy_from_slice(b"0000000\0");
    let size = format!("{size:011o}\0");
    header[124..136].copy_from_slice(size.as_bytes());
    header[136..148].copy_from_slice(b"00000000000\0");
    header[148..156].copy_from_slice(b"        ");
    header[156] = typeflag;
    header[257..263].copy_from_slice(b"ustar\0");
    header[263..265].copy_from_slice(b"00");
    let checksum: u32 = header.iter().map(|&b| u32::from(b)).sum();
    let checksum = format!("{checksum:06o}\0 ");
    header[148..156].copy_from_slice(checksum.as_bytes());
    header
}

/// Gzip-compress `data`
pub(crate) fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Bundle bytes holding one `(guid, pathname, asset)` triple per asset
pub(crate) fn bundle_bytes(assets: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let names: Vec<(String, String)> = assets
        .iter()
        .map(|(guid, _, _)| (format!("{guid}/pathname"), format!("{guid}/asset")))
        .collect();
    let mut items = Vec::new();
    for ((_, pathname, asset), (pathname_name, asset_name)) in assets.iter().zip(&names) {
        items.push(TarItem::File(pathname_name, pathname.as_bytes()));
        items.push(TarItem::File(asset_name, asset));
    }
    gzip(&tar_bytes(&items))
}

/// Bundle bytes declaring the given dependencies in a package descriptor
pub(crate) fn bundle_with_dependencies(dependencies: &[(&str, &str)]) -> Vec<u8> {
    let map: serde_json::Map<String, serde_json::Value> = dependencies
        .iter()
        .map(|(id, version)| (id.to_string(), serde_json::Value::from(*version)))
        .collect();
    let config = serde_json::json!({ "vpmDependencies": map }).to_string();
    bundle_bytes(&[
        ("0a1b2c", "Assets/Tools/readme.txt", b"hello"),
        ("9f8e7d", "Assets/Tools/config.json", config.as_bytes()),
    ])
}

/// Write a bundle without a descriptor to `dir/name` and return its path
pub(crate) fn write_plain_bundle(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bundle_bytes(&[("0a1b2c", "Assets/a.txt", b"a")])).unwrap();
    path
}

// --- fake capabilities ---

/// Importer that records calls and resolves jobs only when told to
pub(crate) struct FakeImporter {
    signal_tx: broadcast::Sender<ImportSignal>,
    next_job: AtomicU64,
    calls: Mutex<Vec<(PathBuf, bool, ImportJobId)>>,
    fail_launch: AtomicBool,
    hang: AtomicBool,
    confirm: Mutex<Option<bool>>,
}

impl FakeImporter {
    pub(crate) fn new() -> Arc<Self> {
        let (signal_tx, _rx) = broadcast::channel(64);
        Arc::new(Self {
            signal_tx,
            next_job: AtomicU64::new(1),
            calls: Mutex::new(vec![]),
            fail_launch: AtomicBool::new(false),
            hang: AtomicBool::new(false),
            confirm: Mutex::new(None),
        })
    }

    /// Every `(path, interactive, job)` call so far
    pub(crate) fn calls(&self) -> Vec<(PathBuf, bool, ImportJobId)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn last_job(&self) -> ImportJobId {
        self.calls.lock().unwrap().last().unwrap().2
    }

    /// Make subsequent `import` calls fail to launch
    pub(crate) fn set_fail_launch(&self, fail: bool) {
        self.fail_launch.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `import` calls record themselves and never return
    pub(crate) fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    /// Answer for `confirm_imported`
    pub(crate) fn set_confirm(&self, answer: Option<bool>) {
        *self.confirm.lock().unwrap() = answer;
    }

    /// Send an outcome; nobody listening is fine
    pub(crate) fn signal(&self, job: ImportJobId, outcome: ImportOutcome) {
        self.signal_tx.send(ImportSignal { job, outcome }).ok();
    }

    pub(crate) fn complete_last(&self) {
        self.signal(self.last_job(), ImportOutcome::Completed);
    }

    pub(crate) fn fail_last(&self, message: &str) {
        self.signal(
            self.last_job(),
            ImportOutcome::Failed {
                message: message.to_string(),
            },
        );
    }

    pub(crate) fn cancel_last(&self) {
        self.signal(self.last_job(), ImportOutcome::Cancelled);
    }
}

#[async_trait]
impl Importer for FakeImporter {
    fn subscribe(&self) -> broadcast::Receiver<ImportSignal> {
        self.signal_tx.subscribe()
    }

    async fn import(&self, path: &Path, interactive: bool) -> crate::Result<ImportJobId> {
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(crate::Error::Import("host refused the call".into()));
        }
        let job = ImportJobId(self.next_job.fetch_add(1, Ordering::SeqCst));
        self.calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), interactive, job));
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(job)
    }

    async fn confirm_imported(&self, _entry: &BundleEntry) -> Option<bool> {
        *self.confirm.lock().unwrap()
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Notifier that records every summary it receives
#[derive(Default)]
pub(crate) struct CountingNotifier {
    summaries: Mutex<Vec<DrainSummary>>,
}

impl CountingNotifier {
    pub(crate) fn count(&self) -> usize {
        self.summaries.lock().unwrap().len()
    }

    pub(crate) fn last(&self) -> Option<DrainSummary> {
        self.summaries.lock().unwrap().last().copied()
    }
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn notify(&self, summary: &DrainSummary) {
        self.summaries.lock().unwrap().push(*summary);
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Probe reporting a mutable set of installed packages
#[derive(Default)]
pub(crate) struct FakeProbe {
    installed: Mutex<Vec<String>>,
}

impl FakeProbe {
    pub(crate) fn install(&self, package_id: &str) {
        self.installed.lock().unwrap().push(package_id.to_string());
    }
}

impl PackageProbe for FakeProbe {
    fn is_installed(&self, package_id: &str) -> bool {
        self.installed.lock().unwrap().iter().any(|p| p == package_id)
    }
}

// --- orchestrator harness ---

/// Orchestrator wired to fakes, sharing one temp directory across restarts
pub(crate) struct Harness {
    pub(crate) dir: tempfile::TempDir,
    pub(crate) importer: Arc<FakeImporter>,
    pub(crate) notifier: Arc<CountingNotifier>,
    pub(crate) probe: Arc<FakeProbe>,
    pub(crate) orchestrator: ImportOrchestrator,
}

impl Harness {
    pub(crate) async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let importer = FakeImporter::new();
        let notifier = Arc::new(CountingNotifier::default());
        let probe = Arc::new(FakeProbe::default());
        let orchestrator = open_orchestrator(dir.path(), &importer, &notifier, &probe).await;
        Self {
            dir,
            importer,
            notifier,
            probe,
            orchestrator,
        }
    }

    /// Abandon the orchestrator mid-run and open a new one over the same
    /// database, as after a crash
    pub(crate) async fn restart(&mut self) {
        self.restart_with(FakeImporter::new()).await;
    }

    /// Like [`restart`](Self::restart), with a prepared importer
    pub(crate) async fn restart_with(&mut self, importer: Arc<FakeImporter>) {
        self.orchestrator.suspend().await.unwrap();
        self.reopen_with(importer).await;
    }

    /// Open a new orchestrator over the same database
    pub(crate) async fn reopen_with(&mut self, importer: Arc<FakeImporter>) {
        self.importer = importer;
        self.orchestrator =
            open_orchestrator(self.dir.path(), &self.importer, &self.notifier, &self.probe).await;
    }

    pub(crate) fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a plain bundle into the harness directory
    pub(crate) fn bundle(&self, name: &str) -> PathBuf {
        write_plain_bundle(self.dir.path(), name)
    }

    pub(crate) async fn snapshot(&self) -> QueueSnapshot {
        self.orchestrator.snapshot().await
    }

    /// Poll until the snapshot satisfies `check`, failing after two seconds
    pub(crate) async fn wait_until<F>(&self, mut check: F) -> QueueSnapshot
    where
        F: FnMut(&QueueSnapshot) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let snapshot = self.snapshot().await;
            if check(&snapshot) {
                return snapshot;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not reached; last snapshot: {snapshot:?}"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Wait until the fake importer has received `n` calls
    pub(crate) async fn wait_for_calls(&self, n: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while self.importer.call_count() < n {
            assert!(
                tokio::time::Instant::now() < deadline,
                "expected {n} import calls, got {}",
                self.importer.call_count()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

pub(crate) fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = dir.join("queue.db");
    config.import.temp_dir = dir.join("temp");
    config
}

pub(crate) fn fake_capabilities(
    importer: &Arc<FakeImporter>,
    notifier: &Arc<CountingNotifier>,
    probe: &Arc<FakeProbe>,
) -> Capabilities {
    Capabilities {
        importer: importer.clone(),
        containers: Arc::new(ZipContainerReader),
        notifier: notifier.clone(),
        probe: probe.clone(),
    }
}

async fn open_orchestrator(
    dir: &Path,
    importer: &Arc<FakeImporter>,
    notifier: &Arc<CountingNotifier>,
    probe: &Arc<FakeProbe>,
) -> ImportOrchestrator {
    ImportOrchestrator::with_capabilities(
        test_config(dir),
        fake_capabilities(importer, notifier, probe),
    )
    .await
    .unwrap()
}
