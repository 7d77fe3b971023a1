//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mediaforge::engine::{EngineInvocation, EngineParts, EngineRunner, EngineSettings, JobEngine, ProgressReporter};
use mediaforge::notification::{CallbackTarget, CompletionEvent, CompletionNotifier};
use mediaforge::probe::{MediaInfo, MetadataProbe};
use mediaforge::registry::Registry;
use mediaforge::storage::BlobStore;
use mediaforge::tts::SimulatedSynthesizer;
use mediaforge::{Error, Result};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::Semaphore;

/// Engine stand-in: records invocations and writes the output file.
pub struct FakeRunner {
    pub exit_code: i32,
    /// When set, every run waits for one permit before exiting.
    pub gate: Option<Arc<Semaphore>>,
    pub invocations: Mutex<Vec<EngineInvocation>>,
    /// Contents of concat list files, read while the engine was running.
    pub concat_lists: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn exiting(exit_code: i32) -> Self {
        Self {
            exit_code,
            gate: None,
            invocations: Mutex::new(Vec::new()),
            concat_lists: Mutex::new(Vec::new()),
        }
    }

    pub fn gated(exit_code: i32, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::exiting(exit_code)
        }
    }

    pub fn args(&self) -> Vec<Vec<String>> {
        self.invocations
            .lock()
            .iter()
            .map(|i| i.args.clone())
            .collect()
    }
}

#[async_trait]
impl EngineRunner for FakeRunner {
    async fn run(&self, invocation: &EngineInvocation, progress: &ProgressReporter) -> Result<i32> {
        self.invocations.lock().push(invocation.clone());
        for arg in &invocation.args {
            if arg.ends_with("concat.txt") {
                let list = tokio::fs::read_to_string(arg).await?;
                self.concat_lists.lock().push(list);
            }
        }

        progress.report_line("out_time_us=1000000");
        if let Some(gate) = &self.gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }

        // The real engine creates its output up front and leaves a partial
        // file behind when it fails.
        if let Some(output) = invocation.args.last() {
            let contents: &[u8] = if self.exit_code == 0 { b"rendered" } else { b"partial" };
            tokio::fs::write(output, contents).await?;
        }
        Ok(self.exit_code)
    }
}

/// Probe answering from a fixed duration, or failing for every file.
pub struct FakeProbe {
    pub duration: Option<f64>,
}

#[async_trait]
impl MetadataProbe for FakeProbe {
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        match self.duration {
            Some(duration) => Ok(MediaInfo {
                duration: Some(duration),
                codec_name: Some("h264".into()),
                ..MediaInfo::default()
            }),
            None => Err(Error::Probe(format!("cannot read {}", path.display()))),
        }
    }
}

/// Notifier keeping every event it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, CompletionEvent)>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<(String, CompletionEvent)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl CompletionNotifier for RecordingNotifier {
    async fn notify(&self, target: &CallbackTarget, event: &CompletionEvent) -> Result<()> {
        self.sent
            .lock()
            .push((target.url.to_string(), event.clone()));
        Ok(())
    }
}

pub struct Harness {
    pub engine: JobEngine,
    pub runner: Arc<FakeRunner>,
    pub notifier: Arc<RecordingNotifier>,
    pub storage: PathBuf,
    pub temp: PathBuf,
    _dir: TempDir,
}

impl Harness {
    pub fn new(runner: FakeRunner, probed_duration: Option<f64>) -> Self {
        let dir = TempDir::new().unwrap();
        let storage = dir.path().join("storage");
        let temp = dir.path().join("tmp");
        let runner = Arc::new(runner);
        let notifier = Arc::new(RecordingNotifier::default());

        let registry = Arc::new(Registry::in_memory(BlobStore::new(&storage)));
        let engine = JobEngine::new(
            registry,
            EngineParts {
                runner: runner.clone(),
                probe: Arc::new(FakeProbe {
                    duration: probed_duration,
                }),
                notifier: notifier.clone(),
                synthesizer: Arc::new(SimulatedSynthesizer::new(Duration::ZERO)),
            },
            EngineSettings {
                temp_dir: temp.clone(),
                clip_duration_estimate: 5.0,
            },
        );

        Self {
            engine,
            runner,
            notifier,
            storage,
            temp,
            _dir: dir,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.engine.registry()
    }

    /// Store `bytes` as a ready upload and return its id.
    pub async fn upload(&self, extension: &str, bytes: &[u8]) -> String {
        let registry = self.registry();
        registry.blobs().ensure_root().await.unwrap();
        let id = registry.allocate_id();
        let path = registry.blobs().create(&id, extension, bytes).await.unwrap();
        registry.create_upload(id.clone(), path).unwrap();
        id
    }

    pub fn path_of(&self, id: &str) -> PathBuf {
        self.registry().resolve_ready(id).unwrap()
    }
}

/// Record-count snapshot by status label.
pub fn status_counts(registry: &Registry) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for record in registry.list() {
        *counts.entry(record.status.to_string()).or_default() += 1;
    }
    counts
}
