//! Job lifecycle engine.
//!
//! A submission resolves its inputs, creates a `processing` record, compiles
//! the operation and launches one engine process in the background. The
//! process exit is the only place a job leaves `processing`, except for
//! compilation failures which are committed before anything is launched.

mod progress;
mod runner;

pub use progress::{ProgressReporter, parse_progress_line};
pub use runner::{EngineInvocation, EngineRunner, FfmpegRunner, SIGNAL_EXIT_CODE};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::notification::{
    CallbackTarget, CompletionEvent, CompletionNotifier, Dispatcher,
};
use crate::pipeline::{
    CompileContext, CompiledPipeline, OperationRequest, ResolvedInput, TransientArtifact, compile,
};
use crate::probe::{MediaInfo, MetadataProbe};
use crate::registry::{CallbackRegistration, JobRecord, Registry, TerminalCommit};
use crate::storage::{DeleteOutcome, absolute_path};
use crate::tts::SpeechSynthesizer;
use crate::{Error, Result};

/// Record kind of speech synthesis jobs.
pub const TTS_KIND: &str = "tts";
const DEFAULT_VOICE: &str = "default";

/// Engine settings independent of the collaborators.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub temp_dir: PathBuf,
    pub clip_duration_estimate: f64,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            temp_dir: config.temp_dir.clone(),
            clip_duration_estimate: config.clip_duration_estimate_secs,
        }
    }
}

/// The collaborators a [`JobEngine`] delegates to.
pub struct EngineParts {
    pub runner: Arc<dyn EngineRunner>,
    pub probe: Arc<dyn MetadataProbe>,
    pub notifier: Arc<dyn CompletionNotifier>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

#[derive(Clone)]
pub struct JobEngine {
    registry: Arc<Registry>,
    runner: Arc<dyn EngineRunner>,
    probe: Arc<dyn MetadataProbe>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    dispatcher: Dispatcher,
    tracker: TaskTracker,
    settings: EngineSettings,
}

async fn write_artifacts(dir: &Path, artifacts: &[TransientArtifact]) -> Result<()> {
    if artifacts.is_empty() {
        return Ok(());
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::io_path("creating", dir, e))?;
    for artifact in artifacts {
        tokio::fs::write(&artifact.path, &artifact.contents)
            .await
            .map_err(|e| Error::io_path("writing", &artifact.path, e))?;
    }
    Ok(())
}

async fn remove_artifacts(artifacts: &[TransientArtifact]) {
    for artifact in artifacts {
        match tokio::fs::remove_file(&artifact.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %artifact.path.display(), error = %e, "Failed to remove artifact"),
        }
    }
}

impl JobEngine {
    pub fn new(registry: Arc<Registry>, parts: EngineParts, mut settings: EngineSettings) -> Self {
        settings.temp_dir = absolute_path(settings.temp_dir);
        let tracker = TaskTracker::new();
        Self {
            registry,
            runner: parts.runner,
            probe: parts.probe,
            synthesizer: parts.synthesizer,
            dispatcher: Dispatcher::new(parts.notifier, tracker.clone()),
            tracker,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Submit an operation.
    ///
    /// Reference and callback errors are returned before any record exists.
    /// Compilation errors are returned after the job was committed `failed`.
    /// Otherwise the `processing` record is returned and the engine runs in
    /// the background.
    pub async fn submit(&self, request: OperationRequest) -> Result<JobRecord> {
        let OperationRequest {
            operation,
            callback_url,
        } = request;
        let callback = callback_url
            .as_deref()
            .map(CallbackTarget::parse)
            .transpose()?;

        let paths = operation
            .references()
            .iter()
            .map(|reference| self.registry.resolve_ready(&reference.id))
            .collect::<Result<Vec<_>>>()?;
        let inputs = self.probe_inputs(paths).await;

        let record = self.registry.create_job(operation.kind())?;
        if let Some(target) = callback {
            self.registry.register_callback(&record.id, target)?;
        }

        let ctx = CompileContext {
            job_id: record.id.clone(),
            output: self
                .registry
                .blobs()
                .output_path(&record.id, operation.output_extension()),
            temp_dir: self.settings.temp_dir.clone(),
            clip_duration_estimate: self.settings.clip_duration_estimate,
        };
        let pipeline = match compile(&operation, &inputs, &ctx) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                warn!(job_id = %record.id, kind = operation.kind(), error = %e, "Compilation rejected");
                self.settle(self.registry.fail(&record.id, &e.to_string()));
                return Err(e);
            }
        };

        info!(job_id = %record.id, kind = operation.kind(), "Job started");
        let engine = self.clone();
        let job_id = record.id.clone();
        self.tracker
            .spawn(async move { engine.run_pipeline(job_id, pipeline).await });
        Ok(record)
    }

    /// Submit a speech synthesis job producing a WAV file.
    pub async fn submit_speech(
        &self,
        text: &str,
        voice: Option<&str>,
        callback_url: Option<&str>,
    ) -> Result<JobRecord> {
        if text.trim().is_empty() {
            return Err(Error::validation("text must not be empty"));
        }
        let callback = callback_url.map(CallbackTarget::parse).transpose()?;

        let record = self.registry.create_job(TTS_KIND)?;
        if let Some(target) = callback {
            self.registry.register_callback(&record.id, target)?;
        }

        info!(job_id = %record.id, kind = TTS_KIND, "Job started");
        let engine = self.clone();
        let job_id = record.id.clone();
        let text = text.to_string();
        let voice = voice.unwrap_or(DEFAULT_VOICE).to_string();
        self.tracker.spawn(async move {
            let output = engine.registry.blobs().output_path(&job_id, "wav");
            let outcome = match engine.registry.blobs().ensure_root().await {
                Ok(()) => engine.synthesizer.synthesize(&text, &voice, &output).await,
                Err(e) => Err(e),
            };
            let commit = match outcome {
                Ok(()) => engine.registry.complete(&job_id, output.clone()),
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "Speech synthesis failed");
                    engine.discard_output(&output).await;
                    engine.registry.fail(&job_id, &e.to_string())
                }
            };
            engine.finish(commit, &output).await;
        });
        Ok(record)
    }

    /// Register a completion callback for `id`.
    ///
    /// On a job that already finished the notification is delivered before
    /// this returns.
    pub async fn register_callback(&self, id: &str, url: &str) -> Result<CallbackRegistration> {
        let target = CallbackTarget::parse(url)?;
        let registration = self.registry.register_callback(id, target.clone())?;
        if let CallbackRegistration::DeliverNow(record) = &registration {
            self.dispatcher
                .deliver(&target, &CompletionEvent::from_record(record))
                .await;
        }
        Ok(registration)
    }

    /// Describe a ready asset.
    pub async fn probe_asset(&self, id: &str) -> Result<MediaInfo> {
        let path = self.registry.resolve_ready(id)?;
        self.probe.probe(&path).await
    }

    pub async fn delete(&self, id: &str) -> DeleteOutcome {
        self.registry.delete(id).await
    }

    /// Wait for every running job and pending notification.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Probe every input; failures leave the duration unknown.
    async fn probe_inputs(&self, paths: Vec<PathBuf>) -> Vec<ResolvedInput> {
        join_all(paths.into_iter().map(|path| async move {
            match self.probe.probe(&path).await {
                Ok(MediaInfo {
                    duration: Some(duration),
                    ..
                }) => ResolvedInput::new(path).with_duration(duration),
                Ok(_) => ResolvedInput::new(path),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Probe failed, duration unknown");
                    ResolvedInput::new(path)
                }
            }
        }))
        .await
    }

    async fn execute(&self, job_id: &str, pipeline: &CompiledPipeline) -> Result<i32> {
        self.registry.blobs().ensure_root().await?;
        write_artifacts(&self.settings.temp_dir, &pipeline.artifacts).await?;
        let invocation = EngineInvocation {
            args: pipeline.to_args(),
            working_dir: None,
        };
        let progress =
            ProgressReporter::new(self.registry.clone(), job_id, pipeline.expected_duration);
        self.runner.run(&invocation, &progress).await
    }

    async fn run_pipeline(self, job_id: String, pipeline: CompiledPipeline) {
        let started = Instant::now();
        let outcome = self.execute(&job_id, &pipeline).await;
        remove_artifacts(&pipeline.artifacts).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let commit = match outcome {
            Ok(0) => {
                info!(job_id = %job_id, elapsed_ms, "Job finished");
                self.registry.complete(&job_id, pipeline.output.clone())
            }
            Ok(exit_code) => {
                let e = Error::EngineExecution { exit_code };
                warn!(job_id = %job_id, exit_code, elapsed_ms, "Job failed");
                self.discard_output(&pipeline.output).await;
                self.registry.fail(&job_id, &e.to_string())
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Engine run failed");
                self.discard_output(&pipeline.output).await;
                self.registry.fail(&job_id, &e.to_string())
            }
        };
        self.finish(commit, &pipeline.output).await;
    }

    /// Settle a background terminal commit. A job deleted while running has
    /// no record left to commit to; its output is discarded.
    async fn finish(&self, commit: Result<TerminalCommit>, output: &Path) {
        match commit {
            Err(e) if e.is_reference() => {
                debug!(output = %output.display(), "Job deleted while running, discarding output");
                self.discard_output(output).await;
            }
            commit => self.settle(commit),
        }
    }

    /// Remove whatever the engine or synthesizer left at `output`. A failed
    /// record has no path, so nothing else would ever delete it.
    async fn discard_output(&self, output: &Path) {
        match self.registry.blobs().delete(output).await {
            Ok(DeleteOutcome::Removed) => debug!(output = %output.display(), "Discarded output"),
            Ok(DeleteOutcome::AlreadyAbsent) => {}
            Err(e) => warn!(output = %output.display(), error = %e, "Failed to discard output"),
        }
    }

    /// Dispatch the notification owed by a terminal commit, if any.
    fn settle(&self, commit: Result<TerminalCommit>) {
        match commit {
            Ok(TerminalCommit {
                record,
                callback: Some(target),
            }) => self
                .dispatcher
                .dispatch(target, CompletionEvent::from_record(&record)),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Terminal commit rejected"),
        }
    }
}
