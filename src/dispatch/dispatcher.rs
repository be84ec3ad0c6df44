//! Runs a job's tasks and turns their outputs into a delivered report.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use super::outcome::{FailureCause, JobFailure, JobOutcome};
use super::state::JobState;
use super::task::{ArtifactKind, AuditTask, TaskContext, TaskError, TaskOutput, TaskProduct};
use crate::client::{DeliveryClient, HttpDeliveryClient};
use crate::config::{Config, DispatchConfig};
use crate::error::Result;
use crate::merge::first_meaningful;
use crate::payload::{ReportPayloader, ResultSet};
use crate::store::ArtifactStore;
use crate::types::{AuditDetails, Job};

/// File name the source archive is downloaded to inside a job's work dir.
const ARCHIVE_FILE: &str = "source-archive";

/// Storage reference for one task artifact: `{checksum}-{task}-{full|details}.json`.
///
/// # Examples
///
/// ```
/// use tide_audit::dispatch::{artifact_reference, ArtifactKind};
///
/// assert_eq!(
///     artifact_reference("abc123", "phpcs_wordpress", ArtifactKind::Raw),
///     "abc123-phpcs_wordpress-full.json"
/// );
/// ```
pub fn artifact_reference(checksum: &str, task_id: &str, kind: ArtifactKind) -> String {
    format!("{checksum}-{task_id}-{}.json", kind.suffix())
}

/// Semaphore size for a configured concurrency limit.
fn task_permits(max_concurrency: usize) -> usize {
    max_concurrency.clamp(1, Semaphore::MAX_PERMITS)
}

type Settled = Vec<(String, std::result::Result<TaskOutput, TaskError>)>;

/// Executes audit jobs.
///
/// Tasks of one job run concurrently, bounded by a semaphore shared by every
/// job this dispatcher processes. A failing task never cancels its
/// siblings; the job is only failed when the report cannot be assembled or
/// delivered.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tide_audit::client::HttpDeliveryClient;
/// use tide_audit::dispatch::Dispatcher;
/// use tide_audit::store::MemoryStore;
/// use tide_audit::types::Job;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let dispatcher = Dispatcher::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(HttpDeliveryClient::new()?),
///     "https://tide.example.org/api/tide/v1/audit",
/// );
///
/// let job = Job::new("hello-dolly", "abc123").with_audits(["info"]);
/// match dispatcher.process(job).await {
///     Ok(outcome) => println!("delivered {} bytes", outcome.payload.len()),
///     Err(failure) => eprintln!("{failure}"),
/// }
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher {
    tasks: HashMap<String, Arc<dyn AuditTask>>,
    store: Arc<dyn ArtifactStore>,
    payloader: ReportPayloader<Arc<dyn DeliveryClient>>,
    limiter: Arc<Semaphore>,
    work_dir: PathBuf,
    report_endpoint: String,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tasks", &self.task_ids())
            .field("store", &self.store.kind())
            .field("work_dir", &self.work_dir)
            .field("report_endpoint", &self.report_endpoint)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher with default dispatch settings and no tasks.
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        client: Arc<dyn DeliveryClient>,
        report_endpoint: impl Into<String>,
    ) -> Self {
        let defaults = DispatchConfig::default();
        Self {
            tasks: HashMap::new(),
            store,
            payloader: ReportPayloader::new(client),
            limiter: Arc::new(Semaphore::new(task_permits(defaults.max_concurrency))),
            work_dir: defaults.work_dir,
            report_endpoint: report_endpoint.into(),
        }
    }

    /// Build a dispatcher from configuration.
    ///
    /// The client is not authenticated; see [`Dispatcher::connect`].
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let client = HttpDeliveryClient::with_timeout(config.api.timeout())?;
        Ok(Self::new(
            config.storage.build(),
            Arc::new(client),
            config.api.report_endpoint.clone(),
        )
        .with_dispatch_config(&config.dispatch))
    }

    /// Build a dispatcher from configuration and authenticate its client
    /// when credentials are configured.
    pub async fn connect(config: &Config) -> Result<Self> {
        let dispatcher = Self::from_config(config)?;
        if config.api.has_credentials() {
            dispatcher
                .client()
                .authenticate(
                    &config.api.client_id,
                    &config.api.client_secret,
                    &config.api.auth_endpoint,
                )
                .await?;
        }
        Ok(dispatcher)
    }

    /// Apply concurrency and work-dir settings.
    ///
    /// `max_concurrency` is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn with_dispatch_config(mut self, config: &DispatchConfig) -> Self {
        self.limiter = Arc::new(Semaphore::new(task_permits(config.max_concurrency)));
        self.work_dir = config.work_dir.clone();
        self
    }

    /// Register a task.
    pub fn with_task(mut self, task: impl AuditTask + 'static) -> Self {
        self.register(Arc::new(task));
        self
    }

    /// Register a task, replacing any task with the same id.
    pub fn register(&mut self, task: Arc<dyn AuditTask>) {
        let id = task.id().to_string();
        if self.tasks.insert(id.clone(), task).is_some() {
            tracing::warn!(task = %id, "Replaced previously registered task");
        }
    }

    /// Registered task ids, sorted.
    pub fn task_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// The delivery client.
    pub fn client(&self) -> &Arc<dyn DeliveryClient> {
        self.payloader.client()
    }

    /// The artifact store.
    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Process one job to a terminal state.
    ///
    /// The job moves `Queued -> Running -> Collecting -> Reporting ->
    /// Delivered`, or to `Failed` from any of those. The job's scratch
    /// directory is removed on every exit path.
    pub async fn process(&self, job: Job) -> std::result::Result<JobOutcome, JobFailure> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("job", %run_id, job = %job.label());
        self.process_run(run_id, job).instrument(span).await
    }

    async fn process_run(
        &self,
        run_id: Uuid,
        job: Job,
    ) -> std::result::Result<JobOutcome, JobFailure> {
        let run = JobRun::new(run_id, &job);
        tracing::info!(audits = job.audits.len(), "Job accepted");

        let work_dir = self.work_dir.join(run_id.to_string());
        if let Err(e) = tokio::fs::create_dir_all(&work_dir).await {
            return Err(run.fail(Some(FailureCause::Workspace(e))));
        }

        let result = self.run_in(run, job, &work_dir).await;

        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            tracing::warn!(work_dir = %work_dir.display(), error = %e, "Failed to remove work directory");
        }

        match &result {
            Ok(outcome) => tracing::info!(
                partial_failures = outcome.partial_failures.len(),
                "Job delivered"
            ),
            Err(failure) => tracing::error!(error = %failure, "Job failed"),
        }
        result
    }

    async fn run_in(
        &self,
        mut run: JobRun,
        job: Job,
        work_dir: &Path,
    ) -> std::result::Result<JobOutcome, JobFailure> {
        let archive = match &job.archive_reference {
            Some(reference) => {
                let local = work_dir.join(ARCHIVE_FILE);
                if let Err(error) = self.store.download(reference, &local).await {
                    return Err(run.fail(Some(FailureCause::Download {
                        reference: reference.clone(),
                        error,
                    })));
                }
                Some(local)
            },
            None => None,
        };

        let job = Arc::new(job);
        let ctx = Arc::new(TaskContext {
            job: Arc::clone(&job),
            work_dir: work_dir.to_path_buf(),
            archive,
        });

        run.advance(JobState::Running);
        let settled = self.run_tasks(&ctx).await;

        run.advance(JobState::Collecting);
        let mut outputs = Vec::with_capacity(settled.len());
        for (task_id, result) in settled {
            match result {
                Ok(output) => outputs.push((task_id, output)),
                Err(error) => run.record(FailureCause::Task { task_id, error }),
            }
        }
        for cause in self.upload_artifacts(&job.checksum, &mut outputs).await {
            run.record(cause);
        }
        let results = collect_results(&job, outputs);

        run.advance(JobState::Reporting);
        let payload = match self.payloader.build(&job, &results) {
            Ok(bytes) => bytes,
            Err(e) => return Err(run.fail(Some(FailureCause::Payload(e)))),
        };
        tracing::debug!(bytes = payload.len(), "Report assembled");

        match self.payloader.send(&self.report_endpoint, &payload).await {
            Ok(response) => Ok(run.deliver(payload, response)),
            Err(e) => Err(run.fail(Some(FailureCause::Delivery(e)))),
        }
    }

    /// Spawn every requested task and wait for all of them to settle.
    async fn run_tasks(&self, ctx: &Arc<TaskContext>) -> Settled {
        let mut seen = HashSet::new();
        let handles: Vec<(String, Option<JoinHandle<_>>)> = ctx
            .job
            .audits
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .map(|task_id| {
                let handle = self
                    .tasks
                    .get(task_id)
                    .map(|task| self.spawn_task(Arc::clone(task), Arc::clone(ctx)));
                (task_id.clone(), handle)
            })
            .collect();

        let mut settled = Vec::with_capacity(handles.len());
        for (task_id, handle) in handles {
            let result = match handle {
                None => Err(TaskError::Unregistered(task_id.clone())),
                Some(handle) => match handle.await {
                    Ok(result) => result,
                    Err(e) if e.is_panic() => Err(TaskError::Panicked),
                    Err(e) => Err(TaskError::Failed(e.to_string())),
                },
            };
            match &result {
                Ok(_) => tracing::info!(task = %task_id, "Task completed"),
                Err(e) => tracing::warn!(task = %task_id, error = %e, "Task failed"),
            }
            settled.push((task_id, result));
        }
        settled
    }

    fn spawn_task(
        &self,
        task: Arc<dyn AuditTask>,
        ctx: Arc<TaskContext>,
    ) -> JoinHandle<std::result::Result<TaskOutput, TaskError>> {
        let limiter = Arc::clone(&self.limiter);
        let span = tracing::info_span!("task", task = %task.id());
        tokio::spawn(
            async move {
                let _permit = limiter
                    .acquire_owned()
                    .await
                    .map_err(|_| TaskError::Failed("task pool closed".to_string()))?;
                tracing::debug!("Task started");
                task.run(&ctx).await
            }
            .instrument(span),
        )
    }

    /// Upload every artifact concurrently. Successful uploads rewrite the
    /// owning report's details to point at the stored object.
    async fn upload_artifacts(
        &self,
        checksum: &str,
        outputs: &mut [(String, TaskOutput)],
    ) -> Vec<FailureCause> {
        let mut failures = Vec::new();
        let mut uploads: Vec<(usize, ArtifactKind, String, PathBuf)> = Vec::new();
        for (index, (task_id, output)) in outputs.iter().enumerate() {
            let mut kinds = HashSet::new();
            for artifact in &output.artifacts {
                // One object per reference: a repeated kind would race its sibling.
                if !kinds.insert(artifact.kind) {
                    failures.push(FailureCause::DuplicateArtifact {
                        task_id: task_id.clone(),
                        kind: artifact.kind,
                    });
                    continue;
                }
                uploads.push((
                    index,
                    artifact.kind,
                    artifact_reference(checksum, task_id, artifact.kind),
                    artifact.path.clone(),
                ));
            }
        }

        let store = &self.store;
        let settled = join_all(uploads.into_iter().map(|(index, kind, reference, path)| async move {
            let result = store.upload(&path, &reference).await;
            (index, kind, reference, result)
        }))
        .await;

        for (index, kind, reference, result) in settled {
            match result {
                Ok(()) => {
                    tracing::debug!(reference = %reference, "Artifact uploaded");
                    if let TaskProduct::Report(report) = &mut outputs[index].1.product {
                        let details = AuditDetails::new(
                            self.store.kind(),
                            reference,
                            self.store.collection_ref(),
                        );
                        match kind {
                            ArtifactKind::Raw => report.raw = details,
                            ArtifactKind::Parsed => report.parsed = details,
                        }
                    }
                },
                Err(error) => failures.push(FailureCause::Upload { reference, error }),
            }
        }
        failures
    }
}

/// Fold settled task outputs into a result set, in task-id order.
fn collect_results(job: &Job, mut outputs: Vec<(String, TaskOutput)>) -> ResultSet {
    outputs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut results = ResultSet::new();
    if !job.checksum.is_empty() {
        results.set_checksum(job.checksum.clone());
    }

    let mut infos = Vec::new();
    for (task_id, output) in outputs {
        results.set_overrides(task_id.clone(), output.overrides);
        match output.product {
            TaskProduct::CodeInfo(info) => infos.push(info),
            TaskProduct::Report(report) => {
                results.insert_report(task_id, report);
            },
        }
    }

    if let Some(info) = first_meaningful(&infos).or_else(|| infos.first().cloned()) {
        results.set_code_info(info);
    }
    results
}

/// Bookkeeping for one pass through the state machine.
struct JobRun {
    run_id: Uuid,
    slug: String,
    checksum: String,
    state: JobState,
    started_at: DateTime<Utc>,
    causes: Vec<FailureCause>,
}

impl JobRun {
    fn new(run_id: Uuid, job: &Job) -> Self {
        Self {
            run_id,
            slug: job.slug.clone(),
            checksum: job.checksum.clone(),
            state: JobState::Queued,
            started_at: Utc::now(),
            causes: Vec::new(),
        }
    }

    fn advance(&mut self, next: JobState) {
        if self.state.can_transition_to(next) {
            tracing::debug!(from = %self.state, to = %next, "Job state changed");
            self.state = next;
        } else {
            tracing::error!(from = %self.state, to = %next, "Rejected job state transition");
        }
    }

    fn record(&mut self, cause: FailureCause) {
        tracing::warn!(cause = %cause, "Partial failure recorded");
        self.causes.push(cause);
    }

    fn fail(mut self, cause: Option<FailureCause>) -> JobFailure {
        let stage = self.state;
        self.causes.extend(cause);
        self.advance(JobState::Failed);
        JobFailure {
            run_id: self.run_id,
            slug: self.slug,
            checksum: self.checksum,
            stage,
            causes: self.causes,
            started_at: self.started_at,
            failed_at: Utc::now(),
        }
    }

    fn deliver(mut self, payload: Vec<u8>, response: Vec<u8>) -> JobOutcome {
        self.advance(JobState::Delivered);
        JobOutcome {
            run_id: self.run_id,
            slug: self.slug,
            checksum: self.checksum,
            payload,
            response,
            partial_failures: self.causes,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}
