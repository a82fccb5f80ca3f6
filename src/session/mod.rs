//! The session: the single live job, the signed-in user, the history
//! ledger and the notification slot, with every operation the user-facing
//! layer can perform on them.
//!
//! State is replaced as whole values under a short-lived lock that is never
//! held across an await, so a reader always sees a consistent job. Two
//! single-flight guards provide the only mutual exclusion: the submission
//! flag (one job processing at a time) and the refinement slot.

pub mod notify;
pub mod refine;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::{ErrorKind, JobError};
use crate::history::HistoryLedger;
use crate::identity::{IdentityStore, User};
use crate::job::{link, segment, JobStatus, SegmentPatch, TranscriptionJob, VideoMetadata};
use crate::services::{GeneratedTranscript, Services};
use crate::store::RecordStore;

use notify::{Notification, Notifier};
use refine::{Declined, InFlight, RefinementCoordinator};

pub const INVALID_LINK_MESSAGE: &str = "Please provide a valid YouTube URL.";
pub const GENERATION_FAILED_MESSAGE: &str =
    "Unable to process this video. Try a shorter clip or public video.";
pub const REFINED_MESSAGE: &str = "Refined successfully";
pub const REFINE_FAILED_MESSAGE: &str = "Refining failed. Please try again.";
pub const DELETED_MESSAGE: &str = "Project deleted from studio.";
pub const SIGNED_OUT_MESSAGE: &str = "Successfully signed out.";

const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_secs(4);

/// Result of `Session::submit`.
#[must_use]
#[derive(Debug)]
pub enum SubmitOutcome {
    /// A job was created in `Processing`; the handle resolves to its final status.
    Started {
        job_id: String,
        handle: JoinHandle<JobStatus>,
    },
    /// The link was invalid. No job was created.
    Rejected,
    /// Empty input, or another submission is still processing.
    Ignored,
}

/// Result of `Session::refine`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefineOutcome {
    /// The segment's text was replaced with this.
    Refined(String),
    /// The rewriter failed; the segment is unchanged.
    Failed,
    /// Another refinement is in flight.
    Busy(InFlight),
    /// No live completed job, or no such segment.
    Ignored,
}

#[derive(Debug, Default)]
struct SessionState {
    user: Option<User>,
    job: Option<TranscriptionJob>,
    submitting: bool,
}

pub struct Session {
    state: Mutex<SessionState>,
    history: HistoryLedger,
    identity: IdentityStore,
    notifier: Notifier,
    refinement: RefinementCoordinator,
    services: Services,
}

impl Session {
    /// A session that keeps nothing between runs.
    pub fn in_memory(services: Services) -> Self {
        Self::build(services, HistoryLedger::in_memory(), IdentityStore::in_memory())
    }

    /// A session restored from `store`: the saved user and history, each
    /// treated as absent if unreadable.
    pub fn restore(services: Services, store: RecordStore) -> Self {
        let history = HistoryLedger::open(store.clone());
        let identity = IdentityStore::new(store);
        let session = Self::build(services, history, identity);
        let user = session.identity.load();
        if let Some(user) = &user {
            tracing::debug!(user = %user.name, "Restored signed-in user");
        }
        session.lock_state().user = user;
        session
    }

    fn build(services: Services, history: HistoryLedger, identity: IdentityStore) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            history,
            identity,
            notifier: Notifier::new(DEFAULT_NOTIFICATION_DURATION),
            refinement: RefinementCoordinator::new(Arc::clone(&services.rewriter)),
            services,
        }
    }

    pub fn with_notification_duration(mut self, display_for: Duration) -> Self {
        self.notifier = Notifier::new(display_for);
        self
    }

    // --- Observers ---

    pub fn current_job(&self) -> Option<TranscriptionJob> {
        self.lock_state().job.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.lock_state().user.clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.lock_state().submitting
    }

    pub fn refining(&self) -> Option<InFlight> {
        self.refinement.in_flight()
    }

    pub fn notification(&self) -> Option<Notification> {
        self.notifier.current()
    }

    pub fn history(&self) -> Vec<TranscriptionJob> {
        self.history.list()
    }

    // --- Job lifecycle ---

    /// Validate `url` and, if it is a video link, start a job for it.
    ///
    /// The job is visible as `Processing` as soon as this returns; metadata
    /// lookup and transcript generation run on a spawned task. Must be
    /// called from within a Tokio runtime.
    pub fn submit(self: &Arc<Self>, url: &str) -> SubmitOutcome {
        let url = url.trim();
        if url.is_empty() {
            return SubmitOutcome::Ignored;
        }

        let job = {
            let mut state = self.lock_state();
            if state.submitting {
                tracing::debug!("Submission already in flight, ignoring");
                return SubmitOutcome::Ignored;
            }
            let Some(video_id) = link::extract_video_id(url) else {
                drop(state);
                let err = JobError::InvalidInput(url.to_string());
                tracing::info!("{}", err);
                self.notifier.failure(err.kind(), INVALID_LINK_MESSAGE);
                return SubmitOutcome::Rejected;
            };

            let job = TranscriptionJob::start(
                new_job_id(),
                VideoMetadata::placeholder(&video_id, url),
                now_millis(),
            );
            state.submitting = true;
            state.job = Some(job.clone());
            job
        };

        tracing::info!(job_id = %job.id(), url, "Job submitted");
        let job_id = job.id().to_string();
        let session = Arc::clone(self);
        let url = url.to_string();
        let handle = tokio::spawn(async move {
            let status = session.enrich(job, &url).await;
            session.lock_state().submitting = false;
            status
        });

        SubmitOutcome::Started { job_id, handle }
    }

    /// Metadata lookup then transcript generation for a freshly started job.
    async fn enrich(&self, job: TranscriptionJob, url: &str) -> JobStatus {
        let job = match self.resolve_metadata(&job, url).await {
            Ok(video) => {
                let job = job.with_video(video);
                self.replace_live(&job);
                job
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id(), "{}; continuing with placeholder metadata", e);
                job
            }
        };

        let title = job.title().unwrap_or_default().to_string();
        match self.generate(url, &title).await {
            Ok(generated) => {
                let completed =
                    job.complete(generated.segments, generated.summary, now_millis());
                let signed_in = {
                    let mut state = self.lock_state();
                    if is_live(&state, completed.id()) {
                        state.job = Some(completed.clone());
                    }
                    state.user.is_some()
                };
                tracing::info!(
                    job_id = %completed.id(),
                    segments = completed.segments().len(),
                    "Job completed"
                );
                // Appended exactly once, here, at the completion transition.
                if signed_in {
                    self.history.append(completed);
                }
                JobStatus::Completed
            }
            Err(e) => {
                tracing::error!(job_id = %job.id(), "{}", e);
                self.replace_live(&job.fail());
                self.notifier.failure(e.kind(), GENERATION_FAILED_MESSAGE);
                JobStatus::Error
            }
        }
    }

    async fn resolve_metadata(
        &self,
        job: &TranscriptionJob,
        url: &str,
    ) -> Result<VideoMetadata, JobError> {
        let resolved = self
            .services
            .metadata
            .resolve(url)
            .await
            .map_err(JobError::MetadataFetch)?;
        let placeholder = job
            .video()
            .cloned()
            .unwrap_or_else(|| VideoMetadata::placeholder("", url));
        Ok(placeholder.resolved(resolved.title, resolved.author, resolved.thumbnail))
    }

    async fn generate(&self, url: &str, title: &str) -> Result<GeneratedTranscript, JobError> {
        tracing::info!(generator = %self.services.generator.name(), title, "Generating transcript");
        let generated = self
            .services
            .generator
            .generate(url, title)
            .await
            .map_err(JobError::Generation)?;
        segment::check_ids(&generated.segments).map_err(|reason| {
            JobError::Generation(crate::error::ServiceError::InvalidResponse(reason))
        })?;
        Ok(generated)
    }

    /// Discard the live job. A job still processing keeps running and is
    /// saved to history on completion, but no longer becomes live.
    pub fn reset(&self) {
        if let Some(job) = self.lock_state().job.take() {
            tracing::debug!(job_id = %job.id(), "Discarded live job");
        }
    }

    // --- Segment edits ---

    /// Edit a segment of the live job and sync the edit into its history
    /// entry. Returns the updated live job; unknown segment ids change nothing.
    ///
    /// The history entry is updated while the state lock is held, so
    /// concurrent edits land in the same order in both.
    pub fn update_segment(&self, segment_id: &str, patch: &SegmentPatch) -> Option<TranscriptionJob> {
        let mut state = self.lock_state();
        let job = state.job.as_ref()?;
        if patch.is_empty() || job.segment(segment_id).is_none() {
            return Some(job.clone());
        }
        let updated = job.with_segment_update(segment_id, patch);
        state.job = Some(updated.clone());
        self.history
            .sync_update(updated.id(), |entry| entry.with_segment_update(segment_id, patch));
        Some(updated)
    }

    /// Rewrite one segment of the live job with the rewriter.
    ///
    /// Only one refinement runs at a time across the session. On success
    /// only the segment's text changes, in the live job (if it is still
    /// live) and in its history entry. If the user edited the same text
    /// while the rewrite was in flight, the rewrite wins.
    pub async fn refine(&self, segment_id: &str) -> RefineOutcome {
        let Some(job) = self.current_job() else {
            return RefineOutcome::Ignored;
        };
        let ticket = match self.refinement.begin(&job, segment_id) {
            Ok(ticket) => ticket,
            Err(Declined::Busy(in_flight)) => {
                tracing::debug!(?in_flight, "Refinement already in flight");
                return RefineOutcome::Busy(in_flight);
            }
            Err(reason) => {
                tracing::debug!(?reason, segment_id, "Refinement not started");
                return RefineOutcome::Ignored;
            }
        };

        match self.refinement.rewrite(&ticket).await {
            Ok(text) => {
                let patch = SegmentPatch::text(text.clone());
                {
                    let mut state = self.lock_state();
                    if let Some(live) = state.job.as_ref().filter(|j| j.id() == job.id()) {
                        let updated = live.with_segment_update(segment_id, &patch);
                        state.job = Some(updated);
                    }
                    self.history
                        .sync_update(job.id(), |entry| entry.with_segment_update(segment_id, &patch));
                }
                self.notifier.success(REFINED_MESSAGE);
                RefineOutcome::Refined(text)
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id(), segment_id, "{}", e);
                self.notifier.failure(ErrorKind::RefinementFailure, REFINE_FAILED_MESSAGE);
                RefineOutcome::Failed
            }
        }
    }

    // --- History ---

    /// Make a saved job the live job.
    pub fn open(&self, job_id: &str) -> Option<TranscriptionJob> {
        let job = self.history.get(job_id)?;
        self.lock_state().job = Some(job.clone());
        tracing::debug!(job_id, "Opened job from history");
        Some(job)
    }

    /// Remove a saved job. Notifies only when an entry was removed.
    pub fn delete(&self, job_id: &str) -> bool {
        let removed = self.history.remove(job_id);
        if removed {
            self.notifier.info(DELETED_MESSAGE);
        }
        removed
    }

    // --- Identity ---

    /// Sign in with a display-only identity. Blank fields take defaults.
    pub fn sign_in(&self, name: &str, email: &str) -> User {
        let user = User::new(name, email);
        self.identity.save(&user);
        self.lock_state().user = Some(user.clone());
        self.notifier
            .success(format!("Welcome, {}!", user.first_name()));
        user
    }

    pub fn sign_out(&self) {
        self.lock_state().user = None;
        self.identity.clear();
        self.notifier.info(SIGNED_OUT_MESSAGE);
    }

    // --- Helpers ---

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the live job with `job` if the live job is still that job.
    fn replace_live(&self, job: &TranscriptionJob) {
        let mut state = self.lock_state();
        if is_live(&state, job.id()) {
            state.job = Some(job.clone());
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &*self.lock_state())
            .field("history_len", &self.history.len())
            .field("services", &self.services)
            .finish()
    }
}

fn is_live(state: &SessionState, job_id: &str) -> bool {
    state.job.as_ref().is_some_and(|j| j.id() == job_id)
}

fn new_job_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
