//! Refinement coordinator: at most one segment rewrite in flight per session,
//! across all segments and jobs.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::JobError;
use crate::job::{segment, JobStatus, TranscriptionJob};
use crate::services::{prompt, RewriteContext, SegmentRewriter};

/// Identifies the refinement currently holding the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    pub job_id: String,
    pub segment_id: String,
}

/// Why a refinement request was not started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declined {
    /// The job is not `Completed`.
    NotCompleted,
    /// No segment with that id in the job.
    UnknownSegment,
    /// Another refinement holds the slot.
    Busy(InFlight),
}

type SharedSlot = Arc<Mutex<Option<InFlight>>>;

/// Proof of holding the refinement slot. Released on drop, whether the
/// rewrite succeeded, failed or panicked.
#[derive(Debug)]
pub struct RefinementTicket {
    slot: SharedSlot,
    in_flight: InFlight,
    context: RewriteContext,
}

impl RefinementTicket {
    pub fn job_id(&self) -> &str {
        &self.in_flight.job_id
    }

    pub fn segment_id(&self) -> &str {
        &self.in_flight.segment_id
    }

    pub fn context(&self) -> &RewriteContext {
        &self.context
    }
}

impl Drop for RefinementTicket {
    fn drop(&mut self) {
        let mut slot = lock(&self.slot);
        if slot.as_ref() == Some(&self.in_flight) {
            *slot = None;
        }
    }
}

pub struct RefinementCoordinator {
    slot: SharedSlot,
    rewriter: Arc<dyn SegmentRewriter>,
}

impl RefinementCoordinator {
    pub fn new(rewriter: Arc<dyn SegmentRewriter>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            rewriter,
        }
    }

    /// The refinement currently in flight, for gating the user-facing layer.
    pub fn in_flight(&self) -> Option<InFlight> {
        lock(&self.slot).clone()
    }

    /// Claim the slot for `segment_id` of `job` and capture its context.
    pub fn begin(&self, job: &TranscriptionJob, segment_id: &str) -> Result<RefinementTicket, Declined> {
        if job.status() != JobStatus::Completed {
            return Err(Declined::NotCompleted);
        }
        let context = gather_context(job, segment_id).ok_or(Declined::UnknownSegment)?;

        let mut slot = lock(&self.slot);
        if let Some(busy) = slot.as_ref() {
            return Err(Declined::Busy(busy.clone()));
        }
        let in_flight = InFlight {
            job_id: job.id().to_string(),
            segment_id: segment_id.to_string(),
        };
        *slot = Some(in_flight.clone());

        Ok(RefinementTicket {
            slot: Arc::clone(&self.slot),
            in_flight,
            context,
        })
    }

    /// Ask the rewriter for the segment's new text. Empty output is a failure.
    pub async fn rewrite(&self, ticket: &RefinementTicket) -> Result<String, JobError> {
        tracing::info!(
            job_id = %ticket.job_id(),
            segment_id = %ticket.segment_id(),
            rewriter = %self.rewriter.name(),
            "Refining segment"
        );
        let raw = self
            .rewriter
            .rewrite(ticket.context())
            .await
            .map_err(JobError::Refinement)?;
        prompt::parse_refined_text(&raw).map_err(JobError::Refinement)
    }
}

/// Topic plus the previous/current/next text of `segment_id`, by store order.
pub fn gather_context(job: &TranscriptionJob, segment_id: &str) -> Option<RewriteContext> {
    let (previous, current, next) = segment::with_neighbours(job.segments(), segment_id)?;
    let topic = job
        .summary()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| job.title())
        .unwrap_or_default()
        .to_string();

    Some(RewriteContext {
        topic,
        previous: previous.map(|s| s.text.clone()),
        current: current.text.clone(),
        next: next.map(|s| s.text.clone()),
    })
}

fn lock(slot: &Mutex<Option<InFlight>>) -> MutexGuard<'_, Option<InFlight>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}
