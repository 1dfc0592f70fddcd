//! # Result Aggregator Module
//!
//! Unico proprietario di `BatchProgress`: riceve gli `Outcome` dal canale dei worker,
//! li somma uno alla volta nell'ordine di arrivo e pubblica uno snapshot dopo ogni fold.
//! I worker non toccano mai lo stato condiviso, quindi non serve alcun lock.

use crate::{
    outcome::{Outcome, OutcomeStatus},
    progress::BatchProgress,
};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Single writer of the batch totals
pub struct Aggregator {
    progress: BatchProgress,
    snapshot_sender: watch::Sender<BatchProgress>,
    outcome_sender: mpsc::UnboundedSender<Outcome>,
}

impl Aggregator {
    /// Returns the aggregator plus the snapshot and outcome streams observers read from
    pub fn new(
        progress: BatchProgress,
    ) -> (Self, watch::Receiver<BatchProgress>, mpsc::UnboundedReceiver<Outcome>) {
        let (snapshot_sender, snapshot_receiver) = watch::channel(progress.clone());
        let (outcome_sender, outcome_receiver) = mpsc::unbounded_channel();

        let aggregator = Self {
            progress,
            snapshot_sender,
            outcome_sender,
        };
        (aggregator, snapshot_receiver, outcome_receiver)
    }

    /// Fold one outcome and publish the new snapshot
    pub fn fold(&mut self, outcome: Outcome) {
        self.progress.fold(&outcome);

        match outcome.status {
            OutcomeStatus::Failed => warn!("{} {}", outcome.status.label(), outcome.message),
            _ => info!("{} {}", outcome.status.label(), outcome.message),
        }

        self.snapshot_sender.send_replace(self.progress.clone());
        // Observers may have gone away; the totals still count the outcome
        let _ = self.outcome_sender.send(outcome);
    }

    /// Consume outcomes until every sender is dropped, then return the final totals
    pub async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Outcome>) -> BatchProgress {
        while let Some(outcome) = receiver.recv().await {
            self.fold(outcome);
        }

        if !self.progress.is_complete() {
            warn!(
                "Outcome stream closed after {} of {} jobs",
                self.progress.completed_jobs, self.progress.total_jobs
            );
        }

        self.progress.finish();
        self.snapshot_sender.send_replace(self.progress.clone());
        self.progress
    }
}
