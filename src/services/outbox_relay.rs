//! # Outbox Relay
//!
//! Background dispatcher for outbox rows that missed their immediate
//! publish, usually because the broker was unreachable when the schedule
//! was created.

use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::RelaySettings;
use crate::messaging::Broker;
use crate::models::OutboxMessage;

/// Outcome of one relay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub dispatched: usize,
    pub failed: usize,
}

impl RelayReport {
    /// True when the pass found nothing to do
    pub fn is_idle(&self) -> bool {
        self.dispatched == 0 && self.failed == 0
    }
}

/// Polls the outbox table and publishes pending rows.
///
/// Each pass claims a batch with `FOR UPDATE SKIP LOCKED` and records every
/// outcome inside the claiming transaction, so concurrent relay instances
/// never fight over rows. A pass that dies between publish and commit leaves
/// its rows pending and they are published again later; delivery is
/// at-least-once and consumers must tolerate duplicates.
#[derive(Debug, Clone)]
pub struct OutboxRelay {
    pool: PgPool,
    broker: Arc<dyn Broker>,
    settings: RelaySettings,
}

impl OutboxRelay {
    /// Create a new relay over the given pool and broker
    pub fn new(pool: PgPool, broker: Arc<dyn Broker>, settings: RelaySettings) -> Self {
        Self {
            pool,
            broker,
            settings,
        }
    }

    /// Claim and dispatch one batch of pending rows.
    ///
    /// Broker failures are recorded per row and counted in the report;
    /// only database problems abort the pass.
    pub async fn run_once(&self) -> Result<RelayReport, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let batch = OutboxMessage::claim_pending(&mut tx, self.settings.batch_size).await?;

        if batch.is_empty() {
            tx.rollback().await?;
            return Ok(RelayReport::default());
        }

        debug!(claimed = batch.len(), "Relay claimed outbox batch");

        let mut report = RelayReport::default();
        for message in &batch {
            match self
                .broker
                .publish(&message.exchange, &message.routing_key, &message.payload)
                .await
            {
                Ok(()) => {
                    OutboxMessage::mark_dispatched(&mut *tx, message.id).await?;
                    debug!(
                        outbox_id = message.id,
                        schedule_id = message.schedule_id,
                        "Outbox row dispatched"
                    );
                    report.dispatched += 1;
                }
                Err(e) => {
                    OutboxMessage::record_failure(&mut *tx, message.id, &e.to_string()).await?;
                    warn!(
                        outbox_id = message.id,
                        schedule_id = message.schedule_id,
                        attempts = message.attempts + 1,
                        error = %e,
                        "Outbox dispatch failed"
                    );
                    report.failed += 1;
                }
            }
        }

        tx.commit().await?;
        Ok(report)
    }

    /// Number of rows still awaiting dispatch
    pub async fn pending_count(&self) -> Result<i64, sqlx::Error> {
        OutboxMessage::pending_count(&self.pool).await
    }

    /// Run relay passes until the shutdown channel flips.
    ///
    /// Pass failures are logged and the loop keeps going; a database outage
    /// should not kill the relay.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.settings.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            poll_interval_ms = self.settings.poll_interval_ms,
            batch_size = self.settings.batch_size,
            "Outbox relay started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.run_once().await {
                        Ok(report) if report.is_idle() => {}
                        Ok(report) => {
                            info!(
                                dispatched = report.dispatched,
                                failed = report.failed,
                                "Relay pass complete"
                            );
                        }
                        Err(e) => {
                            error!(error = %e, "Relay pass failed");
                        }
                    }
                }

                _ = shutdown.changed() => {
                    info!("Outbox relay shutting down");
                    break;
                }
            }
        }
    }
}
