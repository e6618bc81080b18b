// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The poll loop: drives the pipeline on a fixed interval and delivers the
//! resulting tasks, then sleeps. Shuts down cleanly on cancellation.

use std::sync::Arc;
use std::time::Duration;

use glimpse_core::{DeliveryChannel, DeliveryTask};
use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::pipeline::Pipeline;

/// Periodic driver for [`Pipeline::run_cycle`].
///
/// The loop never exits on its own; cycle errors are logged and the next
/// tick proceeds. Cancellation is honored between cycles and during the
/// sleep, never mid-batch, so per-account atomicity holds through shutdown.
pub struct PollLoop {
    pipeline: Arc<Pipeline>,
    channel: Arc<dyn DeliveryChannel>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl PollLoop {
    pub fn new(
        pipeline: Arc<Pipeline>,
        channel: Arc<dyn DeliveryChannel>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pipeline,
            channel,
            interval,
            shutdown,
        }
    }

    /// Run check-deliver-sleep cycles until the shutdown token fires.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "starting story poll loop");

        loop {
            match self.pipeline.run_cycle().await {
                Ok(tasks) => {
                    deliver_all(self.channel.as_ref(), &tasks).await;
                }
                Err(e) => error!(error = %e, "check cycle failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.cancelled() => {
                    info!("poll loop shutting down");
                    return;
                }
            }
        }
    }
}

/// Push every task through the channel, isolating per-recipient failures.
///
/// Send failures are logged and not retried: the stories are already
/// persisted, so the next cycle will not see them as new. Returns the number
/// of tasks that were delivered.
pub async fn deliver_all(channel: &dyn DeliveryChannel, tasks: &[DeliveryTask]) -> usize {
    let mut delivered = 0;
    for task in tasks {
        match channel
            .send_group(task.chat_id, &task.handle, &task.stories)
            .await
        {
            Ok(()) => {
                counter!("glimpse_deliveries_total").increment(1);
                delivered += 1;
            }
            Err(e) => {
                counter!("glimpse_delivery_failures_total").increment(1);
                warn!(
                    chat_id = task.chat_id,
                    handle = task.handle,
                    error = %e,
                    "delivery failed"
                );
            }
        }
    }
    delivered
}
