//! Periodic health probing on a background scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::aggregator::Aggregator;

/// Handle to the running probe job. Dropping it without
/// [`HealthMonitor::shutdown`] leaves the scheduler running until the
/// runtime stops.
pub struct HealthMonitor {
    scheduler: JobScheduler,
    interval: Duration,
}

impl HealthMonitor {
    /// Starts probing every retailer of `aggregator` every `interval`. The
    /// first probe runs one interval after start.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
    /// the job cannot be registered, or the scheduler fails to start.
    pub async fn start(
        aggregator: Arc<Aggregator>,
        interval: Duration,
    ) -> Result<Self, JobSchedulerError> {
        let scheduler = JobScheduler::new().await?;

        let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
            let aggregator = Arc::clone(&aggregator);
            Box::pin(async move {
                let statuses = aggregator.probe_health().await;
                let unhealthy = statuses.iter().filter(|s| !s.is_healthy).count();
                tracing::info!(
                    probed = statuses.len(),
                    unhealthy,
                    "health monitor: probe complete"
                );
            })
        })?;
        scheduler.add(job).await?;
        scheduler.start().await?;

        tracing::info!(
            interval_secs = interval.as_secs(),
            "health monitor: started"
        );
        Ok(Self {
            scheduler,
            interval,
        })
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stops the probe job.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the scheduler fails to shut down.
    pub async fn shutdown(mut self) -> Result<(), JobSchedulerError> {
        self.scheduler.shutdown().await?;
        tracing::info!("health monitor: stopped");
        Ok(())
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}
