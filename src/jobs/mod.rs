use crate::{context::AppContext, metrics};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        if self.context.edge.is_some() {
            tokio::spawn(Self::cache_sweep_job(Arc::clone(&self)));
        }
        tokio::spawn(Self::uptime_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Drop expired edge cache entries
    async fn cache_sweep_job(scheduler: Arc<Self>) {
        let secs = scheduler.context.config.gateway.cache_sweep_interval_secs.max(1);
        let mut interval = interval(Duration::from_secs(secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            scheduler.sweep_cache();
        }
    }

    /// One sweep pass. Returns the number of entries removed.
    pub fn sweep_cache(&self) -> usize {
        let Some(edge) = &self.context.edge else {
            return 0;
        };

        let removed = edge.sweep_expired();
        if removed > 0 {
            debug!(removed, remaining = edge.cache().len(), "Swept expired cache entries");
        }
        metrics::record_background_job("cache_sweep", "success");
        removed
    }

    /// Refresh the uptime gauge (every 15 seconds)
    async fn uptime_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(15));

        loop {
            interval.tick().await;
            metrics::UPTIME_SECONDS.set(scheduler.context.uptime_secs());
        }
    }
}
