use std::sync::Arc;

use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::checker::CheckRunner;
use crate::config::Settings;
use crate::utils::error::Result;

/// Twice a day, 10:00 and 16:00 UTC.
const DEFAULT_SCHEDULE: &str = "0 0 10,16 * * *";

/// Cron wiring around the check cycle. The job body swallows and logs
/// every failure so one bad cycle never stops the schedule.
pub struct CheckScheduler {
    scheduler: JobScheduler,
}

impl CheckScheduler {
    pub async fn new(settings: Arc<Settings>, runner: Arc<CheckRunner>) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        let schedule = match settings.value("checkSchedule") {
            "" => DEFAULT_SCHEDULE.to_string(),
            custom => custom.to_string(),
        };
        info!("scheduling checks with cron expression '{schedule}'");

        let job = Job::new_async(schedule.as_str(), move |_id, _sched| {
            let settings = Arc::clone(&settings);
            let runner = Arc::clone(&runner);
            Box::pin(async move {
                info!("timer triggered check cycle at {}", Utc::now());
                let state_file = match settings.value("lastChangedFileName") {
                    "" => "lastChanged.txt",
                    name => name,
                };
                match runner.run(state_file).await {
                    Ok(outcome) => info!(
                        "cycle done: changed={}, error_notified={}, persisted={}",
                        outcome.changed, outcome.error_notified, outcome.persisted
                    ),
                    Err(e) => error!("check cycle failed: {e}"),
                }
            })
        })?;
        scheduler.add(job).await?;

        Ok(Self { scheduler })
    }

    pub async fn start(&mut self) -> Result<()> {
        self.scheduler.start().await?;
        info!("check scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler.shutdown().await?;
        info!("check scheduler shut down");
        Ok(())
    }
}
