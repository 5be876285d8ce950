/// Externally triggered daily update and subscriber notifications
use super::snapshot::SnapshotService;
use crate::config::CronConfig;
use crate::domain::{AggregatedResponse, DailyReport, Location};
use crate::errors::{ApiError, ApiResult};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_DIGEST: &str = "Tonight looks good for stargazing.";

/// Delivers the daily digest to one subscriber
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &str, report: &DailyReport) -> ApiResult<()>;
}

/// Notifier that only records the delivery in the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: &str, report: &DailyReport) -> ApiResult<()> {
        info!(
            recipient,
            events = report.events_count,
            "Notification sent: {}",
            report.summary
        );
        Ok(())
    }
}

/// Trigger credentials as presented by the caller
#[derive(Debug, Default, Clone, Copy)]
pub struct CronAuth<'a> {
    pub authorization: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

pub struct DailyUpdateService {
    snapshots: Arc<SnapshotService>,
    notifier: Arc<dyn Notifier>,
    config: CronConfig,
}

impl DailyUpdateService {
    pub fn new(
        snapshots: Arc<SnapshotService>,
        notifier: Arc<dyn Notifier>,
        config: CronConfig,
    ) -> Self {
        Self {
            snapshots,
            notifier,
            config,
        }
    }

    /// Bearer secret plus a scheduler marker in the user agent
    pub fn authorize(&self, auth: CronAuth<'_>) -> ApiResult<()> {
        let Some(secret) = self.config.secret.as_deref() else {
            warn!("Cron trigger rejected: CRON_SECRET is not configured");
            return Err(ApiError::Unauthorized);
        };

        let bearer_ok = auth
            .authorization
            .and_then(|h| h.strip_prefix("Bearer "))
            .is_some_and(|token| token == secret);
        let agent = auth.user_agent.unwrap_or_default();
        let agent_ok = self
            .config
            .user_agent_markers
            .iter()
            .any(|marker| agent.contains(marker.as_str()));

        if bearer_ok && agent_ok {
            Ok(())
        } else {
            warn!("Cron trigger rejected: bad credentials");
            Err(ApiError::Unauthorized)
        }
    }

    /// Rebuild the daily snapshot, refresh the cache, notify subscribers
    pub async fn run(&self) -> DailyReport {
        info!("Starting daily celestial update");
        let snapshot = self.snapshots.refresh(Location::default()).await;
        let mut report = daily_report(&snapshot);
        report.subscribers_count = self.config.subscribers.len();

        let deliveries = self
            .config
            .subscribers
            .iter()
            .map(|recipient| self.notifier.notify(recipient, &report));
        let results = join_all(deliveries).await;

        for (recipient, result) in self.config.subscribers.iter().zip(&results) {
            if let Err(e) = result {
                warn!("Notification to {} failed: {}", recipient, e);
            }
        }
        report.notifications_sent = results.iter().filter(|r| r.is_ok()).count();

        info!(
            "Daily update finished: {}/{} notifications, {} events",
            report.notifications_sent, report.subscribers_count, report.events_count
        );
        report
    }

    /// Rebuild the snapshot without notifying anyone
    pub async fn rebuild(&self) -> DailyReport {
        info!("Manual daily update triggered");
        let snapshot = self.snapshots.refresh(Location::default()).await;
        daily_report(&snapshot)
    }
}

fn daily_report(snapshot: &AggregatedResponse) -> DailyReport {
    DailyReport {
        date: snapshot.date,
        events_count: snapshot.events.len(),
        subscribers_count: 0,
        notifications_sent: 0,
        summary: snapshot
            .summary
            .recommendations
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_DIGEST.to_string()),
    }
}
