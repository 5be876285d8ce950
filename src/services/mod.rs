/// Business logic services layer
mod assistant;
mod cache;
mod daily_update;
mod enrichment;
mod quota;
mod snapshot;
mod summary;

#[cfg(test)]
pub(crate) mod stubs;

pub use assistant::AssistantService;
pub use cache::RequestCache;
pub use daily_update::{CronAuth, DailyUpdateService, LogNotifier};
pub use enrichment::AdviceEnricher;
pub use quota::InMemoryQuota;
pub use snapshot::{SnapshotService, Sources};
