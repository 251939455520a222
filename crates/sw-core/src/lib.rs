pub mod error;
pub mod job;
pub mod lifecycle;
pub mod notification;
pub mod params;
pub mod readiness;
pub mod report;

pub use error::{IllegalTransition, InvalidParameters, UnknownStatus};
pub use job::{JobId, JobRecord, JobStatus, JobType};
pub use lifecycle::JobEvent;
pub use notification::{Notification, NotificationKind};
pub use params::{GenerationMode, GenerationParameters, JobPriority, OutputFormat};
pub use readiness::{ComponentReadiness, GpuInfo, ReadinessSnapshot};
pub use report::{QueueStatus, StatusReport};
