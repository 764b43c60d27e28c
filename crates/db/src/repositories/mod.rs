//! Stateless repository structs, one per table.

mod broadcast_template_repo;
mod email_queue_repo;
mod notification_repo;
mod report_log_repo;
mod report_repo;
mod schedule_config_repo;
mod student_repo;

pub use broadcast_template_repo::BroadcastTemplateRepo;
pub use email_queue_repo::EmailQueueRepo;
pub use notification_repo::NotificationRepo;
pub use report_log_repo::ReportLogRepo;
pub use report_repo::ReportRepo;
pub use schedule_config_repo::ScheduleConfigRepo;
pub use student_repo::StudentRepo;
