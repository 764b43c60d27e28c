//! Row models and DTOs, one module per aggregate.

pub mod broadcast;
pub mod email;
pub mod notification;
pub mod report;
pub mod report_log;
pub mod schedule;
pub mod student;
