//! Request handlers, grouped by resource.

pub mod communication;
pub mod monitoring;
pub mod notifications;
