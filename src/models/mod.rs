//! Data models shared across database access and API handlers.

pub mod notification;
pub mod session;
pub mod subject;
