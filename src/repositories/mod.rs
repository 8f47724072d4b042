pub mod outbox;
pub mod session;
pub mod subject;
