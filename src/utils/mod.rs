pub mod password;
pub mod time;

pub use password::*;
pub use time::*;
