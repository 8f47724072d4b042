//! Domain services: the token codec, device trust engine, suspension state
//! machine, and the dispatcher-facing delivery trait.

pub mod dispatcher;
pub mod suspension;
pub mod token;
pub mod trust;
