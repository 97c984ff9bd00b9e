mod charge;
mod client;
mod money;
pub mod timestamp;

pub use charge::*;
pub use client::*;
pub use money::*;
pub use timestamp::Timestamp;
