mod export;
mod remittance;

pub use export::*;
pub use remittance::*;
