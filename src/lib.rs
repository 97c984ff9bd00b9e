pub mod application;
pub mod cli;
pub mod domain;
pub mod io;
pub mod report;
pub mod storage;

pub use application::{AppError, Ledger};
pub use domain::*;
pub use storage::{JsonStore, MemoryStore, SqliteStore, Store};
