pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod seed;
pub mod session;
pub mod storage;

pub use error::ErrorKind;
pub use session::{SessionError, SessionMachine, SessionOptions, SessionResult};
pub use storage::{Storage, StorageError, StorageResult, VocabularyEntry};
