pub mod api;
pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod mode;
pub mod profile;
pub mod state;
pub mod storage;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types for convenience
pub use api::{ApiClient, Method, ReqwestTransport, Transport};
pub use chat::{ChatOutcome, ChatSession, ChatTurn};
pub use config::Config;
pub use context::ClientContext;
pub use error::{ClientError, ConfigError, StorageError};
pub use identity::ensure_identity;
pub use mode::ResponseMode;
pub use profile::{Profile, ProfileField, ProfileForm, SaveOutcome};
pub use state::{ChatMessage, ChatRole};
pub use storage::{FileStore, MemoryStore, Storage};
