//! Per-device user identity.
//!
//! Development builds have no login flow, so the client mints a readable id
//! from the current time and sends it as `X-User-ID` on every request.

use chrono::Utc;
use log::info;

use crate::error::StorageError;
use crate::storage::{Storage, StorageExt, USER_ID_KEY};

pub const IDENTITY_PREFIX: &str = "dev_";

/// Returns the stored identity, minting and persisting one on first use.
pub fn ensure_identity(store: &dyn Storage) -> Result<String, StorageError> {
    if let Some(existing) = store.get_string(USER_ID_KEY)? {
        return Ok(existing);
    }

    let identity = generate_identity(Utc::now().timestamp_millis());
    store.set_as(USER_ID_KEY, &identity)?;
    info!("generated new client identity {}", identity);
    Ok(identity)
}

fn generate_identity(millis: i64) -> String {
    format!("{}{}", IDENTITY_PREFIX, millis)
}
