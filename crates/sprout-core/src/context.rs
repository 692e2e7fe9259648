use crate::api::{ApiClient, Transport};
use crate::config::Config;
use crate::error::StorageError;
use crate::identity::ensure_identity;
use crate::storage::Storage;

/// Everything an operation needs: built once at startup and passed by
/// reference, never stored globally.
pub struct ClientContext {
    pub api: ApiClient,
    pub store: Box<dyn Storage>,
}

impl ClientContext {
    /// Resolves the device identity and wires the request client to it.
    pub fn bootstrap(
        config: Config,
        store: Box<dyn Storage>,
        transport: Box<dyn Transport>,
    ) -> Result<Self, StorageError> {
        let identity = ensure_identity(store.as_ref())?;
        let api = ApiClient::new(config, Some(identity), transport);
        Ok(Self { api, store })
    }

    pub fn identity(&self) -> &str {
        self.api.user_id().unwrap_or_default()
    }

    pub fn config(&self) -> &Config {
        self.api.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageExt, USER_ID_KEY};
    use crate::testing::ScriptedTransport;
    use serde_json::json;

    #[test]
    fn test_bootstrap_reuses_stored_identity() {
        let store = MemoryStore::new();
        store.set(USER_ID_KEY, json!("dev_42")).unwrap();

        let ctx = ClientContext::bootstrap(
            Config::new(),
            Box::new(store),
            Box::new(ScriptedTransport::new()),
        )
        .unwrap();
        assert_eq!(ctx.identity(), "dev_42");
    }

    #[test]
    fn test_bootstrap_mints_identity() {
        let ctx = ClientContext::bootstrap(
            Config::new(),
            Box::new(MemoryStore::new()),
            Box::new(ScriptedTransport::new()),
        )
        .unwrap();
        assert!(ctx.identity().starts_with("dev_"));
        assert_eq!(
            ctx.store.get_string(USER_ID_KEY).unwrap().as_deref(),
            Some(ctx.identity())
        );
    }
}
