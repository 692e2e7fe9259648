use anyhow::{Context, Result};
use sprout_core::storage::Storage;
use sprout_core::{
    ChatSession, ClientContext, Config, FileStore, ProfileForm, ReqwestTransport, Transport,
};
use std::path::PathBuf;

use crate::cli::Cli;

/// Per-run client state: the shared context plus the chat and profile
/// views built on top of it.
pub struct App {
    pub ctx: ClientContext,
    pub chat: ChatSession,
    pub profile: ProfileForm,
}

impl App {
    /// Load config and local state, then connect to the real backend.
    pub fn new(cli: &Cli) -> Result<Self> {
        let config = resolve_config(cli)?;
        let store = open_store(cli.store.clone())?;
        Self::with_parts(config, store, Box::new(ReqwestTransport::new()))
    }

    pub fn with_parts(
        config: Config,
        store: Box<dyn Storage>,
        transport: Box<dyn Transport>,
    ) -> Result<Self> {
        let ctx = ClientContext::bootstrap(config, store, transport)
            .context("failed to initialize client identity")?;
        let chat = ChatSession::restore(ctx.store.as_ref())
            .context("failed to restore cached conversation")?;

        Ok(Self {
            ctx,
            chat,
            profile: ProfileForm::new(),
        })
    }
}

/// Config file and environment first, then command-line flags.
pub fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load().context("failed to load config")?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url.clone());
    }
    if let Some(token) = &cli.token {
        config = config.with_token(token.clone());
    }
    Ok(config)
}

fn open_store(path: Option<PathBuf>) -> Result<Box<dyn Storage>> {
    let store = match path {
        Some(path) => FileStore::open(&path)
            .with_context(|| format!("failed to open local state at {:?}", path))?,
        None => FileStore::open_default().context("failed to open local state")?,
    };
    Ok(Box::new(store))
}
