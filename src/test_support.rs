use sprout_core::testing::ScriptedTransport;
use sprout_core::{Config, MemoryStore};

use crate::app::App;

pub fn app_with(transport: ScriptedTransport) -> App {
    App::with_parts(
        Config::new().with_base_url("http://backend.test"),
        Box::new(MemoryStore::new()),
        Box::new(transport),
    )
    .unwrap()
}
