//! Gateway entry point: load config, bind schemas, serve.

use std::{path::PathBuf, sync::Arc};

use graphbind_gateway::{Server, init_tracing, load_config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("graphbind.yaml"));
    let config = load_config(&config_path)?;
    init_tracing(config.debug);

    Arc::new(Server::new(config)).serve().await
}
