use std::sync::Arc;

use anyhow::Context;
use job_board::{
    build_app, init_tracing, Auth, AuthConfig, MemoryStore, ServerConfig, Store, USERS_TABLE,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env().context("failed to load configuration")?;
    let addr = config.socket_addr()?;

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new().with_unique(USERS_TABLE, "email"));

    let mut auth_config = AuthConfig::new(config.token_config());
    auth_config.token_lifetime = config.token_lifetime;
    let auth = Arc::new(Auth::new(auth_config, store.clone()));

    let app = build_app(&auth, &store, config.static_dir.clone());

    tracing::info!(%addr, static_dir = %config.static_dir.display(), "server listening");

    warp::serve(app).run(addr).await;

    Ok(())
}
