//! Runs the relay server until a shutdown signal.

use std::sync::Arc;

use seedshare_relay_server::RelayServer;

use crate::config::Config;

pub async fn run(config: Config) -> anyhow::Result<()> {
    log_ice_servers(&config);

    let server = RelayServer::new(config.server_config());
    let server_run = Arc::clone(&server);
    let mut handle = tokio::spawn(async move { server_run.run().await });

    tokio::select! {
        result = &mut handle => {
            // The server only returns on its own when it fails to start.
            result??;
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, shutting down");
        }
    }

    tracing::info!(clients = server.client_count().await, "stopping relay");
    server.shutdown();
    handle.await??;
    Ok(())
}

fn log_ice_servers(config: &Config) {
    if config.ice_servers.is_empty() {
        tracing::info!("no ICE servers configured");
        return;
    }
    for server in &config.ice_servers {
        tracing::info!(
            urls = ?server.urls,
            turn = server.is_turn(),
            credentials = server.has_credentials(),
            policy = ?config.ice_transport_policy,
            "ICE server"
        );
    }
}
