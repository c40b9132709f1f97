//! Heartbeat command implementation.

use std::time::Duration;
use syncbridge_auth::{HttpTokenServer, TokenServer, TokenServerConfig};

/// Runs the heartbeat command. Fails when the token server is down.
pub fn run(url: &str, timeout: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let config = TokenServerConfig::new(url).with_heartbeat_timeout(timeout);
    let server = HttpTokenServer::new(config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    tracing::debug!(url, ?timeout, "checking token server heartbeat");
    let up = runtime.block_on(server.heartbeat());

    if up {
        println!("{url}: ok");
        Ok(())
    } else {
        Err(format!("{url}: token server did not answer its heartbeat").into())
    }
}
