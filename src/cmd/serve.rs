use anyhow::Result;

use issue_maker::config::AppConfig;
use issue_maker::server::{ServerConfig, start_server};

pub async fn cmd_serve(port: Option<u16>, host: Option<String>, dev: bool) -> Result<()> {
    let config = AppConfig::from_env()?;

    start_server(
        &config,
        ServerConfig {
            host: host.unwrap_or_else(|| config.host.clone()),
            port: port.unwrap_or(config.port),
            dev_mode: dev,
        },
    )
    .await
}
