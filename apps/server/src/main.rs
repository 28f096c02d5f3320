use anyhow::Context;
use lreg::domain::config::ApiConfig;
use lreg::domain::constants::APP_NAME;
use lreg::kernel::config::load_config;
use lreg_logger::Logger;
use lreg_server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg: ApiConfig =
        load_config(Some("server")).context("Critical: Configuration is malformed")?;

    let _log = Logger::from_config(APP_NAME, &cfg.logging).init()?;

    Server::builder().config(cfg).build().await?.run().await
}
