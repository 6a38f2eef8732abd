use std::{env, error::Error, sync::Arc};

use log::info;
use socks5_relay::{Config, Socks5Server, TcpDialer};
use tokio::runtime::Runtime;

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args();
    if args.len() > 2 {
        println!("Usage: {} [config.toml]", args.next().unwrap_or_default());
        return Ok(());
    }

    env_logger::builder()
        .format_timestamp(None)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = match args.nth(1) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    info!("{:?}", config);

    let dialer = Arc::new(TcpDialer::new(config.dial_timeout(), config.keepalive));

    let rt = Runtime::new()?;
    rt.block_on(async move {
        let server = Socks5Server::listen(&config, dialer).await?;
        info!("listen: {}", server.local_addr()?);
        server.run().await;
        Ok::<(), Box<dyn Error>>(())
    })
}
