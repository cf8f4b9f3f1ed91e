use futures::future::join_all;
use log::{error, info};
use preconn::def::config::Config;
use preconn::object::config::ObjectConfig;
use preconn::object::Object;
use std::env;
use std::io::{Error, ErrorKind};
use std::sync::Arc;
use tokio::fs;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    env_logger::init();

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "config/config.toml".to_string());
    let contents = fs::read_to_string(&path).await?;

    // 解析 TOML
    let cfg = toml::from_str::<Config>(&contents).map_err(|e| {
        Error::new(
            ErrorKind::InvalidData,
            format!("invalid config file {}: {}", path, e),
        )
    })?;

    let mut tasks = Vec::with_capacity(cfg.listener.len());
    for l in &cfg.listener {
        let object = Object::new(Arc::new(ObjectConfig::build(&l.name, &cfg)?));
        tasks.push(tokio::spawn(async move { object.start().await }));
    }
    info!("{} listener(s) started", tasks.len());

    for res in join_all(tasks).await {
        match res {
            Ok(Err(e)) => error!("listener stopped: {}", e),
            Err(e) => error!("listener task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }
    Ok(())
}
