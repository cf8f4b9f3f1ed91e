use crate::listener::sniff::SniffRunAcceptor;
use crate::object::config::ObjectConfig;
use crate::stream::tcp::TcpRunConn;
use log::{debug, error};
use std::io::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::spawn;

pub mod config;

/// One listener: sniff every accepted connection, connect the selected
/// upstream and relay until either side closes.
pub struct Object {
    config: Arc<ObjectConfig>,
}

impl Object {
    pub fn new(config: Arc<ObjectConfig>) -> Self {
        Self { config }
    }

    pub async fn start(&self) -> Result<()> {
        let acc = SniffRunAcceptor::listen(&self.config).await.map_err(|e| {
            error!("Failed to create listener {}: {}", self.config.listener.name, e);
            e
        })?;
        self.serve(acc).await
    }

    pub async fn serve(&self, acc: SniffRunAcceptor) -> Result<()> {
        let acc = Arc::new(acc);
        loop {
            let (conn, addr) = acc.accept().await.map_err(|e| {
                error!("Failed to accept connection: {}", e);
                e
            })?;
            let acc = Arc::clone(&acc);
            spawn(async move {
                if let Err(e) = handle(acc, conn, addr).await {
                    error!("connection {} error: {}", addr, e);
                }
            });
        }
    }
}

async fn handle(acc: Arc<SniffRunAcceptor>, conn: TcpRunConn, addr: SocketAddr) -> Result<()> {
    let (route, mut client) = acc.handshake(conn).await?;
    debug!("{} -> {} ({})", addr, route.upstream, route.name);
    let mut upstream = TcpRunConn::connect(&route.upstream).await.map_err(|e| {
        Error::new(
            e.kind(),
            format!("connect upstream {} failed: {}", route.upstream, e),
        )
    })?;
    let (sent, received) = tokio::io::copy_bidirectional(&mut client, &mut upstream).await?;
    debug!(
        "{} closed, {} bytes up, {} bytes down",
        addr, sent, received
    );
    Ok(())
}
