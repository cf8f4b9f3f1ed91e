use crate::def::{config, RunConn};
use crate::object::config::ObjectConfig;
use crate::stream::prefixed::PrefixedConn;
use crate::stream::tcp::TcpRunConn;
use log::{debug, info};
use std::io::{Error, ErrorKind, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::Instant;

/// Accepts TCP connections and picks a route from their first bytes.
///
/// The bytes read for the decision are put back in front of the
/// connection, so whoever takes it over sees the stream from its start.
pub struct SniffRunAcceptor {
    inner: TcpListener,
    routes: Vec<config::Route>,
    default: config::Route,
    peek: usize,
    timeout: Duration,
}

/// First route matching `head`, or `default`.
pub fn select<'a>(
    routes: &'a [config::Route],
    default: &'a config::Route,
    head: &[u8],
) -> &'a config::Route {
    routes.iter().find(|r| r.matches(head)).unwrap_or(default)
}

impl SniffRunAcceptor {
    pub async fn listen(cfg: &ObjectConfig) -> Result<Self> {
        let inner = TcpListener::bind(cfg.listener.endpoint.as_str()).await?;
        info!(
            "listener {} on {}",
            cfg.listener.name,
            inner.local_addr()?
        );
        Ok(Self {
            inner,
            routes: cfg.routes.clone(),
            default: cfg.default.clone(),
            peek: cfg.peek(),
            timeout: cfg.sniff_timeout(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.local_addr()
    }

    pub async fn accept(&self) -> Result<(TcpRunConn, SocketAddr)> {
        let (socket, addr) = self.inner.accept().await?;
        Ok((TcpRunConn::new(socket), addr))
    }

    /// Reads the first bytes of `conn` and returns the selected route with
    /// the connection rewound to its start.
    pub async fn handshake<C: RunConn>(
        &self,
        mut conn: C,
    ) -> Result<(config::Route, PrefixedConn<C>)> {
        let mut buf = vec![0u8; self.peek];
        conn.set_read_deadline(Some(Instant::now() + self.timeout))?;
        let n = conn.read(&mut buf).await?;
        if n == 0 {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                "Connection closed before handshake",
            ));
        }
        buf.truncate(n);
        debug!("sniffed {} bytes: {:?}", n, &buf);

        let route = select(&self.routes, &self.default, &buf).clone();
        info!("Protocol sniff: route {} selected", route.name);

        let mut conn = PrefixedConn::wrap(conn, buf);
        conn.set_read_deadline(None)?;
        Ok((route, conn))
    }
}
