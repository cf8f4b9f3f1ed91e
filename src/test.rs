use crate::def::RunConn;
use crate::stream::prefixed::PrefixedConn;
use crate::stream::tcp::TcpRunConn;
use std::io::{Error, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::spawn;
use tokio::time::Instant;

const HEAD: &str = "hello ";
const TEXT: &str = "world";
const FULL: &str = "hello world";

// Every accepted connection gets TEXT and is closed.
async fn text_server() -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            spawn(async move {
                socket.write_all(TEXT.as_bytes()).await?;
                socket.shutdown().await?;
                Ok::<(), Error>(())
            });
        }
    });
    Ok(addr)
}

#[tokio::test]
async fn test_tcp_read_in_small_pieces() -> Result<()> {
    let addr = text_server().await?;
    let conn = TcpRunConn::connect(&addr.to_string()).await?;
    let mut pconn = PrefixedConn::wrap(conn, HEAD);
    let mut out = Vec::new();
    let mut buf = [0u8; 2];
    loop {
        let n = RunConn::read(&mut pconn, &mut buf).await?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    assert_eq!(out, FULL.as_bytes(), "reading many times should get the full data");

    // end of stream is final, the prefix does not come back
    assert_eq!(RunConn::read(&mut pconn, &mut buf).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_tcp_read_whole_buffer() -> Result<()> {
    let addr = text_server().await?;
    let conn = TcpRunConn::connect(&addr.to_string()).await?;
    let mut pconn = PrefixedConn::wrap(conn, HEAD);
    let mut buf = vec![0u8; FULL.len()];
    let n = RunConn::read(&mut pconn, &mut buf).await?;
    assert!(n >= HEAD.len());
    assert_eq!(&buf[..HEAD.len()], HEAD.as_bytes());

    // the transport may hand over "world" later
    let mut filled = n;
    while filled < buf.len() {
        let m = RunConn::read(&mut pconn, &mut buf[filled..]).await?;
        assert!(m > 0, "stream ended early");
        filled += m;
    }
    assert_eq!(buf, FULL.as_bytes());
    Ok(())
}

#[tokio::test]
async fn test_tcp_poll_surface() -> Result<()> {
    let addr = text_server().await?;
    let conn = TcpRunConn::connect(&addr.to_string()).await?;
    let mut pconn = PrefixedConn::wrap_reader(conn, HEAD.as_bytes());
    let mut out = String::new();
    pconn.read_to_string(&mut out).await?;
    assert_eq!(out, FULL);
    Ok(())
}

#[tokio::test]
async fn test_tcp_delegation() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = spawn(async move {
        let (mut socket, _) = listener.accept().await?;
        let mut got = Vec::new();
        socket.read_to_end(&mut got).await?;
        // keep the socket open so the client side does not see EOF
        Ok::<_, Error>((got, socket))
    });

    let conn = TcpRunConn::connect(&addr.to_string()).await?;
    let local = conn.local_addr()?;
    let mut pconn = PrefixedConn::wrap(conn, HEAD);
    assert_eq!(pconn.peer_addr()?, addr);
    assert_eq!(pconn.local_addr()?, local);

    RunConn::write_all(&mut pconn, b"request").await?;
    RunConn::close(&mut pconn).await?;
    let (got, _socket) = server.await.map_err(|e| Error::new(std::io::ErrorKind::Other, e))??;
    assert_eq!(got, b"request");

    // the server never writes, so a read past the prefix hits the deadline
    let mut buf = [0u8; 16];
    let n = RunConn::read(&mut pconn, &mut buf[..HEAD.len()]).await?;
    assert_eq!(&buf[..n], HEAD.as_bytes());
    pconn.set_deadline(Some(Instant::now() + Duration::from_millis(50)))?;
    let err = RunConn::read(&mut pconn, &mut buf).await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
    Ok(())
}
