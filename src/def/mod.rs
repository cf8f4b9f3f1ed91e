use std::io::Result;
use std::net::SocketAddr;
use tokio::time::Instant;

pub mod config;

// 连接的能力集合: 读写, 关闭, 地址, 截止时间
#[async_trait::async_trait]
pub trait RunConn: Send + Sync {
    /// Reads into `buf`, returning how many bytes were written to it.
    /// `Ok(0)` on a non-empty buffer means end of stream.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    async fn write(&mut self, buf: &[u8]) -> Result<usize>;

    async fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            let n = self.write(buf).await?;
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ));
            }
            buf = &buf[n..];
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()>;

    fn local_addr(&self) -> Result<SocketAddr>;

    fn peer_addr(&self) -> Result<SocketAddr>;

    /// Sets both the read and the write deadline. `None` clears them.
    fn set_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.set_read_deadline(deadline)?;
        self.set_write_deadline(deadline)
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> Result<()>;

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> Result<()>;
}

#[async_trait::async_trait]
impl RunConn for Box<dyn RunConn> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.as_mut().read(buf).await
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.as_mut().write(buf).await
    }

    async fn close(&mut self) -> Result<()> {
        self.as_mut().close().await
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        self.as_ref().local_addr()
    }

    fn peer_addr(&self) -> Result<SocketAddr> {
        self.as_ref().peer_addr()
    }

    fn set_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.as_mut().set_deadline(deadline)
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.as_mut().set_read_deadline(deadline)
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.as_mut().set_write_deadline(deadline)
    }
}

// 读取半边
#[async_trait::async_trait]
pub trait RunReadHalf: Send + Sync {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> Result<()>;
}

// 写入半边
#[async_trait::async_trait]
pub trait RunWriteHalf: Send + Sync {
    async fn write(&mut self, buf: &[u8]) -> Result<usize>;

    async fn close(&mut self) -> Result<()>;

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> Result<()>;
}

/// A connection whose read and write sides can be driven independently.
pub trait RunSplit: RunConn + Sized {
    type ReadHalf: RunReadHalf;
    type WriteHalf: RunWriteHalf;

    /// Splits the connection; deadlines already set carry over to the halves.
    fn split(self) -> (Self::ReadHalf, Self::WriteHalf);
}
