use crate::def::{RunReadHalf, RunWriteHalf};
use crate::stream::deadline::Deadlines;
use std::io::Result;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

/// Read side of a split tokio stream.
pub struct IoReadHalf<R> {
    inner: R,
    deadlines: Deadlines,
}

/// Write side of a split tokio stream.
pub struct IoWriteHalf<W> {
    inner: W,
    deadlines: Deadlines,
}

impl<R> IoReadHalf<R> {
    pub fn new(inner: R, deadline: Option<Instant>) -> Self {
        Self {
            inner,
            deadlines: Deadlines {
                read: deadline,
                write: None,
            },
        }
    }
}

impl<W> IoWriteHalf<W> {
    pub fn new(inner: W, deadline: Option<Instant>) -> Self {
        Self {
            inner,
            deadlines: Deadlines {
                read: None,
                write: deadline,
            },
        }
    }
}

#[async_trait::async_trait]
impl<R: AsyncRead + Unpin + Send + Sync> RunReadHalf for IoReadHalf<R> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.deadlines.read(self.inner.read(buf)).await
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.deadlines.read = deadline;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<W: AsyncWrite + Unpin + Send + Sync> RunWriteHalf for IoWriteHalf<W> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.deadlines.write(self.inner.write(buf)).await
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.shutdown().await
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.deadlines.write = deadline;
        Ok(())
    }
}
