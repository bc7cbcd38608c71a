//! Trait abstraction for telemetry byte transports to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;

/// Trait for polling raw bytes off a telemetry link.
///
/// `Ok(None)` means nothing arrived within the poll bound — the normal
/// idle case. `Ok(Some(bytes))` is one chunk as it came off the wire, with
/// no framing applied yet.
#[async_trait]
pub trait FrameTransport: Send {
    /// Read whatever bytes are available, waiting at most `bound`.
    async fn poll_bytes(&mut self, bound: Duration) -> io::Result<Option<Vec<u8>>>;
}

/// Wrapper around tokio_serial::SerialStream that implements FrameTransport
pub struct TokioSerialTransport {
    port: tokio_serial::SerialStream,
}

impl TokioSerialTransport {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

#[async_trait]
impl FrameTransport for TokioSerialTransport {
    async fn poll_bytes(&mut self, bound: Duration) -> io::Result<Option<Vec<u8>>> {
        use tokio::io::AsyncReadExt;

        let mut buf = [0u8; 512];
        match tokio::time::timeout(bound, self.port.read(&mut buf)).await {
            // bound elapsed with no data: not an error, just an idle poll
            Err(_) => Ok(None),
            Ok(Ok(0)) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "device closed the stream",
            )),
            Ok(Ok(n)) => Ok(Some(buf[..n].to_vec())),
            Ok(Err(e)) => Err(e),
        }
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted transport for tests: hands out the queued chunks one per
    /// poll, then reports idle forever.
    pub struct ScriptedTransport {
        chunks: VecDeque<Vec<u8>>,
        fail_after_script: bool,
    }

    impl ScriptedTransport {
        pub fn new(chunks: Vec<&[u8]>) -> Self {
            Self {
                chunks: chunks.into_iter().map(|c| c.to_vec()).collect(),
                fail_after_script: false,
            }
        }

        /// After the script runs out, report an I/O error instead of idle.
        pub fn failing_after_script(mut self) -> Self {
            self.fail_after_script = true;
            self
        }
    }

    #[async_trait]
    impl FrameTransport for ScriptedTransport {
        async fn poll_bytes(&mut self, _bound: Duration) -> io::Result<Option<Vec<u8>>> {
            match self.chunks.pop_front() {
                Some(chunk) => Ok(Some(chunk)),
                None if self.fail_after_script => Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "scripted transport exhausted",
                )),
                None => Ok(None),
            }
        }
    }
}
