//! Bounded, non-blocking accept for the control loop's connection poll

use embassy_time::{Duration, Instant, Timer};
use log::{debug, info};
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};

/// Longest a single poll may hold up the control loop.
pub const POLL_WINDOW: Duration = Duration::from_millis(100);
/// Granularity of the poll.
pub const POLL_SLICE: Duration = Duration::from_millis(10);
/// A client that connects and stays silent costs the loop no more than one
/// extra poll window.
pub const READ_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(100);

#[allow(async_fn_in_trait)]
pub trait ConnectionListener {
    type Conn: Read + Write;

    /// Wait at most `window` for a pending connection. `Ok(None)` is the
    /// normal idle outcome.
    async fn poll(&mut self, window: Duration) -> anyhow::Result<Option<Self::Conn>>;
}

pub struct TcpConnectionListener {
    listener: TcpListener,
}

impl TcpConnectionListener {
    pub fn bind(addr: impl ToSocketAddrs) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        info!("🌐 Web server listening on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    pub fn local_port(&self) -> anyhow::Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }
}

impl ConnectionListener for TcpConnectionListener {
    type Conn = TcpStream;

    async fn poll(&mut self, window: Duration) -> anyhow::Result<Option<TcpStream>> {
        let started = Instant::now();
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!("Connection from {}", peer);
                    stream.set_nonblocking(false)?;
                    stream.set_read_timeout(Some(READ_TIMEOUT))?;
                    return Ok(Some(stream));
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if started.elapsed() >= window {
                        return Ok(None);
                    }
                    Timer::after(POLL_SLICE).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
