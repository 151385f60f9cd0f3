//! Readiness-driven X11 event source
//!
//! A blocking mio poller watches the X socket and wakes the tokio loop; the
//! loop then drains whatever x11rb has buffered without ever blocking on it.

use anyhow::{Context, Result};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, oneshot};
use tracing::{info, trace, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

const X11_TOKEN: mio::Token = mio::Token(0);

/// Poll timeout, bounds how long shutdown of the poller can lag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct X11EventStream {
    conn: Arc<RustConnection>,
    readable: Arc<Notify>,
    /// Dropping this stops the poller thread
    _shutdown: oneshot::Receiver<()>,
}

impl X11EventStream {
    pub fn new(conn: Arc<RustConnection>) -> Result<Self> {
        let fd = conn.stream().as_raw_fd();
        let readable = Arc::new(Notify::new());
        let (stop_guard, shutdown) = oneshot::channel::<()>();

        spawn_poller(fd, readable.clone(), stop_guard)?;

        Ok(Self {
            conn,
            readable,
            _shutdown: shutdown,
        })
    }

    /// Wait until the X socket has data
    pub async fn readable(&self) {
        self.readable.notified().await;
    }

    /// Take every event x11rb has already read or can read without blocking
    pub fn drain(&self) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        while let Some(event) = self.conn.poll_for_event()? {
            events.push(event);
        }
        if !events.is_empty() {
            trace!("Drained {} X11 event(s)", events.len());
        }
        Ok(events)
    }

    /// Push out queued requests
    pub fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}

fn spawn_poller(fd: RawFd, readable: Arc<Notify>, stop_guard: oneshot::Sender<()>) -> Result<()> {
    let mut poll = mio::Poll::new().context("Failed to create mio Poll")?;
    poll.registry()
        .register(&mut mio::unix::SourceFd(&fd), X11_TOKEN, mio::Interest::READABLE)
        .context("Failed to register X11 socket with mio")?;

    tokio::task::spawn_blocking(move || {
        let mut events = mio::Events::with_capacity(1);
        loop {
            if stop_guard.is_closed() {
                info!("X11 poller shutting down");
                return;
            }

            if let Err(e) = poll.poll(&mut events, Some(POLL_INTERVAL)) {
                warn!("X11 socket poll failed: {:?}", e);
                continue;
            }

            if events.iter().any(|event| event.token() == X11_TOKEN) {
                readable.notify_one();
            }
        }
    });

    Ok(())
}
