//! X11 Async Event Stream
//!
//! Polls the X11 socket with mio on a blocking task and hands events for
//! the menu windows to the core thread.

use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{Notify, oneshot};
use tracing::{info, trace, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use crate::service::{Command, CoreHandle};

/// Upper bound on how long buffered events may wait. Replies read by the
/// core thread can pull events into the connection buffer without the
/// socket becoming readable again.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// X11 event stream with async polling support
pub struct X11EventStream {
    conn: Arc<RustConnection>,
    notify: Arc<Notify>,
    _task_guard: oneshot::Receiver<()>,
}

impl X11EventStream {
    /// Create a new X11 event stream with async polling
    ///
    /// Spawns a blocking task that uses mio to poll the X11 file descriptor
    /// and wakes the async side when it becomes readable.
    pub fn new(conn: Arc<RustConnection>) -> Result<Self> {
        let fd = conn.stream().as_raw_fd();
        let notify = Arc::new(Notify::new());
        let task_notify = notify.clone();

        let (guard, task_guard) = oneshot::channel::<()>();
        let mut poll = mio::Poll::new().context("Failed to create mio Poll")?;
        let mut events = mio::Events::with_capacity(1);

        poll.registry()
            .register(
                &mut mio::unix::SourceFd(&fd),
                mio::Token(0),
                mio::Interest::READABLE,
            )
            .context("Failed to register X11 FD with mio")?;

        let timeout = Duration::from_millis(100);
        tokio::task::spawn_blocking(move || {
            loop {
                if guard.is_closed() {
                    info!("X11 socket polling thread shutting down");
                    return;
                }

                if let Err(err) = poll.poll(&mut events, Some(timeout)) {
                    warn!("X11 socket poll failed: {:?}", err);
                    continue;
                }

                events
                    .iter()
                    .filter(|event| event.token() == mio::Token(0))
                    .for_each(|_| task_notify.notify_one());
            }
        });

        Ok(Self {
            conn,
            notify,
            _task_guard: task_guard,
        })
    }

    /// Non-blocking: next buffered event, if any
    pub fn poll_next_event(&self) -> Result<Option<Event>> {
        Ok(self.conn.poll_for_event()?)
    }

    /// Wait for the X11 FD to become readable, or the drain interval to pass
    pub async fn wait_readable(&self) {
        let _ = tokio::time::timeout(DRAIN_INTERVAL, self.notify.notified()).await;
    }

    pub fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }

    /// Forward every event to the core until the connection breaks or the
    /// core stops. A broken connection is an error.
    pub async fn forward_events(self, core: CoreHandle) -> Result<()> {
        loop {
            self.flush().context("X11 connection lost")?;
            while let Some(event) = self.poll_next_event().context("X11 connection lost")? {
                trace!("X11 event: {:?}", event);
                if core.send(Command::X11(event)).await.is_err() {
                    return Ok(());
                }
            }
            self.wait_readable().await;
        }
    }
}
