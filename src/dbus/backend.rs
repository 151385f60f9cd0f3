//! Session bridge: lock backend calls, logind locked hint and sleep inhibitors
//!
//! Every call is fire-and-forget from the shield's point of view. Calls run
//! on spawned tasks bounded by the configured RPC timeout; failures are only
//! logged. Inhibitor grants come back to the loop as events. Password keys
//! go through one forwarding task so the backend sees them in typing order.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use zbus::{Connection, proxy};

use crate::shield::{InhibitTicket, Inhibitor, Key, SessionBridge, ShieldEvent};

use super::login1::{Login1ManagerProxy, Login1SessionProxy};

/// Proxy for the process that owns the unlock dialog and authentication
#[proxy(
    interface = "org.area.LockBackend",
    default_service = "org.area.LockBackend",
    default_path = "/org/area/LockBackend"
)]
pub trait LockBackend {
    fn lock(&self, stage_window: u32, vt: u32) -> zbus::Result<()>;

    fn unlock(&self) -> zbus::Result<()>;

    /// Drop any grabs a previous shell instance left behind
    fn release_grabs(&self) -> zbus::Result<()>;

    /// Feed the password entry: a character, `BackSpace` or `Return`
    fn forward_key(&self, key: &str) -> zbus::Result<()>;

    /// The user authenticated in the unlock dialog
    #[zbus(signal)]
    fn authenticated(&self) -> zbus::Result<()>;

    /// The user dismissed the unlock dialog
    #[zbus(signal)]
    fn cancelled(&self) -> zbus::Result<()>;
}

const INHIBIT_WHO: &str = "area-lock";

pub struct DbusSessionBridge {
    backend: LockBackendProxy<'static>,
    manager: Login1ManagerProxy<'static>,
    session: Login1SessionProxy<'static>,
    events: UnboundedSender<ShieldEvent>,
    keys: UnboundedSender<String>,
    timeout: Duration,
    vt: u32,
}

impl DbusSessionBridge {
    pub async fn new(
        session_bus: &Connection,
        system_bus: &Connection,
        events: UnboundedSender<ShieldEvent>,
        timeout: Duration,
    ) -> Result<Self> {
        let backend = LockBackendProxy::new(session_bus)
            .await
            .context("Failed to create lock backend proxy")?;
        let manager = Login1ManagerProxy::new(system_bus)
            .await
            .context("Failed to create login1 manager proxy")?;
        let session = Login1SessionProxy::new(system_bus)
            .await
            .context("Failed to create login1 session proxy")?;

        let vt = std::env::var("XDG_VTNR")
            .ok()
            .and_then(|vt| vt.parse().ok())
            .unwrap_or(0);

        let (keys, pending) = mpsc::unbounded_channel();
        spawn_key_forwarder(backend.clone(), pending, timeout);

        Ok(Self {
            backend,
            manager,
            session,
            events,
            keys,
            timeout,
            vt,
        })
    }

    /// Run `call` in the background, logging failures and timeouts
    fn spawn_call<F>(&self, what: &'static str, call: F)
    where
        F: Future<Output = zbus::Result<()>> + Send + 'static,
    {
        let timeout = self.timeout;
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, call).await {
                Ok(Ok(())) => debug!("{} done", what),
                Ok(Err(e)) => warn!("{} failed: {}", what, e),
                Err(_) => warn!("{} timed out after {:?}", what, timeout),
            }
        });
    }

    fn set_locked_hint(&self, locked: bool) {
        let session = self.session.clone();
        self.spawn_call("login1 SetLockedHint", async move {
            session.set_locked_hint(locked).await
        });
    }
}

impl SessionBridge for DbusSessionBridge {
    fn lock(&mut self, stage_window: u32) {
        let backend = self.backend.clone();
        let vt = self.vt;
        self.spawn_call("LockBackend.Lock", async move {
            backend.lock(stage_window, vt).await
        });
        self.set_locked_hint(true);
    }

    fn unlock(&mut self) {
        let backend = self.backend.clone();
        self.spawn_call("LockBackend.Unlock", async move { backend.unlock().await });
        self.set_locked_hint(false);
    }

    fn release_grabs(&mut self) {
        let backend = self.backend.clone();
        self.spawn_call("LockBackend.ReleaseGrabs", async move {
            backend.release_grabs().await
        });
    }

    fn forward_key(&mut self, key: Key) {
        let Some(name) = key_name(key) else {
            return;
        };
        if self.keys.send(name).is_err() {
            warn!("Password key forwarder has stopped");
        }
    }

    fn request_inhibitor(&mut self, reason: &str, ticket: InhibitTicket) {
        let manager = self.manager.clone();
        let events = self.events.clone();
        let reason = reason.to_string();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let call = manager.inhibit("sleep", INHIBIT_WHO, &reason, "delay");
            let inhibitor = match tokio::time::timeout(timeout, call).await {
                Ok(Ok(fd)) => Some(Inhibitor::new(move || drop(fd))),
                Ok(Err(e)) => {
                    warn!("Failed to take sleep inhibitor: {}", e);
                    None
                }
                Err(_) => {
                    warn!("Sleep inhibitor request timed out after {:?}", timeout);
                    None
                }
            };

            let _ = events.send(ShieldEvent::InhibitorReady { ticket, inhibitor });
        });
    }
}

/// Argument of `LockBackend.ForwardKey`; keys the entry does not take map to `None`
fn key_name(key: Key) -> Option<String> {
    match key {
        Key::Char(ch) => Some(ch.to_string()),
        Key::Backspace => Some("BackSpace".into()),
        Key::Enter => Some("Return".into()),
        Key::Escape | Key::Other => None,
    }
}

/// Deliver password keys one call at a time
fn spawn_key_forwarder(
    backend: LockBackendProxy<'static>,
    mut keys: UnboundedReceiver<String>,
    timeout: Duration,
) {
    tokio::spawn(async move {
        while let Some(key) = keys.recv().await {
            match tokio::time::timeout(timeout, backend.forward_key(&key)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("LockBackend.ForwardKey failed: {}", e),
                Err(_) => warn!("LockBackend.ForwardKey timed out after {:?}", timeout),
            }
        }
        debug!("Password key forwarder stopped");
    });
}

/// Forward the unlock dialog's outcome from the lock backend
pub async fn watch(conn: &Connection, events: UnboundedSender<ShieldEvent>) -> Result<()> {
    let backend = LockBackendProxy::new(conn)
        .await
        .context("Failed to create lock backend proxy")?;

    let mut authenticated = backend.receive_authenticated().await?;
    let mut cancelled = backend.receive_cancelled().await?;

    info!("Watching lock backend for dialog results");

    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                Some(_) = authenticated.next() => ShieldEvent::DialogAuthenticated,
                Some(_) = cancelled.next() => ShieldEvent::DialogCancelled,
                else => break,
            };

            if events.send(event).is_err() {
                break;
            }
        }
        debug!("Lock backend watcher stopped");
    });

    Ok(())
}
