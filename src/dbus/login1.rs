//! Session and power management via org.freedesktop.login1

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use zbus::{Connection, proxy};

use crate::shield::ShieldEvent;

/// Proxy for systemd-logind
#[proxy(
    interface = "org.freedesktop.login1.Manager",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1"
)]
pub trait Login1Manager {
    /// Take an inhibitor lock; it is held for as long as the fd stays open
    fn inhibit(
        &self,
        what: &str,
        who: &str,
        why: &str,
        mode: &str,
    ) -> zbus::Result<zbus::zvariant::OwnedFd>;

    /// Emitted with `true` before suspend and `false` after resume
    #[zbus(signal)]
    fn prepare_for_sleep(&self, start: bool) -> zbus::Result<()>;
}

/// Proxy for the caller's own logind session
#[proxy(
    interface = "org.freedesktop.login1.Session",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1/session/auto"
)]
pub trait Login1Session {
    fn set_locked_hint(&self, locked: bool) -> zbus::Result<()>;

    #[zbus(signal)]
    fn lock(&self) -> zbus::Result<()>;

    #[zbus(signal)]
    fn unlock(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn active(&self) -> zbus::Result<bool>;
}

/// Forward logind's sleep, lock, unlock and activation notifications
pub async fn watch(conn: &Connection, events: UnboundedSender<ShieldEvent>) -> Result<()> {
    let manager = Login1ManagerProxy::new(conn)
        .await
        .context("Failed to create login1 manager proxy")?;
    let session = Login1SessionProxy::new(conn)
        .await
        .context("Failed to create login1 session proxy")?;

    let mut sleep = manager.receive_prepare_for_sleep().await?;
    let mut lock = session.receive_lock().await?;
    let mut unlock = session.receive_unlock().await?;
    let mut active = session.receive_active_changed().await;

    info!("Watching logind for sleep and session changes");

    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                Some(signal) = sleep.next() => match signal.args() {
                    Ok(args) => ShieldEvent::PrepareForSleep(*args.start()),
                    Err(e) => {
                        warn!("Malformed PrepareForSleep signal: {}", e);
                        continue;
                    }
                },
                Some(_) = lock.next() => ShieldEvent::SessionLock,
                Some(_) = unlock.next() => ShieldEvent::SessionUnlock,
                Some(change) = active.next() => match change.get().await {
                    Ok(value) => ShieldEvent::SessionActive(value),
                    Err(e) => {
                        warn!("Failed to read session Active property: {}", e);
                        continue;
                    }
                },
                else => break,
            };

            debug!("logind: {:?}", event);
            if events.send(event).is_err() {
                break;
            }
        }
        debug!("logind watcher stopped");
    });

    Ok(())
}
