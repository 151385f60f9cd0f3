//! Area Lock
//!
//! Screen shield and lock screen for the Area X11 session. Covers every
//! monitor while the session is idle or locked, captures input, and hands
//! authentication off to the lock backend over D-Bus.

mod config;
mod dbus;
mod shared;
mod shield;
mod widgets;
mod x11;

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::dbus::DbusManager;
use crate::dbus::backend::DbusSessionBridge;
use crate::dbus::service::ShieldService;
use crate::shield::store::FileLockStore;
use crate::shield::{ScreenShield, ShieldEvent, ShieldHost};
use crate::widgets::WidgetRegistry;
use crate::x11::X11Host;

/// Sleep target when no shield timer is armed
const IDLE_WAIT: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "area_lock=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Area Lock");

    let config = Config::load().context("Failed to load configuration")?;

    let mut x11 = X11Host::connect()?;
    let compositor = x11.compositor()?;
    let overlay = x11.overlay()?;
    let stream = x11.event_stream()?;

    let dbus = DbusManager::new().await?;
    let (events_tx, mut events) = mpsc::unbounded_channel::<ShieldEvent>();

    let session = DbusSessionBridge::new(
        dbus.session(),
        dbus.system(),
        events_tx.clone(),
        config.backend.rpc_timeout(),
    )
    .await?;

    if let Err(e) = dbus::login1::watch(dbus.system(), events_tx.clone()).await {
        warn!("logind integration unavailable: {:#}", e);
    }
    if let Err(e) = dbus::backend::watch(dbus.session(), events_tx.clone()).await {
        warn!("Lock backend signals unavailable: {:#}", e);
    }

    let host = ShieldHost {
        compositor: Box::new(compositor),
        view: Box::new(overlay),
        session: Box::new(session),
        store: Box::new(FileLockStore::open_default()?),
    };
    let mut shield = ScreenShield::new(config.shield_settings(), host, WidgetRegistry::new());

    let service = ShieldService::serve(dbus.session(), events_tx.clone(), shield.state()).await?;

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("Screen shield ready ({})", shield.state().as_str());

    loop {
        shield.dispatch_timers();
        service.publish(shield.take_signals());

        if let Err(e) = stream.flush() {
            error!("Failed to flush X11 requests: {:#}", e);
            break;
        }

        // Replies read since the last wake can leave events queued in x11rb
        // without the socket becoming readable again
        let batch = match stream.drain() {
            Ok(batch) => batch,
            Err(e) => {
                error!("X11 connection lost: {:#}", e);
                break;
            }
        };
        for event in &batch {
            if let Some(event) = x11.translate(event) {
                shield.handle_event(event);
            }
        }
        if !batch.is_empty() {
            continue;
        }

        let deadline = shield
            .next_deadline()
            .unwrap_or_else(|| tokio::time::Instant::now() + IDLE_WAIT);

        tokio::select! {
            Some(event) = events.recv() => shield.handle_event(event),
            () = tokio::time::sleep_until(deadline) => {}
            () = stream.readable() => {}
            _ = sighup.recv() => match Config::load() {
                Ok(config) => {
                    info!("Configuration reloaded");
                    shield.handle_event(ShieldEvent::SettingsChanged(config.shield_settings()));
                }
                Err(e) => warn!("Keeping previous configuration: {:#}", e),
            },
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
        }
    }

    if shield.is_locked() {
        info!("Exiting while locked; the lock is restored on next start");
    }

    Ok(())
}
