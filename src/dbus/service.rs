//! `org.area.ScreenShield` on the session bus
//!
//! Lets the rest of the shell lock the screen, toggle the screensaver and
//! follow the shield's state. Method calls are turned into [`ShieldEvent`]s
//! for the main loop; the loop hands drained [`ShieldSignal`]s back to
//! [`ShieldService::publish`].

use anyhow::{Context, Result};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use zbus::object_server::SignalEmitter;
use zbus::{Connection, fdo, interface};

use crate::shield::{ShieldEvent, ShieldSignal, State};

pub const BUS_NAME: &str = "org.area.ScreenShield";
pub const OBJECT_PATH: &str = "/org/area/ScreenShield";

pub struct ScreenShieldInterface {
    events: UnboundedSender<ShieldEvent>,
    state: watch::Receiver<State>,
}

impl ScreenShieldInterface {
    fn send(&self, event: ShieldEvent) -> fdo::Result<()> {
        self.events
            .send(event)
            .map_err(|_| fdo::Error::Failed("Screen shield is shutting down".into()))
    }
}

#[interface(name = "org.area.ScreenShield")]
impl ScreenShieldInterface {
    /// Lock now, prompting for an away message when configured
    async fn lock(&self) -> fdo::Result<()> {
        debug!("D-Bus: Lock");
        self.send(ShieldEvent::LockRequested {
            ask_for_away_message: true,
        })
    }

    async fn set_active(&self, active: bool) -> fdo::Result<()> {
        debug!("D-Bus: SetActive({})", active);
        self.send(ShieldEvent::SetActive(active))
    }

    async fn get_active(&self) -> bool {
        *self.state.borrow() != State::Hidden
    }

    async fn get_locked(&self) -> bool {
        self.state.borrow().is_locked()
    }

    /// Close the away message prompt with `message`; empty means none
    async fn submit_away_message(&self, message: String) -> fdo::Result<()> {
        let message = Some(message).filter(|m| !m.trim().is_empty());
        self.send(ShieldEvent::AwayMessageEntered(message))
    }

    #[zbus(signal)]
    async fn active_changed(emitter: &SignalEmitter<'_>, active: bool) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn locked(emitter: &SignalEmitter<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn unlocked(emitter: &SignalEmitter<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn state_changed(emitter: &SignalEmitter<'_>, old: &str, new: &str)
        -> zbus::Result<()>;
}

pub struct ShieldService {
    conn: Connection,
    state: watch::Sender<State>,
}

impl ShieldService {
    /// Export the interface and claim the bus name
    pub async fn serve(
        conn: &Connection,
        events: UnboundedSender<ShieldEvent>,
        initial: State,
    ) -> Result<Self> {
        let (state, rx) = watch::channel(initial);
        let iface = ScreenShieldInterface { events, state: rx };

        conn.object_server()
            .at(OBJECT_PATH, iface)
            .await
            .context("Failed to export ScreenShield interface")?;
        conn.request_name(BUS_NAME)
            .await
            .with_context(|| format!("Failed to acquire {}", BUS_NAME))?;

        info!("Serving {} at {}", BUS_NAME, OBJECT_PATH);

        Ok(Self {
            conn: conn.clone(),
            state,
        })
    }

    /// Update the exported state and emit `signals` in order
    pub fn publish(&self, signals: Vec<ShieldSignal>) {
        if signals.is_empty() {
            return;
        }

        for signal in &signals {
            if let ShieldSignal::StateChanged { new, .. } = signal {
                self.state.send_replace(*new);
            }
        }

        let conn = self.conn.clone();
        tokio::spawn(async move {
            if let Err(e) = emit(&conn, &signals).await {
                warn!("Failed to emit ScreenShield signals: {}", e);
            }
        });
    }
}

async fn emit(conn: &Connection, signals: &[ShieldSignal]) -> zbus::Result<()> {
    let iface = conn
        .object_server()
        .interface::<_, ScreenShieldInterface>(OBJECT_PATH)
        .await?;
    let emitter = iface.signal_emitter();

    for signal in signals {
        match *signal {
            ShieldSignal::StateChanged { old, new } => {
                ScreenShieldInterface::state_changed(emitter, old.as_str(), new.as_str()).await?;
                if (old == State::Hidden) != (new == State::Hidden) {
                    ScreenShieldInterface::active_changed(emitter, new != State::Hidden).await?;
                }
            }
            ShieldSignal::Locked => ScreenShieldInterface::locked(emitter).await?,
            ShieldSignal::Unlocked => ScreenShieldInterface::unlocked(emitter).await?,
        }
    }

    Ok(())
}
