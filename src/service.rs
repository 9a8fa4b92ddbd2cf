//! Menu core thread
//!
//! All menu and grab state lives on one dedicated thread that drains a
//! FIFO command queue. D-Bus handlers, the mouse-area stream, the X11
//! poller and timers only ever send [`Command`]s.

use std::thread;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use x11rb::protocol::Event;

use crate::display::X11Display;
use crate::error::MenuError;
use crate::menu::controller::InputEvent;
use crate::presentation::x11::X11Presentation;
use crate::session::{Effect, Notification, SessionId, SessionRegistry};

/// Bound of the command queue
pub const COMMAND_QUEUE: usize = 256;

type Reply<T> = oneshot::Sender<Result<T, MenuError>>;

pub enum Command {
    RegisterMenu {
        reply: oneshot::Sender<SessionId>,
    },
    UnregisterMenu {
        session: SessionId,
        reply: Reply<()>,
    },
    ShowMenu {
        session: SessionId,
        content: String,
        reply: Reply<()>,
    },
    SetItemText {
        session: SessionId,
        item_id: String,
        text: String,
        reply: Reply<()>,
    },
    SetItemActivity {
        session: SessionId,
        item_id: String,
        active: bool,
        reply: Reply<()>,
    },
    SetItemChecked {
        session: SessionId,
        item_id: String,
        checked: bool,
        reply: Reply<()>,
    },
    /// Mouse-area event
    Input(InputEvent),
    /// Event for the menu windows
    X11(Event),
    RestartWindowElapsed {
        generation: u64,
    },
    Shutdown,
}

/// Sending side of the command queue
#[derive(Clone)]
pub struct CoreHandle {
    commands: mpsc::Sender<Command>,
}

impl CoreHandle {
    pub fn new(commands: mpsc::Sender<Command>) -> Self {
        Self { commands }
    }

    pub async fn send(&self, command: Command) -> Result<(), MenuError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| MenuError::ServiceStopped)
    }

    /// Send a command carrying a reply channel and wait for the answer
    pub async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, MenuError> {
        let (reply, answer) = oneshot::channel();
        self.send(build(reply)).await?;
        answer.await.map_err(|_| MenuError::ServiceStopped)
    }
}

/// Carries registry effects out of the core thread
struct EffectSink {
    notifications: mpsc::UnboundedSender<Notification>,
    core: CoreHandle,
    runtime: Handle,
}

impl EffectSink {
    fn dispatch(&self, effect: Effect) {
        match effect {
            Effect::Notify(notification) => {
                if self.notifications.send(notification).is_err() {
                    debug!("Notification emitter is gone");
                }
            }
            Effect::ArmRestartTimer { generation, after } => {
                let core = self.core.clone();
                self.runtime.spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = core.send(Command::RestartWindowElapsed { generation }).await;
                });
            }
            Effect::SpawnReplacement => {
                if let Err(e) = spawn_replacement() {
                    error!("Failed to restart menu service: {:#}", e);
                }
            }
        }
    }
}

/// Start a new instance with the same executable and flags. It claims the
/// bus name and this process exits on NameLost.
fn spawn_replacement() -> Result<()> {
    let exe = std::env::current_exe().context("Failed to locate own executable")?;
    let child = std::process::Command::new(&exe)
        .args(std::env::args().skip(1))
        .spawn()
        .with_context(|| format!("Failed to spawn {:?}", exe))?;
    info!("Spawned replacement menu service (pid {})", child.id());
    Ok(())
}

pub struct MenuCore {
    registry: SessionRegistry<X11Display, X11Presentation>,
    effects: EffectSink,
}

impl MenuCore {
    pub fn new(
        registry: SessionRegistry<X11Display, X11Presentation>,
        core: CoreHandle,
        notifications: mpsc::UnboundedSender<Notification>,
        runtime: Handle,
    ) -> Self {
        Self {
            registry,
            effects: EffectSink {
                notifications,
                core,
                runtime,
            },
        }
    }

    /// Run on a dedicated thread until `Shutdown` or all senders are gone
    pub fn spawn(self, commands: mpsc::Receiver<Command>) -> Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("menu-core".into())
            .spawn(move || self.run(commands))
            .context("Failed to spawn menu core thread")
    }

    fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!("Menu core running");
        while let Some(command) = commands.blocking_recv() {
            if matches!(command, Command::Shutdown) {
                break;
            }
            self.execute(command);
            self.registry.process_presentation_events();
            for effect in self.registry.take_effects() {
                self.effects.dispatch(effect);
            }
            self.presentation().flush();
        }
        self.registry.shutdown();
        self.presentation().flush();
        info!("Menu core stopped");
    }

    fn presentation(&mut self) -> &mut X11Presentation {
        self.registry
            .controller_mut()
            .hierarchy_mut()
            .presentation_mut()
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::RegisterMenu { reply } => {
                let _ = reply.send(self.registry.register_session());
            }
            Command::UnregisterMenu { session, reply } => {
                let _ = reply.send(self.registry.unregister_session(&session));
            }
            Command::ShowMenu {
                session,
                content,
                reply,
            } => {
                let result = self.registry.show_menu(&session, &content).map(|_| ());
                if let Err(e) = &result {
                    warn!("ShowMenu for {} failed: {}", session, e);
                }
                let _ = reply.send(result);
            }
            Command::SetItemText {
                session,
                item_id,
                text,
                reply,
            } => {
                let _ = reply.send(self.registry.set_item_text(&session, &item_id, &text));
            }
            Command::SetItemActivity {
                session,
                item_id,
                active,
                reply,
            } => {
                let _ = reply.send(self.registry.set_item_activity(&session, &item_id, active));
            }
            Command::SetItemChecked {
                session,
                item_id,
                checked,
                reply,
            } => {
                let _ = reply.send(self.registry.set_item_checked(&session, &item_id, checked));
            }
            Command::Input(event) => self.registry.handle_input(&event),
            Command::X11(event) => self.presentation().handle_event(&event),
            Command::RestartWindowElapsed { generation } => {
                self.registry.restart_window_elapsed(generation);
            }
            Command::Shutdown => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sink() -> (
        EffectSink,
        mpsc::UnboundedReceiver<Notification>,
        mpsc::Receiver<Command>,
    ) {
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let sink = EffectSink {
            notifications: notify_tx,
            core: CoreHandle::new(command_tx),
            runtime: Handle::current(),
        };
        (sink, notify_rx, command_rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_timer_posts_after_grace() {
        let (sink, _notifications, mut commands) = sink();

        sink.dispatch(Effect::ArmRestartTimer {
            generation: 3,
            after: Duration::from_secs(5),
        });

        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert!(commands.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let command = commands.try_recv().unwrap();
        assert!(matches!(command, Command::RestartWindowElapsed { generation: 3 }));
    }

    #[tokio::test]
    async fn test_notifications_reach_emitter_in_order() {
        let (sink, mut notifications, _commands) = sink();
        let session = SessionId::from("/com/deepin/menu/a");

        sink.dispatch(Effect::Notify(Notification::ItemInvoked {
            session: session.clone(),
            item_id: "copy".into(),
            checked: false,
        }));
        sink.dispatch(Effect::Notify(Notification::MenuUnregistered {
            session: session.clone(),
        }));

        assert!(matches!(
            notifications.recv().await,
            Some(Notification::ItemInvoked { .. })
        ));
        assert_eq!(
            notifications.recv().await,
            Some(Notification::MenuUnregistered { session })
        );
    }

    #[tokio::test]
    async fn test_request_fails_once_core_is_gone() {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let core = CoreHandle::new(command_tx);
        drop(command_rx);

        let result = core.request(|reply| Command::RegisterMenu { reply }).await;

        assert!(matches!(result, Err(MenuError::ServiceStopped)));
    }
}
