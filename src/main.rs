//! Area Menu
//!
//! Popup menu service for the Area desktop session. Clients register a
//! menu session over D-Bus, send a JSON menu definition and get item
//! activations back as signals. While a menu is open the service holds the
//! pointer and keyboard grabs and closes the menu on any click outside it.

mod config;
mod dbus;
mod display;
mod error;
mod geometry;
mod grab;
mod menu;
mod presentation;
mod service;
mod session;
#[cfg(test)]
mod testing;
mod x11_async;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::dbus::manager::MenuManager;
use crate::dbus::mouse_area::XMouseAreaProxy;
use crate::dbus::{menu_object, mouse_area};
use crate::display::X11Display;
use crate::grab::InputGrabber;
use crate::menu::controller::HierarchyController;
use crate::menu::hierarchy::Hierarchy;
use crate::presentation::x11::X11Presentation;
use crate::service::{COMMAND_QUEUE, Command, CoreHandle, MenuCore};
use crate::session::{RestartGuard, SessionRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let quiet = args.iter().any(|arg| arg == "--quiet" || arg == "-q");
    let default_filter = if quiet { "warn" } else { "area_menu=debug,info" };

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Area menu service");

    let config = config::Config::load().context("Failed to load configuration")?;

    // Connect to X11
    let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
    let conn = Arc::new(conn);
    info!("Connected to X server, screen {}", screen_num);

    let dbus = dbus::DbusManager::new().await?;
    let mouse_area_proxy = XMouseAreaProxy::new(dbus.connection())
        .await
        .context("Failed to create mouse-area proxy")?;

    let presentation = X11Presentation::new(conn.clone(), screen_num, config.appearance.clone())
        .context("Failed to initialize menu surfaces")?;
    let display = X11Display::new(conn.clone(), mouse_area_proxy, Handle::current());
    let controller = HierarchyController::new(
        InputGrabber::new(display, config.grab.retry_attempts),
        Hierarchy::new(presentation),
    );
    let restart = RestartGuard::new(config.service.restart_grace(), config.service.restart_enabled);
    let registry = SessionRegistry::new(controller, &config.service.manager_path, restart);

    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
    let (notify_tx, notify_rx) = mpsc::unbounded_channel();
    let core = CoreHandle::new(command_tx);
    let core_thread = MenuCore::new(registry, core.clone(), notify_tx, Handle::current()).spawn(command_rx)?;

    tokio::spawn(menu_object::forward_notifications(dbus.connection().clone(), notify_rx));
    {
        let conn = dbus.connection().clone();
        let core = core.clone();
        tokio::spawn(async move {
            if let Err(e) = mouse_area::forward_events(conn, core).await {
                warn!("Mouse-area events unavailable: {:#}", e);
            }
        });
    }
    let x11_stream = x11_async::X11EventStream::new(conn.clone())
        .context("Failed to start X11 event stream")?;

    dbus.serve_manager(&config.service.manager_path, MenuManager::new(core.clone()))
        .await?;
    dbus.claim_name(&config.service.bus_name).await?;

    // Setup signal handlers for graceful shutdown
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    // Handle SIGTERM and SIGINT
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let tx = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    let _ = tx.send(()).await;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    let _ = tx.send(()).await;
                }
            }
        });
    }

    let outcome = tokio::select! {
        result = x11_stream.forward_events(core.clone()) => {
            if let Err(e) = &result {
                error!("X11 event stream failed: {:#}", e);
            }
            result
        }
        result = dbus.name_lost(&config.service.bus_name) => {
            info!("Bus name {} taken over by another instance, exiting", config.service.bus_name);
            result
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received, cleaning up...");
            Ok(())
        }
    };

    // Release grabs and the mouse area before exiting
    let _ = core.send(Command::Shutdown).await;
    let joined = tokio::task::spawn_blocking(move || core_thread.join()).await;
    if !matches!(joined, Ok(Ok(()))) {
        warn!("Menu core thread did not stop cleanly");
    }

    outcome
}
