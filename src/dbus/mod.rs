//! D-Bus integration: the menu control channel and the mouse-area client

use anyhow::{Context, Result, bail};
use futures_util::StreamExt;
use tracing::{info, warn};
use zbus::Connection;
use zbus::fdo::{self, RequestNameFlags, RequestNameReply};

pub mod manager;
pub mod menu_object;
pub mod mouse_area;

pub struct DbusManager {
    conn: Connection,
}

impl DbusManager {
    /// Connect to session D-Bus
    pub async fn new() -> Result<Self> {
        let conn = Connection::session()
            .await
            .context("Failed to connect to D-Bus session bus")?;

        tracing::info!("Connected to D-Bus session bus");

        Ok(Self { conn })
    }

    /// Get connection (for creating proxies)
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Serve the manager object at `path`
    pub async fn serve_manager(&self, path: &str, manager: manager::MenuManager) -> Result<()> {
        self.conn
            .object_server()
            .at(path, manager)
            .await
            .with_context(|| format!("Failed to serve menu manager at {}", path))?;
        Ok(())
    }

    /// Claim `name`, replacing a running instance and allowing the next
    /// one to replace us.
    pub async fn claim_name(&self, name: &str) -> Result<()> {
        let reply = self
            .conn
            .request_name_with_flags(
                name,
                RequestNameFlags::ReplaceExisting | RequestNameFlags::AllowReplacement,
            )
            .await
            .with_context(|| format!("Failed to request bus name {}", name))?;
        match reply {
            RequestNameReply::PrimaryOwner | RequestNameReply::AlreadyOwner => {
                info!("Acquired bus name {}", name);
            }
            RequestNameReply::InQueue => {
                warn!("Bus name {} is held by a non-replaceable owner, queued", name);
            }
            RequestNameReply::Exists => bail!("Bus name {} is already taken", name),
        }
        Ok(())
    }

    /// Resolve once another process has taken `name` from us
    pub async fn name_lost(&self, name: &str) -> Result<()> {
        let proxy = fdo::DBusProxy::new(&self.conn)
            .await
            .context("Failed to create bus proxy")?;
        let mut lost = proxy
            .receive_name_lost()
            .await
            .context("Failed to subscribe to NameLost")?;
        while let Some(signal) = lost.next().await {
            let args = signal.args()?;
            if args.name().as_str() == name {
                return Ok(());
            }
        }
        bail!("NameLost stream ended")
    }
}
