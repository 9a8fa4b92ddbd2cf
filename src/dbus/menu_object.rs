//! com.deepin.menu.Menu: one object per registered session

use tokio::sync::mpsc;
use tracing::{debug, warn};
use zbus::object_server::SignalEmitter;
use zbus::{Connection, fdo, interface};

use crate::service::{Command, CoreHandle};
use crate::session::{Notification, SessionId};

pub struct MenuObject {
    session: SessionId,
    core: CoreHandle,
}

impl MenuObject {
    pub fn new(session: SessionId, core: CoreHandle) -> Self {
        Self { session, core }
    }
}

#[interface(name = "com.deepin.menu.Menu")]
impl MenuObject {
    async fn show_menu(&self, menu_json_content: String) -> fdo::Result<()> {
        let session = self.session.clone();
        self.core
            .request(|reply| Command::ShowMenu {
                session,
                content: menu_json_content,
                reply,
            })
            .await??;
        Ok(())
    }

    async fn set_item_text(&self, id: String, value: String) -> fdo::Result<()> {
        let session = self.session.clone();
        self.core
            .request(|reply| Command::SetItemText {
                session,
                item_id: id,
                text: value,
                reply,
            })
            .await??;
        Ok(())
    }

    async fn set_item_activity(&self, id: String, value: bool) -> fdo::Result<()> {
        let session = self.session.clone();
        self.core
            .request(|reply| Command::SetItemActivity {
                session,
                item_id: id,
                active: value,
                reply,
            })
            .await??;
        Ok(())
    }

    async fn set_item_checked(&self, id: String, value: bool) -> fdo::Result<()> {
        let session = self.session.clone();
        self.core
            .request(|reply| Command::SetItemChecked {
                session,
                item_id: id,
                checked: value,
                reply,
            })
            .await??;
        Ok(())
    }

    #[zbus(signal)]
    async fn item_invoked(emitter: &SignalEmitter<'_>, id: &str, checked: bool) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn item_text_set(emitter: &SignalEmitter<'_>, id: &str, value: &str) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn item_activity_set(emitter: &SignalEmitter<'_>, id: &str, value: bool) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn item_checked_set(emitter: &SignalEmitter<'_>, id: &str, value: bool) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn menu_unregistered(emitter: &SignalEmitter<'_>) -> zbus::Result<()>;
}

/// Emit core notifications as signals on the session paths
pub async fn forward_notifications(conn: Connection, mut notifications: mpsc::UnboundedReceiver<Notification>) {
    while let Some(notification) = notifications.recv().await {
        if let Err(e) = emit(&conn, &notification).await {
            warn!("Failed to emit {:?}: {}", notification, e);
        }
    }
    debug!("Notification channel closed");
}

async fn emit(conn: &Connection, notification: &Notification) -> zbus::Result<()> {
    let path = notification.session().as_str();
    let emitter = SignalEmitter::new(conn, path)?;
    match notification {
        Notification::ItemInvoked { item_id, checked, .. } => {
            MenuObject::item_invoked(&emitter, item_id, *checked).await
        }
        Notification::ItemTextSet { item_id, text, .. } => {
            MenuObject::item_text_set(&emitter, item_id, text).await
        }
        Notification::ItemActivitySet { item_id, active, .. } => {
            MenuObject::item_activity_set(&emitter, item_id, *active).await
        }
        Notification::ItemCheckedSet { item_id, checked, .. } => {
            MenuObject::item_checked_set(&emitter, item_id, *checked).await
        }
        Notification::MenuUnregistered { .. } => {
            MenuObject::menu_unregistered(&emitter).await?;
            // Object goes away only after clients saw the signal
            conn.object_server().remove::<MenuObject, _>(path).await?;
            Ok(())
        }
    }
}
