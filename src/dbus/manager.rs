//! com.deepin.menu.Manager: session registration

use tracing::debug;
use zbus::zvariant::OwnedObjectPath;
use zbus::{ObjectServer, fdo, interface};

use crate::dbus::menu_object::MenuObject;
use crate::service::{Command, CoreHandle};
use crate::session::SessionId;

pub struct MenuManager {
    core: CoreHandle,
}

impl MenuManager {
    pub fn new(core: CoreHandle) -> Self {
        Self { core }
    }
}

#[interface(name = "com.deepin.menu.Manager")]
impl MenuManager {
    async fn register_menu(
        &self,
        #[zbus(object_server)] server: &ObjectServer,
    ) -> fdo::Result<OwnedObjectPath> {
        let session = self.core.request(|reply| Command::RegisterMenu { reply }).await?;
        let path = OwnedObjectPath::try_from(session.as_str().to_string())
            .map_err(|e| fdo::Error::Failed(format!("invalid session path {}: {}", session, e)))?;
        server.at(path.clone(), MenuObject::new(session, self.core.clone())).await?;
        debug!("Serving menu object at {}", path.as_str());
        Ok(path)
    }

    async fn unregister_menu(&self, menu_object_path: String) -> fdo::Result<()> {
        let session = SessionId::from(menu_object_path);
        self.core
            .request(|reply| Command::UnregisterMenu { session, reply })
            .await??;
        Ok(())
    }
}
