//! Global pointer/keyboard events via com.deepin.api.XMouseArea

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tracing::{debug, info, warn};
use zbus::message::{Message, Type as MessageType};
use zbus::{Connection, MatchRule, MessageStream, proxy};

use crate::grab::AreaCookie;
use crate::menu::controller::{InputEvent, InputKind};
use crate::service::{Command, CoreHandle};

const INTERFACE: &str = "com.deepin.api.XMouseArea";
const PATH: &str = "/com/deepin/api/XMouseArea";

/// Proxy for the mouse-area service
#[proxy(
    interface = "com.deepin.api.XMouseArea",
    default_service = "com.deepin.api.XMouseArea",
    default_path = "/com/deepin/api/XMouseArea",
    gen_blocking = false
)]
pub trait XMouseArea {
    /// Register a rectangle (corner coordinates) and get its cookie
    fn register_area(&self, x1: i32, y1: i32, x2: i32, y2: i32, flag: i32) -> zbus::Result<String>;

    fn unregister_area(&self, id: &str) -> zbus::Result<()>;
}

/// Forward mouse-area signals to the core in arrival order.
///
/// All three signals share one stream so that a motion followed by a
/// press is never reordered.
pub async fn forward_events(conn: Connection, core: CoreHandle) -> Result<()> {
    let rule = MatchRule::builder()
        .msg_type(MessageType::Signal)
        .interface(INTERFACE)?
        .path(PATH)?
        .build();
    let mut stream = MessageStream::for_match_rule(rule, &conn, Some(256))
        .await
        .context("Failed to subscribe to mouse-area signals")?;
    info!("Listening for {} signals", INTERFACE);

    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!("Mouse-area signal stream error: {}", e);
                continue;
            }
        };
        match parse_signal(&message) {
            Ok(Some(event)) => {
                if core.send(Command::Input(event)).await.is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => debug!("Ignoring malformed mouse-area signal: {}", e),
        }
    }
    Ok(())
}

fn parse_signal(message: &Message) -> zbus::Result<Option<InputEvent>> {
    let header = message.header();
    let Some(member) = header.member() else {
        return Ok(None);
    };
    let body = message.body();
    let (kind, x, y, id) = match member.as_str() {
        "ButtonPress" => {
            let (button, x, y, id): (i32, i32, i32, String) = body.deserialize()?;
            (InputKind::ButtonPress { button }, x, y, id)
        }
        "KeyPress" => {
            let (key, x, y, id): (String, i32, i32, String) = body.deserialize()?;
            (InputKind::KeyPress { key }, x, y, id)
        }
        "MotionMove" => {
            let (x, y, id): (i32, i32, String) = body.deserialize()?;
            (InputKind::Motion, x, y, id)
        }
        _ => return Ok(None),
    };
    Ok(Some(InputEvent {
        kind,
        x,
        y,
        cookie: AreaCookie(id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal<B>(member: &str, body: &B) -> Message
    where
        B: serde::Serialize + zbus::zvariant::DynamicType,
    {
        Message::signal(PATH, INTERFACE, member).unwrap().build(body).unwrap()
    }

    #[test]
    fn test_button_press_signal() {
        let message = signal("ButtonPress", &(1i32, 40i32, 50i32, "cookie-9"));

        let event = parse_signal(&message).unwrap().unwrap();

        assert_eq!(event.kind, InputKind::ButtonPress { button: 1 });
        assert_eq!((event.x, event.y), (40, 50));
        assert_eq!(event.cookie, AreaCookie("cookie-9".into()));
    }

    #[test]
    fn test_key_and_motion_signals() {
        let key = parse_signal(&signal("KeyPress", &("down", 0i32, 0i32, "c")))
            .unwrap()
            .unwrap();
        assert_eq!(key.kind, InputKind::KeyPress { key: "down".into() });

        let motion = parse_signal(&signal("MotionMove", &(3i32, 4i32, "c"))).unwrap().unwrap();
        assert_eq!(motion.kind, InputKind::Motion);
        assert_eq!((motion.x, motion.y), (3, 4));
    }

    #[test]
    fn test_unrelated_signal_is_skipped() {
        let message = signal("CursorInto", &(3i32, 4i32, "c"));
        assert!(parse_signal(&message).unwrap().is_none());
    }
}
