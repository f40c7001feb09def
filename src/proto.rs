//! Push-channel wire format.
//!
//! Every server→viewer message is a single JSON object tagged with `type`.
//! The shapes are frozen: viewers key off `type` and the field names below.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

use crate::cell::Value;

/// Messages broadcast to connected viewers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PushMessage {
    /// Complete serialized document plus the current scroll cursor. Sent once
    /// to each viewer immediately on connect, never broadcast.
    Full { html: String, scroll: (i64, i64) },
    /// Incremental batch of changed cells since the last update cycle.
    Update { cells: Vec<CellPatch> },
    /// All viewers align their visual offset to this cursor.
    Scroll { x: i64, y: i64 },
    /// Structural change: viewers discard local state and re-fetch the
    /// full document.
    Reload,
}

/// One changed cell inside an `update` broadcast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellPatch {
    pub x: usize,
    pub y: usize,
    pub value: Option<Value>,
    pub style: PatchStyle,
}

/// The style subset viewers can apply in place without a reload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchStyle {
    pub bg: String,
    pub color: String,
}

/// Handle a grid uses to signal a structural change (growth, compaction,
/// sheet creation) to the server it is bound to. Cloneable; sends are
/// fire-and-forget and drop silently when no viewer is subscribed.
#[derive(Clone)]
pub struct ReloadHandle {
    bus: broadcast::Sender<PushMessage>,
}

impl ReloadHandle {
    pub(crate) fn new(bus: broadcast::Sender<PushMessage>) -> Self {
        ReloadHandle { bus }
    }

    pub fn reload(&self) {
        let _ = self.bus.send(PushMessage::Reload);
    }
}

impl fmt::Debug for ReloadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadHandle")
            .field("receivers", &self.bus.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_wire_shape() {
        let msg = PushMessage::Update {
            cells: vec![CellPatch {
                x: 5,
                y: 5,
                value: Some(Value::Text("X".to_string())),
                style: PatchStyle {
                    bg: "#ffffff".to_string(),
                    color: "#000".to_string(),
                },
            }],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r##"{"type":"update","cells":[{"x":5,"y":5,"value":"X","style":{"bg":"#ffffff","color":"#000"}}]}"##
        );
    }

    #[test]
    fn full_scroll_and_reload_wire_shapes() {
        let full = PushMessage::Full {
            html: "<table></table>".to_string(),
            scroll: (3, 40),
        };
        let json = serde_json::to_string(&full).unwrap();
        assert_eq!(
            json,
            r#"{"type":"full","html":"<table></table>","scroll":[3,40]}"#
        );

        let scroll = PushMessage::Scroll { x: 1, y: 2 };
        assert_eq!(
            serde_json::to_string(&scroll).unwrap(),
            r#"{"type":"scroll","x":1,"y":2}"#
        );

        let reload = PushMessage::Reload;
        assert_eq!(serde_json::to_string(&reload).unwrap(), r#"{"type":"reload"}"#);
    }

    #[test]
    fn empty_cells_patch_as_null() {
        let patch = CellPatch {
            x: 0,
            y: 0,
            value: None,
            style: PatchStyle {
                bg: "#fff".to_string(),
                color: "#000".to_string(),
            },
        };
        let json = serde_json::to_string(&patch).unwrap();
        assert!(json.contains(r#""value":null"#));
    }
}
