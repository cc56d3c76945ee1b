//! Local session marker read by the frontend pages.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Minimal identity hint persisted in the browser (cookie `user`).
///
/// Unsigned and never validated server-side; pages only use it to show
/// who is logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionMarker {
    pub uid: String,
    pub name: String,
}

impl SessionMarker {
    /// JSON form stored in the cookie (before percent-encoding).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(value: &str) -> serde_json::Result<Self> {
        serde_json::from_str(value)
    }
}
