//! Label data model.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::color_utils::{DEFAULT_COLOR, normalize_hex};

/// Length of the hex id derived from a label name.
pub const LABEL_ID_LEN: usize = 9;

/// Name of the fallback label.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Derive a label id from its name.
///
/// The id is a prefix of the SHA-256 hex digest, so the same name always maps
/// to the same id.
pub fn label_id_for(name: &str) -> String {
    let hash = Sha256::digest(name.as_bytes());
    let mut id = format!("{hash:x}");
    id.truncate(LABEL_ID_LEN);
    id
}

/// A named, colored class that results are tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    /// `#rrggbb`
    pub color: String,
}

impl Label {
    pub fn new(name: impl Into<String>, color: &str) -> Self {
        let name = name.into();
        Self {
            id: label_id_for(&name),
            name,
            color: normalize_hex(color),
        }
    }

    /// The fallback label used when nothing else is selected.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_LABEL, DEFAULT_COLOR)
    }
}
