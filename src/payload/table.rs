//! Read-only table of embedded payloads.

use super::StoredPayload;

/// Every tier's stored payload, as compiled into a launcher.
///
/// Generated launchers hold one of these in a `static`; it is never mutated and
/// needs no synchronization.
#[derive(Clone, Copy, Debug)]
pub struct EmbeddedPayloads<'a> {
    entries: &'a [StoredPayload<'a>],
}

impl<'a> EmbeddedPayloads<'a> {
    pub const fn new(entries: &'a [StoredPayload<'a>]) -> Self {
        Self { entries }
    }

    /// Looks up a payload by canonical tier key.
    pub fn get(&self, key: &str) -> Option<&'a StoredPayload<'a>> {
        self.entries.iter().find(|entry| entry.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::CompressionKind;

    static ENTRIES: [StoredPayload<'static>; 2] = [
        StoredPayload::new("v1", CompressionKind::None, 0, "", b""),
        StoredPayload::new("v3", CompressionKind::None, 0, "", b""),
    ];

    #[test]
    fn lookup_by_key() {
        let payloads = EmbeddedPayloads::new(&ENTRIES);
        assert_eq!(payloads.get("v3").map(StoredPayload::key), Some("v3"));
        assert!(payloads.get("v2").is_none());
        assert!(payloads.get("").is_none());
    }
}
