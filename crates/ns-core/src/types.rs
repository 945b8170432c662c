//! Core type definitions for netsieve
//!
//! Bit masks shared by the rule parser and the matching engines.

// =============================================================================
// Request Types (bit mask for type filtering)
// =============================================================================

bitflags::bitflags! {
    /// Request type bit mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RequestType: u32 {
        const DOCUMENT = 1 << 0;     // main document
        const SUBDOCUMENT = 1 << 1;  // iframe/frame
        const SCRIPT = 1 << 2;
        const STYLESHEET = 1 << 3;
        const OBJECT = 1 << 4;
        const IMAGE = 1 << 5;
        const XMLHTTPREQUEST = 1 << 6;
        const MEDIA = 1 << 7;
        const FONT = 1 << 8;
        const WEBSOCKET = 1 << 9;
        const PING = 1 << 10;
        const OTHER = 1 << 11;

        /// Document types (main_frame + sub_frame)
        const ANY_DOCUMENT = Self::DOCUMENT.bits() | Self::SUBDOCUMENT.bits();
    }
}

impl RequestType {
    /// Parse from browser request type string.
    pub fn from_browser_type(s: &str) -> Self {
        match s {
            "main_frame" | "document" => Self::DOCUMENT,
            "sub_frame" | "subdocument" => Self::SUBDOCUMENT,
            "stylesheet" => Self::STYLESHEET,
            "script" => Self::SCRIPT,
            "image" => Self::IMAGE,
            "font" => Self::FONT,
            "object" => Self::OBJECT,
            "xmlhttprequest" | "xhr" | "fetch" => Self::XMLHTTPREQUEST,
            "ping" | "beacon" => Self::PING,
            "media" => Self::MEDIA,
            "websocket" => Self::WEBSOCKET,
            _ => Self::OTHER,
        }
    }

    /// Parse a `$modifier` content-type name.
    pub fn from_modifier(name: &str) -> Option<Self> {
        match name {
            "document" | "doc" => Some(Self::DOCUMENT),
            "subdocument" | "frame" => Some(Self::SUBDOCUMENT),
            "script" => Some(Self::SCRIPT),
            "stylesheet" | "css" => Some(Self::STYLESHEET),
            "object" => Some(Self::OBJECT),
            "image" => Some(Self::IMAGE),
            "xmlhttprequest" | "xhr" => Some(Self::XMLHTTPREQUEST),
            "media" => Some(Self::MEDIA),
            "font" => Some(Self::FONT),
            "websocket" => Some(Self::WEBSOCKET),
            "ping" => Some(Self::PING),
            "other" => Some(Self::OTHER),
            _ => None,
        }
    }
}

// =============================================================================
// HTTP Methods
// =============================================================================

bitflags::bitflags! {
    /// HTTP method mask for `$method=`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodMask: u16 {
        const GET = 1 << 0;
        const POST = 1 << 1;
        const PUT = 1 << 2;
        const DELETE = 1 << 3;
        const HEAD = 1 << 4;
        const OPTIONS = 1 << 5;
        const PATCH = 1 << 6;
        const CONNECT = 1 << 7;
        const TRACE = 1 << 8;
    }
}

impl MethodMask {
    /// Parse a method name, case-insensitively.
    pub fn from_method_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "get" => Some(Self::GET),
            "post" => Some(Self::POST),
            "put" => Some(Self::PUT),
            "delete" => Some(Self::DELETE),
            "head" => Some(Self::HEAD),
            "options" => Some(Self::OPTIONS),
            "patch" => Some(Self::PATCH),
            "connect" => Some(Self::CONNECT),
            "trace" => Some(Self::TRACE),
            _ => None,
        }
    }
}

// =============================================================================
// Storage Index
// =============================================================================

/// Exclusive upper bound for filter list identifiers.
pub const MAX_LIST_ID: u32 = 1_000_000;

/// Opaque rule address: list id plus byte offset of the rule line inside
/// that list's raw text, packed into one integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageIndex(u64);

impl StorageIndex {
    /// `list_id` must be below [`MAX_LIST_ID`].
    #[inline]
    pub fn new(list_id: u32, rule_index: usize) -> Self {
        debug_assert!(list_id < MAX_LIST_ID);
        Self(rule_index as u64 * MAX_LIST_ID as u64 + list_id as u64)
    }

    #[inline]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn list_id(self) -> u32 {
        (self.0 % MAX_LIST_ID as u64) as u32
    }

    /// Byte offset of the rule line within its list.
    #[inline]
    pub const fn rule_index(self) -> usize {
        (self.0 / MAX_LIST_ID as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_browser_types() {
        assert_eq!(RequestType::from_browser_type("main_frame"), RequestType::DOCUMENT);
        assert_eq!(RequestType::from_browser_type("sub_frame"), RequestType::SUBDOCUMENT);
        assert_eq!(RequestType::from_browser_type("unknown"), RequestType::OTHER);
        assert!(RequestType::ANY_DOCUMENT.contains(RequestType::SUBDOCUMENT));
    }

    #[test]
    fn parses_modifier_types() {
        assert_eq!(RequestType::from_modifier("xhr"), Some(RequestType::XMLHTTPREQUEST));
        assert_eq!(RequestType::from_modifier("bogus"), None);
    }

    #[test]
    fn storage_index_round_trips_components() {
        let idx = StorageIndex::new(42, 1337);
        assert_eq!(idx.list_id(), 42);
        assert_eq!(idx.rule_index(), 1337);
        assert_ne!(StorageIndex::new(1, 0), StorageIndex::new(0, 1));
        assert_eq!(StorageIndex::from_raw(idx.value()), idx);
    }

    #[test]
    fn parses_methods() {
        assert_eq!(MethodMask::from_method_name("GET"), Some(MethodMask::GET));
        assert_eq!(MethodMask::from_method_name("post"), Some(MethodMask::POST));
        assert_eq!(MethodMask::from_method_name("brew"), None);
    }
}
