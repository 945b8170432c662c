//! Cosmetic rule lookup tables and engine.

mod engine;
mod result;
mod table;

pub use engine::CosmeticEngine;
pub use result::{CosmeticBucket, CosmeticResult};
pub use table::CosmeticLookupTable;

use bitflags::bitflags;

bitflags! {
    /// Which cosmetic rule groups are returned for a page.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CosmeticOption: u8 {
        /// Element hiding and CSS rules without a domain restriction
        const GENERIC_CSS = 1 << 0;
        /// Element hiding and CSS rules restricted to the page's domain
        const SPECIFIC_CSS = 1 << 1;
        const JS = 1 << 2;
        const HTML = 1 << 3;

        const ALL = Self::GENERIC_CSS.bits()
            | Self::SPECIFIC_CSS.bits()
            | Self::JS.bits()
            | Self::HTML.bits();
    }
}

impl CosmeticOption {
    /// Parse a CLI-style name (`all`, `generic-css`, `css`, `js`, ...).
    pub fn from_option_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::ALL),
            "none" => Some(Self::empty()),
            "css" => Some(Self::GENERIC_CSS | Self::SPECIFIC_CSS),
            "generic-css" | "generic" => Some(Self::GENERIC_CSS),
            "specific-css" | "specific" => Some(Self::SPECIFIC_CSS),
            "js" | "scriptlets" => Some(Self::JS),
            "html" => Some(Self::HTML),
            _ => None,
        }
    }
}
