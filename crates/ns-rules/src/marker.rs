//! Cosmetic rule markers (`##`, `#@#`, `#%#`, `$$`, ...).

/// Cosmetic rule category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CosmeticKind {
    /// `##` element hiding
    ElementHiding,
    /// `#$#` CSS injection
    Css,
    /// `#%#` JavaScript / scriptlet injection
    Js,
    /// `$$` HTML filtering
    Html,
}

/// Location and meaning of the marker inside a rule line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub start: usize,
    pub len: usize,
    pub kind: CosmeticKind,
    pub allowlist: bool,
    /// `#?#`-style extended selector syntax
    pub extended: bool,
}

impl Marker {
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

// Longest first so `#@$?#` is not read as `#@$#` or `#@#`.
const MARKERS: &[(&str, CosmeticKind, bool, bool)] = &[
    ("#@$?#", CosmeticKind::Css, true, true),
    ("#@$#", CosmeticKind::Css, true, false),
    ("#@%#", CosmeticKind::Js, true, false),
    ("#@?#", CosmeticKind::ElementHiding, true, true),
    ("#$?#", CosmeticKind::Css, false, true),
    ("#@#", CosmeticKind::ElementHiding, true, false),
    ("#?#", CosmeticKind::ElementHiding, false, true),
    ("#$#", CosmeticKind::Css, false, false),
    ("#%#", CosmeticKind::Js, false, false),
    ("##", CosmeticKind::ElementHiding, false, false),
    ("$@$", CosmeticKind::Html, true, false),
    ("$$", CosmeticKind::Html, false, false),
];

/// Find the first cosmetic marker in `line`.
pub fn find_marker(line: &str) -> Option<Marker> {
    for (i, b) in line.bytes().enumerate() {
        if b != b'#' && b != b'$' {
            continue;
        }
        let rest = &line[i..];
        for &(text, kind, allowlist, extended) in MARKERS {
            if rest.starts_with(text) {
                return Some(Marker {
                    start: i,
                    len: text.len(),
                    kind,
                    allowlist,
                    extended,
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_element_hiding() {
        let marker = find_marker("example.com##.ad").unwrap();
        assert_eq!((marker.start, marker.len), (11, 2));
        assert_eq!(marker.kind, CosmeticKind::ElementHiding);
        assert!(!marker.allowlist);
    }

    #[test]
    fn prefers_longest_marker() {
        let marker = find_marker("example.com#@$?#.ad { color: red }").unwrap();
        assert_eq!(marker.len, 5);
        assert_eq!(marker.kind, CosmeticKind::Css);
        assert!(marker.allowlist && marker.extended);

        let marker = find_marker("#@%#//scriptlet('abort-on-property-read', 'x')").unwrap();
        assert_eq!(marker.kind, CosmeticKind::Js);
        assert!(marker.allowlist);
    }

    #[test]
    fn html_markers() {
        let marker = find_marker("example.org$$script[tag-content=\"ad\"]").unwrap();
        assert_eq!(marker.kind, CosmeticKind::Html);
        let marker = find_marker("example.org$@$script").unwrap();
        assert!(marker.allowlist);
    }

    #[test]
    fn network_rules_have_no_marker() {
        assert!(find_marker("||example.org^$script,domain=a.com").is_none());
        assert!(find_marker("[$path=/page]").is_none());
    }
}
