//! Modifier-list helpers shared by the parser and the tokenizer.
//!
//! Everything here works on byte offsets so the tokenizer can record spans
//! without allocating.

/// Split `text` on `sep` when it is not preceded by a backslash.
pub fn split_unescaped(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
        } else if c == sep {
            parts.push(&text[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Byte offset of the `$` separating a network pattern from its options.
///
/// The last `$` wins. A regex pattern (`/…$/`) may end with `$` itself, in
/// which case the rule has no options.
pub fn find_options_start(rule: &str) -> Option<usize> {
    let idx = rule.rfind('$')?;
    let pattern = rule[..idx].strip_prefix("@@").unwrap_or(&rule[..idx]);
    if pattern.starts_with('/') && rule[idx + 1..].ends_with('/') {
        return None;
    }
    if idx > 0 && rule.as_bytes()[idx - 1] == b'\\' {
        return None;
    }
    Some(idx)
}

/// Byte range of the value of `name=` inside a comma-separated option list.
/// The value runs to the next unescaped comma or the end of `options`.
pub fn find_modifier_value(options: &str, name: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    for part in split_unescaped(options, ',') {
        let leading = part.len() - part.trim_start().len();
        let trimmed = part.trim();
        if let Some(rest) = trimmed.strip_prefix(name) {
            if rest.starts_with('=') {
                let start = offset + leading + name.len() + 1;
                let end = offset + leading + trimmed.len();
                return Some((start, end));
            }
        }
        offset += part.len() + 1;
    }
    None
}

/// Remove backslash escapes of `c`.
pub fn unescape(text: &str, c: char) -> String {
    let escaped = format!("\\{c}");
    text.replace(&escaped, &c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_unescaped() {
        assert_eq!(split_unescaped("a,b,c", ','), vec!["a", "b", "c"]);
        assert_eq!(split_unescaped(r"a\,b,c", ','), vec![r"a\,b", "c"]);
        assert_eq!(split_unescaped("", ','), vec![""]);
    }

    #[test]
    fn test_find_options_start() {
        assert_eq!(find_options_start("||example.org^$script"), Some(14));
        assert_eq!(find_options_start("@@||example.org^$document"), Some(16));
        assert_eq!(find_options_start("||example.org^"), None);
        assert_eq!(find_options_start("/banner$/"), None);
        assert_eq!(find_options_start("/banner.$domain=a.com"), Some(8));
        assert_eq!(find_options_start("/banner\\d+$/$domain=a.com"), Some(12));
    }

    #[test]
    fn test_find_modifier_value() {
        let options = "script,domain=a.com|b.com,third-party";
        let (start, end) = find_modifier_value(options, "domain").unwrap();
        assert_eq!(&options[start..end], "a.com|b.com");

        let options = "path=/x\\,y,domain=c.org";
        let (start, end) = find_modifier_value(options, "domain").unwrap();
        assert_eq!(&options[start..end], "c.org");

        assert_eq!(find_modifier_value("domains=x.com", "domain"), None);
        assert_eq!(find_modifier_value("script", "domain"), None);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"/a\,b/", ','), "/a,b/");
    }
}
