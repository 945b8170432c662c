use std::sync::Arc;

use ns_rules::{CosmeticRule, ScriptletCall};

/// Generic and domain-specific rules of one cosmetic kind.
#[derive(Debug, Clone, Default)]
pub struct CosmeticBucket {
    pub generic: Vec<Arc<CosmeticRule>>,
    pub specific: Vec<Arc<CosmeticRule>>,
}

impl CosmeticBucket {
    /// Specific rules first, then generic ones.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CosmeticRule>> {
        self.specific.iter().chain(self.generic.iter())
    }

    pub fn len(&self) -> usize {
        self.generic.len() + self.specific.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generic.is_empty() && self.specific.is_empty()
    }
}

/// Cosmetic rules that apply to one page.
#[derive(Debug, Clone, Default)]
pub struct CosmeticResult {
    pub element_hiding: CosmeticBucket,
    pub css: CosmeticBucket,
    pub js: CosmeticBucket,
    pub html: CosmeticBucket,
}

impl CosmeticResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.element_hiding.is_empty() && self.css.is_empty() && self.js.is_empty() && self.html.is_empty()
    }

    /// Style sheet for the page: one hiding block for plain selectors, then
    /// every injected style rule.
    pub fn stylesheet(&self) -> String {
        let selectors: Vec<&str> = self
            .element_hiding
            .iter()
            .filter(|rule| !rule.is_extended())
            .map(|rule| rule.content())
            .collect();

        let mut css = String::new();
        if !selectors.is_empty() {
            css = format!("{}{{display:none !important;}}", selectors.join(",\n"));
        }
        for rule in self.css.iter().filter(|rule| !rule.is_extended()) {
            if !css.is_empty() {
                css.push('\n');
            }
            css.push_str(rule.content());
        }
        css
    }

    /// Selectors and styles using extended syntax, left to a content script.
    pub fn extended_rules(&self) -> Vec<&str> {
        self.element_hiding
            .iter()
            .chain(self.css.iter())
            .filter(|rule| rule.is_extended())
            .map(|rule| rule.content())
            .collect()
    }

    pub fn scriptlets(&self) -> Vec<&ScriptletCall> {
        self.js.iter().filter_map(|rule| rule.scriptlet()).collect()
    }

    /// JS rules that are plain scripts rather than scriptlet calls.
    pub fn scripts(&self) -> Vec<&str> {
        self.js
            .iter()
            .filter(|rule| rule.scriptlet().is_none())
            .map(|rule| rule.content())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(text: &str) -> Arc<CosmeticRule> {
        Arc::new(CosmeticRule::parse(text, 0).unwrap())
    }

    #[test]
    fn renders_stylesheet() {
        let mut result = CosmeticResult::new();
        assert!(result.is_empty());
        assert_eq!(result.stylesheet(), "");

        result.element_hiding.generic.push(rule("##.ad"));
        result.element_hiding.specific.push(rule("example.org###banner"));
        result.element_hiding.generic.push(rule("#?#div:has(> .ad)"));
        result.css.specific.push(rule("example.org#$#body { overflow: auto; }"));

        assert_eq!(
            result.stylesheet(),
            "#banner,\n.ad{display:none !important;}\nbody { overflow: auto; }"
        );
        assert_eq!(result.extended_rules(), vec!["div:has(> .ad)"]);
    }

    #[test]
    fn splits_scriptlets_and_scripts() {
        let mut result = CosmeticResult::new();
        result.js.generic.push(rule("#%#//scriptlet('abort-on-property-read', 'ads')"));
        result.js.specific.push(rule("example.org#%#window.ads = false;"));

        let scriptlets = result.scriptlets();
        assert_eq!(scriptlets.len(), 1);
        assert_eq!(scriptlets[0].name, "abort-on-property-read");
        assert_eq!(result.scripts(), vec!["window.ads = false;"]);
        assert_eq!(result.js.len(), 2);
    }
}
