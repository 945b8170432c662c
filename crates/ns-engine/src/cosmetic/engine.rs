use ns_core::Request;
use ns_rules::CosmeticKind;

use super::{CosmeticBucket, CosmeticLookupTable, CosmeticOption, CosmeticResult};
use crate::network::TableContext;
use crate::rule_list::ScanMode;
use crate::storage::ScannedRule;
use crate::tokenizer::RuleParts;

/// One lookup table per cosmetic rule kind.
#[derive(Debug, Default)]
pub struct CosmeticEngine {
    element_hiding: CosmeticLookupTable,
    css: CosmeticLookupTable,
    js: CosmeticLookupTable,
    html: CosmeticLookupTable,
}

impl CosmeticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every cosmetic rule in storage.
    pub fn build(ctx: &mut TableContext<'_>) -> Self {
        let mut engine = Self::new();
        let scanner = ctx.storage.create_scanner(ScanMode::COSMETIC);
        for rule in scanner {
            engine.add_rule(&rule, ctx);
        }
        log::info!(
            "Cosmetic engine built with {} rules (elemhide {}, css {}, js {}, html {})",
            engine.rules_count(),
            engine.element_hiding.count(),
            engine.css.count(),
            engine.js.count(),
            engine.html.count()
        );
        engine
    }

    fn table_mut(&mut self, kind: CosmeticKind) -> &mut CosmeticLookupTable {
        match kind {
            CosmeticKind::ElementHiding => &mut self.element_hiding,
            CosmeticKind::Css => &mut self.css,
            CosmeticKind::Js => &mut self.js,
            CosmeticKind::Html => &mut self.html,
        }
    }

    pub fn add_rule(&mut self, rule: &ScannedRule, ctx: &mut TableContext<'_>) -> bool {
        match rule.parts() {
            RuleParts::Cosmetic(parts) => self.table_mut(parts.kind()).add(rule, ctx),
            _ => false,
        }
    }

    /// Cosmetic rules for the page described by `request`, limited to the
    /// groups enabled in `option`.
    pub fn match_request(
        &mut self,
        request: &Request,
        option: CosmeticOption,
        ctx: &mut TableContext<'_>,
    ) -> CosmeticResult {
        let mut result = CosmeticResult::new();
        let generic_css = option.contains(CosmeticOption::GENERIC_CSS);
        let specific_css = option.contains(CosmeticOption::SPECIFIC_CSS);

        if generic_css {
            result.element_hiding.generic = self.element_hiding.match_generic(request, ctx);
            result.css.generic = self.css.match_generic(request, ctx);
        }
        if specific_css {
            result.element_hiding.specific = self.element_hiding.find_by_hostname(request, ctx);
            result.css.specific = self.css.find_by_hostname(request, ctx);
        }
        if option.contains(CosmeticOption::JS) {
            result.js = Self::match_both(&mut self.js, request, ctx);
        }
        if option.contains(CosmeticOption::HTML) {
            result.html.specific = self.html.find_by_hostname(request, ctx);
            if generic_css {
                result.html.generic = self.html.match_generic(request, ctx);
            }
        }
        result
    }

    fn match_both(table: &mut CosmeticLookupTable, request: &Request, ctx: &mut TableContext<'_>) -> CosmeticBucket {
        CosmeticBucket {
            generic: table.match_generic(request, ctx),
            specific: table.find_by_hostname(request, ctx),
        }
    }

    pub fn rules_count(&self) -> usize {
        self.element_hiding.count() + self.css.count() + self.js.count() + self.html.count()
    }
}
