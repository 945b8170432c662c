/// Error type for rule parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("Rule is too short")]
    TooShort,

    #[error("Empty pattern")]
    EmptyPattern,

    #[error("Pattern matches every request: {0}")]
    TooWide(String),

    #[error("Unknown modifier: {0}")]
    UnknownModifier(String),

    #[error("Invalid value for modifier {name}: {value:?}")]
    InvalidModifierValue { name: String, value: String },

    #[error("Modifier {0} is only allowed on allowlist rules")]
    AllowlistOnlyModifier(String),

    #[error("Invalid cosmetic rule: {0}")]
    InvalidCosmetic(String),

    #[error("Invalid scriptlet call: {0}")]
    InvalidScriptlet(String),

    #[error("Invalid host rule: {0}")]
    InvalidHost(String),
}
