//! `//scriptlet('name', 'arg', ...)` calls.

use crate::error::RuleError;

pub const SCRIPTLET_PREFIX: &str = "//scriptlet(";

/// A parsed scriptlet invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptletCall {
    /// Empty for the `//scriptlet()` and `//scriptlet('')` forms
    pub name: String,
    pub args: Vec<String>,
}

impl ScriptletCall {
    pub fn is_scriptlet(content: &str) -> bool {
        content.trim_start().starts_with(SCRIPTLET_PREFIX)
    }

    /// Parse JS rule content. Both quote styles are accepted; a backslash
    /// escapes the next character.
    pub fn parse(content: &str) -> Result<Self, RuleError> {
        let invalid = || RuleError::InvalidScriptlet(content.to_string());

        let inner = content
            .trim()
            .strip_prefix(SCRIPTLET_PREFIX)
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;

        let mut params = Vec::new();
        let mut chars = inner.chars().peekable();

        loop {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            let quote = match chars.next() {
                None if params.is_empty() => break,
                Some(c @ ('\'' | '"')) => c,
                _ => return Err(invalid()),
            };

            let mut value = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some(next) if next == quote => value.push(next),
                        Some(next) => {
                            value.push('\\');
                            value.push(next);
                        }
                        None => return Err(invalid()),
                    },
                    c if c == quote => {
                        closed = true;
                        break;
                    }
                    c => value.push(c),
                }
            }
            if !closed {
                return Err(invalid());
            }
            params.push(value);

            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            match chars.next() {
                None => break,
                Some(',') => continue,
                Some(_) => return Err(invalid()),
            }
        }

        let mut params = params.into_iter();
        let name = params.next().unwrap_or_default();
        if name.is_empty() && params.len() > 0 {
            return Err(invalid());
        }
        Ok(Self {
            name,
            args: params.collect(),
        })
    }

    /// Name followed by arguments, the way rules count "parameters".
    pub fn param_count(&self) -> usize {
        usize::from(!self.name.is_empty()) + self.args.len()
    }

    /// Single-quoted form used as the allowlist key for calls with
    /// arguments: `//scriptlet('name', 'a', 'b')`.
    pub fn canonical(&self) -> String {
        let mut out = String::from(SCRIPTLET_PREFIX);
        for (i, value) in std::iter::once(&self.name).chain(&self.args).enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push('\'');
            out.push_str(&value.replace('\'', "\\'"));
            out.push('\'');
        }
        out.push(')');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_args() {
        let call = ScriptletCall::parse("//scriptlet('set-cookie','test1','1')").unwrap();
        assert_eq!(call.name, "set-cookie");
        assert_eq!(call.args, vec!["test1", "1"]);
        assert_eq!(call.param_count(), 3);
    }

    #[test]
    fn parses_double_quotes_and_spacing() {
        let call = ScriptletCall::parse(r#"//scriptlet( "abort-on-property-read" , "ads" )"#).unwrap();
        assert_eq!(call.name, "abort-on-property-read");
        assert_eq!(call.args, vec!["ads"]);
    }

    #[test]
    fn parses_escaped_quotes() {
        let call = ScriptletCall::parse(r"//scriptlet('log', 'it\'s')").unwrap();
        assert_eq!(call.args, vec!["it's"]);
        assert_eq!(call.canonical(), r"//scriptlet('log', 'it\'s')");
    }

    #[test]
    fn empty_forms() {
        let call = ScriptletCall::parse("//scriptlet()").unwrap();
        assert!(call.name.is_empty());
        assert_eq!(call.param_count(), 0);

        let call = ScriptletCall::parse("//scriptlet('')").unwrap();
        assert!(call.name.is_empty());
    }

    #[test]
    fn canonical_form() {
        let call = ScriptletCall::parse(r#"//scriptlet("set-cookie","test1",  "1")"#).unwrap();
        assert_eq!(call.canonical(), "//scriptlet('set-cookie', 'test1', '1')");
    }

    #[test]
    fn rejects_malformed() {
        assert!(ScriptletCall::parse("//scriptlet('x'").is_err());
        assert!(ScriptletCall::parse("//scriptlet(x)").is_err());
        assert!(ScriptletCall::parse("//scriptlet('x' 'y')").is_err());
        assert!(ScriptletCall::parse("console.log(1)").is_err());
    }
}
