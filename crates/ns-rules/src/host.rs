//! Hosts-file rules: `0.0.0.0 ads.example.com tracker.example.com # comment`.

use std::net::IpAddr;

use ns_core::StorageIndex;

use crate::error::RuleError;

#[derive(Debug, Clone)]
pub struct HostRule {
    text: String,
    list_id: u32,
    index: Option<StorageIndex>,
    ip: Option<IpAddr>,
    hostnames: Vec<String>,
}

/// Strip a trailing `# comment`.
pub fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => line[..idx].trim_end(),
        None => line,
    }
}

/// Whether `line` has hosts-file shape: an IP literal followed by at least
/// one hostname.
pub fn is_host_line(line: &str) -> bool {
    let mut tokens = strip_comment(line.trim()).split_whitespace();
    matches!(tokens.next().map(str::parse::<IpAddr>), Some(Ok(_))) && tokens.next().is_some()
}

fn is_valid_hostname(host: &str) -> bool {
    !host.is_empty()
        && !host.starts_with('.')
        && !host.ends_with('.')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
}

impl HostRule {
    /// Parse `ip host [alias...]` or a bare `host`.
    pub fn parse(text: &str, list_id: u32) -> Result<Self, RuleError> {
        let text = text.trim();
        let body = strip_comment(text);
        let tokens: Vec<&str> = body.split_whitespace().collect();

        let (ip, names) = match tokens.as_slice() {
            [] => return Err(RuleError::InvalidHost(text.to_string())),
            [_] => (None, &tokens[..]),
            [first, ..] => {
                let ip = first
                    .parse::<IpAddr>()
                    .map_err(|_| RuleError::InvalidHost(text.to_string()))?;
                (Some(ip), &tokens[1..])
            }
        };

        let mut hostnames = Vec::with_capacity(names.len());
        for name in names {
            if !is_valid_hostname(name) {
                return Err(RuleError::InvalidHost(text.to_string()));
            }
            hostnames.push(name.to_ascii_lowercase());
        }
        // A lone IP literal is not a rule
        if ip.is_none() && hostnames[0].parse::<IpAddr>().is_ok() {
            return Err(RuleError::InvalidHost(text.to_string()));
        }

        Ok(Self {
            text: text.to_string(),
            list_id,
            index: None,
            ip,
            hostnames,
        })
    }

    pub fn with_index(mut self, index: Option<StorageIndex>) -> Self {
        self.index = index;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn list_id(&self) -> u32 {
        self.list_id
    }

    pub fn index(&self) -> Option<StorageIndex> {
        self.index
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    pub fn hostnames(&self) -> &[String] {
        &self.hostnames
    }

    pub fn matches(&self, hostname: &str) -> bool {
        self.hostnames.iter().any(|h| h.eq_ignore_ascii_case(hostname))
    }
}
