use crate::errors::RdapError;
use once_cell::sync::Lazy;
use regex::Regex;

const MAX_DOMAIN_LEN: usize = 253;

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z0-9\-_]+\.)+[a-z]{2,}$").expect("domain pattern is a valid regex")
});

/// Turn user input (a bare domain or a URL) into a lowercase domain name.
///
/// `https://Example.com/path` becomes `example.com`. A trailing root dot is
/// dropped.
pub fn normalize_domain_input(raw: &str) -> Result<String, RdapError> {
    let trimmed = raw.trim();
    let without_scheme = strip_scheme(trimmed);
    let host = without_scheme.split('/').next().unwrap_or_default();
    let host = host.strip_suffix('.').unwrap_or(host).to_lowercase();

    if host.is_empty() {
        return Err(RdapError::InvalidDomain("Empty domain".to_string()));
    }
    if host.len() > MAX_DOMAIN_LEN {
        return Err(RdapError::InvalidDomain("Domain name too long".to_string()));
    }
    if !DOMAIN_RE.is_match(&host) {
        return Err(RdapError::InvalidDomain(format!(
            "Invalid domain format: {}",
            raw.trim()
        )));
    }

    Ok(host)
}

fn strip_scheme(input: &str) -> &str {
    for scheme in ["https://", "http://"] {
        match input.get(..scheme.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(scheme) => return &input[scheme.len()..],
            _ => {}
        }
    }
    input
}
