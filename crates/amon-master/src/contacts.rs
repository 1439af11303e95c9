//! §4.6 Contact Model: parse a contact URN into `(attrName, subKey?)` and
//! resolve it against a user record into `(medium, address)`.

use amon_domain::{DomainError, User};
use amon_notify::NotificationRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrn {
    pub attr_name: String,
    pub sub_key: Option<String>,
}

/// `<medium>` or `<medium>:<sub-key>` (§3).
pub fn parse_urn(urn: &str) -> Result<ParsedUrn, DomainError> {
    if urn.is_empty() {
        return Err(DomainError::InvalidContactUrn(urn.to_string()));
    }
    match urn.split_once(':') {
        Some((attr, sub)) if !attr.is_empty() && !sub.is_empty() => {
            Ok(ParsedUrn { attr_name: attr.to_string(), sub_key: Some(sub.to_string()) })
        }
        Some(_) => Err(DomainError::InvalidContactUrn(urn.to_string())),
        None => Ok(ParsedUrn { attr_name: urn.to_string(), sub_key: None }),
    }
}

#[derive(Debug, Clone)]
pub struct Contact {
    pub medium: String,
    /// `None` means the attribute was absent on the user record — the
    /// caller must raise a config alarm to the probe owner (§3, §4.8).
    pub address: Option<String>,
}

/// Resolve a contact URN against `user`'s directory attributes, asking
/// `notify` for the plugin that accepts the attribute name (§4.6). Fails
/// with `InvalidContactUrn` only if the URN itself is malformed, or if no
/// plugin accepts the medium — a missing attribute is not an error, it is
/// the "config alarm" case.
pub fn resolve(user: &User, urn: &str, notify: &NotificationRegistry) -> Result<Contact, DomainError> {
    let parsed = parse_urn(urn)?;
    let plugin = notify
        .for_medium(&parsed.attr_name)
        .map_err(|_| DomainError::InvalidContactUrn(format!("no plugin accepts medium '{}'", parsed.attr_name)))?;
    let address = user.attribute(&parsed.attr_name).map(str::to_string);
    Ok(Contact { medium: plugin.name().to_string(), address })
}
