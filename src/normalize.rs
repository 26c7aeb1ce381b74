//! Best-effort projections of an RDAP document.
//!
//! Nothing here fails. Servers are free to leave fields out or encode them
//! oddly, and missing or malformed input simply produces an emptier view.

use crate::document::{Entity, IpAddresses, RdapDocument, SecureDns};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fmt};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<PostalAddress>,
}

impl ContactRecord {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Full name, else organization. Empty strings count as missing.
    pub fn display_name(&self) -> Option<&str> {
        [&self.full_name, &self.organization]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// The vCard properties we project. Everything else lands in `Ignored`.
#[derive(Debug, PartialEq)]
enum VCardProperty<'a> {
    FullName(&'a Value),
    Organization(&'a Value),
    Email(&'a Value),
    Phone(&'a Value),
    Address(&'a [Value]),
    Ignored,
}

impl<'a> VCardProperty<'a> {
    /// Interpret one `[name, params, value-type, value]` tuple.
    fn from_tuple(item: &'a Value) -> Self {
        let Some(tuple) = item.as_array() else {
            return Self::Ignored;
        };
        let (Some(tag), Some(value)) = (tuple.first().and_then(Value::as_str), tuple.get(3)) else {
            return Self::Ignored;
        };

        match tag {
            "fn" => Self::FullName(value),
            "org" => Self::Organization(value),
            "email" => Self::Email(value),
            "tel" => Self::Phone(value),
            "adr" => match value.as_array() {
                Some(parts) => Self::Address(parts),
                None => Self::Ignored,
            },
            _ => Self::Ignored,
        }
    }
}

/// Project an entity's jCard into a contact record. Repeated properties
/// overwrite earlier ones.
pub fn parse_contact(entity: &Entity) -> ContactRecord {
    let mut contact = ContactRecord::default();

    let properties = entity
        .vcard_array
        .as_ref()
        .and_then(|vcard| vcard.get(1))
        .and_then(Value::as_array);
    let Some(properties) = properties else {
        return contact;
    };

    for item in properties {
        match VCardProperty::from_tuple(item) {
            VCardProperty::FullName(v) => contact.full_name = text(v),
            VCardProperty::Organization(v) => contact.organization = text(v),
            VCardProperty::Email(v) => contact.email = text(v),
            VCardProperty::Phone(v) => contact.phone = text(v),
            VCardProperty::Address(parts) => {
                let at = |i: usize| parts.get(i).and_then(text);
                contact.address = Some(PostalAddress {
                    street: at(2),
                    city: at(3),
                    state: at(4),
                    postal_code: at(5),
                    country: at(6),
                });
            }
            VCardProperty::Ignored => {}
        }
    }

    contact
}

// Strings pass through, and lists of strings (multi-line streets,
// org units) are joined.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameserverSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ips: Option<IpAddresses>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactSummary {
    #[serde(flatten)]
    pub contact: ContactRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<String>>,
    pub events: BTreeMap<String, String>,
    pub nameservers: Vec<NameserverSummary>,
    pub contacts: BTreeMap<String, ContactSummary>,
    #[serde(rename = "secureDNS", skip_serializing_if = "Option::is_none")]
    pub secure_dns: Option<SecureDns>,
}

impl FormattedSummary {
    /// Pretty-printed JSON block. Map keys are sorted, so equal summaries
    /// always render to identical text.
    pub fn to_pretty_string(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl fmt::Display for FormattedSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pretty_string())
    }
}

pub fn format_summary(doc: &RdapDocument) -> FormattedSummary {
    let mut events = BTreeMap::new();
    for event in doc.events() {
        // later events with the same action win
        events.insert(event.event_action.clone(), iso_timestamp(&event.event_date));
    }

    let nameservers = doc
        .nameservers()
        .iter()
        .map(|ns| NameserverSummary {
            name: ns.ldh_name.clone(),
            ips: ns.ip_addresses.clone(),
        })
        .collect();

    let mut contacts = BTreeMap::new();
    for entity in doc.entities() {
        let contact = parse_contact(entity);
        for role in entity.roles() {
            contacts.insert(
                role.clone(),
                ContactSummary {
                    contact: contact.clone(),
                    handle: entity.handle.clone(),
                },
            );
        }
    }

    FormattedSummary {
        domain: doc.ldh_name.clone(),
        handle: doc.handle.clone(),
        status: doc.status.clone(),
        events,
        nameservers,
        contacts,
        secure_dns: doc.secure_dns.clone(),
    }
}

/// Normalize an RDAP date to UTC ISO-8601 with millisecond precision.
/// Unparseable input is returned unchanged.
pub fn iso_timestamp(raw: &str) -> String {
    let trimmed = raw.trim();
    let parsed = DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        });

    match parsed {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => raw.to_string(),
    }
}

/// One line per entity: its roles and the best available name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactLine {
    pub roles: String,
    pub name: String,
}

pub fn contacts(doc: &RdapDocument) -> Vec<ContactLine> {
    doc.entities()
        .iter()
        .map(|entity| {
            let contact = parse_contact(entity);
            let roles = entity.roles();
            ContactLine {
                roles: if roles.is_empty() {
                    "Unknown".to_string()
                } else {
                    roles.join(", ")
                },
                name: contact.display_name().unwrap_or("N/A").to_string(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub domain: Option<String>,
    pub status: String,
}

pub fn key_info(doc: &RdapDocument) -> KeyInfo {
    let status = doc.status();
    KeyInfo {
        domain: doc.ldh_name.clone(),
        status: if status.is_empty() {
            "Unknown".to_string()
        } else {
            status.join(", ")
        },
    }
}
