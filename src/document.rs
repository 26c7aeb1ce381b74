//! Typed view of an RDAP response.
//!
//! RDAP is deliberately extensible, so every object keeps the members it does
//! not model in a flattened `extra` map. Deserializing and re-serializing a
//! document therefore loses nothing.
//!
//! Registries are loose about member shapes. Apart from `objectClassName`, a
//! member of the wrong type reads as absent instead of failing the document,
//! a bare value where a list is expected reads as a one-element list, and
//! malformed list items are dropped.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| T::deserialize(item).ok())
                .collect(),
        ),
        single => T::deserialize(single).ok().map(|item| vec![item]),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdapDocument {
    pub object_class_name: String,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ldh_name: Option<String>,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<String>>,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Entity>>,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Event>>,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub notices: Option<Vec<Notice>>,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub nameservers: Option<Vec<Nameserver>>,

    #[serde(rename = "secureDNS", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub secure_dns: Option<SecureDns>,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub public_ids: Option<Vec<PublicId>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RdapDocument {
    pub fn entities(&self) -> &[Entity] {
        self.entities.as_deref().unwrap_or_default()
    }

    pub fn events(&self) -> &[Event] {
        self.events.as_deref().unwrap_or_default()
    }

    pub fn nameservers(&self) -> &[Nameserver] {
        self.nameservers.as_deref().unwrap_or_default()
    }

    pub fn status(&self) -> &[String] {
        self.status.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub object_class_name: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,

    /// jCard payload: `["vcard", [[name, params, type, value], ...]]`.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub vcard_array: Option<Value>,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Entity>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity {
    pub fn roles(&self) -> &[String] {
        self.roles.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, deserialize_with = "lenient")]
    pub event_action: String,
    #[serde(default, deserialize_with = "lenient")]
    pub event_date: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default, deserialize_with = "lenient")]
    pub rel: String,
    #[serde(default, deserialize_with = "lenient")]
    pub href: String,

    #[serde(rename = "type", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub description: Option<Vec<String>>,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nameserver {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub object_class_name: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ldh_name: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ip_addresses: Option<IpAddresses>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpAddresses {
    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub v4: Option<Vec<String>>,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub v6: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureDns {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub zone_signed: Option<bool>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub delegation_signed: Option<bool>,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub ds_data: Option<Vec<Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicId {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub id_type: String,
    #[serde(default, deserialize_with = "lenient")]
    pub identifier: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "objectClassName": "domain",
            "handle": "2336799_DOMAIN_COM-VRSN",
            "ldhName": "EXAMPLE.COM",
            "status": ["client delete prohibited"],
            "secureDNS": { "delegationSigned": false },
            "nameservers": [
                { "objectClassName": "nameserver", "ldhName": "A.IANA-SERVERS.NET" }
            ],
            "rdapConformance": ["rdap_level_0", "icann_rdap_technical_implementation_guide_1"],
            "port43": "whois.verisign-grs.com"
        })
    }

    #[test]
    fn test_extension_fields_are_preserved() {
        let doc: RdapDocument = serde_json::from_value(sample()).unwrap();
        assert_eq!(doc.ldh_name.as_deref(), Some("EXAMPLE.COM"));
        assert!(doc.extra.contains_key("rdapConformance"));
        assert_eq!(doc.extra["port43"], "whois.verisign-grs.com");
        assert_eq!(doc.secure_dns.as_ref().and_then(|s| s.delegation_signed), Some(false));

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_object_class_name_is_required() {
        let result = serde_json::from_value::<RdapDocument>(json!({ "ldhName": "example.com" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_lists_read_as_empty() {
        let doc: RdapDocument =
            serde_json::from_value(json!({ "objectClassName": "domain" })).unwrap();
        assert!(doc.entities().is_empty());
        assert!(doc.events().is_empty());
        assert!(doc.nameservers().is_empty());
        assert!(doc.status().is_empty());
    }

    #[test]
    fn test_loose_member_shapes_do_not_reject_the_document() {
        let doc: RdapDocument = serde_json::from_value(json!({
            "objectClassName": "domain",
            "ldhName": "example.com",
            "notices": [{ "title": "Terms", "description": "single line" }],
            "events": [
                { "eventAction": "registration", "eventDate": null },
                "not an event"
            ],
            "nameservers": [{
                "objectClassName": "nameserver",
                "ldhName": "ns1.example.com",
                "ipAddresses": { "v4": "192.0.2.1", "v6": 6 }
            }],
            "secureDNS": { "delegationSigned": "yes" },
            "status": "active",
            "handle": 42
        }))
        .unwrap();

        let notice = &doc.notices.as_ref().unwrap()[0];
        assert_eq!(notice.description, Some(vec!["single line".to_string()]));

        assert_eq!(doc.events().len(), 1);
        assert_eq!(doc.events()[0].event_action, "registration");
        assert_eq!(doc.events()[0].event_date, "");

        let ips = doc.nameservers()[0].ip_addresses.as_ref().unwrap();
        assert_eq!(ips.v4, Some(vec!["192.0.2.1".to_string()]));
        assert_eq!(ips.v6, None);

        assert_eq!(doc.secure_dns.as_ref().and_then(|s| s.delegation_signed), None);
        assert_eq!(doc.status(), ["active".to_string()]);
        assert_eq!(doc.handle, None);
        assert_eq!(doc.ldh_name.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_null_members_read_as_absent() {
        let doc: RdapDocument = serde_json::from_value(json!({
            "objectClassName": "domain",
            "entities": null,
            "links": [{ "rel": null, "href": "https://rdap.example/domain/example.com" }],
            "publicIds": [{ "type": null, "identifier": "1234" }]
        }))
        .unwrap();

        assert!(doc.entities().is_empty());
        let link = &doc.links.as_ref().unwrap()[0];
        assert_eq!(link.rel, "");
        assert_eq!(link.href, "https://rdap.example/domain/example.com");
        let id = &doc.public_ids.as_ref().unwrap()[0];
        assert_eq!(id.id_type, "");
        assert_eq!(id.identifier, "1234");
    }
}
