//! Mapping of raw phpIPAM objects onto cached collection records

use phpipam::{first_present, format_subnet, resolve_id, text_field, value_to_text};
use serde::Serialize;
use serde_json::Value;

use crate::models::CollectionRecord;

/// Field spellings, in priority order
pub const NAME_KEYS: &[&str] = &["name"];
pub const DESCRIPTION_KEYS: &[&str] = &["description"];
pub const SLUG_KEYS: &[&str] = &["slug"];
pub const ADDRESS_KEYS: &[&str] = &["address"];
pub const CONTACT_KEYS: &[&str] = &["contact"];
pub const SITE_ID_KEYS: &[&str] = &["siteId", "siteID", "siteid"];
pub const SUBNET_ADDRESS_KEYS: &[&str] = &["subnet", "address", "ip"];
pub const MASK_KEYS: &[&str] = &["mask", "netmask", "cidr"];
pub const VLAN_KEYS: &[&str] = &["vlanId", "vlan_id", "vlan"];
pub const VRF_KEYS: &[&str] = &["vrfId", "vrf_id", "vrf"];
pub const GATEWAY_KEYS: &[&str] = &["gateway", "gateway_ip", "gatewayIp"];
/// Address keys inside an object-valued gateway
pub const GATEWAY_ADDRESS_KEYS: &[&str] = &["ip_addr", "ip"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SectionMetadata {
    remote_id: Option<Value>,
    slug: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LocationMetadata {
    remote_id: Option<Value>,
    address: Option<String>,
    contact: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RangeMetadata {
    remote_id: Option<Value>,
    cidr: Option<String>,
    section_id: Value,
    section_name: Option<String>,
    vlan_id: Option<Value>,
    vrf_id: Option<Value>,
    gateway: Option<String>,
}

fn remote_label(remote_id: Option<&Value>) -> String {
    remote_id
        .map(value_to_text)
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn section_record(section: &Value) -> serde_json::Result<CollectionRecord> {
    let remote_id = resolve_id(section, &[]);
    let description = text_field(section, DESCRIPTION_KEYS);
    let name = text_field(section, NAME_KEYS)
        .or_else(|| description.clone())
        .unwrap_or_else(|| format!("Section {}", remote_label(remote_id.as_ref())));

    let metadata = serde_json::to_value(SectionMetadata {
        remote_id,
        slug: text_field(section, SLUG_KEYS),
    })?;

    Ok(CollectionRecord {
        name,
        description,
        metadata,
    })
}

pub fn location_record(location: &Value) -> serde_json::Result<CollectionRecord> {
    let remote_id = resolve_id(location, SITE_ID_KEYS);
    let address = text_field(location, ADDRESS_KEYS);
    let name = text_field(location, NAME_KEYS)
        .unwrap_or_else(|| format!("Location {}", remote_label(remote_id.as_ref())));
    let description = text_field(location, DESCRIPTION_KEYS).or_else(|| address.clone());

    let metadata = serde_json::to_value(LocationMetadata {
        remote_id,
        address,
        contact: text_field(location, CONTACT_KEYS),
    })?;

    Ok(CollectionRecord {
        name,
        description,
        metadata,
    })
}

/// `<address>/<mask>`, or the bare address when no mask is given
pub fn subnet_cidr(subnet: &Value) -> Option<String> {
    let address = first_present(subnet, SUBNET_ADDRESS_KEYS).map(format_subnet)?;
    match text_field(subnet, MASK_KEYS) {
        Some(mask) => Some(format!("{}/{}", address, mask)),
        None => Some(address),
    }
}

fn gateway_address(subnet: &Value) -> Option<String> {
    let gateway = first_present(subnet, GATEWAY_KEYS)?;
    if gateway.is_object() {
        text_field(gateway, GATEWAY_ADDRESS_KEYS)
    } else {
        Some(value_to_text(gateway))
    }
}

pub fn range_record(
    subnet: &Value,
    section: &Value,
    section_id: &Value,
) -> serde_json::Result<CollectionRecord> {
    let remote_id = resolve_id(subnet, &[]);
    let cidr = subnet_cidr(subnet);
    let description = text_field(subnet, DESCRIPTION_KEYS);
    let name = description
        .clone()
        .or_else(|| cidr.clone())
        .unwrap_or_else(|| format!("Subnet {}", remote_label(remote_id.as_ref())));

    let metadata = serde_json::to_value(RangeMetadata {
        remote_id,
        cidr,
        section_id: section_id.clone(),
        section_name: text_field(section, NAME_KEYS),
        vlan_id: first_present(subnet, VLAN_KEYS).cloned(),
        vrf_id: first_present(subnet, VRF_KEYS).cloned(),
        gateway: gateway_address(subnet),
    })?;

    Ok(CollectionRecord {
        name,
        description,
        metadata,
    })
}
