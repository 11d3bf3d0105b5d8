//! Storefront address/contact records and their gateway-shaped projections.
//!
//! The maximum lengths are the gateway's field limits; anything longer is
//! rejected by the gateway, so values are cut rather than sent as-is.

use serde::{Deserialize, Serialize};

use crate::country::iso2_to_iso3;

pub const CITY_MAX: usize = 100;
pub const POSTCODE_MAX: usize = 10;
pub const STREET_MAX: usize = 100;
pub const STREET2_MAX: usize = 100;
pub const COMPANY_MAX: usize = 100;
pub const NAME_MAX: usize = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub postcode: String,
    /// ISO 3166-1 alpha-2.
    pub country_iso2: String,
    pub company: Option<String>,
    pub firstname: String,
    pub lastname: String,
    pub phone: Option<String>,
    pub phone_mobile: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    pub firstname: String,
    pub lastname: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub phone_mobile: Option<String>,
}

impl From<&Address> for Contact {
    fn from(address: &Address) -> Self {
        Contact {
            firstname: address.firstname.clone(),
            lastname: address.lastname.clone(),
            email: None,
            phone: address.phone.clone(),
            phone_mobile: address.phone_mobile.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode_zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayContact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Trim, drop empty values, and cut to `limit` characters (never mid code point).
pub fn safe(value: &str, limit: usize) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.chars().take(limit).collect())
}

fn safe_opt(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn address_for_gateway(address: &Address) -> GatewayAddress {
    let country = iso2_to_iso3(&address.country_iso2).map(str::to_string);
    if country.is_none() {
        tracing::warn!(
            "No alpha-3 mapping for country code '{}', omitting country",
            address.country_iso2
        );
    }

    GatewayAddress {
        city: safe(&address.city, CITY_MAX),
        country,
        postcode_zip: safe(&address.postcode, POSTCODE_MAX),
        street: safe(&address.address1, STREET_MAX),
        street2: address.address2.as_deref().and_then(|s| safe(s, STREET2_MAX)),
        company: address.company.as_deref().and_then(|s| safe(s, COMPANY_MAX)),
    }
}

pub fn contact_for_gateway(contact: &Contact) -> GatewayContact {
    GatewayContact {
        first_name: safe(&contact.firstname, NAME_MAX),
        last_name: safe(&contact.lastname, NAME_MAX),
        email: safe_opt(contact.email.as_ref()),
        mobile_phone: safe_opt(contact.phone_mobile.as_ref()),
        phone: safe_opt(contact.phone.as_ref()),
    }
}
