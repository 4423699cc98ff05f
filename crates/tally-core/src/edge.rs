//! Edge metadata — connection, geolocation and network attributes made
//! available by the serving infrastructure rather than by the client.

use crate::visit::VisitFields;

/// ISO 3166-1 alpha-2 codes of the EU member states.
const EU_COUNTRIES: &[&str] = &[
  "AT", "BE", "BG", "CY", "CZ", "DE", "DK", "EE", "ES", "FI", "FR", "GR",
  "HR", "HU", "IE", "IT", "LT", "LU", "LV", "MT", "NL", "PL", "PT", "RO",
  "SE", "SI", "SK",
];

/// Placeholder codes a CDN emits when the country is unknown (`XX`) or the
/// client connects through Tor (`T1`).
const UNKNOWN_COUNTRIES: &[&str] = &["XX", "T1"];

/// Attributes observed by the edge for a single request. Empty strings mean
/// "not available".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeMetadata {
  pub country:      String,
  pub city:         String,
  pub region:       String,
  pub region_code:  String,
  pub continent:    String,
  pub postal_code:  String,
  pub metro_code:   String,
  pub timezone:     String,
  pub latitude:     String,
  pub longitude:    String,
  pub asn:          String,
  pub colo:         String,
  pub http_version: String,
  pub tls_version:  String,
  pub tls_cipher:   String,
}

impl EdgeMetadata {
  /// Copy into the geo/network columns of `fields`, normalising the country
  /// code and deriving `is_eu_country` from it.
  pub fn write_into(self, fields: &mut VisitFields) {
    let country = normalize_country(&self.country);
    fields.is_eu_country = is_eu_country(&country).to_string();
    fields.country = country;
    fields.city = self.city;
    fields.region = self.region;
    fields.region_code = self.region_code;
    fields.continent = self.continent;
    fields.postal_code = self.postal_code;
    fields.metro_code = self.metro_code;
    fields.timezone = self.timezone;
    fields.latitude = self.latitude;
    fields.longitude = self.longitude;
    fields.asn = self.asn;
    fields.colo = self.colo;
    fields.http_version = self.http_version;
    fields.tls_version = self.tls_version;
    fields.tls_cipher = self.tls_cipher;
  }
}

/// Uppercase a country code and blank out placeholder values.
pub fn normalize_country(raw: &str) -> String {
  let code = raw.trim().to_ascii_uppercase();
  if UNKNOWN_COUNTRIES.contains(&code.as_str()) {
    String::new()
  } else {
    code
  }
}

pub fn is_eu_country(code: &str) -> bool {
  EU_COUNTRIES.contains(&code.to_ascii_uppercase().as_str())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn eu_membership_is_case_insensitive() {
    assert!(is_eu_country("DE"));
    assert!(is_eu_country("fr"));
    assert!(!is_eu_country("GB"));
    assert!(!is_eu_country(""));
  }

  #[test]
  fn write_into_sets_stringified_eu_flag() {
    let mut fields = VisitFields::default();
    EdgeMetadata { country: "nl".into(), colo: "AMS".into(), ..Default::default() }
      .write_into(&mut fields);
    assert_eq!(fields.country, "NL");
    assert_eq!(fields.is_eu_country, "true");
    assert_eq!(fields.colo, "AMS");

    let mut fields = VisitFields::default();
    EdgeMetadata::default().write_into(&mut fields);
    assert_eq!(fields.is_eu_country, "false");
  }

  #[test]
  fn placeholder_countries_normalise_to_empty() {
    assert_eq!(normalize_country("XX"), "");
    assert_eq!(normalize_country("T1"), "");
    assert_eq!(normalize_country(" us "), "US");
  }
}
