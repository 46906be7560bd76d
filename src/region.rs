//! Routing regions and the static country -> region table.
//!
//! Four regions host routing infrastructure. Everything that cannot be placed
//! in one of them maps to [`Region::Unknown`], which serializes as `"unknown"`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    Frankfurt,
    Dubai,
    NewYork,
    Tokyo,
    /// No determinable region
    #[serde(rename = "unknown")]
    Unknown,
}

/// ISO 3166-1 alpha-2 country code -> region.
///
/// Pure data; codes not listed here classify as [`Region::Unknown`].
pub const COUNTRY_REGIONS: &[(&str, Region)] = &[
    // North/South America
    ("US", Region::NewYork),
    ("CA", Region::NewYork),
    ("MX", Region::NewYork),
    ("BR", Region::NewYork),
    ("AR", Region::NewYork),
    ("CL", Region::NewYork),
    ("CO", Region::NewYork),
    ("PE", Region::NewYork),
    ("VE", Region::NewYork),
    // Europe
    ("DE", Region::Frankfurt),
    ("FR", Region::Frankfurt),
    ("GB", Region::Frankfurt),
    ("NL", Region::Frankfurt),
    ("BE", Region::Frankfurt),
    ("CH", Region::Frankfurt),
    ("AT", Region::Frankfurt),
    ("PL", Region::Frankfurt),
    ("CZ", Region::Frankfurt),
    ("SE", Region::Frankfurt),
    ("NO", Region::Frankfurt),
    ("DK", Region::Frankfurt),
    ("FI", Region::Frankfurt),
    ("IE", Region::Frankfurt),
    ("PT", Region::Frankfurt),
    ("ES", Region::Frankfurt),
    ("IT", Region::Frankfurt),
    ("GR", Region::Frankfurt),
    ("RO", Region::Frankfurt),
    ("HU", Region::Frankfurt),
    ("BG", Region::Frankfurt),
    ("UA", Region::Frankfurt),
    ("RU", Region::Frankfurt),
    // Middle East, Africa, India
    ("AE", Region::Dubai),
    ("SA", Region::Dubai),
    ("QA", Region::Dubai),
    ("KW", Region::Dubai),
    ("BH", Region::Dubai),
    ("OM", Region::Dubai),
    ("IL", Region::Dubai),
    ("TR", Region::Dubai),
    ("EG", Region::Dubai),
    ("ZA", Region::Dubai),
    ("NG", Region::Dubai),
    ("KE", Region::Dubai),
    ("IN", Region::Dubai),
    ("PK", Region::Dubai),
    ("BD", Region::Dubai),
    // East/South-East Asia, Oceania
    ("JP", Region::Tokyo),
    ("KR", Region::Tokyo),
    ("CN", Region::Tokyo),
    ("HK", Region::Tokyo),
    ("TW", Region::Tokyo),
    ("SG", Region::Tokyo),
    ("MY", Region::Tokyo),
    ("TH", Region::Tokyo),
    ("VN", Region::Tokyo),
    ("PH", Region::Tokyo),
    ("ID", Region::Tokyo),
    ("AU", Region::Tokyo),
    ("NZ", Region::Tokyo),
];

impl Region {
    pub const ALL: [Region; 5] = [
        Region::Frankfurt,
        Region::Dubai,
        Region::NewYork,
        Region::Tokyo,
        Region::Unknown,
    ];

    /// Classify a country code. Absent or unmapped codes give `Unknown`.
    pub fn from_country_code(country_code: Option<&str>) -> Region {
        let Some(code) = country_code else {
            return Region::Unknown;
        };
        COUNTRY_REGIONS
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(code))
            .map(|(_, region)| *region)
            .unwrap_or(Region::Unknown)
    }

    /// Label used in the region-map document.
    pub fn label(&self) -> &'static str {
        match self {
            Region::Frankfurt => "Frankfurt",
            Region::Dubai => "Dubai",
            Region::NewYork => "NewYork",
            Region::Tokyo => "Tokyo",
            Region::Unknown => "unknown",
        }
    }

    /// Human-readable geographic label for the region.
    pub fn geo_label(&self) -> &'static str {
        match self {
            Region::Frankfurt => "Europe/Frankfurt",
            Region::Dubai => "Middle East/Dubai",
            Region::NewYork => "North America/New York",
            Region::Tokyo => "Asia/Tokyo",
            Region::Unknown => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Region::Unknown
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
