//! Brand records returned by the upstream brand-data API
//!
//! Payloads are parsed into these types once, at the API boundary. Optional
//! or null fields collapse to `None`/empty so that extraction never has to
//! probe raw JSON.

use serde::{Deserialize, Deserializer, Serialize};

/// One brand as returned by a provider search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    /// Top-level icon URL (`logo_url` on providers without logo sets)
    #[serde(default, alias = "logo_url")]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logos: Vec<LogoEntry>,
    /// Upstream relevance score, higher is better
    #[serde(default, alias = "qualityScore", alias = "score")]
    pub relevance: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

/// A logo variant (icon, wordmark, symbol...) with its rendered formats
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogoEntry {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub formats: Vec<FormatEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub format: AssetFormat,
    #[serde(default)]
    pub src: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetFormat {
    Png,
    Svg,
    #[serde(alias = "jpg")]
    Jpeg,
    Webp,
    #[default]
    #[serde(other)]
    Other,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a provider response body into brand records
///
/// Records without a name and without a domain cannot be matched or
/// displayed and are dropped here.
pub fn parse_brand_records(body: &[u8]) -> Result<Vec<BrandRecord>, serde_json::Error> {
    let records: Vec<BrandRecord> = serde_json::from_slice(body)?;
    Ok(records
        .into_iter()
        .filter(|record| record.name.is_some() || record.domain.is_some())
        .collect())
}

impl BrandRecord {
    /// Name to show for this brand, falling back to the domain
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(self.domain.as_deref())
    }

    /// Case-insensitive equality against an already normalized query
    pub fn name_matches(&self, normalized_query: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| name.trim().to_lowercase() == normalized_query)
    }

    pub fn domain_matches(&self, domain: &str) -> bool {
        self.domain
            .as_deref()
            .is_some_and(|own| own.trim().eq_ignore_ascii_case(domain.trim()))
    }

    /// Best logo asset URL for this brand
    ///
    /// The first logo entry with a non-empty format list decides: PNG, then
    /// SVG, then whatever format comes first. Without such an entry the
    /// top-level icon is used.
    pub fn logo_url(&self) -> Option<&str> {
        let from_logos = self
            .logos
            .iter()
            .find(|entry| !entry.formats.is_empty())
            .and_then(|entry| entry.preferred_src());

        from_logos.or_else(|| non_empty(self.icon.as_deref()))
    }
}

impl LogoEntry {
    fn preferred_src(&self) -> Option<&str> {
        let by_format = |wanted: AssetFormat| {
            self.formats
                .iter()
                .filter(|f| f.format == wanted)
                .find_map(|f| non_empty(f.src.as_deref()))
        };

        by_format(AssetFormat::Png)
            .or_else(|| by_format(AssetFormat::Svg))
            .or_else(|| self.formats.first().and_then(|f| non_empty(f.src.as_deref())))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
