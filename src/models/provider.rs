//! Upstream brand-data providers

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::config::defaults::{BRANDFETCH_API_KEY_ENV, LOGO_DEV_API_KEY_ENV};

/// Closed set of providers the resolver knows how to query
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ProviderKind {
    #[default]
    Brandfetch,
    LogoDev,
}

impl ProviderKind {
    pub fn all() -> impl Iterator<Item = ProviderKind> {
        Self::iter()
    }

    /// Identifiers accepted by [`ProviderKind::from_str`](std::str::FromStr)
    pub fn supported_names() -> Vec<&'static str> {
        Self::iter().map(|p| p.as_static_str()).collect()
    }

    pub fn as_static_str(&self) -> &'static str {
        match self {
            ProviderKind::Brandfetch => "brandfetch",
            ProviderKind::LogoDev => "logo_dev",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Brandfetch => BRANDFETCH_API_KEY_ENV,
            ProviderKind::LogoDev => LOGO_DEV_API_KEY_ENV,
        }
    }
}
