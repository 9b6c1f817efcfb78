//! Service categories offered in the directory

use serde::{Deserialize, Serialize};

/// Service category of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceCategory {
    /// Plumbing
    #[serde(rename = "plomeria")]
    Plumbing,
    /// Electrical work
    #[serde(rename = "electricidad")]
    Electrical,
    /// Carpentry
    #[serde(rename = "carpinteria")]
    Carpentry,
    /// Locksmith
    #[serde(rename = "cerrajeria")]
    Locksmith,
    /// Cleaning
    #[serde(rename = "limpieza")]
    Cleaning,
    /// General repairs
    #[serde(rename = "reparaciones")]
    Repairs,
}

impl ServiceCategory {
    /// All categories in display order
    pub const ALL: [ServiceCategory; 6] = [
        ServiceCategory::Plumbing,
        ServiceCategory::Electrical,
        ServiceCategory::Carpentry,
        ServiceCategory::Locksmith,
        ServiceCategory::Cleaning,
        ServiceCategory::Repairs,
    ];

    /// Slug stored in provider records
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Plumbing => "plomeria",
            Self::Electrical => "electricidad",
            Self::Carpentry => "carpinteria",
            Self::Locksmith => "cerrajeria",
            Self::Cleaning => "limpieza",
            Self::Repairs => "reparaciones",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Plumbing => "Plomería",
            Self::Electrical => "Electricidad",
            Self::Carpentry => "Carpintería",
            Self::Locksmith => "Cerrajería",
            Self::Cleaning => "Limpieza",
            Self::Repairs => "Reparaciones",
        }
    }

    /// Parse a stored slug
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.slug() == slug)
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
