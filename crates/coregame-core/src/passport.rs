//! # Passport Module
//!
//! Global schema of the passport facet: the traits stamped on every player
//! passport and the template for per-user metadata.
//!
//! Both lists are replaced wholesale, the way `setGlobalAttributes` and
//! `setGlobalUserMetadataTemplate` replace them on chain. Rows whose fields
//! are all blank are dropped; any other row needs a key, and keys are unique
//! within a list (ASCII case-insensitive).

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A trait every passport carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassportTrait {
    pub trait_type: String,
    pub value: String,
    #[serde(default)]
    pub display_type: String,
    #[serde(default)]
    pub uri: String,
}

impl PassportTrait {
    /// Build from the parallel arrays taken by `setGlobalAttributes`.
    ///
    /// `display_types` and `uris` may be left empty, meaning blank for every
    /// row.
    pub fn from_columns(
        keys: &[String],
        values: &[String],
        display_types: &[String],
        uris: &[String],
    ) -> Result<Vec<Self>> {
        let values = column("values", values, keys.len(), false)?;
        let display_types = column("display_types", display_types, keys.len(), true)?;
        let uris = column("uris", uris, keys.len(), true)?;
        Ok(keys
            .iter()
            .zip(values)
            .zip(display_types)
            .zip(uris)
            .map(|(((key, value), display_type), uri)| Self {
                trait_type: key.clone(),
                value,
                display_type,
                uri,
            })
            .collect())
    }

    fn trimmed(self) -> Self {
        Self {
            trait_type: self.trait_type.trim().to_string(),
            value: self.value.trim().to_string(),
            display_type: self.display_type.trim().to_string(),
            uri: self.uri.trim().to_string(),
        }
    }

    fn is_blank(&self) -> bool {
        self.trait_type.is_empty() && self.value.is_empty() && self.display_type.is_empty() && self.uri.is_empty()
    }
}

/// One field of the per-user metadata template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataField {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub uri: String,
}

impl MetadataField {
    /// Build from the parallel arrays taken by `setGlobalUserMetadataTemplate`.
    pub fn from_columns(keys: &[String], values: &[String], uris: &[String]) -> Result<Vec<Self>> {
        let values = column("values", values, keys.len(), false)?;
        let uris = column("uris", uris, keys.len(), true)?;
        Ok(keys
            .iter()
            .zip(values)
            .zip(uris)
            .map(|((key, value), uri)| Self {
                key: key.clone(),
                value,
                uri,
            })
            .collect())
    }

    fn trimmed(self) -> Self {
        Self {
            key: self.key.trim().to_string(),
            value: self.value.trim().to_string(),
            uri: self.uri.trim().to_string(),
        }
    }

    fn is_blank(&self) -> bool {
        self.key.is_empty() && self.value.is_empty() && self.uri.is_empty()
    }
}

fn column(name: &'static str, values: &[String], expected: usize, optional: bool) -> Result<Vec<String>> {
    if optional && values.is_empty() {
        return Ok(vec![String::new(); expected]);
    }
    if values.len() != expected {
        return Err(CoreError::ColumnMismatch {
            column: name,
            expected,
            found: values.len(),
        });
    }
    Ok(values.to_vec())
}

fn check_keys<'a>(kind: &str, keys: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = BTreeSet::new();
    for key in keys {
        if key.is_empty() {
            return Err(CoreError::InvalidField(format!("{kind} key must not be empty")));
        }
        if !seen.insert(key.to_ascii_lowercase()) {
            return Err(CoreError::DuplicateKey(key.to_string()));
        }
    }
    Ok(())
}

// =============================================================================
// SCHEMA
// =============================================================================

/// Passport configuration of one game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassportSchema {
    pub traits: Vec<PassportTrait>,
    pub user_metadata: Vec<MetadataField>,
    /// Passports minted so far, as last read from the chain.
    pub total_passports: u64,
}

impl PassportSchema {
    /// Replace the global traits.
    pub fn set_traits(&mut self, traits: Vec<PassportTrait>) -> Result<()> {
        let traits: Vec<PassportTrait> = traits
            .into_iter()
            .map(PassportTrait::trimmed)
            .filter(|t| !t.is_blank())
            .collect();
        check_keys("trait", traits.iter().map(|t| t.trait_type.as_str()))?;
        self.traits = traits;
        Ok(())
    }

    /// Replace the user metadata template.
    pub fn set_user_metadata(&mut self, fields: Vec<MetadataField>) -> Result<()> {
        let fields: Vec<MetadataField> = fields
            .into_iter()
            .map(MetadataField::trimmed)
            .filter(|f| !f.is_blank())
            .collect();
        check_keys("metadata", fields.iter().map(|f| f.key.as_str()))?;
        self.user_metadata = fields;
        Ok(())
    }
}

/// Partial passport update. `None` leaves a part untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassportPatch {
    pub traits: Option<Vec<PassportTrait>>,
    pub user_metadata: Option<Vec<MetadataField>>,
    pub total_passports: Option<u64>,
}

impl PassportPatch {
    /// Apply every present part. On error `schema` is left unchanged.
    pub fn apply(self, schema: &mut PassportSchema) -> Result<()> {
        let mut next = schema.clone();
        if let Some(traits) = self.traits {
            next.set_traits(traits)?;
        }
        if let Some(fields) = self.user_metadata {
            next.set_user_metadata(fields)?;
        }
        if let Some(total) = self.total_passports {
            next.total_passports = total;
        }
        *schema = next;
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// =============================================================================
// TESTS
// =============================================================================
