//! # Inventory Module
//!
//! Item types registered with the inventory facet through `addItem`.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One attribute of an item type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAttribute {
    pub trait_type: String,
    pub value: String,
    #[serde(default)]
    pub display_type: String,
}

impl FromStr for ItemAttribute {
    type Err = CoreError;

    /// Parses `trait=value` or `trait=value=display`.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, '=');
        let trait_type = parts.next().unwrap_or_default().trim();
        let Some(value) = parts.next() else {
            return Err(CoreError::InvalidField(format!(
                "attribute `{s}`: expected trait=value[=display]"
            )));
        };
        Ok(Self {
            trait_type: trait_type.to_string(),
            value: value.trim().to_string(),
            display_type: parts.next().unwrap_or_default().trim().to_string(),
        })
    }
}

/// An item type players can hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub token_id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_uri: String,
    #[serde(default)]
    pub attributes: Vec<ItemAttribute>,
}

impl InventoryItem {
    #[must_use]
    pub fn new(token_id: u64, name: &str) -> Self {
        Self {
            token_id,
            name: name.to_string(),
            description: String::new(),
            image_uri: String::new(),
            attributes: Vec::new(),
        }
    }

    /// First trait type, shown as the item's attribute in listings.
    #[must_use]
    pub fn primary_attribute(&self) -> Option<&str> {
        self.attributes.first().map(|a| a.trait_type.as_str())
    }

    fn normalized(mut self) -> Result<Self> {
        self.name = self.name.trim().to_string();
        self.description = self.description.trim().to_string();
        self.image_uri = self.image_uri.trim().to_string();
        if self.name.is_empty() {
            return Err(CoreError::InvalidField(format!("item {} needs a name", self.token_id)));
        }

        let mut attributes = Vec::with_capacity(self.attributes.len());
        for attr in self.attributes {
            let attr = ItemAttribute {
                trait_type: attr.trait_type.trim().to_string(),
                value: attr.value.trim().to_string(),
                display_type: attr.display_type.trim().to_string(),
            };
            if attr.trait_type.is_empty() {
                if attr.value.is_empty() && attr.display_type.is_empty() {
                    continue;
                }
                return Err(CoreError::InvalidField(format!(
                    "item {}: attribute trait type must not be empty",
                    self.token_id
                )));
            }
            attributes.push(attr);
        }
        self.attributes = attributes;
        Ok(self)
    }
}

/// Item types of one game, ordered by token id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemCatalog(Vec<InventoryItem>);

impl ItemCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item type. Token ids are unique.
    pub fn add(&mut self, item: InventoryItem) -> Result<()> {
        let item = item.normalized()?;
        match self.0.binary_search_by_key(&item.token_id, |i| i.token_id) {
            Ok(_) => Err(CoreError::DuplicateItem(item.token_id)),
            Err(pos) => {
                self.0.insert(pos, item);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn get(&self, token_id: u64) -> Option<&InventoryItem> {
        self.0
            .binary_search_by_key(&token_id, |i| i.token_id)
            .ok()
            .and_then(|pos| self.0.get(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryItem> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
