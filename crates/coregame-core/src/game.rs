//! # Game Module
//!
//! The local record of a game diamond: metadata, attached facets,
//! authorized users, the passport schema and the item catalog.
//!
//! Timestamps are unix seconds supplied by the caller. The core never reads
//! the clock.

use crate::address::Address;
use crate::error::{CoreError, Result};
use crate::inventory::{InventoryItem, ItemCatalog};
use crate::lifecycle::{LifecycleState, LifecycleStatus, ModuleKind, ModuleSet, classify};
use crate::passport::{PassportPatch, PassportSchema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// METADATA
// =============================================================================

/// Social profile links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    pub twitter: String,
    pub discord: String,
    pub telegram: String,
    pub youtube: String,
    pub tiktok: String,
    pub instagram: String,
}

/// Descriptive metadata held by the metadata facet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub name: String,
    pub description: String,
    pub genre: String,
    pub image_uri: String,
    pub game_link: String,
    pub website: String,
    pub support_email: String,
    pub socials: SocialLinks,
}

impl GameMetadata {
    /// Mirrors `setBasicGameMetadata`.
    pub fn set_basic(&mut self, name: &str, description: &str, genre: &str, image_uri: &str) {
        self.name = name.trim().to_string();
        self.description = description.trim().to_string();
        self.genre = genre.trim().to_string();
        self.image_uri = image_uri.trim().to_string();
    }

    /// Mirrors `setGameLinks`.
    pub fn set_links(&mut self, game_link: &str, website: &str, support_email: &str) {
        self.game_link = game_link.trim().to_string();
        self.website = website.trim().to_string();
        self.support_email = support_email.trim().to_string();
    }

    /// Mirrors `setSocialLinks`.
    pub fn set_socials(&mut self, socials: SocialLinks) {
        self.socials = socials;
    }
}

/// Partial metadata update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub image_uri: Option<String>,
    pub game_link: Option<String>,
    pub website: Option<String>,
    pub support_email: Option<String>,
    pub socials: Option<SocialLinks>,
}

impl MetadataPatch {
    /// Apply every present field to `metadata`.
    pub fn apply(self, metadata: &mut GameMetadata) {
        let fields = [
            (self.name, &mut metadata.name),
            (self.description, &mut metadata.description),
            (self.genre, &mut metadata.genre),
            (self.image_uri, &mut metadata.image_uri),
            (self.game_link, &mut metadata.game_link),
            (self.website, &mut metadata.website),
            (self.support_email, &mut metadata.support_email),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value.trim().to_string();
            }
        }
        if let Some(socials) = self.socials {
            metadata.set_socials(socials);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// =============================================================================
// FACET MAP
// =============================================================================

/// Facet name to facet address, as reported by the diamond.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacetMap(BTreeMap<String, Address>);

impl FacetMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the facet registry's parallel address and name lists.
    ///
    /// Lists of different length, or a name listed twice, are rejected.
    pub fn from_registry(addresses: &[Address], names: &[String]) -> Result<Self> {
        if addresses.len() != names.len() {
            return Err(CoreError::RegistryMismatch {
                addresses: addresses.len(),
                names: names.len(),
            });
        }
        let mut map = Self::new();
        for (name, address) in names.iter().zip(addresses) {
            if map.contains(name) {
                return Err(CoreError::DuplicateFacetName(name.clone()));
            }
            map.0.insert(name.clone(), *address);
        }
        Ok(map)
    }

    /// Combine the two on-chain views of the facet inventory.
    ///
    /// The game data facet's `deployedFacets` listing wins when it is
    /// non-empty; otherwise the registry listing is used.
    #[must_use]
    pub fn resolve(registry: Option<Self>, deployed: Option<Self>) -> Self {
        match (registry, deployed) {
            (_, Some(deployed)) if !deployed.is_empty() => deployed,
            (Some(registry), _) => registry,
            _ => Self::new(),
        }
    }

    /// Address registered under `name`, matched case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Address> {
        self.0.get(name).copied().or_else(|| {
            self.0
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| *v)
        })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Register a facet. Fails if the name is already present.
    pub fn attach(&mut self, name: &str, address: Address) -> Result<()> {
        if self.contains(name) {
            return Err(CoreError::FacetAlreadyAttached(name.to_string()));
        }
        self.0.insert(name.to_string(), address);
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Address)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn module_set(&self) -> ModuleSet {
        ModuleSet::from_facet_names(self.names())
    }
}

// =============================================================================
// GAME RECORD
// =============================================================================

/// A game diamond known to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Diamond contract address; also the game id.
    pub address: Address,
    /// Account that created the game through the factory.
    pub developer: Address,
    pub metadata: GameMetadata,
    pub facets: FacetMap,
    pub authorized_users: Vec<Address>,
    pub passport: PassportSchema,
    pub items: ItemCatalog,
    pub created_at: u64,
    pub updated_at: u64,
}

impl GameRecord {
    /// A freshly created game with no modules attached.
    #[must_use]
    pub fn new(address: Address, developer: Address, now: u64) -> Self {
        Self {
            address,
            developer,
            metadata: GameMetadata::default(),
            facets: FacetMap::new(),
            authorized_users: Vec::new(),
            passport: PassportSchema::default(),
            items: ItemCatalog::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn module_set(&self) -> ModuleSet {
        self.facets.module_set()
    }

    /// Current lifecycle status, derived from the attached facets.
    #[must_use]
    pub fn lifecycle(&self) -> LifecycleStatus {
        classify(self.module_set())
    }

    #[must_use]
    pub fn facet_address(&self, module: ModuleKind) -> Option<Address> {
        self.facets.get(module.facet_name())
    }

    /// Record a facet added by a diamond cut.
    pub fn attach_facet(&mut self, name: &str, address: Address, now: u64) -> Result<()> {
        if address.is_zero() {
            return Err(CoreError::ZeroAddress);
        }
        self.facets.attach(name, address)?;
        self.updated_at = now;
        Ok(())
    }

    /// Record a module's facet under its canonical facet name.
    pub fn attach_module(&mut self, module: ModuleKind, address: Address, now: u64) -> Result<()> {
        self.attach_facet(module.facet_name(), address, now)
    }

    pub fn update_metadata(&mut self, patch: MetadataPatch, now: u64) {
        patch.apply(&mut self.metadata);
        self.updated_at = now;
    }

    /// Mirrors `addAuthorizedUser`.
    pub fn add_authorized_user(&mut self, user: Address, now: u64) -> Result<()> {
        if user.is_zero() {
            return Err(CoreError::ZeroAddress);
        }
        if self.authorized_users.contains(&user) {
            return Err(CoreError::AlreadyAuthorized(user));
        }
        self.authorized_users.push(user);
        self.updated_at = now;
        Ok(())
    }

    /// Update the passport schema. Needs the passport module.
    pub fn update_passport(&mut self, patch: PassportPatch, now: u64) -> Result<()> {
        self.require_module(ModuleKind::Passport)?;
        patch.apply(&mut self.passport)?;
        self.updated_at = now;
        Ok(())
    }

    /// Mirrors `addItem`. Needs the inventory module.
    pub fn add_item(&mut self, item: InventoryItem, now: u64) -> Result<()> {
        self.require_module(ModuleKind::Inventory)?;
        self.items.add(item)?;
        self.updated_at = now;
        Ok(())
    }

    #[must_use]
    pub fn total_items(&self) -> usize {
        self.items.len()
    }

    fn require_module(&self, module: ModuleKind) -> Result<()> {
        if self.module_set().contains(module) {
            Ok(())
        } else {
            Err(CoreError::ModuleNotAttached(module))
        }
    }

    /// Card title: the game name once active, otherwise the short address.
    #[must_use]
    pub fn display_title(&self) -> String {
        if self.lifecycle().state == LifecycleState::Active && !self.metadata.name.is_empty() {
            self.metadata.name.clone()
        } else {
            format!("Game {}", self.address.abbreviated())
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
