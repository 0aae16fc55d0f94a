//! # Lifecycle Module
//!
//! Derives the deployment state of a game from the modules attached to its
//! diamond.
//!
//! A game moves through three states:
//!
//! ```text
//! Bare ──(metadata / passport / inventory)──► Configured ──(game data)──► Active
//! ```
//!
//! The state is never stored. It is recomputed from the current facet
//! inventory each time it is read, so [`classify`] must stay pure and total.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// =============================================================================
// MODULES
// =============================================================================

/// Facet names installed by the factory when a game is created.
pub const BOOTSTRAP_FACETS: [&str; 3] = ["FacetRegistryFacet", "OwnershipFacet", "DiamondLoupeFacet"];

/// A feature module that can be attached to a game diamond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Game info and settings.
    Metadata,
    /// Player identities.
    Passport,
    /// Items and NFTs.
    Inventory,
    /// Aggregated gameplay data; unlocks the full dashboard.
    GameData,
}

impl ModuleKind {
    /// All modules, in deployment order.
    pub const ALL: [Self; 4] = [Self::Metadata, Self::Passport, Self::Inventory, Self::GameData];

    /// The three modules that configure a game.
    pub const CORE: [Self; 3] = [Self::Metadata, Self::Passport, Self::Inventory];

    /// Name under which the module's facet is registered on the diamond.
    #[must_use]
    pub const fn facet_name(self) -> &'static str {
        match self {
            Self::Metadata => "GameInfoFacet",
            Self::Passport => "PassportFacet",
            Self::Inventory => "InventoryFacet",
            Self::GameData => "GameDataFacetV1",
        }
    }

    /// Resolve a registered facet name to its module.
    ///
    /// Matching is ASCII case-insensitive.
    #[must_use]
    pub fn from_facet_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.facet_name().eq_ignore_ascii_case(name))
    }

    /// The modules whose selectors must not be claimed by this module's cut.
    #[must_use]
    pub fn competing(self) -> Vec<Self> {
        Self::CORE.into_iter().filter(|m| *m != self).collect()
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Metadata => "metadata",
            Self::Passport => "passport",
            Self::Inventory => "inventory",
            Self::GameData => "gamedata",
        };
        f.write_str(name)
    }
}

impl FromStr for ModuleKind {
    type Err = CoreError;

    /// Accepts the short module name or the facet name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "metadata" => Ok(Self::Metadata),
            "passport" => Ok(Self::Passport),
            "inventory" => Ok(Self::Inventory),
            "gamedata" | "game-data" | "gameplay" => Ok(Self::GameData),
            _ => Self::from_facet_name(s.trim()).ok_or_else(|| CoreError::UnknownModule(s.to_string())),
        }
    }
}

// =============================================================================
// MODULE SET
// =============================================================================

/// Which modules are currently attached to a game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleSet {
    #[serde(default)]
    pub metadata: bool,
    #[serde(default)]
    pub passport: bool,
    #[serde(default)]
    pub inventory: bool,
    #[serde(default)]
    pub gamedata: bool,
}

impl ModuleSet {
    /// Build a set from the four flags.
    #[must_use]
    pub const fn new(metadata: bool, passport: bool, inventory: bool, gamedata: bool) -> Self {
        Self {
            metadata,
            passport,
            inventory,
            gamedata,
        }
    }

    /// Every module attached.
    #[must_use]
    pub const fn complete() -> Self {
        Self::new(true, true, true, true)
    }

    /// Derive the set from a facet registry listing.
    pub fn from_facet_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for name in names {
            if let Some(module) = ModuleKind::from_facet_name(name.as_ref()) {
                set.insert(module);
            }
        }
        set
    }

    /// Whether the given module is attached.
    #[must_use]
    pub const fn contains(&self, module: ModuleKind) -> bool {
        match module {
            ModuleKind::Metadata => self.metadata,
            ModuleKind::Passport => self.passport,
            ModuleKind::Inventory => self.inventory,
            ModuleKind::GameData => self.gamedata,
        }
    }

    /// Mark a module as attached.
    pub fn insert(&mut self, module: ModuleKind) {
        match module {
            ModuleKind::Metadata => self.metadata = true,
            ModuleKind::Passport => self.passport = true,
            ModuleKind::Inventory => self.inventory = true,
            ModuleKind::GameData => self.gamedata = true,
        }
    }

    /// Copy of this set with one more module attached.
    #[must_use]
    pub fn with(mut self, module: ModuleKind) -> Self {
        self.insert(module);
        self
    }

    /// At least one of metadata, passport, inventory.
    #[must_use]
    pub const fn any_core(&self) -> bool {
        self.metadata || self.passport || self.inventory
    }

    /// All of metadata, passport, inventory.
    #[must_use]
    pub const fn all_core(&self) -> bool {
        self.metadata && self.passport && self.inventory
    }

    /// Game data is only ever deployed on top of a fully configured game.
    ///
    /// A set that violates this cannot arise through the dashboard flow;
    /// it is still classified, but callers should report it.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        !self.gamedata || self.all_core()
    }

    /// Whether every module attached here is also attached in `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        ModuleKind::ALL
            .into_iter()
            .all(|m| !self.contains(m) || other.contains(m))
    }

    /// Core modules not yet attached, in deployment order.
    #[must_use]
    pub fn missing_core(&self) -> Vec<ModuleKind> {
        ModuleKind::CORE
            .into_iter()
            .filter(|m| !self.contains(*m))
            .collect()
    }
}

// =============================================================================
// LIFECYCLE STATE
// =============================================================================

/// Deployment progress of a game. Ordered `Bare < Configured < Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Fresh from the factory; only bootstrap facets.
    Bare,
    /// Some core modules attached, no game data facet.
    Configured,
    /// Game data facet attached; full dashboard available.
    Active,
}

impl LifecycleState {
    /// Human label shown next to the status badge.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bare => "Uninitialized",
            Self::Configured => "Configured",
            Self::Active => "Active",
        }
    }

    /// Position on the three-step progress bar.
    #[must_use]
    pub const fn progress(self) -> Progress {
        match self {
            Self::Bare => Progress { step: 1, percent: 33 },
            Self::Configured => Progress { step: 2, percent: 66 },
            Self::Active => Progress { step: 3, percent: 100 },
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bare => "bare",
            Self::Configured => "configured",
            Self::Active => "active",
        };
        f.write_str(name)
    }
}

/// Step on the lifecycle progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// 1-based step, out of [`Progress::TOTAL_STEPS`].
    pub step: u8,
    /// Bar fill, 0-100.
    pub percent: u8,
}

impl Progress {
    pub const TOTAL_STEPS: u8 = 3;

    /// Whether the final step has been reached.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.step >= Self::TOTAL_STEPS
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_complete() {
            f.write_str("Complete")
        } else {
            write!(f, "Step {} of {}", self.step, Self::TOTAL_STEPS)
        }
    }
}

// =============================================================================
// NEXT STEP
// =============================================================================

/// What the developer should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    DeployCoreModules,
    CompleteModules,
    DeployGameData,
    FullyActive,
}

impl NextStep {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::DeployCoreModules => "Deploy core modules to configure your game",
            Self::CompleteModules => "Complete module deployment first",
            Self::DeployGameData => "Deploy GameDataFacet to activate full dashboard",
            Self::FullyActive => "Game is fully active",
        }
    }
}

impl fmt::Display for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Result of classifying a [`ModuleSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleStatus {
    pub state: LifecycleState,
    pub modules: ModuleSet,
    /// Whether the developer can move to the next state right now.
    pub can_progress: bool,
    pub next_step: NextStep,
}

impl LifecycleStatus {
    /// The next-step message for the status card.
    #[must_use]
    pub const fn next_step_message(&self) -> &'static str {
        self.next_step.message()
    }

    #[must_use]
    pub const fn progress(&self) -> Progress {
        self.state.progress()
    }

    /// Modules to offer as deploy actions in the current state.
    #[must_use]
    pub fn recommended_modules(&self) -> Vec<ModuleKind> {
        match self.next_step {
            NextStep::DeployCoreModules => ModuleKind::CORE.to_vec(),
            NextStep::CompleteModules => self.modules.missing_core(),
            NextStep::DeployGameData => vec![ModuleKind::GameData],
            NextStep::FullyActive => Vec::new(),
        }
    }

    /// Whether the full dashboard (analytics, users, items) can be shown.
    #[must_use]
    pub const fn dashboard_available(&self) -> bool {
        matches!(self.state, LifecycleState::Active)
    }
}

/// Classify a module set into its lifecycle state.
///
/// Total over all inputs. Core modules decide between `Bare` and the rest;
/// once any core module is present, the game data facet decides between
/// `Configured` and `Active`.
#[must_use]
pub fn classify(modules: ModuleSet) -> LifecycleStatus {
    let (state, can_progress, next_step) = if !modules.any_core() {
        (LifecycleState::Bare, true, NextStep::DeployCoreModules)
    } else if !modules.gamedata {
        let ready = modules.all_core();
        let next = if ready {
            NextStep::DeployGameData
        } else {
            NextStep::CompleteModules
        };
        (LifecycleState::Configured, ready, next)
    } else {
        (LifecycleState::Active, false, NextStep::FullyActive)
    };

    LifecycleStatus {
        state,
        modules,
        can_progress,
        next_step,
    }
}

// =============================================================================
// TESTS
// =============================================================================
