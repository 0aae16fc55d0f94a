//! # Views
//!
//! Serializable shapes shared by the CLI `--json` output and the HTTP API,
//! plus their plain-text renderings.

use coregame_core::{
    Address, FacetMap, GameMetadata, GameRecord, InventoryItem, LifecycleState, LifecycleStatus,
    ModuleKind, ModuleSet, NextStep, PassportSchema, Progress, Selector,
};
use serde::{Deserialize, Serialize};

/// Lifecycle status as consumed by the dashboard's status card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    pub state: LifecycleState,
    pub label: String,
    pub modules: ModuleSet,
    pub can_progress: bool,
    pub next_step: NextStep,
    pub next_step_message: String,
    pub progress: Progress,
    pub progress_label: String,
    /// Modules to offer as deploy buttons.
    pub recommended: Vec<ModuleKind>,
    pub dashboard_available: bool,
    /// False when game data is attached without every core module.
    pub consistent: bool,
}

impl From<LifecycleStatus> for StatusView {
    fn from(status: LifecycleStatus) -> Self {
        let progress = status.progress();
        Self {
            state: status.state,
            label: status.state.label().to_string(),
            modules: status.modules,
            can_progress: status.can_progress,
            next_step: status.next_step,
            next_step_message: status.next_step_message().to_string(),
            progress,
            progress_label: progress.to_string(),
            recommended: status.recommended_modules(),
            dashboard_available: status.dashboard_available(),
            consistent: status.modules.is_consistent(),
        }
    }
}

impl StatusView {
    /// Multi-line text rendering for the terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Status:   {} ({}, {}%)\n",
            self.label, self.progress_label, self.progress.percent
        ));
        out.push_str("Modules: ");
        for module in ModuleKind::ALL {
            let mark = if self.modules.contains(module) { "x" } else { " " };
            out.push_str(&format!(" [{mark}] {module}"));
        }
        out.push('\n');
        out.push_str(&format!("Next:     {}\n", self.next_step_message));
        if !self.recommended.is_empty() {
            let names: Vec<String> = self.recommended.iter().map(|m| m.to_string()).collect();
            out.push_str(&format!("Deploy:   {}\n", names.join(", ")));
        }
        if !self.consistent {
            out.push_str("Warning:  game data attached before all core modules\n");
        }
        out
    }
}

/// A stored game with its derived status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameView {
    pub address: Address,
    pub title: String,
    pub developer: Address,
    pub metadata: GameMetadata,
    pub facets: FacetMap,
    pub authorized_users: Vec<Address>,
    pub passport: PassportSchema,
    pub items: Vec<InventoryItem>,
    pub total_items: usize,
    pub created_at: u64,
    pub updated_at: u64,
    pub status: StatusView,
}

impl From<GameRecord> for GameView {
    fn from(record: GameRecord) -> Self {
        let status = StatusView::from(record.lifecycle());
        Self {
            title: record.display_title(),
            address: record.address,
            developer: record.developer,
            metadata: record.metadata,
            facets: record.facets,
            authorized_users: record.authorized_users,
            total_items: record.items.len(),
            items: record.items.iter().cloned().collect(),
            passport: record.passport,
            created_at: record.created_at,
            updated_at: record.updated_at,
            status,
        }
    }
}

impl GameView {
    pub fn render(&self) -> String {
        let mut out = format!("{}\n", self.title);
        out.push_str(&format!("Address:  {}\n", self.address.to_checksum()));
        out.push_str(&format!("Owner:    {}\n", self.developer.to_checksum()));
        if !self.metadata.genre.is_empty() {
            out.push_str(&format!("Genre:    {}\n", self.metadata.genre));
        }
        out.push_str(&self.status.render());
        if !self.facets.is_empty() {
            out.push_str("Facets:\n");
            for (name, address) in self.facets.iter() {
                out.push_str(&format!("  {name:<20} {address}\n"));
            }
        }
        if self.status.modules.passport {
            out.push_str(&render_passport(&self.passport));
        }
        if self.status.modules.inventory {
            out.push_str(&format!("Items:    {}\n", self.total_items));
        }
        out
    }

    /// One line for `list` output.
    pub fn summary_line(&self) -> String {
        format!(
            "{}  {:<10}  {}",
            self.address,
            self.status.state.to_string(),
            self.title
        )
    }
}

fn render_passport(passport: &PassportSchema) -> String {
    let mut out = format!("Passports: {}\n", passport.total_passports);
    for t in &passport.traits {
        out.push_str(&format!("  trait  {} = {}\n", t.trait_type, t.value));
    }
    for f in &passport.user_metadata {
        out.push_str(&format!("  field  {} = {}\n", f.key, f.value));
    }
    out
}

/// Item catalog as a table.
pub fn render_items(items: &[InventoryItem]) -> String {
    if items.is_empty() {
        return "No items registered\n".to_string();
    }
    items
        .iter()
        .map(|item| {
            format!(
                "{:>6}  {:<24}  {}\n",
                item.token_id,
                item.name,
                item.primary_attribute().unwrap_or("-")
            )
        })
        .collect()
}

/// Output of selector computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorsView {
    pub selectors: Vec<Selector>,
    /// Function selectors of the target dropped because another ABI declares them.
    pub excluded: usize,
}

impl SelectorsView {
    pub fn render(&self) -> String {
        let mut out: String = self
            .selectors
            .iter()
            .map(|s| format!("{s}\n"))
            .collect();
        if self.excluded > 0 {
            out.push_str(&format!("({} shared selectors excluded)\n", self.excluded));
        }
        out
    }
}

// =============================================================================
// TESTS
// =============================================================================
