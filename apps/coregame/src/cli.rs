//! # CLI Module
//!
//! clap command definitions and the `cmd_*` functions behind them.
//!
//! Every command returns its rendered output instead of printing it, so the
//! same functions back both the binary and the integration tests.

use crate::config::ServerConfig;
use crate::view::{GameView, SelectorsView, StatusView, render_items};
use clap::{Args, Parser, Subcommand};
use coregame_core::{
    Abi, AbiCatalog, Address, CoreError, FacetMap, GameRecord, GameStore, InventoryItem,
    ItemAttribute, LifecycleState, MetadataField, MetadataPatch, ModuleKind, ModuleSet,
    PassportPatch, PassportTrait, bootstrap_deployment, classify, exclusive_selectors,
    plan_bootstrap_cuts, plan_module_cut,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced by CLI commands and server startup.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database already exists at {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("no database at {0} (run `coregame init` first)")]
    MissingDatabase(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("server error: {0}")]
    Server(String),
}

// =============================================================================
// COMMAND LINE
// =============================================================================

/// CoreGame developer tools.
#[derive(Debug, Parser)]
#[command(name = "coregame", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Database location shared by the store-backed commands.
#[derive(Debug, Clone, Args)]
pub struct DbArgs {
    /// Path to the game registry database.
    #[arg(long, env = "COREGAME_DB", default_value = "coregame.redb")]
    pub db: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create an empty game registry.
    Init {
        #[command(flatten)]
        db: DbArgs,
        /// Overwrite an existing database.
        #[arg(long)]
        force: bool,
    },

    /// Record a game created by the factory.
    Register {
        #[command(flatten)]
        db: DbArgs,
        /// Diamond address of the new game.
        #[arg(long)]
        address: String,
        /// Developer account that created it.
        #[arg(long)]
        developer: String,
        #[arg(long)]
        name: Option<String>,
        /// Facet addresses reported by the facet registry, in listing order.
        #[arg(long = "registry-address")]
        registry_addresses: Vec<String>,
        /// Facet names reported by the facet registry, in listing order.
        #[arg(long = "registry-name")]
        registry_names: Vec<String>,
        #[arg(long)]
        json: bool,
    },

    /// Record a facet attached by a diamond cut.
    Attach {
        #[command(flatten)]
        db: DbArgs,
        #[arg(long)]
        game: String,
        /// Module (metadata, passport, inventory, gamedata) or raw facet name.
        #[arg(long)]
        module: String,
        /// Address of the deployed facet.
        #[arg(long)]
        facet: String,
        #[arg(long)]
        json: bool,
    },

    /// Update a game's descriptive metadata.
    Metadata {
        #[command(flatten)]
        db: DbArgs,
        #[arg(long)]
        game: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        genre: Option<String>,
        #[arg(long)]
        image_uri: Option<String>,
        #[arg(long)]
        game_link: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        support_email: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Replace passport traits or the user metadata template.
    Passport {
        #[command(flatten)]
        db: DbArgs,
        #[arg(long)]
        game: String,
        #[arg(long = "trait-key")]
        trait_keys: Vec<String>,
        #[arg(long = "trait-value")]
        trait_values: Vec<String>,
        #[arg(long = "trait-display")]
        trait_displays: Vec<String>,
        #[arg(long = "trait-uri")]
        trait_uris: Vec<String>,
        #[arg(long = "meta-key")]
        meta_keys: Vec<String>,
        #[arg(long = "meta-value")]
        meta_values: Vec<String>,
        #[arg(long = "meta-uri")]
        meta_uris: Vec<String>,
        /// Passports minted so far, as read from the chain.
        #[arg(long)]
        total_passports: Option<u64>,
        #[arg(long)]
        json: bool,
    },

    /// Register an item type with the inventory module.
    AddItem {
        #[command(flatten)]
        db: DbArgs,
        #[arg(long)]
        game: String,
        #[arg(long)]
        token_id: u64,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        image_uri: String,
        /// `trait=value` or `trait=value=display`; repeatable.
        #[arg(long = "attribute")]
        attributes: Vec<String>,
        #[arg(long)]
        json: bool,
    },

    /// List a game's item catalog.
    Items {
        #[command(flatten)]
        db: DbArgs,
        #[arg(long)]
        game: String,
        #[arg(long)]
        json: bool,
    },

    /// Authorize an admin account for a game.
    Authorize {
        #[command(flatten)]
        db: DbArgs,
        #[arg(long)]
        game: String,
        #[arg(long)]
        user: String,
    },

    /// List registered games.
    List {
        #[command(flatten)]
        db: DbArgs,
        /// Only games created by this developer.
        #[arg(long)]
        developer: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Show the lifecycle status of a registered game.
    Status {
        #[command(flatten)]
        db: DbArgs,
        #[arg(long)]
        game: String,
        #[arg(long)]
        json: bool,
    },

    /// Classify a set of attached modules without touching the registry.
    Classify {
        #[arg(long)]
        metadata: bool,
        #[arg(long)]
        passport: bool,
        #[arg(long)]
        inventory: bool,
        #[arg(long)]
        gamedata: bool,
        #[arg(long)]
        json: bool,
    },

    /// Compute the function selectors a facet may register.
    Selectors {
        /// ABI or build artifact of the facet.
        #[arg(long)]
        abi: PathBuf,
        /// ABIs whose selectors must be excluded.
        #[arg(long)]
        exclude: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Print the diamond cut that attaches a module's deployed facet.
    PlanCut {
        /// Directory of `<FacetName>.json` artifacts.
        #[arg(long, env = "COREGAME_ABI_DIR")]
        abi_dir: PathBuf,
        #[arg(long)]
        module: String,
        /// Address of the deployed facet.
        #[arg(long)]
        facet: String,
    },

    /// Print the cuts the factory installs when creating a game.
    PlanBootstrap {
        /// Directory of `<FacetName>.json` artifacts.
        #[arg(long, env = "COREGAME_ABI_DIR")]
        abi_dir: PathBuf,
        /// Deployed FacetRegistryFacet.
        #[arg(long)]
        registry: String,
        /// Deployed OwnershipFacet.
        #[arg(long)]
        ownership: String,
        /// Deployed DiamondLoupeFacet.
        #[arg(long)]
        loupe: String,
    },

    /// Run the HTTP API.
    Serve {
        #[command(flatten)]
        db: DbArgs,
        #[arg(long, env = "COREGAME_HOST", default_value = "127.0.0.1")]
        host: String,
        #[arg(long, env = "COREGAME_PORT", default_value_t = 8080)]
        port: u16,
        /// Require `Authorization: Bearer <key>` on API routes.
        #[arg(long, env = "COREGAME_API_KEY")]
        api_key: Option<String>,
        /// Requests per second across all clients (0 disables limiting).
        #[arg(long, env = "COREGAME_RATE_LIMIT", default_value_t = 50)]
        rate_limit: u32,
        /// Directory of facet artifacts used for cut planning.
        #[arg(long, env = "COREGAME_ABI_DIR")]
        abi_dir: Option<PathBuf>,
    },
}

impl Commands {
    /// Server settings, if this is the `serve` command.
    pub fn server_config(&self) -> Option<ServerConfig> {
        match self {
            Self::Serve {
                db,
                host,
                port,
                api_key,
                rate_limit,
                abi_dir,
            } => Some(ServerConfig {
                db_path: db.db.clone(),
                host: host.clone(),
                port: *port,
                api_key: api_key.clone().filter(|k| !k.is_empty()),
                rate_limit: *rate_limit,
                abi_dir: abi_dir.clone(),
            }),
            _ => None,
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Open the registry at `db`, refusing to create one implicitly.
pub fn open_store(db: &Path) -> Result<GameStore, CliError> {
    if !db.exists() {
        return Err(CliError::MissingDatabase(db.to_path_buf()));
    }
    Ok(GameStore::open(db)?)
}

fn read_abi(path: &Path) -> Result<Abi, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Abi::from_json(&text)?)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn render_game(record: GameRecord, json: bool) -> Result<String, CliError> {
    let view = GameView::from(record);
    if json { to_json(&view) } else { Ok(view.render()) }
}

/// Facet map from the registry's parallel address and name columns.
pub fn registry_facets(addresses: &[String], names: &[String]) -> Result<FacetMap, CliError> {
    let addresses = addresses
        .iter()
        .map(|a| Address::parse(a))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FacetMap::from_registry(&addresses, names)?)
}

/// Parse repeated `--attribute` values.
pub fn parse_attributes(raw: &[String]) -> Result<Vec<ItemAttribute>, CliError> {
    Ok(raw
        .iter()
        .map(|a| a.parse())
        .collect::<Result<Vec<ItemAttribute>, CoreError>>()?)
}

/// Resolve `--module` to the facet name to record.
///
/// Known modules map to their canonical facet name; anything else is
/// recorded verbatim (bootstrap or custom facets).
pub fn resolve_facet_name(module: &str) -> String {
    module
        .parse::<ModuleKind>()
        .map(|m| m.facet_name().to_string())
        .unwrap_or_else(|_| module.trim().to_string())
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Create an empty registry.
pub fn cmd_init(db: &Path, force: bool) -> Result<String, CliError> {
    if db.exists() {
        if !force {
            return Err(CliError::AlreadyExists(db.to_path_buf()));
        }
        std::fs::remove_file(db).map_err(|source| CliError::Io {
            path: db.to_path_buf(),
            source,
        })?;
        tracing::warn!(path = %db.display(), "overwriting existing database");
    }
    GameStore::create(db)?;
    tracing::info!(path = %db.display(), "initialized game registry");
    Ok(format!("Initialized game registry at {}\n", db.display()))
}

/// Record a newly created game.
pub fn cmd_register(
    db: &Path,
    address: &str,
    developer: &str,
    name: Option<&str>,
    facets: &FacetMap,
    json: bool,
) -> Result<String, CliError> {
    let store = open_store(db)?;
    let address = Address::parse(address)?;
    let developer = Address::parse(developer)?;

    let mut record = GameRecord::new(address, developer, unix_now());
    if let Some(name) = name {
        record.metadata.name = name.trim().to_string();
    }
    for (facet, facet_address) in facets.iter() {
        record.attach_facet(facet, facet_address, record.created_at)?;
    }
    store.insert(&record)?;
    tracing::info!(
        game = %address,
        developer = %developer,
        facets = facets.len(),
        state = %record.lifecycle().state,
        "registered game"
    );
    render_game(record, json)
}

/// Record a facet attachment.
pub fn cmd_attach(
    db: &Path,
    game: &str,
    module: &str,
    facet: &str,
    json: bool,
) -> Result<String, CliError> {
    let store = open_store(db)?;
    let game = Address::parse(game)?;
    let facet = Address::parse(facet)?;
    let facet_name = resolve_facet_name(module);

    let mut before = LifecycleState::Bare;
    let record = store.update(&game, |g| {
        before = g.lifecycle().state;
        g.attach_facet(&facet_name, facet, unix_now())
    })?;
    let status = record.lifecycle();

    tracing::info!(game = %game, facet = %facet_name, address = %facet, "attached facet");
    if status.state != before {
        tracing::info!(game = %game, from = %before, to = %status.state, "lifecycle advanced");
    }
    if !status.modules.is_consistent() {
        tracing::warn!(game = %game, "game data attached before all core modules");
    }
    render_game(record, json)
}

/// Apply a metadata patch.
pub fn cmd_metadata(db: &Path, game: &str, patch: MetadataPatch, json: bool) -> Result<String, CliError> {
    let store = open_store(db)?;
    let game = Address::parse(game)?;
    if patch.is_empty() {
        tracing::debug!(game = %game, "empty metadata patch");
    }
    let record = store.update(&game, |g| {
        g.update_metadata(patch, unix_now());
        Ok(())
    })?;
    tracing::info!(game = %game, "updated metadata");
    render_game(record, json)
}

/// Apply a passport patch.
pub fn cmd_passport(db: &Path, game: &str, patch: PassportPatch, json: bool) -> Result<String, CliError> {
    let store = open_store(db)?;
    let game = Address::parse(game)?;
    let record = store.update(&game, |g| g.update_passport(patch, unix_now()))?;
    tracing::info!(
        game = %game,
        traits = record.passport.traits.len(),
        fields = record.passport.user_metadata.len(),
        "updated passport schema"
    );
    render_game(record, json)
}

/// Register an item type.
pub fn cmd_add_item(db: &Path, game: &str, item: InventoryItem, json: bool) -> Result<String, CliError> {
    let store = open_store(db)?;
    let game = Address::parse(game)?;
    let token_id = item.token_id;
    let record = store.update(&game, |g| g.add_item(item, unix_now()))?;
    tracing::info!(game = %game, token_id, total = record.total_items(), "added item");
    render_game(record, json)
}

/// A game's item catalog.
pub fn cmd_items(db: &Path, game: &str, json: bool) -> Result<String, CliError> {
    let store = open_store(db)?;
    let record = store.require(&Address::parse(game)?)?;
    let items: Vec<InventoryItem> = record.items.iter().cloned().collect();
    if json { to_json(&items) } else { Ok(render_items(&items)) }
}

/// Authorize an admin account.
pub fn cmd_authorize(db: &Path, game: &str, user: &str) -> Result<String, CliError> {
    let store = open_store(db)?;
    let game = Address::parse(game)?;
    let user = Address::parse(user)?;
    store.update(&game, |g| g.add_authorized_user(user, unix_now()))?;
    tracing::info!(game = %game, user = %user, "authorized user");
    Ok(format!("Authorized {} for {}\n", user.to_checksum(), game))
}

/// List registered games.
pub fn cmd_list(db: &Path, developer: Option<&str>, json: bool) -> Result<String, CliError> {
    let store = open_store(db)?;
    let records = match developer {
        Some(dev) => store.list_by_developer(&Address::parse(dev)?)?,
        None => store.list()?,
    };
    let views: Vec<GameView> = records.into_iter().map(GameView::from).collect();
    if json {
        return to_json(&views);
    }
    if views.is_empty() {
        return Ok("No games registered\n".to_string());
    }
    Ok(views.iter().map(|v| format!("{}\n", v.summary_line())).collect())
}

/// Lifecycle status of a stored game.
pub fn cmd_status(db: &Path, game: &str, json: bool) -> Result<String, CliError> {
    let store = open_store(db)?;
    let record = store.require(&Address::parse(game)?)?;
    let view = StatusView::from(record.lifecycle());
    if json {
        return to_json(&view);
    }
    Ok(format!("{}\n{}", record.display_title(), view.render()))
}

/// Classify explicit module flags.
pub fn cmd_classify(modules: ModuleSet, json: bool) -> Result<String, CliError> {
    let view = StatusView::from(classify(modules));
    if !view.consistent {
        tracing::warn!(?modules, "inconsistent module set");
    }
    if json { to_json(&view) } else { Ok(view.render()) }
}

/// Selectors of `abi` not declared by any of `exclude`.
pub fn cmd_selectors(abi: &Path, exclude: &[PathBuf], json: bool) -> Result<String, CliError> {
    let target = read_abi(abi)?;
    let others = exclude
        .iter()
        .map(|p| read_abi(p))
        .collect::<Result<Vec<_>, _>>()?;

    let view = selectors_view(&target, &others);
    if json { to_json(&view) } else { Ok(view.render()) }
}

/// Shared by the CLI and the HTTP API.
pub fn selectors_view(target: &Abi, others: &[Abi]) -> SelectorsView {
    let selectors = exclusive_selectors(target, others);
    let declared: std::collections::BTreeSet<_> = target.selectors().collect();
    SelectorsView {
        excluded: declared.len().saturating_sub(selectors.len()),
        selectors,
    }
}

/// Cut JSON for a module's deployed facet.
pub fn cmd_plan_cut(abi_dir: &Path, module: &str, facet: &str) -> Result<String, CliError> {
    let catalog = AbiCatalog::load_dir(abi_dir)?;
    let module: ModuleKind = module.parse()?;
    let facet = Address::parse(facet)?;
    let planned = plan_module_cut(module, facet, &catalog)?;
    tracing::info!(
        module = %module,
        selectors = planned.cut.function_selectors.len(),
        "planned facet cut"
    );
    to_json(&planned)
}

/// Cut JSON for the factory's bootstrap facets.
pub fn cmd_plan_bootstrap(abi_dir: &Path, addresses: [&str; 3]) -> Result<String, CliError> {
    let catalog = AbiCatalog::load_dir(abi_dir)?;
    let [registry, ownership, loupe] = addresses;
    let deployed = bootstrap_deployment([
        Address::parse(registry)?,
        Address::parse(ownership)?,
        Address::parse(loupe)?,
    ]);
    let cuts = plan_bootstrap_cuts(&deployed, &catalog)?;
    tracing::info!(cuts = cuts.len(), "planned bootstrap cuts");
    to_json(&cuts)
}

/// Run the command (everything except `serve`).
pub fn run(command: Commands) -> Result<String, CliError> {
    match command {
        Commands::Init { db, force } => cmd_init(&db.db, force),
        Commands::Register {
            db,
            address,
            developer,
            name,
            registry_addresses,
            registry_names,
            json,
        } => {
            let facets = registry_facets(&registry_addresses, &registry_names)?;
            cmd_register(&db.db, &address, &developer, name.as_deref(), &facets, json)
        }
        Commands::Attach {
            db,
            game,
            module,
            facet,
            json,
        } => cmd_attach(&db.db, &game, &module, &facet, json),
        Commands::Metadata {
            db,
            game,
            name,
            description,
            genre,
            image_uri,
            game_link,
            website,
            support_email,
            json,
        } => {
            let patch = MetadataPatch {
                name,
                description,
                genre,
                image_uri,
                game_link,
                website,
                support_email,
                socials: None,
            };
            cmd_metadata(&db.db, &game, patch, json)
        }
        Commands::Passport {
            db,
            game,
            trait_keys,
            trait_values,
            trait_displays,
            trait_uris,
            meta_keys,
            meta_values,
            meta_uris,
            total_passports,
            json,
        } => {
            let traits = (!trait_keys.is_empty() || !trait_values.is_empty())
                .then(|| {
                    PassportTrait::from_columns(&trait_keys, &trait_values, &trait_displays, &trait_uris)
                })
                .transpose()?;
            let user_metadata = (!meta_keys.is_empty() || !meta_values.is_empty())
                .then(|| MetadataField::from_columns(&meta_keys, &meta_values, &meta_uris))
                .transpose()?;
            let patch = PassportPatch {
                traits,
                user_metadata,
                total_passports,
            };
            cmd_passport(&db.db, &game, patch, json)
        }
        Commands::AddItem {
            db,
            game,
            token_id,
            name,
            description,
            image_uri,
            attributes,
            json,
        } => {
            let item = InventoryItem {
                token_id,
                name,
                description,
                image_uri,
                attributes: parse_attributes(&attributes)?,
            };
            cmd_add_item(&db.db, &game, item, json)
        }
        Commands::Items { db, game, json } => cmd_items(&db.db, &game, json),
        Commands::Authorize { db, game, user } => cmd_authorize(&db.db, &game, &user),
        Commands::List {
            db,
            developer,
            json,
        } => cmd_list(&db.db, developer.as_deref(), json),
        Commands::Status { db, game, json } => cmd_status(&db.db, &game, json),
        Commands::Classify {
            metadata,
            passport,
            inventory,
            gamedata,
            json,
        } => cmd_classify(ModuleSet::new(metadata, passport, inventory, gamedata), json),
        Commands::Selectors { abi, exclude, json } => cmd_selectors(&abi, &exclude, json),
        Commands::PlanCut {
            abi_dir,
            module,
            facet,
        } => cmd_plan_cut(&abi_dir, &module, &facet),
        Commands::PlanBootstrap {
            abi_dir,
            registry,
            ownership,
            loupe,
        } => cmd_plan_bootstrap(&abi_dir, [&registry, &ownership, &loupe]),
        Commands::Serve { .. } => Err(CliError::Config(
            "serve must be started through the async runtime".to_string(),
        )),
    }
}
