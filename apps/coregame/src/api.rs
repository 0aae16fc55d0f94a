//! # API Module
//!
//! HTTP API consumed by the dashboard front-end.
//!
//! | Method | Path                                  | Purpose                          |
//! |--------|---------------------------------------|----------------------------------|
//! | GET    | `/health`                             | Liveness and registry size       |
//! | POST   | `/lifecycle/classify`                 | Classify explicit module flags   |
//! | GET    | `/games`                              | List games (`?developer=0x..`)   |
//! | POST   | `/games`                              | Register a factory-created game  |
//! | GET    | `/games/{address}`                    | Game record with derived status  |
//! | GET    | `/games/{address}/status`             | Lifecycle status only            |
//! | POST   | `/games/{address}/facets`             | Record an attached facet         |
//! | PUT    | `/games/{address}/metadata`           | Patch descriptive metadata       |
//! | PUT    | `/games/{address}/passport`           | Patch the passport schema        |
//! | GET    | `/games/{address}/items`              | Item catalog                     |
//! | POST   | `/games/{address}/items`              | Register an item type            |
//! | POST   | `/games/{address}/authorized-users`   | Authorize an admin account       |
//! | POST   | `/selectors`                          | Exclusive selectors of an ABI    |
//! | POST   | `/cuts/plan`                          | Cut payload for a module facet   |
//! | POST   | `/cuts/bootstrap`                     | Cuts for the factory's facets    |
//!
//! `/health` is always open. Every other route requires the bearer key when
//! one is configured.

use crate::cli::{CliError, resolve_facet_name, selectors_view, unix_now};
use crate::config::ServerConfig;
use crate::view::{GameView, SelectorsView, StatusView};
use axum::extract::{Path, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use coregame_core::{
    Abi, AbiCatalog, Address, CoreError, FacetMap, GameRecord, GameStore, InventoryItem,
    MetadataPatch, ModuleKind, ModuleSet, PassportPatch, PlannedCut, bootstrap_deployment,
    classify, plan_bootstrap_cuts, plan_module_cut,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// STATE
// =============================================================================

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    store: Arc<GameStore>,
    catalog: Arc<AbiCatalog>,
    api_key: Option<Arc<str>>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl AppState {
    /// State with no authentication and no rate limit.
    pub fn new(store: GameStore) -> Self {
        Self {
            store: Arc::new(store),
            catalog: Arc::new(AbiCatalog::new()),
            api_key: None,
            limiter: None,
        }
    }

    /// Build state from server settings.
    pub fn from_config(config: &ServerConfig) -> Result<Self, CliError> {
        let store = GameStore::create(&config.db_path)?;
        let catalog = match &config.abi_dir {
            Some(dir) => AbiCatalog::load_dir(dir)?,
            None => AbiCatalog::new(),
        };
        let mut state = Self::new(store).with_catalog(catalog);
        if let Some(key) = &config.api_key {
            state = state.with_api_key(key);
        }
        if let Some(quota) = config.rate_limit_quota() {
            state = state.with_rate_limit(Quota::per_second(quota));
        }
        Ok(state)
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: AbiCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(Arc::from(key));
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, quota: Quota) -> Self {
        self.limiter = Some(Arc::new(RateLimiter::direct(quota)));
        self
    }

    /// Run a store operation off the async executor.
    async fn with_store<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&GameStore) -> coregame_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(ApiError::from)
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Handler error rendered as `{ "error": ... }`.
#[derive(Debug)]
pub enum ApiError {
    Core(CoreError),
    BadRequest(String),
    Unauthorized,
    RateLimited,
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self::Core(err)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Core(err) => match err {
                CoreError::GameNotFound(_) => StatusCode::NOT_FOUND,
                CoreError::GameExists(_)
                | CoreError::FacetAlreadyAttached(_)
                | CoreError::AlreadyAuthorized(_)
                | CoreError::DuplicateItem(_)
                | CoreError::ModuleNotAttached(_) => StatusCode::CONFLICT,
                CoreError::Storage(_) | CoreError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Core(err) => err.to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::Unauthorized => "missing or invalid API key".to_string(),
            Self::RateLimited => "rate limit exceeded".to_string(),
            Self::Internal(msg) => format!("internal error: {msg}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.message(), "request failed");
        } else {
            tracing::debug!(status = %status, error = %self.message(), "request rejected");
        }
        (status, Json(ErrorBody { error: self.message() })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    Address::parse(raw).map_err(ApiError::from)
}

// =============================================================================
// REQUEST BODIES
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub developer: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGameRequest {
    pub address: Address,
    pub developer: Address,
    #[serde(default)]
    pub metadata: MetadataPatch,
    /// Facets already installed by the factory (`deployedFacets`).
    #[serde(default)]
    pub facets: FacetMap,
    /// Facet registry listing, used when `facets` is empty.
    #[serde(default)]
    pub registry: Option<RegistryListing>,
}

/// The facet registry's parallel address and name columns.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RegistryListing {
    pub addresses: Vec<Address>,
    pub names: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttachFacetRequest {
    /// Module name (`passport`) or facet name (`PassportFacet`).
    pub facet: String,
    pub address: Address,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    pub user: Address,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectorsRequest {
    /// ABI array or artifact object.
    pub abi: serde_json::Value,
    #[serde(default)]
    pub exclude: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanCutRequest {
    pub module: String,
    pub facet_address: Address,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BootstrapRequest {
    /// FacetRegistryFacet, OwnershipFacet and DiamondLoupeFacet, in that order.
    pub addresses: [Address; 3],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub games: u64,
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/lifecycle/classify", post(classify_handler))
        .route("/games", get(list_games).post(create_game))
        .route("/games/{address}", get(get_game))
        .route("/games/{address}/status", get(game_status))
        .route("/games/{address}/facets", post(attach_facet))
        .route("/games/{address}/metadata", put(update_metadata))
        .route("/games/{address}/passport", put(update_passport))
        .route("/games/{address}/items", get(list_items).post(add_item))
        .route("/games/{address}/authorized-users", post(authorize_user))
        .route("/selectors", post(selectors_handler))
        .route("/cuts/plan", post(plan_cut_handler))
        .route("/cuts/bootstrap", post(bootstrap_cuts_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<(), CliError> {
    let addr = config.socket_addr()?;
    let state = AppState::from_config(&config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CliError::Server(format!("bind {addr}: {e}")))?;
    tracing::info!(
        %addr,
        db = %config.db_path.display(),
        auth = config.api_key.is_some(),
        rate_limit = config.rate_limit,
        "coregame API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CliError::Server(e.to_string()))?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(expected) = &state.api_key {
        let provided = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or("");
        if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            return ApiError::Unauthorized.into_response();
        }
    }
    next.run(request).await
}

async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            return ApiError::RateLimited.into_response();
        }
    }
    next.run(request).await
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn health(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let games = state.with_store(|store| store.len()).await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        games,
    }))
}

async fn classify_handler(Json(modules): Json<ModuleSet>) -> ApiResult<StatusView> {
    if !modules.is_consistent() {
        tracing::warn!(?modules, "inconsistent module set");
    }
    Ok(Json(StatusView::from(classify(modules))))
}

async fn list_games(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Vec<GameView>> {
    let developer = query.developer.as_deref().map(parse_address).transpose()?;
    let records = state
        .with_store(move |store| match developer {
            Some(dev) => store.list_by_developer(&dev),
            None => store.list(),
        })
        .await?;
    Ok(Json(records.into_iter().map(GameView::from).collect()))
}

async fn create_game(
    State(state): State<AppState>,
    Json(body): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<GameView>), ApiError> {
    if body.address.is_zero() {
        return Err(ApiError::BadRequest("game address must not be zero".to_string()));
    }
    let registry = body
        .registry
        .map(|listing| FacetMap::from_registry(&listing.addresses, &listing.names))
        .transpose()?;
    let facets = FacetMap::resolve(registry, Some(body.facets));

    let mut record = GameRecord::new(body.address, body.developer, unix_now());
    record.update_metadata(body.metadata, record.created_at);
    for (name, address) in facets.iter() {
        record.attach_facet(name, address, record.created_at)?;
    }

    let stored = record.clone();
    state.with_store(move |store| store.insert(&stored)).await?;
    tracing::info!(game = %record.address, developer = %record.developer, "registered game");
    Ok((StatusCode::CREATED, Json(GameView::from(record))))
}

async fn get_game(State(state): State<AppState>, Path(address): Path<String>) -> ApiResult<GameView> {
    let address = parse_address(&address)?;
    let record = state.with_store(move |store| store.require(&address)).await?;
    Ok(Json(GameView::from(record)))
}

async fn game_status(State(state): State<AppState>, Path(address): Path<String>) -> ApiResult<StatusView> {
    let address = parse_address(&address)?;
    let record = state.with_store(move |store| store.require(&address)).await?;
    Ok(Json(StatusView::from(record.lifecycle())))
}

async fn attach_facet(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(body): Json<AttachFacetRequest>,
) -> ApiResult<GameView> {
    let game = parse_address(&address)?;
    let facet_name = resolve_facet_name(&body.facet);
    if facet_name.is_empty() {
        return Err(ApiError::BadRequest("facet name must not be empty".to_string()));
    }

    let name = facet_name.clone();
    let record = state
        .with_store(move |store| store.update(&game, |g| g.attach_facet(&name, body.address, unix_now())))
        .await?;

    let status = record.lifecycle();
    tracing::info!(game = %game, facet = %facet_name, state = %status.state, "attached facet");
    if !status.modules.is_consistent() {
        tracing::warn!(game = %game, "game data attached before all core modules");
    }
    Ok(Json(GameView::from(record)))
}

async fn update_metadata(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(patch): Json<MetadataPatch>,
) -> ApiResult<GameView> {
    let game = parse_address(&address)?;
    let record = state
        .with_store(move |store| {
            store.update(&game, |g| {
                g.update_metadata(patch, unix_now());
                Ok(())
            })
        })
        .await?;
    tracing::info!(game = %game, "updated metadata");
    Ok(Json(GameView::from(record)))
}

async fn update_passport(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(patch): Json<PassportPatch>,
) -> ApiResult<GameView> {
    let game = parse_address(&address)?;
    let record = state
        .with_store(move |store| store.update(&game, |g| g.update_passport(patch, unix_now())))
        .await?;
    tracing::info!(game = %game, traits = record.passport.traits.len(), "updated passport schema");
    Ok(Json(GameView::from(record)))
}

async fn list_items(State(state): State<AppState>, Path(address): Path<String>) -> ApiResult<Vec<InventoryItem>> {
    let game = parse_address(&address)?;
    let record = state.with_store(move |store| store.require(&game)).await?;
    Ok(Json(record.items.iter().cloned().collect()))
}

async fn add_item(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(item): Json<InventoryItem>,
) -> Result<(StatusCode, Json<GameView>), ApiError> {
    let game = parse_address(&address)?;
    let token_id = item.token_id;
    let record = state
        .with_store(move |store| store.update(&game, |g| g.add_item(item, unix_now())))
        .await?;
    tracing::info!(game = %game, token_id, total = record.total_items(), "added item");
    Ok((StatusCode::CREATED, Json(GameView::from(record))))
}

async fn authorize_user(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(body): Json<AuthorizeRequest>,
) -> ApiResult<GameView> {
    let game = parse_address(&address)?;
    let user = body.user;
    let record = state
        .with_store(move |store| store.update(&game, |g| g.add_authorized_user(user, unix_now())))
        .await?;
    tracing::info!(game = %game, user = %user, "authorized user");
    Ok(Json(GameView::from(record)))
}

async fn selectors_handler(Json(body): Json<SelectorsRequest>) -> ApiResult<SelectorsView> {
    let target = Abi::from_value(body.abi)?;
    let others = body
        .exclude
        .into_iter()
        .map(Abi::from_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(selectors_view(&target, &others)))
}

async fn plan_cut_handler(
    State(state): State<AppState>,
    Json(body): Json<PlanCutRequest>,
) -> ApiResult<PlannedCut> {
    let module: ModuleKind = body.module.parse()?;
    let planned = plan_module_cut(module, body.facet_address, &state.catalog)?;
    tracing::info!(
        module = %module,
        selectors = planned.cut.function_selectors.len(),
        "planned facet cut"
    );
    Ok(Json(planned))
}

async fn bootstrap_cuts_handler(
    State(state): State<AppState>,
    Json(body): Json<BootstrapRequest>,
) -> ApiResult<Vec<PlannedCut>> {
    let deployed = bootstrap_deployment(body.addresses);
    let cuts = plan_bootstrap_cuts(&deployed, &state.catalog)?;
    tracing::info!(cuts = cuts.len(), "planned bootstrap cuts");
    Ok(Json(cuts))
}
