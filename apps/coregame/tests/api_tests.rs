//! Integration tests for the CoreGame HTTP API.
//!
//! Requests are driven through the router with `tower::ServiceExt::oneshot`;
//! no socket is bound.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use coregame::api::{AppState, router};
use coregame_core::{Abi, AbiCatalog, GameStore};
use governor::Quota;
use serde_json::{Value, json};
use std::num::NonZeroU32;
use tempfile::TempDir;
use tower::ServiceExt;

const GAME: &str = "0x1234567890abcdef1234567890abcdef12345678";
const DEVELOPER: &str = "0x742d35cc6634c0532925a3b8d4c0c8b3c2e1e1e1";

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Fresh state backed by a temporary registry. Keep the `TempDir` alive.
fn test_state() -> (TempDir, AppState) {
    let temp = tempfile::tempdir().expect("Failed to create temp dir");
    let store = GameStore::create(&temp.path().join("api.redb")).unwrap();
    (temp, AppState::new(store))
}

fn facet_address(byte: u8) -> String {
    format!("0x{}", format!("{byte:02x}").repeat(20))
}

fn abi_of(functions: &[&str]) -> Value {
    Value::Array(
        functions
            .iter()
            .map(|f| json!({"type": "function", "name": f, "inputs": []}))
            .collect(),
    )
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>, key: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body), None).await
}

async fn create_game(app: &Router) -> Value {
    let (status, body) = post(
        app,
        "/games",
        json!({
            "address": GAME,
            "developer": DEVELOPER,
            "metadata": {"name": "CyberWar 2099", "genre": "Action"}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

// =============================================================================
// HEALTH / CLASSIFY
// =============================================================================

#[tokio::test]
async fn test_health_reports_game_count() {
    let (_temp, state) = test_state();
    let app = router(state);

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["games"], 0);

    create_game(&app).await;
    let (_, body) = get(&app, "/health").await;
    assert_eq!(body["games"], 1);
}

#[tokio::test]
async fn test_classify_endpoint() {
    let (_temp, state) = test_state();
    let app = router(state);

    let (status, body) = post(&app, "/lifecycle/classify", json!({"metadata": true})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "configured");
    assert_eq!(body["next_step_message"], "Complete module deployment first");
    assert_eq!(body["recommended"], json!(["passport", "inventory"]));

    let (_, body) = post(&app, "/lifecycle/classify", json!({"gamedata": true})).await;
    assert_eq!(body["state"], "bare");
    assert_eq!(body["consistent"], false);
}

// =============================================================================
// GAME LIFECYCLE
// =============================================================================

#[tokio::test]
async fn test_create_and_fetch_game() {
    let (_temp, state) = test_state();
    let app = router(state);

    let created = create_game(&app).await;
    assert_eq!(created["status"]["state"], "bare");
    assert_eq!(created["title"], "Game 0x123456...345678");

    let (status, body) = get(&app, &format!("/games/{GAME}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["genre"], "Action");
}

#[tokio::test]
async fn test_create_duplicate_is_conflict() {
    let (_temp, state) = test_state();
    let app = router(state);

    create_game(&app).await;
    let (status, body) = post(&app, "/games", json!({"address": GAME, "developer": DEVELOPER})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_create_with_factory_facets() {
    let (_temp, state) = test_state();
    let app = router(state);

    let (status, body) = post(
        &app,
        "/games",
        json!({
            "address": GAME,
            "developer": DEVELOPER,
            "facets": {
                "OwnershipFacet": facet_address(1),
                "GameInfoFacet": facet_address(2)
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"]["state"], "configured");
}

#[tokio::test]
async fn test_create_from_registry_listing() {
    let (_temp, state) = test_state();
    let app = router(state);

    let (status, body) = post(
        &app,
        "/games",
        json!({
            "address": GAME,
            "developer": DEVELOPER,
            "registry": {
                "addresses": [facet_address(1), facet_address(2)],
                "names": ["OwnershipFacet", "PassportFacet"]
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["facets"]["PassportFacet"], facet_address(2));
    assert_eq!(body["status"]["state"], "configured");
}

#[tokio::test]
async fn test_deployed_facets_win_over_registry() {
    let (_temp, state) = test_state();
    let app = router(state);

    let (status, body) = post(
        &app,
        "/games",
        json!({
            "address": GAME,
            "developer": DEVELOPER,
            "facets": {"GameInfoFacet": facet_address(3)},
            "registry": {
                "addresses": [facet_address(2)],
                "names": ["PassportFacet"]
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["facets"].as_object().map(|f| f.len()), Some(1));
    assert_eq!(body["facets"]["GameInfoFacet"], facet_address(3));
}

#[tokio::test]
async fn test_registry_listing_with_repeated_name_is_rejected() {
    let (_temp, state) = test_state();
    let app = router(state);

    let (status, body) = post(
        &app,
        "/games",
        json!({
            "address": GAME,
            "developer": DEVELOPER,
            "registry": {
                "addresses": [facet_address(1), facet_address(2)],
                "names": ["PassportFacet", "PassportFacet"]
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some_and(|e| e.contains("more than once")));

    let (_, health) = get(&app, "/health").await;
    assert_eq!(health["games"], 0);
}

#[tokio::test]
async fn test_unknown_game_is_not_found() {
    let (_temp, state) = test_state();
    let app = router(state);

    let (status, _) = get(&app, &format!("/games/{}/status", facet_address(9))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/games/not-an-address").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_attach_facets_until_active() {
    let (_temp, state) = test_state();
    let app = router(state);
    create_game(&app).await;

    let uri = format!("/games/{GAME}/facets");
    for (i, facet) in ["metadata", "PassportFacet", "inventory"].iter().enumerate() {
        let (status, _) = post(&app, &uri, json!({"facet": facet, "address": facet_address(i as u8 + 1)})).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, status_body) = get(&app, &format!("/games/{GAME}/status")).await;
    assert_eq!(status_body["state"], "configured");
    assert_eq!(status_body["can_progress"], true);
    assert_eq!(status_body["next_step_message"], "Deploy GameDataFacet to activate full dashboard");

    let (_, body) = post(&app, &uri, json!({"facet": "GameDataFacetV1", "address": facet_address(4)})).await;
    assert_eq!(body["status"]["state"], "active");
    assert_eq!(body["status"]["can_progress"], false);
    assert_eq!(body["title"], "CyberWar 2099");
}

#[tokio::test]
async fn test_attach_twice_is_conflict() {
    let (_temp, state) = test_state();
    let app = router(state);
    create_game(&app).await;

    let uri = format!("/games/{GAME}/facets");
    post(&app, &uri, json!({"facet": "passport", "address": facet_address(1)})).await;
    let (status, _) = post(&app, &uri, json!({"facet": "passport", "address": facet_address(2)})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_attach_zero_address_is_bad_request() {
    let (_temp, state) = test_state();
    let app = router(state);
    create_game(&app).await;

    let (status, _) = post(
        &app,
        &format!("/games/{GAME}/facets"),
        json!({"facet": "passport", "address": facet_address(0)}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metadata_and_authorized_users() {
    let (_temp, state) = test_state();
    let app = router(state);
    create_game(&app).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/games/{GAME}/metadata"),
        Some(json!({"description": "Neon shooter"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["description"], "Neon shooter");
    assert_eq!(body["metadata"]["name"], "CyberWar 2099");

    let uri = format!("/games/{GAME}/authorized-users");
    let (status, body) = post(&app, &uri, json!({"user": facet_address(5)})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authorized_users"], json!([facet_address(5)]));

    let (status, _) = post(&app, &uri, json!({"user": facet_address(5)})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_passport_schema_updates() {
    let (_temp, state) = test_state();
    let app = router(state);
    create_game(&app).await;
    let uri = format!("/games/{GAME}/passport");
    let patch = json!({
        "traits": [{"trait_type": "Level", "value": "1", "display_type": "number"}],
        "user_metadata": [{"key": "bio", "value": ""}],
        "total_passports": 3
    });

    // Passport module not attached yet
    let (status, _) = send(&app, Method::PUT, &uri, Some(patch.clone()), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    post(&app, &format!("/games/{GAME}/facets"), json!({"facet": "passport", "address": facet_address(2)})).await;
    let (status, body) = send(&app, Method::PUT, &uri, Some(patch), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["passport"]["traits"][0]["trait_type"], "Level");
    assert_eq!(body["passport"]["total_passports"], 3);

    let duplicate = json!({"traits": [
        {"trait_type": "Level", "value": "1"},
        {"trait_type": "LEVEL", "value": "2"}
    ]});
    let (status, _) = send(&app, Method::PUT, &uri, Some(duplicate), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, game) = get(&app, &format!("/games/{GAME}")).await;
    assert_eq!(game["passport"]["traits"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_item_catalog() {
    let (_temp, state) = test_state();
    let app = router(state);
    create_game(&app).await;
    let uri = format!("/games/{GAME}/items");
    post(&app, &format!("/games/{GAME}/facets"), json!({"facet": "inventory", "address": facet_address(3)})).await;

    let sword = json!({
        "token_id": 2,
        "name": "Sword",
        "attributes": [{"trait_type": "Damage", "value": "12"}]
    });
    let (status, body) = post(&app, &uri, sword.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total_items"], 1);

    let (status, _) = post(&app, &uri, json!({"token_id": 1, "name": "Shield"})).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post(&app, &uri, sword).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "item 2 already exists");

    let (status, _) = post(&app, &uri, json!({"token_id": 9, "name": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, items) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(items.as_array().map(Vec::len), Some(2));
    assert_eq!(items[0]["name"], "Shield");
}

#[tokio::test]
async fn test_items_need_inventory_module() {
    let (_temp, state) = test_state();
    let app = router(state);
    create_game(&app).await;

    let (status, body) = post(&app, &format!("/games/{GAME}/items"), json!({"token_id": 1, "name": "Shield"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "inventory module is not attached");
}

#[tokio::test]
async fn test_list_by_developer() {
    let (_temp, state) = test_state();
    let app = router(state);
    create_game(&app).await;
    post(&app, "/games", json!({"address": facet_address(0xaa), "developer": facet_address(0xbb)})).await;

    let (_, all) = get(&app, "/games").await;
    assert_eq!(all.as_array().map(Vec::len), Some(2));

    let (_, mine) = get(&app, &format!("/games?developer={DEVELOPER}")).await;
    assert_eq!(mine.as_array().map(Vec::len), Some(1));
    assert_eq!(mine[0]["address"], GAME);
}

// =============================================================================
// SELECTORS / CUTS
// =============================================================================

#[tokio::test]
async fn test_selectors_endpoint() {
    let (_temp, state) = test_state();
    let app = router(state);

    let (status, body) = post(
        &app,
        "/selectors",
        json!({
            "abi": {"abi": abi_of(&["mintPassport", "isAuthorized"])},
            "exclude": [abi_of(&["isAuthorized"])]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["selectors"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["excluded"], 1);
}

#[tokio::test]
async fn test_selectors_rejects_malformed_abi() {
    let (_temp, state) = test_state();
    let app = router(state);

    let (status, body) = post(&app, "/selectors", json!({"abi": "not an abi"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_plan_cut_endpoint() {
    let (_temp, state) = test_state();
    let mut catalog = AbiCatalog::new();
    for (name, functions) in [
        ("GameInfoFacet", vec!["setBasicGameMetadata", "isAuthorized"]),
        ("PassportFacet", vec!["mintPassport", "isAuthorized"]),
        ("InventoryFacet", vec!["mintItem"]),
    ] {
        let abi = Abi::from_value(abi_of(&functions)).unwrap();
        catalog.insert(name, abi);
    }
    let app = router(state.with_catalog(catalog));

    let (status, body) = post(
        &app,
        "/cuts/plan",
        json!({"module": "passport", "facet_address": facet_address(2)}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["facet_name"], "PassportFacet");
    assert_eq!(body["cut"]["facetAddress"], facet_address(2));
    assert_eq!(body["cut"]["functionSelectors"].as_array().map(Vec::len), Some(1));

    // Game data needs every core ABI plus its own
    let (status, _) = post(
        &app,
        "/cuts/plan",
        json!({"module": "gamedata", "facet_address": facet_address(4)}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bootstrap_cuts_endpoint() {
    let (_temp, state) = test_state();
    let mut catalog = AbiCatalog::new();
    for (name, functions) in [
        ("FacetRegistryFacet", vec!["owner", "getAllFacets"]),
        ("OwnershipFacet", vec!["owner", "transferOwnership"]),
        ("DiamondLoupeFacet", vec!["facets"]),
    ] {
        catalog.insert(name, Abi::from_value(abi_of(&functions)).unwrap());
    }
    let app = router(state.with_catalog(catalog));

    let addresses = json!({"addresses": [facet_address(1), facet_address(2), facet_address(3)]});
    let (status, body) = post(&app, "/cuts/bootstrap", addresses).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(3));
    assert_eq!(body[1]["facet_name"], "OwnershipFacet");
    assert_eq!(body[1]["cut"]["functionSelectors"].as_array().map(Vec::len), Some(1));

    let (status, _) = post(&app, "/cuts/bootstrap", json!({"addresses": [facet_address(1)]})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// AUTH / RATE LIMIT
// =============================================================================

#[tokio::test]
async fn test_api_key_required_except_health() {
    let (_temp, state) = test_state();
    let app = router(state.with_api_key("s3cret"));

    let (status, _) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&app, "/games").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing or invalid API key");

    let (status, _) = send(&app, Method::GET, "/games", None, Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/games", None, Some("s3cret")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let (_temp, state) = test_state();
    let quota = Quota::per_minute(NonZeroU32::new(1).unwrap());
    let app = router(state.with_rate_limit(quota));

    let (status, _) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate limit exceeded");
}
