//! # ABI Module
//!
//! Minimal contract ABI model: just enough to derive canonical function
//! signatures for selector computation.
//!
//! Accepts either a bare JSON fragment array or a build artifact with an
//! `abi` field (the shape Hardhat and Foundry emit).

use crate::error::{CoreError, Result};
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One input or output parameter of an ABI fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Param>,
}

impl Param {
    /// Canonical type string, with tuples expanded and integer aliases resolved.
    #[must_use]
    pub fn canonical_type(&self) -> String {
        if let Some(suffix) = self.ty.strip_prefix("tuple") {
            let inner: Vec<String> = self.components.iter().map(Param::canonical_type).collect();
            return format!("({}){}", inner.join(","), suffix);
        }
        normalize_elementary(&self.ty)
    }
}

fn normalize_elementary(ty: &str) -> String {
    let split = ty.find('[').unwrap_or(ty.len());
    let (base, suffix) = ty.split_at(split);
    let base = match base {
        "uint" => "uint256",
        "int" => "int256",
        "byte" => "bytes1",
        other => other,
    };
    format!("{base}{suffix}")
}

fn default_kind() -> String {
    "function".to_string()
}

/// One entry of a contract ABI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// `function`, `event`, `error`, `constructor`, `fallback` or `receive`.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<Param>,
    #[serde(default)]
    pub outputs: Vec<Param>,
    #[serde(rename = "stateMutability", default, skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<String>,
}

impl Fragment {
    #[must_use]
    pub fn is_function(&self) -> bool {
        self.kind == "function"
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`.
    #[must_use]
    pub fn signature(&self) -> String {
        let inputs: Vec<String> = self.inputs.iter().map(Param::canonical_type).collect();
        format!("{}({})", self.name, inputs.join(","))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AbiSource {
    Bare(Vec<Fragment>),
    Artifact { abi: Vec<Fragment> },
}

/// A parsed contract ABI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Abi {
    pub fragments: Vec<Fragment>,
}

impl Abi {
    #[must_use]
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }

    /// Parse from JSON text (bare array or artifact object).
    pub fn from_json(text: &str) -> Result<Self> {
        let source: AbiSource =
            serde_json::from_str(text).map_err(|e| CoreError::InvalidAbi(e.to_string()))?;
        Ok(Self::from_source(source))
    }

    /// Parse from an already-decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let source: AbiSource =
            serde_json::from_value(value).map_err(|e| CoreError::InvalidAbi(e.to_string()))?;
        Ok(Self::from_source(source))
    }

    fn from_source(source: AbiSource) -> Self {
        match source {
            AbiSource::Bare(fragments) | AbiSource::Artifact { abi: fragments } => {
                Self::new(fragments)
            }
        }
    }

    /// Function fragments, in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter().filter(|f| f.is_function())
    }

    /// Selectors of every function, in declaration order (duplicates kept).
    pub fn selectors(&self) -> impl Iterator<Item = Selector> + '_ {
        self.functions().map(|f| Selector::from_signature(&f.signature()))
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// Facet ABIs keyed by facet name.
#[derive(Debug, Clone, Default)]
pub struct AbiCatalog {
    entries: BTreeMap<String, Abi>,
}

impl AbiCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the ABI for a facet.
    pub fn insert(&mut self, facet: impl Into<String>, abi: Abi) {
        self.entries.insert(facet.into(), abi);
    }

    /// Look up a facet's ABI.
    pub fn get(&self, facet: &str) -> Result<&Abi> {
        self.entries
            .get(facet)
            .ok_or_else(|| CoreError::MissingAbi(facet.to_string()))
    }

    #[must_use]
    pub fn contains(&self, facet: &str) -> bool {
        self.entries.contains_key(facet)
    }

    pub fn facet_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load every `<FacetName>.json` artifact in a directory.
    ///
    /// Files that are not valid ABIs are rejected rather than skipped.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut catalog = Self::new();
        let entries = std::fs::read_dir(dir).map_err(|e| CoreError::InvalidAbi(format!("{}: {e}", dir.display())))?;
        for entry in entries {
            let path = entry
                .map_err(|e| CoreError::InvalidAbi(e.to_string()))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let text = std::fs::read_to_string(&path)
                .map_err(|e| CoreError::InvalidAbi(format!("{}: {e}", path.display())))?;
            let abi = Abi::from_json(&text)
                .map_err(|e| CoreError::InvalidAbi(format!("{}: {e}", path.display())))?;
            catalog.insert(stem, abi);
        }
        Ok(catalog)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    const ERC20_SUBSET: &str = r#"[
        {"type": "function", "name": "transfer", "inputs": [
            {"name": "to", "type": "address"}, {"name": "amount", "type": "uint256"}
        ], "outputs": [{"name": "", "type": "bool"}], "stateMutability": "nonpayable"},
        {"type": "event", "name": "Transfer", "inputs": []},
        {"name": "totalSupply", "inputs": [], "outputs": [{"type": "uint"}]}
    ]"#;

    #[test]
    fn parses_bare_array() {
        let abi = Abi::from_json(ERC20_SUBSET).expect("ERC20 subset parses");
        assert_eq!(abi.fragments.len(), 3);
        let sigs: Vec<String> = abi.functions().map(Fragment::signature).collect();
        assert_eq!(sigs, vec!["transfer(address,uint256)", "totalSupply()"]);
    }

    #[test]
    fn parses_artifact_object() {
        let text = format!(r#"{{"contractName": "Token", "abi": {ERC20_SUBSET}, "bytecode": "0x00"}}"#);
        let abi = Abi::from_json(&text).expect("artifact parses");
        assert_eq!(abi.functions().count(), 2);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(Abi::from_json("{\"nope\": 1}"), Err(CoreError::InvalidAbi(_))));
        assert!(Abi::from_json("not json").is_err());
    }

    #[test]
    fn expands_tuples_and_aliases() {
        let text = r#"[{"type": "function", "name": "deployFacet", "inputs": [
            {"name": "cuts", "type": "tuple[]", "components": [
                {"name": "facetAddress", "type": "address"},
                {"name": "action", "type": "uint8"},
                {"name": "functionSelectors", "type": "bytes4[]"}
            ]},
            {"name": "names", "type": "string[]"},
            {"name": "amounts", "type": "uint[2]"}
        ]}]"#;
        let abi = Abi::from_json(text).expect("tuple ABI parses");
        let sig = abi.functions().next().map(Fragment::signature);
        assert_eq!(
            sig.as_deref(),
            Some("deployFacet((address,uint8,bytes4[])[],string[],uint256[2])")
        );
    }

    #[test]
    fn catalog_reports_missing_abi() {
        let catalog = AbiCatalog::new();
        assert!(matches!(catalog.get("PassportFacet"), Err(CoreError::MissingAbi(_))));
    }

    #[test]
    fn catalog_loads_directory() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("TokenFacet.json"), ERC20_SUBSET).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = AbiCatalog::load_dir(dir.path()).expect("catalog loads");
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("TokenFacet"));
    }
}
