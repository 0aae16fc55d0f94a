//! # Cut Module
//!
//! Builds the `FacetCut` payloads handed to the diamond's `deployFacet`
//! and to the factory's `createCoreGame`.
//!
//! Deployment of the facet contract itself happens outside this crate;
//! planning starts from the address the deployment produced.

use crate::abi::AbiCatalog;
use crate::address::Address;
use crate::error::{CoreError, Result};
use crate::lifecycle::{BOOTSTRAP_FACETS, ModuleKind};
use crate::selector::{Selector, SelectorSet, exclusive_selectors};
use serde::{Deserialize, Serialize};

/// Action carried by a facet cut. Encoded on chain as `uint8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum FacetCutAction {
    Add = 0,
    Replace = 1,
    Remove = 2,
}

impl From<FacetCutAction> for u8 {
    fn from(action: FacetCutAction) -> Self {
        action as u8
    }
}

impl TryFrom<u8> for FacetCutAction {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Add),
            1 => Ok(Self::Replace),
            2 => Ok(Self::Remove),
            other => Err(format!("invalid facet cut action {other}")),
        }
    }
}

/// One entry of a diamond cut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetCut {
    pub facet_address: Address,
    pub action: FacetCutAction,
    pub function_selectors: Vec<Selector>,
}

impl FacetCut {
    /// An `Add` cut. Rejects the zero address and empty selector lists.
    pub fn add(facet: &str, facet_address: Address, function_selectors: Vec<Selector>) -> Result<Self> {
        if facet_address.is_zero() {
            return Err(CoreError::ZeroAddress);
        }
        if function_selectors.is_empty() {
            return Err(CoreError::EmptyCut(facet.to_string()));
        }
        Ok(Self {
            facet_address,
            action: FacetCutAction::Add,
            function_selectors,
        })
    }
}

/// A cut together with the facet name it registers under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedCut {
    pub facet_name: String,
    pub cut: FacetCut,
}

/// Plan the cut that attaches a module's freshly deployed facet.
///
/// Selectors shared with the competing core modules are dropped; for the
/// game data module, all three core modules compete.
pub fn plan_module_cut(module: ModuleKind, facet_address: Address, catalog: &AbiCatalog) -> Result<PlannedCut> {
    let facet_name = module.facet_name();
    let target = catalog.get(facet_name)?;

    let competing = module.competing();
    let mut others = Vec::with_capacity(competing.len());
    for other in competing {
        others.push(catalog.get(other.facet_name())?);
    }

    let selectors = exclusive_selectors(target, others);
    Ok(PlannedCut {
        facet_name: facet_name.to_string(),
        cut: FacetCut::add(facet_name, facet_address, selectors)?,
    })
}

/// Plan the cuts passed to the factory when a game is created.
///
/// `deployed` pairs each bootstrap facet name with its deployed address,
/// in cut order. Earlier facets win shared selectors.
pub fn plan_bootstrap_cuts(deployed: &[(&str, Address)], catalog: &AbiCatalog) -> Result<Vec<PlannedCut>> {
    let mut seen = SelectorSet::new();
    let mut cuts = Vec::with_capacity(deployed.len());
    for (name, address) in deployed {
        let abi = catalog.get(name)?;
        let selectors = seen.claim_unique(abi);
        cuts.push(PlannedCut {
            facet_name: (*name).to_string(),
            cut: FacetCut::add(name, *address, selectors)?,
        });
    }
    Ok(cuts)
}

/// Pair the standard bootstrap facets with their deployed addresses.
#[must_use]
pub fn bootstrap_deployment(addresses: [Address; 3]) -> Vec<(&'static str, Address)> {
    BOOTSTRAP_FACETS.into_iter().zip(addresses).collect()
}

// =============================================================================
// TESTS
// =============================================================================
