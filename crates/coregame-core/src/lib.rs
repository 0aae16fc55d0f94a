//! # CoreGame Core
//!
//! The deterministic engine behind the CoreGame developer tools.
//!
//! A CoreGame is a diamond proxy created by the factory with three bootstrap
//! facets. Developers then attach feature modules (metadata, passport,
//! inventory, game data) one diamond cut at a time. This crate answers the
//! questions that need no chain access:
//!
//! - which lifecycle state a game is in, and what to deploy next
//!   ([`lifecycle`])
//! - which function selectors a facet may register ([`abi`], [`selector`])
//! - what the cut payload looks like ([`cut`])
//! - what the dashboard knows about each game ([`game`], [`passport`],
//!   [`inventory`], [`storage`])
//!
//! ```text
//!   facet registry ──► FacetMap ──► ModuleSet ──► classify ──► LifecycleStatus
//!                                                                   │
//!   facet ABI ──► exclusive_selectors ──► FacetCut ◄── next module ─┘
//! ```
//!
//! Everything here is synchronous and free of I/O except [`storage`].

pub mod abi;
pub mod address;
pub mod cut;
pub mod error;
pub mod game;
pub mod inventory;
pub mod lifecycle;
pub mod passport;
pub mod selector;
pub mod storage;

pub use abi::{Abi, AbiCatalog, Fragment, Param};
pub use address::Address;
pub use cut::{
    FacetCut, FacetCutAction, PlannedCut, bootstrap_deployment, plan_bootstrap_cuts,
    plan_module_cut,
};
pub use error::{CoreError, Result};
pub use game::{FacetMap, GameMetadata, GameRecord, MetadataPatch, SocialLinks};
pub use inventory::{InventoryItem, ItemAttribute, ItemCatalog};
pub use lifecycle::{
    BOOTSTRAP_FACETS, LifecycleState, LifecycleStatus, ModuleKind, ModuleSet, NextStep, Progress,
    classify,
};
pub use passport::{MetadataField, PassportPatch, PassportSchema, PassportTrait};
pub use selector::{Selector, SelectorSet, exclusive_selectors, keccak256};
pub use storage::GameStore;
