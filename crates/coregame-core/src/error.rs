//! # Error Module
//!
//! The single error type returned by fallible core operations.
//!
//! Lifecycle classification is total and never produces one of these.

use crate::Address;
use crate::lifecycle::ModuleKind;
use thiserror::Error;

/// Errors produced by the CoreGame engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Address string was not `0x` followed by 40 hex digits.
    #[error("invalid address `{0}`: expected 0x followed by 40 hex digits")]
    InvalidAddress(String),

    /// Selector string was not `0x` followed by 8 hex digits.
    #[error("invalid selector `{0}`: expected 0x followed by 8 hex digits")]
    InvalidSelector(String),

    /// ABI JSON could not be parsed.
    #[error("invalid ABI: {0}")]
    InvalidAbi(String),

    /// A facet ABI was required but not present in the catalog.
    #[error("no ABI registered for facet `{0}`")]
    MissingAbi(String),

    /// The zero address cannot receive a facet cut.
    #[error("facet address must not be the zero address")]
    ZeroAddress,

    /// A cut would carry no selectors.
    #[error("facet `{0}` has no selectors left to add")]
    EmptyCut(String),

    /// Facet registry returned address and name lists of different length.
    #[error("facet registry mismatch: {addresses} addresses, {names} names")]
    RegistryMismatch { addresses: usize, names: usize },

    /// Facet registry listed the same facet name more than once.
    #[error("facet registry lists `{0}` more than once")]
    DuplicateFacetName(String),

    /// Parallel input columns have different lengths.
    #[error("column `{column}` has {found} entries, expected {expected}")]
    ColumnMismatch {
        column: &'static str,
        expected: usize,
        found: usize,
    },

    /// A required text field was empty or malformed.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// A key appears twice in one passport schema list.
    #[error("duplicate key `{0}`")]
    DuplicateKey(String),

    /// An item with this token id already exists in the catalog.
    #[error("item {0} already exists")]
    DuplicateItem(u64),

    /// The operation needs a module that is not attached yet.
    #[error("{0} module is not attached")]
    ModuleNotAttached(ModuleKind),

    /// A facet with this name is already attached to the diamond.
    #[error("facet `{0}` is already attached")]
    FacetAlreadyAttached(String),

    /// The module name did not match any known module.
    #[error("unknown module `{0}`")]
    UnknownModule(String),

    /// The user is already authorized for this game.
    #[error("{0} is already an authorized user")]
    AlreadyAuthorized(Address),

    /// A game with this address is already registered.
    #[error("game {0} is already registered")]
    GameExists(Address),

    /// No game with this address is registered.
    #[error("game {0} not found")]
    GameNotFound(Address),

    /// Embedded database failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Record (de)serialization failure.
    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),
}

impl CoreError {
    /// Wrap any redb error into [`CoreError::Storage`].
    pub(crate) fn storage(err: impl Into<redb::Error>) -> Self {
        Self::Storage(err.into().to_string())
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
