//! # Selector Module
//!
//! Function selectors and the deduplication rules applied before every
//! diamond cut.
//!
//! A diamond routes calls by 4-byte selector, so two facets may never
//! register the same selector. Two strategies are used:
//!
//! - [`SelectorSet::claim_unique`]: first facet to declare a selector owns
//!   it. Used when several facets are cut in together at game creation.
//! - [`exclusive_selectors`]: a facet keeps only the selectors no competing
//!   module declares. Used when a single module is attached later.

use crate::abi::Abi;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tiny_keccak::{Hasher, Keccak};

/// Keccak-256 digest of `data`.
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// A 4-byte function selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Selector(pub [u8; 4]);

impl Selector {
    /// First four bytes of the Keccak-256 of a canonical signature.
    #[must_use]
    pub fn from_signature(signature: &str) -> Self {
        let digest = keccak256(signature.as_bytes());
        Self([digest[0], digest[1], digest[2], digest[3]])
    }

    /// Parse `0x` + 8 hex digits.
    pub fn parse(input: &str) -> Result<Self> {
        let digits = input
            .trim()
            .strip_prefix("0x")
            .ok_or_else(|| CoreError::InvalidSelector(input.to_string()))?;
        let mut bytes = [0u8; 4];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| CoreError::InvalidSelector(input.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Selector {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// DEDUPLICATION
// =============================================================================

/// Selectors already claimed by earlier facets in the same cut.
#[derive(Debug, Clone, Default)]
pub struct SelectorSet {
    seen: BTreeSet<Selector>,
}

impl SelectorSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the selectors of `abi` that nobody has claimed yet.
    ///
    /// Returns them in declaration order and marks them as seen.
    pub fn claim_unique(&mut self, abi: &Abi) -> Vec<Selector> {
        abi.selectors().filter(|s| self.seen.insert(*s)).collect()
    }

    #[must_use]
    pub fn contains(&self, selector: &Selector) -> bool {
        self.seen.contains(selector)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Selectors of `target` that none of `others` declares.
///
/// Declaration order of `target` is preserved; duplicates within `target`
/// are collapsed.
#[must_use]
pub fn exclusive_selectors<'a, I>(target: &Abi, others: I) -> Vec<Selector>
where
    I: IntoIterator<Item = &'a Abi>,
{
    let taken: BTreeSet<Selector> = others.into_iter().flat_map(Abi::selectors).collect();
    let mut emitted = BTreeSet::new();
    target
        .selectors()
        .filter(|s| !taken.contains(s) && emitted.insert(*s))
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{Fragment, Param};
    use proptest::prelude::*;

    fn function(name: &str, inputs: &[&str]) -> Fragment {
        Fragment {
            kind: "function".to_string(),
            name: name.to_string(),
            inputs: inputs
                .iter()
                .map(|ty| Param {
                    name: String::new(),
                    ty: (*ty).to_string(),
                    components: Vec::new(),
                })
                .collect(),
            outputs: Vec::new(),
            state_mutability: None,
        }
    }

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap_or(Selector([0; 4]))
    }

    #[test]
    fn known_selectors() {
        assert_eq!(
            Selector::from_signature("transfer(address,uint256)").to_string(),
            "0xa9059cbb"
        );
        assert_eq!(Selector::from_signature("balanceOf(address)").to_string(), "0x70a08231");
        assert_eq!(Selector::from_signature("totalSupply()").to_string(), "0x18160ddd");
    }

    #[test]
    fn parse_round_trips_display() {
        let s = Selector::from_signature("approve(address,uint256)");
        assert_eq!(Selector::parse(&s.to_string()).ok(), Some(s));
        assert!(Selector::parse("0x1234").is_err());
        assert!(Selector::parse("a9059cbb").is_err());
    }

    #[test]
    fn claim_unique_first_declaration_wins() {
        let registry = Abi::new(vec![function("owner", &[]), function("getAllFacets", &[])]);
        let ownership = Abi::new(vec![
            function("owner", &[]),
            function("transferOwnership", &["address"]),
        ]);

        let mut seen = SelectorSet::new();
        let first = seen.claim_unique(&registry);
        let second = seen.claim_unique(&ownership);

        assert_eq!(first.len(), 2);
        assert_eq!(
            second,
            vec![Selector::from_signature("transferOwnership(address)")]
        );
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn exclusive_drops_shared_selectors() {
        let passport = Abi::new(vec![
            function("mintPassport", &["address"]),
            function("isAuthorized", &["address"]),
        ]);
        let info = Abi::new(vec![function("isAuthorized", &["address"])]);

        let kept = exclusive_selectors(&passport, [&info]);
        assert_eq!(kept, vec![Selector::from_signature("mintPassport(address)")]);
    }

    #[test]
    fn exclusive_collapses_overloads_declared_twice() {
        let target = Abi::new(vec![function("ping", &[]), function("ping", &[])]);
        assert_eq!(exclusive_selectors(&target, std::iter::empty::<&Abi>()).len(), 1);
    }

    #[test]
    fn events_are_ignored() {
        let mut event = function("Transfer", &["address", "address", "uint256"]);
        event.kind = "event".to_string();
        let abi = Abi::new(vec![event]);
        assert_eq!(abi.selectors().count(), 0);
        assert_eq!(sel("0xa9059cbb"), Selector::from_signature("transfer(address,uint256)"));
    }

    proptest! {
        #[test]
        fn claimed_selectors_never_repeat(names in proptest::collection::vec("[a-d]{1,2}", 0..12), split in 0usize..12) {
            let split = split.min(names.len());
            let left = Abi::new(names[..split].iter().map(|n| function(n, &[])).collect());
            let right = Abi::new(names[split..].iter().map(|n| function(n, &[])).collect());

            let mut seen = SelectorSet::new();
            let mut all = seen.claim_unique(&left);
            all.extend(seen.claim_unique(&right));

            let unique: BTreeSet<Selector> = all.iter().copied().collect();
            prop_assert_eq!(unique.len(), all.len());
            prop_assert_eq!(all.len(), seen.len());
        }

        #[test]
        fn exclusive_is_disjoint_from_others(a in proptest::collection::vec("[a-d]{1,2}", 0..8), b in proptest::collection::vec("[a-d]{1,2}", 0..8)) {
            let target = Abi::new(a.iter().map(|n| function(n, &[])).collect());
            let other = Abi::new(b.iter().map(|n| function(n, &[])).collect());
            let other_set: BTreeSet<Selector> = other.selectors().collect();

            for s in exclusive_selectors(&target, [&other]) {
                prop_assert!(!other_set.contains(&s));
            }
        }
    }
}
