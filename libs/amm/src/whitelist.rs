//! Whitelisted-deposit admission
//!
//! During the guarded launch only allowlisted accounts may deposit, each up
//! to a cap. Admission is a capability check behind [`AllowlistVerifier`];
//! [`MerkleAllowlist`] implements it for claims proven against a keccak256
//! merkle root (sorted-pair hashing, OpenZeppelin `MerkleProof` compatible).

use crate::error::{CurveError, CurveResult};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::collections::HashMap;
use std::fmt;
use types::{Address, Fixed18, Hash256};

/// Allowance record presented with a whitelisted deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistClaim {
    pub index: u64,
    pub account: Address,
    /// Upper bound on the account's cumulative deposit amount
    pub cap_amount: Fixed18,
    pub proof: Vec<Hash256>,
}

impl AllowlistClaim {
    /// `keccak256(uint256 index ‖ address account ‖ uint256 amount)`
    pub fn leaf(&self) -> Hash256 {
        leaf_hash(self.index, self.account, self.cap_amount)
    }
}

pub fn leaf_hash(index: u64, account: Address, cap_amount: Fixed18) -> Hash256 {
    let mut hasher = Keccak256::new();
    hasher.update(word(index as u128));
    hasher.update(account.as_bytes());
    hasher.update(word(cap_amount.raw_value()));
    Hash256::new(hasher.finalize().into())
}

fn word(value: u128) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[16..].copy_from_slice(&value.to_be_bytes());
    out
}

fn hash_pair(a: Hash256, b: Hash256) -> Hash256 {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Keccak256::new();
    hasher.update(first.as_bytes());
    hasher.update(second.as_bytes());
    Hash256::new(hasher.finalize().into())
}

/// Decides whether a claim is genuine
pub trait AllowlistVerifier: Send + Sync + fmt::Debug {
    fn verify(&self, claim: &AllowlistClaim) -> bool;
}

/// Rejects every claim; the default until an allowlist is installed
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAll;

impl AllowlistVerifier for DenyAll {
    fn verify(&self, _claim: &AllowlistClaim) -> bool {
        false
    }
}

/// Claims proven against a merkle root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerkleAllowlist {
    root: Hash256,
}

impl MerkleAllowlist {
    pub fn new(root: Hash256) -> Self {
        Self { root }
    }

    pub fn root(&self) -> Hash256 {
        self.root
    }
}

impl AllowlistVerifier for MerkleAllowlist {
    fn verify(&self, claim: &AllowlistClaim) -> bool {
        let computed = claim
            .proof
            .iter()
            .fold(claim.leaf(), |node, sibling| hash_pair(node, *sibling));
        computed == self.root
    }
}

/// Merkle tree over allowlist leaves, used to issue proofs off the curve
#[derive(Debug, Clone)]
pub struct MerkleTree {
    layers: Vec<Vec<Hash256>>,
}

impl MerkleTree {
    /// Build from leaves in index order; an unpaired node is carried up as-is
    pub fn from_leaves(leaves: Vec<Hash256>) -> Self {
        let mut layers = vec![leaves];
        while let Some(layer) = layers.last().filter(|layer| layer.len() > 1) {
            let next = layer
                .chunks(2)
                .map(|pair| match pair.get(1) {
                    Some(right) => hash_pair(pair[0], *right),
                    None => pair[0],
                })
                .collect();
            layers.push(next);
        }
        Self { layers }
    }

    /// Root of the tree; zero for an empty allowlist
    pub fn root(&self) -> Hash256 {
        self.layers
            .last()
            .and_then(|layer| layer.first())
            .copied()
            .unwrap_or(Hash256::ZERO)
    }

    /// Sibling path for the leaf at `position`
    pub fn proof(&self, position: usize) -> Option<Vec<Hash256>> {
        if position >= self.layers.first()?.len() {
            return None;
        }
        let mut proof = Vec::new();
        let mut position = position;
        for layer in &self.layers[..self.layers.len() - 1] {
            if let Some(sibling) = layer.get(position ^ 1) {
                proof.push(*sibling);
            }
            position /= 2;
        }
        Some(proof)
    }
}

/// Cumulative whitelisted deposits per account
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpentTracker {
    spent: HashMap<Address, Fixed18>,
}

impl SpentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spent(&self, account: Address) -> Fixed18 {
        self.spent.get(&account).copied().unwrap_or(Fixed18::ZERO)
    }

    /// Cumulative total after depositing `amount`, if it stays within `cap`
    pub fn check(&self, account: Address, amount: Fixed18, cap: Fixed18) -> CurveResult<Fixed18> {
        let attempted = self.spent(account).checked_add(amount)?;
        if attempted > cap {
            return Err(CurveError::WhitelistCapExceeded {
                account,
                cap,
                attempted,
            });
        }
        Ok(attempted)
    }

    pub fn record(&mut self, account: Address, total: Fixed18) {
        self.spent.insert(account, total);
    }
}
