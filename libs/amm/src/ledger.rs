//! Fungible token ledger interface and settlement batches
//!
//! Curves never move tokens piecemeal. Each operation first plans every
//! transfer it needs into a [`Settlement`], then hands the whole batch to the
//! ledger which applies it all-or-nothing.

use crate::error::TransferError;
use std::collections::{BTreeMap, HashMap};
use types::Address;

/// Allowance value treated as unlimited (never decremented)
pub const UNLIMITED_ALLOWANCE: u128 = u128::MAX;

/// One planned token transfer in raw token units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMovement {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: u128,
    /// Account whose allowance from `from` is consumed; `None` for a
    /// transfer initiated by `from` itself
    pub spender: Option<Address>,
}

/// Ordered batch of token movements applied atomically
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settlement {
    movements: Vec<TokenMovement>,
}

impl Settlement {
    pub fn new() -> Self {
        Self::default()
    }

    /// `transferFrom(from, to, amount)` executed by `spender`
    pub fn pull(&mut self, token: Address, from: Address, to: Address, spender: Address, amount: u128) {
        self.movements.push(TokenMovement {
            token,
            from,
            to,
            amount,
            spender: Some(spender),
        });
    }

    /// `transfer(to, amount)` executed by `from`
    pub fn push(&mut self, token: Address, from: Address, to: Address, amount: u128) {
        self.movements.push(TokenMovement {
            token,
            from,
            to,
            amount,
            spender: None,
        });
    }

    /// Append another batch after this one
    pub fn extend(&mut self, other: Settlement) {
        self.movements.extend(other.movements);
    }

    /// Attribute every allowance-consuming movement to `spender`
    ///
    /// Used when an intermediary (the router) executes the pulls on the
    /// caller's behalf, so only the intermediary needs an approval.
    pub fn with_spender(mut self, spender: Address) -> Self {
        for movement in &mut self.movements {
            if movement.spender.is_some() {
                movement.spender = Some(spender);
            }
        }
        self
    }

    pub fn movements(&self) -> &[TokenMovement] {
        &self.movements
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }
}

/// Standard fungible-transfer interface consumed by curves
pub trait TokenLedger {
    fn balance_of(&self, token: Address, holder: Address) -> u128;

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> u128;

    fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: u128);

    /// Apply every movement or none of them
    fn settle(&mut self, settlement: &Settlement) -> Result<(), TransferError>;
}

/// Ledger kept entirely in memory, for simulation and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: HashMap<(Address, Address), u128>,
    allowances: HashMap<(Address, Address, Address), u128>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` new tokens for `holder`
    pub fn mint(&mut self, token: Address, holder: Address, amount: u128) -> Result<(), TransferError> {
        let balance = self.balances.entry((token, holder)).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or(TransferError::BalanceOverflow { token, holder })?;
        Ok(())
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, token: Address, holder: Address) -> u128 {
        self.balances.get(&(token, holder)).copied().unwrap_or(0)
    }

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> u128 {
        self.allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(0)
    }

    fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: u128) {
        self.allowances.insert((token, owner, spender), amount);
    }

    fn settle(&mut self, settlement: &Settlement) -> Result<(), TransferError> {
        // Stage every touched entry, apply sequentially, then commit.
        let mut balances: BTreeMap<(Address, Address), u128> = BTreeMap::new();
        let mut allowances: BTreeMap<(Address, Address, Address), u128> = BTreeMap::new();

        for movement in settlement.movements() {
            let TokenMovement {
                token,
                from,
                to,
                amount,
                spender,
            } = *movement;

            if let Some(spender) = spender.filter(|spender| *spender != from) {
                let key = (token, from, spender);
                let approved = *allowances
                    .entry(key)
                    .or_insert_with(|| self.allowance(token, from, spender));
                if approved < amount {
                    return Err(TransferError::InsufficientAllowance {
                        token,
                        owner: from,
                        spender,
                        needed: amount,
                        approved,
                    });
                }
                if approved != UNLIMITED_ALLOWANCE {
                    allowances.insert(key, approved - amount);
                }
            }

            let available = *balances
                .entry((token, from))
                .or_insert_with(|| self.balance_of(token, from));
            if available < amount {
                return Err(TransferError::InsufficientBalance {
                    token,
                    holder: from,
                    needed: amount,
                    available,
                });
            }
            balances.insert((token, from), available - amount);

            let credited = balances
                .entry((token, to))
                .or_insert_with(|| self.balance_of(token, to));
            *credited = credited
                .checked_add(amount)
                .ok_or(TransferError::BalanceOverflow { token, holder: to })?;
        }

        self.balances.extend(balances);
        self.allowances.extend(allowances);
        Ok(())
    }
}
