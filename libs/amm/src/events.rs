//! Typed records of curve and factory state changes

use crate::params::CurveParams;
use serde::Serialize;
use types::{Address, Fixed18};

/// State change recorded by a curve, in emission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CurveEvent {
    Trade {
        trader: Address,
        origin: Address,
        target: Address,
        origin_amount: u128,
        target_amount: u128,
    },
    ProportionalDeposit {
        provider: Address,
        shares: Fixed18,
        amounts: [u128; 2],
    },
    ProportionalWithdraw {
        provider: Address,
        shares: Fixed18,
        amounts: [u128; 2],
    },
    EmergencyWithdraw {
        provider: Address,
        shares: Fixed18,
        amounts: [u128; 2],
    },
    ParametersSet {
        params: CurveParams,
    },
    WhitelistingStopped,
    WhitelistingDeadlineSet {
        deadline: u64,
    },
    AllowlistReplaced,
    FrozenSet {
        frozen: bool,
    },
    EmergencyAlarm {
        emergency: bool,
    },
    OwnershipTransferred {
        previous: Address,
        new_owner: Address,
    },
    Transfer {
        from: Address,
        to: Address,
        value: Fixed18,
    },
    Approval {
        owner: Address,
        spender: Address,
        value: Fixed18,
    },
}

/// State change recorded by the factory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FactoryEvent {
    NewCurve {
        caller: Address,
        curve: Address,
        base: Address,
        quote: Address,
    },
}
