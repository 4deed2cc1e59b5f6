//! Two-asset curve: reserves, LP shares, swaps and administration
//!
//! ## Execution model
//!
//! Every mutating entry point follows the same three steps:
//!
//! 1. **Plan** against `&self`: price the operation, check bounds, and
//!    collect every token movement into a [`Settlement`]
//! 2. **Settle**: hand the batch to the [`TokenLedger`], which applies it
//!    all-or-nothing
//! 3. **Commit**: only after settlement succeeds, update share balances,
//!    whitelist spend and the penalty reserve
//!
//! An `Err` at any step therefore leaves both the curve and the ledger
//! untouched. Reserves are never cached: they are the curve address's
//! ledger balances, valued through the assimilators on every call.

use crate::assimilator::Assimilator;
use crate::curve_math::{CurveMath, Liquidity, ASSET_COUNT};
use crate::error::{CurveError, CurveResult};
use crate::events::CurveEvent;
use crate::ledger::{Settlement, TokenLedger};
use crate::params::{CurveParams, DerivedParams};
use crate::whitelist::{AllowlistClaim, AllowlistVerifier, DenyAll, SpentTracker};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use types::{Address, Fixed18, Fixed64x64, U256};

/// Index of the base asset
pub const BASE: usize = 0;
/// Index of the quote (numeraire-side) asset
pub const QUOTE: usize = 1;

/// Who is calling and when
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    pub caller: Address,
    /// Unix timestamp the operation executes at
    pub now: u64,
}

impl ExecutionContext {
    pub fn new(caller: Address, now: u64) -> Self {
        Self { caller, now }
    }
}

/// Lifecycle stage, derived from the curve's state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveStage {
    /// Assets bound, parameters not yet set
    Created,
    /// Parameters set, no liquidity yet
    ParamsSet,
    /// Liquidity present, whitelisting still in force
    Active,
    /// Whitelisting turned off (one-way)
    WhitelistingDisabled,
}

/// One side of the pair
#[derive(Debug, Clone)]
pub struct CurveAsset {
    pub assimilator: Arc<Assimilator>,
    /// Target share of the pool's value
    pub weight: Fixed18,
}

impl CurveAsset {
    pub fn new(assimilator: Arc<Assimilator>, weight: Fixed18) -> Self {
        Self {
            assimilator,
            weight,
        }
    }

    pub fn token(&self) -> Address {
        self.assimilator.token()
    }
}

/// Priced swap, before or after execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwapQuote {
    pub origin_amount: u128,
    pub target_amount: u128,
    pub penalty: Fixed64x64,
    pub bonus: Fixed64x64,
}

/// Shares and raw per-asset amounts of a deposit or withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LiquidityQuote {
    pub shares: Fixed18,
    pub amounts: [u128; ASSET_COUNT],
}

#[derive(Debug, Clone)]
pub(crate) struct SwapPlan {
    pub(crate) quote: SwapQuote,
    pub(crate) settlement: Settlement,
    penalty_reserve: Fixed64x64,
    event: CurveEvent,
}

#[derive(Debug, Clone)]
pub(crate) struct LiquidityPlan {
    quote: LiquidityQuote,
    settlement: Settlement,
}

/// Diagnostic snapshot returned by [`Curve::view_curve`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurveSnapshot {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub owner: Address,
    pub stage: CurveStage,
    pub tokens: [Address; ASSET_COUNT],
    pub weights: [Fixed18; ASSET_COUNT],
    pub raw_balances: [u128; ASSET_COUNT],
    pub numeraire_balances: [Fixed18; ASSET_COUNT],
    pub total_liquidity: Fixed18,
    pub params: Option<CurveParams>,
    pub total_supply: Fixed18,
    pub penalty_reserve: Fixed18,
    pub whitelisting_deadline: Option<u64>,
    pub frozen: bool,
    pub emergency: bool,
}

#[derive(Debug)]
pub struct Curve {
    address: Address,
    name: String,
    symbol: String,
    owner: Address,
    assets: [CurveAsset; ASSET_COUNT],
    weights: [Fixed64x64; ASSET_COUNT],
    params: Option<(CurveParams, DerivedParams)>,
    total_supply: Fixed18,
    shares: HashMap<Address, Fixed18>,
    allowances: HashMap<(Address, Address), Fixed18>,
    whitelisting_stage: bool,
    whitelisting_deadline: Option<u64>,
    allowlist: Arc<dyn AllowlistVerifier>,
    whitelist_spent: SpentTracker,
    penalty_reserve: Fixed64x64,
    frozen: bool,
    emergency: bool,
    events: Vec<CurveEvent>,
}

pub(crate) fn check_deadline(now: u64, deadline: u64) -> CurveResult<()> {
    if now > deadline {
        return Err(CurveError::Expired { deadline, now });
    }
    Ok(())
}

impl Curve {
    /// Bind two assets at fixed target weights
    ///
    /// Weights must be positive and sum to exactly one, and the two tokens
    /// must differ. Whitelisting starts enabled with a deny-all allowlist.
    pub fn new(
        address: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        owner: Address,
        base: CurveAsset,
        quote: CurveAsset,
    ) -> CurveResult<Self> {
        if base.weight.is_zero() || quote.weight.is_zero() {
            return Err(CurveError::InvalidWeights(
                "weights must be positive".to_string(),
            ));
        }
        let sum = base.weight.checked_add(quote.weight)?;
        if sum != Fixed18::ONE {
            return Err(CurveError::InvalidWeights(format!(
                "{} + {} = {}, expected 1",
                base.weight, quote.weight, sum
            )));
        }
        if base.token() == quote.token() {
            return Err(CurveError::InvalidWeights(format!(
                "base and quote are both {}",
                base.token()
            )));
        }

        let weights = [
            Fixed64x64::from_fixed18(base.weight)?,
            Fixed64x64::from_fixed18(quote.weight)?,
        ];

        Ok(Self {
            address,
            name: name.into(),
            symbol: symbol.into(),
            owner,
            assets: [base, quote],
            weights,
            params: None,
            total_supply: Fixed18::ZERO,
            shares: HashMap::new(),
            allowances: HashMap::new(),
            whitelisting_stage: true,
            whitelisting_deadline: None,
            allowlist: Arc::new(DenyAll),
            whitelist_spent: SpentTracker::new(),
            penalty_reserve: Fixed64x64::ZERO,
            frozen: false,
            emergency: false,
            events: Vec::new(),
        })
    }

    // ACCESSORS

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn tokens(&self) -> [Address; ASSET_COUNT] {
        [self.assets[BASE].token(), self.assets[QUOTE].token()]
    }

    pub fn assets(&self) -> &[CurveAsset; ASSET_COUNT] {
        &self.assets
    }

    pub fn params(&self) -> Option<CurveParams> {
        self.params.map(|(params, _)| params)
    }

    pub fn derived_params(&self) -> Option<DerivedParams> {
        self.params.map(|(_, derived)| derived)
    }

    pub fn weights(&self) -> [Fixed64x64; ASSET_COUNT] {
        self.weights
    }

    pub fn total_supply(&self) -> Fixed18 {
        self.total_supply
    }

    pub fn penalty_reserve(&self) -> Fixed64x64 {
        self.penalty_reserve
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_emergency(&self) -> bool {
        self.emergency
    }

    pub fn whitelisting_deadline(&self) -> Option<u64> {
        self.whitelisting_deadline
    }

    pub fn whitelist_spent(&self, account: Address) -> Fixed18 {
        self.whitelist_spent.spent(account)
    }

    pub fn events(&self) -> &[CurveEvent] {
        &self.events
    }

    pub fn stage(&self) -> CurveStage {
        if self.params.is_none() {
            CurveStage::Created
        } else if !self.whitelisting_stage {
            CurveStage::WhitelistingDisabled
        } else if self.total_supply.is_zero() {
            CurveStage::ParamsSet
        } else {
            CurveStage::Active
        }
    }

    /// Whitelisted deposits only, until turned off or the deadline passes
    pub fn whitelisting_active(&self, now: u64) -> bool {
        self.whitelisting_stage && self.whitelisting_deadline.map_or(true, |deadline| now <= deadline)
    }

    pub fn asset_index(&self, token: Address) -> CurveResult<usize> {
        self.assets
            .iter()
            .position(|asset| asset.token() == token)
            .ok_or(CurveError::UnknownAsset(token))
    }

    // GUARDS

    fn only_owner(&self, ctx: &ExecutionContext, action: &'static str) -> CurveResult<()> {
        if ctx.caller != self.owner {
            warn!(
                curve = %self.address,
                caller = %ctx.caller,
                action,
                "Rejected administrative call from non-owner"
            );
            return Err(CurveError::PermissionDenied { caller: ctx.caller });
        }
        Ok(())
    }

    /// Swaps and deposits: not in emergency, not frozen, parameters set
    fn require_open(&self) -> CurveResult<&DerivedParams> {
        if self.emergency {
            return Err(CurveError::Emergency);
        }
        if self.frozen {
            return Err(CurveError::Frozen);
        }
        self.params
            .as_ref()
            .map(|(_, derived)| derived)
            .ok_or(CurveError::ParamsNotSet)
    }

    // VALUATION

    fn raw_balances(&self, ledger: &dyn TokenLedger) -> [u128; ASSET_COUNT] {
        [
            ledger.balance_of(self.assets[BASE].token(), self.address),
            ledger.balance_of(self.assets[QUOTE].token(), self.address),
        ]
    }

    /// Oracle-valued liquidity of the given raw balances
    fn value_of(&self, raw: [u128; ASSET_COUNT]) -> CurveResult<Liquidity> {
        let mut balances = [Fixed64x64::ZERO; ASSET_COUNT];
        for ((balance, asset), amount) in balances.iter_mut().zip(&self.assets).zip(raw) {
            *balance = asset.assimilator.view_numeraire_amount(amount)?;
        }
        Liquidity::from_balances(balances)
    }

    /// Oracle-valued liquidity currently held by the curve
    pub fn numeraire_liquidity(&self, ledger: &dyn TokenLedger) -> CurveResult<Liquidity> {
        self.value_of(self.raw_balances(ledger))
    }

    /// `(total value, per-asset value)` in 18-decimal USD
    pub fn liquidity(
        &self,
        ledger: &dyn TokenLedger,
    ) -> CurveResult<(Fixed18, [Fixed18; ASSET_COUNT])> {
        let liquidity = self.numeraire_liquidity(ledger)?;
        Ok((
            liquidity.gross.to_fixed18()?,
            [
                liquidity.balances[BASE].to_fixed18()?,
                liquidity.balances[QUOTE].to_fixed18()?,
            ],
        ))
    }

    pub fn view_curve(&self, ledger: &dyn TokenLedger) -> CurveResult<CurveSnapshot> {
        let raw_balances = self.raw_balances(ledger);
        let (total_liquidity, numeraire_balances) = self.liquidity(ledger)?;
        Ok(CurveSnapshot {
            address: self.address,
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            owner: self.owner,
            stage: self.stage(),
            tokens: self.tokens(),
            weights: [self.assets[BASE].weight, self.assets[QUOTE].weight],
            raw_balances,
            numeraire_balances,
            total_liquidity,
            params: self.params(),
            total_supply: self.total_supply,
            penalty_reserve: self.penalty_reserve.max(Fixed64x64::ZERO).to_fixed18()?,
            whitelisting_deadline: self.whitelisting_deadline,
            frozen: self.frozen,
            emergency: self.emergency,
        })
    }

    // SWAPS

    pub(crate) fn plan_origin_swap(
        &self,
        ledger: &dyn TokenLedger,
        payer: Address,
        recipient: Address,
        origin: Address,
        target: Address,
        origin_amount: u128,
    ) -> CurveResult<SwapPlan> {
        let params = self.require_open()?;
        let (oi, ti) = (self.asset_index(origin)?, self.asset_index(target)?);
        if origin_amount == 0 {
            return Err(CurveError::ZeroAmount);
        }
        let (origin_assim, target_assim) = (&self.assets[oi].assimilator, &self.assets[ti].assimilator);
        let mut settlement = Settlement::new();

        if oi == ti {
            let value = origin_assim.intake_raw(&mut settlement, payer, self.address, origin_amount)?;
            let target_amount =
                target_assim.output_numeraire(&mut settlement, self.address, recipient, value)?;
            return self.swap_plan(
                payer,
                origin,
                target,
                origin_amount,
                target_amount,
                settlement,
                None,
            );
        }

        let old = self.numeraire_liquidity(ledger)?;
        if !old.gross.is_positive() {
            return Err(CurveError::NoLiquidity);
        }
        let input = origin_assim.intake_raw(&mut settlement, payer, self.address, origin_amount)?;

        let mut guess = old;
        guess.balances[oi] = guess.balances[oi].checked_add(input)?;
        guess.balances[ti] = guess.balances[ti].checked_sub(input)?;

        let outcome = CurveMath::calculate_trade(
            params,
            &self.weights,
            &old,
            guess,
            input,
            ti,
            self.penalty_reserve,
        )?;

        let output = outcome
            .amount
            .checked_neg()?
            .checked_mul(Fixed64x64::ONE.checked_sub(params.epsilon)?)?;
        let target_amount =
            target_assim.output_numeraire(&mut settlement, self.address, recipient, output)?;

        debug!(
            curve = %self.address,
            input = %input,
            output = %output,
            penalty = %outcome.penalty,
            bonus = %outcome.bonus,
            "Priced origin swap"
        );

        self.swap_plan(
            payer,
            origin,
            target,
            origin_amount,
            target_amount,
            settlement,
            Some((outcome.penalty, outcome.bonus)),
        )
    }

    pub(crate) fn plan_target_swap(
        &self,
        ledger: &dyn TokenLedger,
        payer: Address,
        recipient: Address,
        origin: Address,
        target: Address,
        target_amount: u128,
    ) -> CurveResult<SwapPlan> {
        let params = self.require_open()?;
        let (oi, ti) = (self.asset_index(origin)?, self.asset_index(target)?);
        if target_amount == 0 {
            return Err(CurveError::ZeroAmount);
        }
        let (origin_assim, target_assim) = (&self.assets[oi].assimilator, &self.assets[ti].assimilator);
        let mut intake = Settlement::new();
        let mut output = Settlement::new();

        if oi == ti {
            let value = target_assim.output_raw(&mut output, self.address, recipient, target_amount)?;
            let origin_amount =
                origin_assim.intake_numeraire(&mut intake, payer, self.address, value)?;
            intake.extend(output);
            return self.swap_plan(
                payer,
                origin,
                target,
                origin_amount,
                target_amount,
                intake,
                None,
            );
        }

        let old = self.numeraire_liquidity(ledger)?;
        if !old.gross.is_positive() {
            return Err(CurveError::NoLiquidity);
        }
        let wanted = target_assim.output_raw(&mut output, self.address, recipient, target_amount)?;

        let mut guess = old;
        guess.balances[ti] = guess.balances[ti].checked_sub(wanted)?;
        guess.balances[oi] = guess.balances[oi].checked_add(wanted)?;

        let outcome = CurveMath::calculate_trade(
            params,
            &self.weights,
            &old,
            guess,
            wanted.checked_neg()?,
            oi,
            self.penalty_reserve,
        )?;

        let required = outcome
            .amount
            .checked_mul(Fixed64x64::ONE.checked_add(params.epsilon)?)?;
        let origin_amount =
            origin_assim.intake_numeraire(&mut intake, payer, self.address, required)?;
        intake.extend(output);

        debug!(
            curve = %self.address,
            wanted = %wanted,
            required = %required,
            penalty = %outcome.penalty,
            bonus = %outcome.bonus,
            "Priced target swap"
        );

        self.swap_plan(
            payer,
            origin,
            target,
            origin_amount,
            target_amount,
            intake,
            Some((outcome.penalty, outcome.bonus)),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn swap_plan(
        &self,
        trader: Address,
        origin: Address,
        target: Address,
        origin_amount: u128,
        target_amount: u128,
        settlement: Settlement,
        penalty_and_bonus: Option<(Fixed64x64, Fixed64x64)>,
    ) -> CurveResult<SwapPlan> {
        let (penalty, bonus) = penalty_and_bonus.unwrap_or((Fixed64x64::ZERO, Fixed64x64::ZERO));
        // bonus never exceeds the reserve, and penalties only add to it
        let penalty_reserve = self
            .penalty_reserve
            .checked_add(penalty)?
            .checked_sub(bonus)?
            .max(Fixed64x64::ZERO);

        Ok(SwapPlan {
            quote: SwapQuote {
                origin_amount,
                target_amount,
                penalty,
                bonus,
            },
            settlement,
            penalty_reserve,
            event: CurveEvent::Trade {
                trader,
                origin,
                target,
                origin_amount,
                target_amount,
            },
        })
    }

    pub(crate) fn commit_swap(&mut self, plan: SwapPlan) {
        self.penalty_reserve = plan.penalty_reserve;
        if let CurveEvent::Trade {
            trader,
            origin_amount,
            target_amount,
            ..
        } = &plan.event
        {
            info!(
                curve = %self.address,
                trader = %trader,
                origin_amount,
                target_amount,
                penalty_reserve = %self.penalty_reserve,
                "Swap executed"
            );
        }
        self.events.push(plan.event);
    }

    /// Simulate swapping exactly `origin_amount` of `origin` for `target`
    pub fn view_origin_swap(
        &self,
        ledger: &dyn TokenLedger,
        origin: Address,
        target: Address,
        origin_amount: u128,
    ) -> CurveResult<u128> {
        self.plan_origin_swap(ledger, Address::ZERO, Address::ZERO, origin, target, origin_amount)
            .map(|plan| plan.quote.target_amount)
    }

    /// Swap exactly `origin_amount` of `origin` for at least `min_target_amount`
    #[allow(clippy::too_many_arguments)]
    pub fn origin_swap(
        &mut self,
        ctx: &ExecutionContext,
        ledger: &mut dyn TokenLedger,
        origin: Address,
        target: Address,
        origin_amount: u128,
        min_target_amount: u128,
        deadline: u64,
    ) -> CurveResult<u128> {
        check_deadline(ctx.now, deadline)?;
        let plan = self.plan_origin_swap(
            ledger,
            ctx.caller,
            ctx.caller,
            origin,
            target,
            origin_amount,
        )?;
        let target_amount = plan.quote.target_amount;
        if target_amount < min_target_amount {
            return Err(CurveError::SlippageExceeded {
                limit: min_target_amount,
                actual: target_amount,
            });
        }
        ledger.settle(&plan.settlement)?;
        self.commit_swap(plan);
        Ok(target_amount)
    }

    /// Simulate the input needed to receive exactly `target_amount`
    pub fn view_target_swap(
        &self,
        ledger: &dyn TokenLedger,
        origin: Address,
        target: Address,
        target_amount: u128,
    ) -> CurveResult<u128> {
        self.plan_target_swap(ledger, Address::ZERO, Address::ZERO, origin, target, target_amount)
            .map(|plan| plan.quote.origin_amount)
    }

    /// Receive exactly `target_amount`, paying at most `max_origin_amount`
    #[allow(clippy::too_many_arguments)]
    pub fn target_swap(
        &mut self,
        ctx: &ExecutionContext,
        ledger: &mut dyn TokenLedger,
        origin: Address,
        target: Address,
        max_origin_amount: u128,
        target_amount: u128,
        deadline: u64,
    ) -> CurveResult<u128> {
        check_deadline(ctx.now, deadline)?;
        let plan = self.plan_target_swap(
            ledger,
            ctx.caller,
            ctx.caller,
            origin,
            target,
            target_amount,
        )?;
        let origin_amount = plan.quote.origin_amount;
        if origin_amount > max_origin_amount {
            return Err(CurveError::SlippageExceeded {
                limit: max_origin_amount,
                actual: origin_amount,
            });
        }
        ledger.settle(&plan.settlement)?;
        self.commit_swap(plan);
        Ok(origin_amount)
    }

    // LIQUIDITY

    fn check_liquidity_invariant(
        &self,
        params: &DerivedParams,
        old_raw: [u128; ASSET_COUNT],
        new_raw: [u128; ASSET_COUNT],
        new_shares: Fixed64x64,
    ) -> CurveResult<()> {
        let old = self.value_of(old_raw)?;
        let new = self.value_of(new_raw)?;
        let omega = CurveMath::calculate_fee(&old, &self.weights, params.beta, params.delta)?;
        let psi = CurveMath::calculate_fee(&new, &self.weights, params.beta, params.delta)?;
        CurveMath::enforce_liquidity_invariant(
            Fixed64x64::from_fixed18(self.total_supply)?,
            new_shares,
            old.gross,
            new.gross,
            omega,
            psi,
        )
    }

    pub(crate) fn plan_deposit(
        &self,
        ledger: &dyn TokenLedger,
        provider: Address,
        deposit: Fixed18,
    ) -> CurveResult<LiquidityPlan> {
        let params = self.require_open()?;
        if deposit.is_zero() {
            return Err(CurveError::ZeroAmount);
        }
        let value = Fixed64x64::from_fixed18(deposit)?;
        let mut settlement = Settlement::new();
        let mut amounts = [0u128; ASSET_COUNT];

        let shares = if self.total_supply.is_zero() {
            for (index, asset) in self.assets.iter().enumerate() {
                let portion = value.checked_mul(self.weights[index])?;
                amounts[index] = asset.assimilator.intake_numeraire(
                    &mut settlement,
                    provider,
                    self.address,
                    portion,
                )?;
            }
            deposit
        } else {
            // value the pool at its reserve ratio, anchored on the quote side
            let quote_balance = self.assets[QUOTE]
                .assimilator
                .view_numeraire_balance(ledger, self.address)?;
            let mut lp_balances = [Fixed64x64::ZERO; ASSET_COUNT];
            for (index, asset) in self.assets.iter().enumerate() {
                lp_balances[index] = asset.assimilator.view_numeraire_balance_lp_ratio(
                    ledger,
                    self.address,
                    quote_balance,
                    self.weights[index],
                    self.weights[QUOTE],
                )?;
            }
            let lp = Liquidity::from_balances(lp_balances)?;
            if !lp.gross.is_positive() {
                return Err(CurveError::NoLiquidity);
            }

            let multiplier = value.checked_div(lp.gross)?;
            for (index, asset) in self.assets.iter().enumerate() {
                if lp_balances[index].is_zero() {
                    continue;
                }
                amounts[index] = asset.assimilator.intake_numeraire_lp_ratio(
                    &mut settlement,
                    ledger,
                    provider,
                    self.address,
                    lp_balances[index].checked_mul(multiplier)?,
                    lp_balances[index],
                )?;
            }
            Fixed18::from_raw(multiplier.mul_u128(self.total_supply.raw_value())?)
        };

        if shares.is_zero() {
            return Err(CurveError::ZeroAmount);
        }

        let old_raw = self.raw_balances(ledger);
        let new_raw = [
            old_raw[BASE]
                .checked_add(amounts[BASE])
                .ok_or(CurveError::Arithmetic(types::FixedPointError::Overflow {
                    operation: "deposit",
                }))?,
            old_raw[QUOTE]
                .checked_add(amounts[QUOTE])
                .ok_or(CurveError::Arithmetic(types::FixedPointError::Overflow {
                    operation: "deposit",
                }))?,
        ];
        self.check_liquidity_invariant(params, old_raw, new_raw, Fixed64x64::from_fixed18(shares)?)?;

        Ok(LiquidityPlan {
            quote: LiquidityQuote { shares, amounts },
            settlement,
        })
    }

    /// Raw amounts paid out for burning `shares`, truncated
    fn proportional_amounts(
        &self,
        ledger: &dyn TokenLedger,
        shares: Fixed18,
    ) -> CurveResult<[u128; ASSET_COUNT]> {
        if self.total_supply.is_zero() {
            return Err(CurveError::NoLiquidity);
        }
        let raw = self.raw_balances(ledger);
        let mut amounts = [0u128; ASSET_COUNT];
        for (amount, balance) in amounts.iter_mut().zip(raw) {
            let wide = U256::from(balance) * U256::from(shares.raw_value())
                / U256::from(self.total_supply.raw_value());
            *amount = wide.low_u128();
        }
        Ok(amounts)
    }

    fn check_burn(&self, provider: Address, shares: Fixed18) -> CurveResult<()> {
        if shares.is_zero() {
            return Err(CurveError::ZeroAmount);
        }
        let available = self.balance_of(provider);
        if shares > available {
            return Err(CurveError::InsufficientShares {
                account: provider,
                requested: shares,
                available,
            });
        }
        Ok(())
    }

    pub(crate) fn plan_withdraw(
        &self,
        ledger: &dyn TokenLedger,
        provider: Address,
        shares: Fixed18,
    ) -> CurveResult<LiquidityPlan> {
        if self.emergency {
            return Err(CurveError::Emergency);
        }
        let params = self
            .params
            .as_ref()
            .map(|(_, derived)| derived)
            .ok_or(CurveError::ParamsNotSet)?;
        self.check_burn(provider, shares)?;

        let amounts = self.proportional_amounts(ledger, shares)?;
        let old_raw = self.raw_balances(ledger);
        let new_raw = [
            old_raw[BASE] - amounts[BASE],
            old_raw[QUOTE] - amounts[QUOTE],
        ];
        self.check_liquidity_invariant(
            params,
            old_raw,
            new_raw,
            Fixed64x64::from_fixed18(shares)?.checked_neg()?,
        )?;

        let mut settlement = Settlement::new();
        for (asset, amount) in self.assets.iter().zip(amounts) {
            asset
                .assimilator
                .output_raw(&mut settlement, self.address, provider, amount)?;
        }
        Ok(LiquidityPlan {
            quote: LiquidityQuote { shares, amounts },
            settlement,
        })
    }

    fn mint(&mut self, to: Address, shares: Fixed18) -> CurveResult<()> {
        let total_supply = self.total_supply.checked_add(shares)?;
        let balance = self.balance_of(to).checked_add(shares)?;
        self.total_supply = total_supply;
        self.shares.insert(to, balance);
        self.events.push(CurveEvent::Transfer {
            from: Address::ZERO,
            to,
            value: shares,
        });
        Ok(())
    }

    fn burn(&mut self, from: Address, shares: Fixed18) -> CurveResult<()> {
        let balance = self.balance_of(from).checked_sub(shares)?;
        let total_supply = self.total_supply.checked_sub(shares)?;
        self.total_supply = total_supply;
        self.shares.insert(from, balance);
        self.events.push(CurveEvent::Transfer {
            from,
            to: Address::ZERO,
            value: shares,
        });
        Ok(())
    }

    /// Shares minted and raw amounts pulled for a deposit worth `deposit`
    pub fn view_deposit(
        &self,
        ledger: &dyn TokenLedger,
        deposit: Fixed18,
    ) -> CurveResult<LiquidityQuote> {
        self.plan_deposit(ledger, Address::ZERO, deposit)
            .map(|plan| plan.quote)
    }

    fn execute_deposit(
        &mut self,
        ctx: &ExecutionContext,
        ledger: &mut dyn TokenLedger,
        deposit: Fixed18,
    ) -> CurveResult<LiquidityQuote> {
        let plan = self.plan_deposit(ledger, ctx.caller, deposit)?;
        ledger.settle(&plan.settlement)?;
        self.mint(ctx.caller, plan.quote.shares)?;
        self.events.push(CurveEvent::ProportionalDeposit {
            provider: ctx.caller,
            shares: plan.quote.shares,
            amounts: plan.quote.amounts,
        });
        info!(
            curve = %self.address,
            provider = %ctx.caller,
            shares = %plan.quote.shares,
            base_amount = plan.quote.amounts[BASE],
            quote_amount = plan.quote.amounts[QUOTE],
            total_supply = %self.total_supply,
            "Proportional deposit"
        );
        Ok(plan.quote)
    }

    /// Deposit `deposit` worth of both assets at the pool's current ratio
    ///
    /// Rejected with `NotWhitelisted` while whitelisting is in force.
    pub fn deposit(
        &mut self,
        ctx: &ExecutionContext,
        ledger: &mut dyn TokenLedger,
        deposit: Fixed18,
        deadline: u64,
    ) -> CurveResult<LiquidityQuote> {
        check_deadline(ctx.now, deadline)?;
        if self.whitelisting_active(ctx.now) {
            return Err(CurveError::NotWhitelisted {
                account: ctx.caller,
            });
        }
        self.execute_deposit(ctx, ledger, deposit)
    }

    /// Deposit under an allowlist claim, bounded by its cumulative cap
    pub fn deposit_with_whitelist(
        &mut self,
        ctx: &ExecutionContext,
        ledger: &mut dyn TokenLedger,
        claim: &AllowlistClaim,
        deposit: Fixed18,
        deadline: u64,
    ) -> CurveResult<LiquidityQuote> {
        check_deadline(ctx.now, deadline)?;
        if !self.whitelisting_active(ctx.now) {
            return Err(CurveError::WhitelistPeriodEnded);
        }
        if claim.account != ctx.caller || !self.allowlist.verify(claim) {
            return Err(CurveError::NotWhitelisted {
                account: ctx.caller,
            });
        }
        let spent = self
            .whitelist_spent
            .check(ctx.caller, deposit, claim.cap_amount)?;

        let quote = self.execute_deposit(ctx, ledger, deposit)?;
        self.whitelist_spent.record(ctx.caller, spent);
        Ok(quote)
    }

    /// Raw amounts returned for burning `shares`
    pub fn view_withdraw(
        &self,
        ledger: &dyn TokenLedger,
        shares: Fixed18,
    ) -> CurveResult<[u128; ASSET_COUNT]> {
        if shares > self.total_supply {
            return Err(CurveError::InsufficientShares {
                account: Address::ZERO,
                requested: shares,
                available: self.total_supply,
            });
        }
        self.proportional_amounts(ledger, shares)
    }

    /// Burn `shares` for both assets at the current reserve ratio
    pub fn withdraw(
        &mut self,
        ctx: &ExecutionContext,
        ledger: &mut dyn TokenLedger,
        shares: Fixed18,
        deadline: u64,
    ) -> CurveResult<[u128; ASSET_COUNT]> {
        check_deadline(ctx.now, deadline)?;
        let plan = self.plan_withdraw(ledger, ctx.caller, shares)?;
        ledger.settle(&plan.settlement)?;
        self.burn(ctx.caller, shares)?;
        self.events.push(CurveEvent::ProportionalWithdraw {
            provider: ctx.caller,
            shares,
            amounts: plan.quote.amounts,
        });
        info!(
            curve = %self.address,
            provider = %ctx.caller,
            shares = %shares,
            base_amount = plan.quote.amounts[BASE],
            quote_amount = plan.quote.amounts[QUOTE],
            total_supply = %self.total_supply,
            "Proportional withdraw"
        );
        Ok(plan.quote.amounts)
    }

    /// Burn `shares` for a raw proportional payout while in emergency mode
    pub fn emergency_withdraw(
        &mut self,
        ctx: &ExecutionContext,
        ledger: &mut dyn TokenLedger,
        shares: Fixed18,
        deadline: u64,
    ) -> CurveResult<[u128; ASSET_COUNT]> {
        check_deadline(ctx.now, deadline)?;
        if !self.emergency {
            return Err(CurveError::NotEmergency);
        }
        self.check_burn(ctx.caller, shares)?;

        let amounts = self.proportional_amounts(ledger, shares)?;
        let mut settlement = Settlement::new();
        for (asset, amount) in self.assets.iter().zip(amounts) {
            asset
                .assimilator
                .output_raw(&mut settlement, self.address, ctx.caller, amount)?;
        }
        ledger.settle(&settlement)?;
        self.burn(ctx.caller, shares)?;
        self.events.push(CurveEvent::EmergencyWithdraw {
            provider: ctx.caller,
            shares,
            amounts,
        });
        warn!(
            curve = %self.address,
            provider = %ctx.caller,
            shares = %shares,
            "Emergency withdraw"
        );
        Ok(amounts)
    }

    // ADMINISTRATION

    /// Set or replace curve parameters
    ///
    /// Replacing parameters on a funded curve may not raise its current fee.
    pub fn set_params(
        &mut self,
        ctx: &ExecutionContext,
        ledger: &dyn TokenLedger,
        params: CurveParams,
    ) -> CurveResult<()> {
        self.only_owner(ctx, "set_params")?;
        let derived = params.derive()?;

        if let Some((_, current)) = &self.params {
            let liquidity = self.numeraire_liquidity(ledger)?;
            if liquidity.gross.is_positive() {
                let omega =
                    CurveMath::calculate_fee(&liquidity, &self.weights, current.beta, current.delta)?;
                let psi =
                    CurveMath::calculate_fee(&liquidity, &self.weights, derived.beta, derived.delta)?;
                if psi > omega {
                    return Err(CurveError::ParamsIncreaseFee);
                }
            }
        }

        self.params = Some((params, derived));
        self.events.push(CurveEvent::ParametersSet { params });
        info!(
            curve = %self.address,
            alpha = %params.alpha,
            beta = %params.beta,
            max = %params.max,
            epsilon = %params.epsilon,
            lambda = %params.lambda,
            "Curve parameters set"
        );
        Ok(())
    }

    /// One-way transition out of the whitelisted launch
    pub fn turn_off_whitelisting(&mut self, ctx: &ExecutionContext) -> CurveResult<()> {
        self.only_owner(ctx, "turn_off_whitelisting")?;
        self.whitelisting_stage = false;
        self.events.push(CurveEvent::WhitelistingStopped);
        info!(curve = %self.address, "Whitelisting turned off");
        Ok(())
    }

    pub fn set_whitelisting_deadline(
        &mut self,
        ctx: &ExecutionContext,
        deadline: u64,
    ) -> CurveResult<()> {
        self.only_owner(ctx, "set_whitelisting_deadline")?;
        self.whitelisting_deadline = Some(deadline);
        self.events
            .push(CurveEvent::WhitelistingDeadlineSet { deadline });
        info!(curve = %self.address, deadline, "Whitelisting deadline set");
        Ok(())
    }

    pub fn set_allowlist(
        &mut self,
        ctx: &ExecutionContext,
        allowlist: Arc<dyn AllowlistVerifier>,
    ) -> CurveResult<()> {
        self.only_owner(ctx, "set_allowlist")?;
        self.allowlist = allowlist;
        self.events.push(CurveEvent::AllowlistReplaced);
        Ok(())
    }

    pub fn set_frozen(&mut self, ctx: &ExecutionContext, frozen: bool) -> CurveResult<()> {
        self.only_owner(ctx, "set_frozen")?;
        self.frozen = frozen;
        self.events.push(CurveEvent::FrozenSet { frozen });
        info!(curve = %self.address, frozen, "Frozen flag set");
        Ok(())
    }

    pub fn set_emergency(&mut self, ctx: &ExecutionContext, emergency: bool) -> CurveResult<()> {
        self.only_owner(ctx, "set_emergency")?;
        self.emergency = emergency;
        self.events.push(CurveEvent::EmergencyAlarm { emergency });
        warn!(curve = %self.address, emergency, "Emergency flag set");
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        ctx: &ExecutionContext,
        new_owner: Address,
    ) -> CurveResult<()> {
        self.only_owner(ctx, "transfer_ownership")?;
        let previous = std::mem::replace(&mut self.owner, new_owner);
        self.events.push(CurveEvent::OwnershipTransferred {
            previous,
            new_owner,
        });
        info!(curve = %self.address, previous = %previous, new_owner = %new_owner, "Ownership transferred");
        Ok(())
    }

    // LP SHARES

    pub fn balance_of(&self, account: Address) -> Fixed18 {
        self.shares.get(&account).copied().unwrap_or(Fixed18::ZERO)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> Fixed18 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or(Fixed18::ZERO)
    }

    fn move_shares(&mut self, from: Address, to: Address, value: Fixed18) -> CurveResult<()> {
        let available = self.balance_of(from);
        if value > available {
            return Err(CurveError::InsufficientShares {
                account: from,
                requested: value,
                available,
            });
        }
        let credited = self.balance_of(to).checked_add(value)?;
        self.shares.insert(from, available.checked_sub(value)?);
        self.shares.insert(to, credited);
        self.events.push(CurveEvent::Transfer { from, to, value });
        Ok(())
    }

    pub fn transfer(
        &mut self,
        ctx: &ExecutionContext,
        to: Address,
        value: Fixed18,
    ) -> CurveResult<()> {
        self.move_shares(ctx.caller, to, value)
    }

    pub fn approve(
        &mut self,
        ctx: &ExecutionContext,
        spender: Address,
        value: Fixed18,
    ) -> CurveResult<()> {
        self.allowances.insert((ctx.caller, spender), value);
        self.events.push(CurveEvent::Approval {
            owner: ctx.caller,
            spender,
            value,
        });
        Ok(())
    }

    /// Move `value` shares of `from`, spending the caller's allowance
    pub fn transfer_from(
        &mut self,
        ctx: &ExecutionContext,
        from: Address,
        to: Address,
        value: Fixed18,
    ) -> CurveResult<()> {
        let approved = self.allowance(from, ctx.caller);
        if value > approved {
            return Err(CurveError::InsufficientShareAllowance {
                owner: from,
                spender: ctx.caller,
                requested: value,
                approved,
            });
        }
        self.move_shares(from, to, value)?;
        if approved != Fixed18::MAX {
            self.allowances
                .insert((from, ctx.caller), approved.checked_sub(value)?);
        }
        Ok(())
    }
}
