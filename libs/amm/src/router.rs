//! Swap routing across factory curves
//!
//! A pair listed in the factory is swapped directly. Otherwise the router
//! hops through its quote currency: `origin -> quote` on one curve, then
//! `quote -> target` on another. Both hops are planned first and settled as
//! one batch, so a two-hop swap either completes entirely or not at all.
//!
//! Users approve the router (not the curves) for the origin token; the
//! router is the intermediate holder of the quote currency between hops.

use crate::error::{CurveError, CurveResult};
use crate::factory::CurveFactory;
use crate::ledger::{Settlement, TokenLedger};
use crate::pool::{check_deadline, ExecutionContext, SwapPlan};
use tracing::{debug, info};
use types::Address;

/// Curves a swap passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Direct { curve: Address },
    TwoHop { first: Address, second: Address },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Router {
    address: Address,
    quote_currency: Address,
}

/// Both hop plans, in execution order
struct RoutePlan {
    hops: Vec<(Address, SwapPlan)>,
}

impl RoutePlan {
    fn origin_amount(&self) -> u128 {
        self.hops
            .first()
            .map_or(0, |(_, plan)| plan.quote.origin_amount)
    }

    fn target_amount(&self) -> u128 {
        self.hops
            .last()
            .map_or(0, |(_, plan)| plan.quote.target_amount)
    }

    /// One settlement for all hops, with pulls authorised by the router
    fn settlement(&mut self, router: Address) -> Settlement {
        let mut merged = Settlement::new();
        for (_, plan) in &mut self.hops {
            merged.extend(std::mem::take(&mut plan.settlement));
        }
        merged.with_spender(router)
    }
}

impl Router {
    pub fn new(address: Address, quote_currency: Address) -> Self {
        Self {
            address,
            quote_currency,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn quote_currency(&self) -> Address {
        self.quote_currency
    }

    /// Curves used to swap `origin` for `target`
    pub fn route(
        &self,
        factory: &CurveFactory,
        origin: Address,
        target: Address,
    ) -> CurveResult<Route> {
        if let Some(curve) = factory.get_curve(origin, target) {
            return Ok(Route::Direct { curve });
        }
        let no_path = CurveError::NoPath { origin, target };
        if origin == self.quote_currency || target == self.quote_currency {
            return Err(no_path);
        }
        match (
            factory.get_curve(origin, self.quote_currency),
            factory.get_curve(self.quote_currency, target),
        ) {
            (Some(first), Some(second)) => Ok(Route::TwoHop { first, second }),
            _ => Err(no_path),
        }
    }

    fn plan_origin(
        &self,
        factory: &CurveFactory,
        ledger: &dyn TokenLedger,
        trader: Address,
        origin: Address,
        target: Address,
        origin_amount: u128,
    ) -> CurveResult<RoutePlan> {
        let hops = match self.route(factory, origin, target)? {
            Route::Direct { curve } => {
                let plan = factory.curve(curve)?.plan_origin_swap(
                    ledger,
                    trader,
                    trader,
                    origin,
                    target,
                    origin_amount,
                )?;
                vec![(curve, plan)]
            }
            Route::TwoHop { first, second } => {
                let quote = self.quote_currency;
                let hop1 = factory.curve(first)?.plan_origin_swap(
                    ledger,
                    trader,
                    self.address,
                    origin,
                    quote,
                    origin_amount,
                )?;
                let hop2 = factory.curve(second)?.plan_origin_swap(
                    ledger,
                    self.address,
                    trader,
                    quote,
                    target,
                    hop1.quote.target_amount,
                )?;
                vec![(first, hop1), (second, hop2)]
            }
        };
        Ok(RoutePlan { hops })
    }

    fn plan_target(
        &self,
        factory: &CurveFactory,
        ledger: &dyn TokenLedger,
        trader: Address,
        origin: Address,
        target: Address,
        target_amount: u128,
    ) -> CurveResult<RoutePlan> {
        let hops = match self.route(factory, origin, target)? {
            Route::Direct { curve } => {
                let plan = factory.curve(curve)?.plan_target_swap(
                    ledger,
                    trader,
                    trader,
                    origin,
                    target,
                    target_amount,
                )?;
                vec![(curve, plan)]
            }
            Route::TwoHop { first, second } => {
                let quote = self.quote_currency;
                // price the last hop first: it fixes how much quote the first must yield
                let hop2 = factory.curve(second)?.plan_target_swap(
                    ledger,
                    self.address,
                    trader,
                    quote,
                    target,
                    target_amount,
                )?;
                let hop1 = factory.curve(first)?.plan_target_swap(
                    ledger,
                    trader,
                    self.address,
                    origin,
                    quote,
                    hop2.quote.origin_amount,
                )?;
                vec![(first, hop1), (second, hop2)]
            }
        };
        Ok(RoutePlan { hops })
    }

    fn execute(
        &self,
        factory: &mut CurveFactory,
        ledger: &mut dyn TokenLedger,
        mut plan: RoutePlan,
    ) -> CurveResult<()> {
        let settlement = plan.settlement(self.address);
        ledger.settle(&settlement)?;
        for (curve, hop) in plan.hops {
            factory.curve_mut(curve)?.commit_swap(hop);
        }
        Ok(())
    }

    /// Simulate swapping exactly `origin_amount` along the best route
    pub fn view_origin_swap(
        &self,
        factory: &CurveFactory,
        ledger: &dyn TokenLedger,
        origin: Address,
        target: Address,
        origin_amount: u128,
    ) -> CurveResult<u128> {
        self.plan_origin(factory, ledger, Address::ZERO, origin, target, origin_amount)
            .map(|plan| plan.target_amount())
    }

    /// Swap exactly `origin_amount` for at least `min_target_amount`
    #[allow(clippy::too_many_arguments)]
    pub fn origin_swap(
        &self,
        ctx: &ExecutionContext,
        factory: &mut CurveFactory,
        ledger: &mut dyn TokenLedger,
        origin: Address,
        target: Address,
        origin_amount: u128,
        min_target_amount: u128,
        deadline: u64,
    ) -> CurveResult<u128> {
        check_deadline(ctx.now, deadline)?;
        let plan = self.plan_origin(factory, ledger, ctx.caller, origin, target, origin_amount)?;
        let target_amount = plan.target_amount();
        if target_amount < min_target_amount {
            return Err(CurveError::SlippageExceeded {
                limit: min_target_amount,
                actual: target_amount,
            });
        }
        debug!(hops = plan.hops.len(), "Routing origin swap");
        self.execute(factory, ledger, plan)?;
        info!(
            trader = %ctx.caller,
            origin = %origin,
            target = %target,
            origin_amount,
            target_amount,
            "Routed swap"
        );
        Ok(target_amount)
    }

    /// Simulate the origin amount needed to receive exactly `target_amount`
    pub fn view_target_swap(
        &self,
        factory: &CurveFactory,
        ledger: &dyn TokenLedger,
        origin: Address,
        target: Address,
        target_amount: u128,
    ) -> CurveResult<u128> {
        self.plan_target(factory, ledger, Address::ZERO, origin, target, target_amount)
            .map(|plan| plan.origin_amount())
    }

    /// Receive exactly `target_amount`, paying at most `max_origin_amount`
    #[allow(clippy::too_many_arguments)]
    pub fn target_swap(
        &self,
        ctx: &ExecutionContext,
        factory: &mut CurveFactory,
        ledger: &mut dyn TokenLedger,
        origin: Address,
        target: Address,
        max_origin_amount: u128,
        target_amount: u128,
        deadline: u64,
    ) -> CurveResult<u128> {
        check_deadline(ctx.now, deadline)?;
        let plan = self.plan_target(factory, ledger, ctx.caller, origin, target, target_amount)?;
        let origin_amount = plan.origin_amount();
        if origin_amount > max_origin_amount {
            return Err(CurveError::SlippageExceeded {
                limit: max_origin_amount,
                actual: origin_amount,
            });
        }
        self.execute(factory, ledger, plan)?;
        info!(
            trader = %ctx.caller,
            origin = %origin,
            target = %target,
            origin_amount,
            target_amount,
            "Routed swap"
        );
        Ok(origin_amount)
    }
}
