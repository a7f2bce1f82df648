// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Platform commission split.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::ledger::models::Platform;

/// Default commission taken by every ride-hailing platform (10%).
pub const DEFAULT_COMMISSION_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Per-platform commission rates, as fractions of the payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionRates {
    pub yango: Decimal,
    pub bolt: Decimal,
}

impl Default for CommissionRates {
    fn default() -> Self {
        Self {
            yango: DEFAULT_COMMISSION_RATE,
            bolt: DEFAULT_COMMISSION_RATE,
        }
    }
}

/// Result of splitting a payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    pub rider_profit: Decimal,
    pub platform_debt: Decimal,
}

impl CommissionRates {
    pub fn rate_for(&self, platform: Platform) -> Decimal {
        match platform {
            Platform::Yango => self.yango,
            Platform::Bolt => self.bolt,
            Platform::Private => Decimal::ZERO,
        }
    }

    /// Split `amount` into rider profit and platform debt.
    ///
    /// Both sides are rounded to the cent independently; when rounding makes
    /// them disagree with `amount`, the smaller side absorbs the difference,
    /// so `rider_profit + platform_debt == amount` always holds.
    pub fn split(&self, amount: Decimal, platform: Platform) -> Split {
        if platform.is_private() {
            return Split {
                rider_profit: amount,
                platform_debt: Decimal::ZERO,
            };
        }

        let rate = self.rate_for(platform);
        let mut platform_debt = round_cents(amount * rate);
        let mut rider_profit = round_cents(amount * (Decimal::ONE - rate));

        let diff = amount - (platform_debt + rider_profit);
        if !diff.is_zero() {
            if platform_debt <= rider_profit {
                platform_debt += diff;
            } else {
                rider_profit += diff;
            }
        }

        Split {
            rider_profit,
            platform_debt,
        }
    }
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
