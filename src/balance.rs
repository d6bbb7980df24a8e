// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Bonus-point balance ledger.
//!
//! Every user owns exactly one [`Balance`], opened with the configured starting
//! bonuses when the user registers. Debits are relative, guarded updates: the
//! decrement only lands if the balance still covers it at the moment of the
//! swap, so concurrent debits can neither lose an update nor drive the balance
//! below zero.

use crate::MarketError;
use std::sync::atomic::{AtomicU32, Ordering};

/// Bonus-point balance of a single user.
#[derive(Debug)]
pub struct Balance {
    bonuses: AtomicU32,
}

impl Balance {
    pub(crate) fn open(bonuses: u32) -> Self {
        Self {
            bonuses: AtomicU32::new(bonuses),
        }
    }

    /// Current bonus count.
    pub fn bonuses(&self) -> u32 {
        self.bonuses.load(Ordering::Acquire)
    }

    /// Removes `amount` bonuses and returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InsufficientFunds`] if `amount` exceeds the
    /// balance observed at the swap. The balance is left untouched.
    pub fn debit(&self, amount: u32) -> Result<u32, MarketError> {
        self.bonuses
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(amount)
            })
            .map(|previous| previous - amount)
            .map_err(|_| MarketError::InsufficientFunds)
    }

    /// Returns `amount` bonuses to the balance. Only used to undo a debit.
    pub(crate) fn credit(&self, amount: u32) -> Result<u32, MarketError> {
        self.bonuses
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_add(amount)
            })
            .map(|previous| previous + amount)
            .map_err(|_| MarketError::Internal("balance overflow on credit".into()))
    }
}
