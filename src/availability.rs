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

//! Course availability state machine.
//!
//! ```text
//!  Available ──add reaching capacity──► Closed
//!      ▲                                  │
//!      └──remove below capacity / clear───┘
//! ```
//!
//! The next state is re-derived from the membership count after every change
//! to a course's enrolled set; nothing is tracked incrementally.

use serde::{Deserialize, Serialize};

/// Whether a course currently accepts purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Availability {
    /// Below capacity; purchases are accepted.
    #[default]
    Available,
    /// At or past capacity; purchases are rejected until a seat frees up.
    Closed,
}

impl Availability {
    /// Returns `true` if the course accepts new purchases.
    pub fn is_available(self) -> bool {
        self == Self::Available
    }
}

/// A change to a course's enrolled-student set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    /// A single student joined through a purchase.
    Added,
    /// A single student was removed by staff.
    Removed,
    /// Every student was removed at once.
    Cleared,
}

/// Computes the availability that follows `change`, given the enrolled count
/// after the change was applied.
pub fn transition(
    current: Availability,
    change: MembershipChange,
    enrolled: usize,
    capacity: usize,
) -> Availability {
    match change {
        MembershipChange::Added if enrolled >= capacity => Availability::Closed,
        MembershipChange::Removed if enrolled < capacity => Availability::Available,
        MembershipChange::Cleared => Availability::Available,
        _ => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Availability::*;
    use MembershipChange::*;

    #[test]
    fn new_courses_start_available() {
        assert_eq!(Availability::default(), Available);
        assert!(Availability::default().is_available());
    }

    #[test]
    fn addition_below_capacity_keeps_course_open() {
        assert_eq!(transition(Available, Added, 1, 300), Available);
        assert_eq!(transition(Available, Added, 299, 300), Available);
    }

    #[test]
    fn addition_reaching_capacity_closes() {
        assert_eq!(transition(Available, Added, 300, 300), Closed);
    }

    #[test]
    fn removal_below_capacity_reopens() {
        assert_eq!(transition(Closed, Removed, 299, 300), Available);
        assert_eq!(transition(Available, Removed, 0, 300), Available);
    }

    #[test]
    fn removal_still_at_capacity_stays_closed() {
        assert_eq!(transition(Closed, Removed, 300, 300), Closed);
    }

    #[test]
    fn clear_always_reopens() {
        assert_eq!(transition(Closed, Cleared, 0, 300), Available);
        assert_eq!(transition(Available, Cleared, 0, 300), Available);
    }
}
