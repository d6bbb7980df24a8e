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

//! Group allocation for newly enrolled students.
//!
//! A new student joins the group with the fewest members. Ties go to the
//! lowest group number, so a fresh course fills groups 1, 2, 3, ... in turn
//! and the groups never differ in size by more than one.
//!
//! The per-group capacity is a soft limit. Once every group is at capacity the
//! allocator keeps balancing across the same groups and logs the overflow.

use crate::MarketError;
use crate::base::{GroupNumber, UserId};
use crate::course::Group;

/// Index of the least-occupied group, lowest number first on ties.
pub fn select_group(groups: &[Group]) -> Option<usize> {
    groups
        .iter()
        .enumerate()
        .min_by_key(|(_, group)| (group.len(), group.number()))
        .map(|(index, _)| index)
}

/// Adds `user` to the least-occupied group and returns its number.
///
/// # Errors
///
/// Returns [`MarketError::Internal`] if the course has no groups or `user`
/// already sits in the chosen group; both mean course state is corrupt.
pub(crate) fn assign(
    groups: &mut [Group],
    user: UserId,
    group_capacity: usize,
) -> Result<GroupNumber, MarketError> {
    let index = select_group(groups)
        .ok_or_else(|| MarketError::Internal("course has no groups".into()))?;
    let group = &mut groups[index];

    if !group.insert(user) {
        return Err(MarketError::Internal(format!(
            "user {user} already in group {}",
            group.number()
        )));
    }
    if group.len() > group_capacity {
        tracing::warn!(
            group = %group.number(),
            members = group.len(),
            capacity = group_capacity,
            "group over soft capacity"
        );
    }

    Ok(group.number())
}
