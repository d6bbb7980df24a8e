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

//! Enrollment records.
//!
//! An [`Enrollment`] is the receipt of a successful purchase. The
//! [`EnrollmentLog`] keys them by (user, course) and is the authority on
//! whether a user has bought a course.

use crate::MarketError;
use crate::base::{CourseId, EnrollmentId, UserId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Confirmed purchase linking a student to a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user: UserId,
    pub course: CourseId,
    pub created: DateTime<Utc>,
}

/// Concurrent registry of enrollments with (user, course) uniqueness.
#[derive(Debug)]
pub struct EnrollmentLog {
    enrollments: DashMap<(UserId, CourseId), Arc<Enrollment>>,
    next_id: AtomicU64,
}

impl EnrollmentLog {
    pub fn new() -> Self {
        Self {
            enrollments: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates the enrollment for `(user, course)`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::AlreadyEnrolled`] if the pair is already recorded.
    pub(crate) fn record(
        &self,
        user: UserId,
        course: CourseId,
    ) -> Result<Arc<Enrollment>, MarketError> {
        // Entry API keeps check-and-insert atomic.
        match self.enrollments.entry((user, course)) {
            Entry::Occupied(_) => Err(MarketError::AlreadyEnrolled),
            Entry::Vacant(entry) => {
                let enrollment = Arc::new(Enrollment {
                    id: EnrollmentId(self.next_id.fetch_add(1, Ordering::Relaxed)),
                    user,
                    course,
                    created: Utc::now(),
                });
                entry.insert(Arc::clone(&enrollment));
                Ok(enrollment)
            }
        }
    }

    pub(crate) fn remove(&self, user: UserId, course: CourseId) -> Option<Arc<Enrollment>> {
        self.enrollments
            .remove(&(user, course))
            .map(|(_, enrollment)| enrollment)
    }

    pub fn get(&self, user: UserId, course: CourseId) -> Option<Arc<Enrollment>> {
        self.enrollments
            .get(&(user, course))
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, user: UserId, course: CourseId) -> bool {
        self.enrollments.contains_key(&(user, course))
    }

    /// Enrollments held by `user`, newest first.
    pub fn of_user(&self, user: UserId) -> Vec<Arc<Enrollment>> {
        let mut held: Vec<_> = self
            .enrollments
            .iter()
            .filter(|entry| entry.key().0 == user)
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        held.sort_by(|a, b| b.id.cmp(&a.id));
        held
    }

    pub fn len(&self) -> usize {
        self.enrollments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enrollments.is_empty()
    }
}

impl Default for EnrollmentLog {
    fn default() -> Self {
        Self::new()
    }
}
