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

//! Purchase transactions.
//!
//! A [`PurchaseTransaction`] holds the course lock for its whole lifetime and
//! journals an undo action for every effect it applies:
//!
//! ```text
//!  begin ─► preconditions ─► debit ─► enrollment ─► membership ─► group ─► commit
//!                              │          │             │           │
//!                              └──────────┴─────────────┴───────────┴──► drop: undo in reverse
//! ```
//!
//! Dropping a transaction that was not committed replays the journal in
//! reverse, so a failed purchase leaves the balance, the enrollment log, the
//! enrolled set, the availability flag and the groups exactly as they were.

use crate::MarketError;
use crate::allocator;
use crate::availability::{Availability, MembershipChange};
use crate::base::GroupNumber;
use crate::course::{Course, CourseData};
use crate::enrollment::{Enrollment, EnrollmentLog};
use crate::user::User;
use parking_lot::MutexGuard;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Undo {
    Refund(u32),
    DropEnrollment,
    DropStudent,
    RestoreAvailability(Availability),
    LeaveGroup(GroupNumber),
}

/// All-or-nothing purchase of one course by one user.
pub(crate) struct PurchaseTransaction<'a> {
    user: &'a User,
    course: &'a Course,
    data: MutexGuard<'a, CourseData>,
    enrollments: &'a EnrollmentLog,
    group_capacity: usize,
    enrollment: Option<Arc<Enrollment>>,
    journal: Vec<Undo>,
}

impl<'a> PurchaseTransaction<'a> {
    /// Locks `course` and opens an empty transaction.
    pub(crate) fn begin(
        user: &'a User,
        course: &'a Course,
        enrollments: &'a EnrollmentLog,
        group_capacity: usize,
    ) -> Self {
        Self {
            user,
            course,
            data: course.lock(),
            enrollments,
            group_capacity,
            enrollment: None,
            journal: Vec::with_capacity(5),
        }
    }

    /// Checks, in order, that the course is open, that the user has not
    /// bought it yet and can afford it. Runs before any mutation.
    pub(crate) fn check_preconditions(&self) -> Result<(), MarketError> {
        if !self.data.availability.is_available() {
            return Err(MarketError::CourseClosed);
        }
        let user = self.user.id();
        if self.data.students.contains(&user) || self.enrollments.contains(user, self.course.id()) {
            return Err(MarketError::AlreadyEnrolled);
        }
        if self.course.price() > self.user.balance().bonuses() {
            return Err(MarketError::InsufficientFunds);
        }
        Ok(())
    }

    pub(crate) fn debit(&mut self) -> Result<u32, MarketError> {
        let price = self.course.price();
        let remaining = self.user.balance().debit(price)?;
        self.journal.push(Undo::Refund(price));
        Ok(remaining)
    }

    pub(crate) fn record_enrollment(&mut self) -> Result<(), MarketError> {
        let enrollment = self
            .enrollments
            .record(self.user.id(), self.course.id())?;
        self.journal.push(Undo::DropEnrollment);
        self.enrollment = Some(enrollment);
        Ok(())
    }

    /// Adds the user to the enrolled set and re-derives availability.
    pub(crate) fn add_student(&mut self) -> Result<(), MarketError> {
        let user = self.user.id();
        if !self.data.students.insert(user) {
            return Err(MarketError::Internal(format!(
                "user {user} already in enrolled set"
            )));
        }
        self.journal.push(Undo::DropStudent);

        let previous = self.data.availability;
        self.journal.push(Undo::RestoreAvailability(previous));
        if self.data.apply_change(MembershipChange::Added) {
            tracing::debug!(
                course = %self.course.id(),
                enrolled = self.data.students.len(),
                "course closed for purchase"
            );
        }
        Ok(())
    }

    pub(crate) fn allocate(&mut self) -> Result<GroupNumber, MarketError> {
        let user = self.user.id();
        let group_capacity = self.group_capacity;
        let number = allocator::assign(&mut self.data.groups, user, group_capacity)?;
        self.journal.push(Undo::LeaveGroup(number));
        tracing::debug!(course = %self.course.id(), %user, group = %number, "student allocated");
        Ok(number)
    }

    /// Makes every applied effect permanent and releases the course lock.
    pub(crate) fn commit(mut self) -> Result<Arc<Enrollment>, MarketError> {
        let enrollment = self
            .enrollment
            .take()
            .ok_or_else(|| MarketError::Internal("commit before enrollment was recorded".into()))?;
        self.data.assert_invariants();
        self.journal.clear();
        Ok(enrollment)
    }

    fn rollback(&mut self) {
        let user = self.user.id();
        while let Some(undo) = self.journal.pop() {
            match undo {
                Undo::Refund(amount) => {
                    if let Err(error) = self.user.balance().credit(amount) {
                        tracing::error!(%user, amount, %error, "refund failed during rollback");
                    }
                }
                Undo::DropEnrollment => {
                    self.enrollments.remove(user, self.course.id());
                    self.enrollment = None;
                }
                Undo::DropStudent => {
                    self.data.students.remove(&user);
                }
                Undo::RestoreAvailability(previous) => {
                    self.data.availability = previous;
                }
                Undo::LeaveGroup(number) => {
                    if let Some(group) = self
                        .data
                        .groups
                        .iter_mut()
                        .find(|group| group.number() == number)
                    {
                        group.remove(user);
                    }
                }
            }
        }
    }
}

impl Drop for PurchaseTransaction<'_> {
    fn drop(&mut self) {
        if self.journal.is_empty() {
            return;
        }
        tracing::warn!(
            user = %self.user.id(),
            course = %self.course.id(),
            steps = self.journal.len(),
            "rolling back purchase"
        );
        self.rollback();
    }
}
