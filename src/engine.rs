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

//! Marketplace engine.
//!
//! The [`Marketplace`] owns every user, course and enrollment, and is the
//! orchestrator for purchases.
//!
//! # Purchases
//!
//! [`Marketplace::purchase`] runs as a single [`PurchaseTransaction`]:
//!
//! 1. Reject if the course is full (`CourseClosed`).
//! 2. Reject if the user already bought the course (`AlreadyEnrolled`).
//! 3. Reject if the price exceeds the user's bonuses (`InsufficientFunds`).
//! 4. Debit the balance, record the enrollment, add the student to the course,
//!    re-derive availability, allocate a group.
//!
//! Any failure in step 4 rolls back the steps already applied.
//!
//! # Thread Safety
//!
//! Registries are [`DashMap`]s of `Arc` records; a registry guard is never held
//! while a course is locked. Purchases of the same course serialize on that
//! course's lock; purchases of different courses run in parallel.

use crate::base::{CourseId, LessonId, UserId};
use crate::config::{ConfigError, MarketConfig};
use crate::course::{Course, GroupSnapshot, Lesson};
use crate::enrollment::{Enrollment, EnrollmentLog};
use crate::transaction::PurchaseTransaction;
use crate::user::{NewUser, User};
use crate::MarketError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Course marketplace holding users, courses and enrollments.
///
/// # Invariants
///
/// - A user is a course member iff an enrollment exists for the pair.
/// - A course is available iff its enrolled count is below capacity.
/// - Every member of a course sits in exactly one of its groups.
/// - No balance ever goes below zero.
pub struct Marketplace {
    config: MarketConfig,
    users: DashMap<UserId, Arc<User>>,
    /// Normalized email to owner, for registration uniqueness.
    emails: DashMap<String, UserId>,
    courses: DashMap<CourseId, Arc<Course>>,
    enrollments: EnrollmentLog,
    next_user_id: AtomicU32,
    next_course_id: AtomicU32,
    next_lesson_id: AtomicU32,
}

impl Marketplace {
    /// Creates an empty marketplace with default limits.
    pub fn new() -> Self {
        Self::build(MarketConfig::default())
    }

    /// Creates an empty marketplace with custom limits.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if a capacity is zero.
    pub fn with_config(config: MarketConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: MarketConfig) -> Self {
        Marketplace {
            config,
            users: DashMap::new(),
            emails: DashMap::new(),
            courses: DashMap::new(),
            enrollments: EnrollmentLog::new(),
            next_user_id: AtomicU32::new(1),
            next_course_id: AtomicU32::new(1),
            next_lesson_id: AtomicU32::new(1),
        }
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Registers a user and opens its balance with the starting bonuses.
    ///
    /// # Errors
    ///
    /// [`MarketError::EmailTaken`] if the email (case-insensitive) is in use.
    pub fn register(&self, registration: NewUser) -> Result<Arc<User>, MarketError> {
        let key = registration.email.trim().to_lowercase();
        match self.emails.entry(key) {
            Entry::Occupied(_) => Err(MarketError::EmailTaken),
            Entry::Vacant(entry) => {
                let id = UserId(self.next_user_id.fetch_add(1, Ordering::Relaxed));
                let user = Arc::new(User::new(id, registration, self.config.starting_bonuses));
                self.users.insert(id, Arc::clone(&user));
                entry.insert(id);
                tracing::info!(user = %id, staff = user.is_staff(), "user registered");
                Ok(user)
            }
        }
    }

    pub fn user(&self, id: UserId) -> Result<Arc<User>, MarketError> {
        self.users
            .get(&id)
            .map(|user| Arc::clone(user.value()))
            .ok_or(MarketError::UserNotFound)
    }

    pub fn course(&self, id: CourseId) -> Result<Arc<Course>, MarketError> {
        self.courses
            .get(&id)
            .map(|course| Arc::clone(course.value()))
            .ok_or(MarketError::CourseNotFound)
    }

    /// All users in ascending id order.
    pub fn users(&self) -> Vec<Arc<User>> {
        let mut users: Vec<_> = self.users.iter().map(|u| Arc::clone(u.value())).collect();
        users.sort_by_key(|user| user.id());
        users
    }

    /// All courses in ascending id order, including closed ones.
    pub fn courses(&self) -> Vec<Arc<Course>> {
        let mut courses: Vec<_> = self.courses.iter().map(|c| Arc::clone(c.value())).collect();
        courses.sort_by_key(|course| course.id());
        courses
    }

    /// Courses open for purchase, newest first.
    pub fn available_courses(&self) -> Vec<Arc<Course>> {
        let mut courses: Vec<_> = self
            .courses()
            .into_iter()
            .filter(|course| course.is_available())
            .collect();
        courses.reverse();
        courses
    }

    /// Creates a course together with its batch of groups. Staff only.
    pub fn create_course(
        &self,
        actor: UserId,
        title: impl Into<String>,
        price: u32,
    ) -> Result<Arc<Course>, MarketError> {
        self.require_staff(actor)?;

        let id = CourseId(self.next_course_id.fetch_add(1, Ordering::Relaxed));
        let course = Arc::new(Course::new(
            id,
            actor,
            title.into(),
            price,
            self.config.course_capacity,
        ));
        self.courses.insert(id, Arc::clone(&course));
        tracing::info!(course = %id, author = %actor, price, "course created");
        Ok(course)
    }

    /// Appends a lesson to a course. Staff only.
    pub fn add_lesson(
        &self,
        actor: UserId,
        course: CourseId,
        title: impl Into<String>,
        link: impl Into<String>,
    ) -> Result<Lesson, MarketError> {
        self.require_staff(actor)?;
        let course = self.course(course)?;

        let lesson = Lesson {
            id: LessonId(self.next_lesson_id.fetch_add(1, Ordering::Relaxed)),
            course: course.id(),
            title: title.into(),
            link: link.into(),
        };
        course.lock().lessons.push(lesson.clone());
        Ok(lesson)
    }

    /// Lessons of a course, visible to staff and to the course's students.
    pub fn lessons(&self, viewer: UserId, course: CourseId) -> Result<Vec<Lesson>, MarketError> {
        let viewer = self.user(viewer)?;
        let course = self.course(course)?;
        if !viewer.is_staff() && !course.is_student(viewer.id()) {
            return Err(MarketError::PermissionDenied);
        }
        Ok(course.lessons())
    }

    /// Buys `course` for `user` with bonuses.
    ///
    /// # Errors
    ///
    /// - [`MarketError::UserNotFound`] / [`MarketError::CourseNotFound`] - Unknown id.
    /// - [`MarketError::CourseClosed`] - The course is full.
    /// - [`MarketError::AlreadyEnrolled`] - The user already bought the course.
    /// - [`MarketError::InsufficientFunds`] - Price exceeds the user's bonuses.
    /// - [`MarketError::Internal`] - A step failed; nothing was committed.
    pub fn purchase(&self, user: UserId, course: CourseId) -> Result<Arc<Enrollment>, MarketError> {
        let user = self.user(user)?;
        let course = self.course(course)?;

        let mut tx =
            PurchaseTransaction::begin(&user, &course, &self.enrollments, self.config.group_capacity);
        tx.check_preconditions()?;
        let remaining = tx.debit()?;
        tx.record_enrollment()?;
        tx.add_student()?;
        let group = tx.allocate()?;
        let enrollment = tx.commit()?;

        tracing::info!(
            user = %user.id(),
            course = %course.id(),
            %group,
            price = course.price(),
            remaining,
            "course purchased"
        );
        Ok(enrollment)
    }

    /// Removes a student from a course, its group and the enrollment log.
    /// Staff only.
    pub fn remove_student(
        &self,
        actor: UserId,
        course: CourseId,
        student: UserId,
    ) -> Result<(), MarketError> {
        self.require_staff(actor)?;
        let course = self.course(course)?;

        let mut data = course.lock();
        if !data.remove_student(student) {
            return Err(MarketError::NotEnrolled);
        }
        self.enrollments.remove(student, course.id());
        tracing::info!(
            course = %course.id(),
            %student,
            enrolled = data.students.len(),
            "student removed"
        );
        Ok(())
    }

    /// Removes every student from a course and reopens it. Staff only.
    ///
    /// Returns the number of students removed.
    pub fn clear_students(&self, actor: UserId, course: CourseId) -> Result<usize, MarketError> {
        self.require_staff(actor)?;
        let course = self.course(course)?;

        let mut data = course.lock();
        let removed = data.clear_students();
        for student in &removed {
            self.enrollments.remove(*student, course.id());
        }
        tracing::info!(course = %course.id(), removed = removed.len(), "course cleared");
        Ok(removed.len())
    }

    /// Enrollments of `user`, newest first.
    pub fn enrollments_of(&self, user: UserId) -> Result<Vec<Arc<Enrollment>>, MarketError> {
        self.user(user)?;
        Ok(self.enrollments.of_user(user))
    }

    pub fn enrollment(&self, user: UserId, course: CourseId) -> Option<Arc<Enrollment>> {
        self.enrollments.get(user, course)
    }

    pub fn groups(&self, course: CourseId) -> Result<Vec<GroupSnapshot>, MarketError> {
        Ok(self.course(course)?.groups())
    }

    fn require_staff(&self, actor: UserId) -> Result<Arc<User>, MarketError> {
        let user = self.user(actor)?;
        if !user.is_staff() {
            return Err(MarketError::PermissionDenied);
        }
        Ok(user)
    }
}

impl Default for Marketplace {
    fn default() -> Self {
        Self::new()
    }
}
