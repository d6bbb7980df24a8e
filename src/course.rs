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

//! Courses, their groups and lessons.
//!
//! A course owns a fixed batch of [`GROUPS_PER_COURSE`] groups, numbered
//! `1..=10` and created together with the course. All mutable course state
//! lives behind a single mutex so that a purchase can update the enrolled set,
//! the availability flag and the group assignment as one isolated unit.

use crate::availability::{self, Availability, MembershipChange};
use crate::base::{CourseId, GroupNumber, LessonId, UserId};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};
use std::collections::BTreeSet;

/// Number of groups every course is created with.
pub const GROUPS_PER_COURSE: u8 = 10;

const GROUP_LETTERS: [char; GROUPS_PER_COURSE as usize] =
    ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J'];

/// One of a course's fixed subdivisions of students.
#[derive(Debug, Clone)]
pub struct Group {
    number: GroupNumber,
    title: String,
    students: BTreeSet<UserId>,
}

impl Group {
    fn new(number: GroupNumber, title: String) -> Self {
        Self {
            number,
            title,
            students: BTreeSet::new(),
        }
    }

    pub fn number(&self) -> GroupNumber {
        self.number
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.students.contains(&user)
    }

    pub(crate) fn insert(&mut self, user: UserId) -> bool {
        self.students.insert(user)
    }

    pub(crate) fn remove(&mut self, user: UserId) -> bool {
        self.students.remove(&user)
    }

    fn snapshot(&self) -> GroupSnapshot {
        GroupSnapshot {
            number: self.number,
            title: self.title.clone(),
            students: self.students.iter().copied().collect(),
        }
    }
}

/// Creates the groups of a new course in one batch, numbered densely from 1.
pub(crate) fn batch_for_course() -> Vec<Group> {
    GROUP_LETTERS
        .iter()
        .zip(1..=GROUPS_PER_COURSE)
        .map(|(letter, number)| Group::new(GroupNumber(number), format!("Group {letter}")))
        .collect()
}

/// Point-in-time copy of a group's membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSnapshot {
    pub number: GroupNumber,
    pub title: String,
    /// Members in ascending id order.
    pub students: Vec<UserId>,
}

/// A lesson of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lesson {
    pub id: LessonId,
    pub course: CourseId,
    pub title: String,
    pub link: String,
}

/// Mutable state of a course, guarded by [`Course`]'s mutex.
#[derive(Debug)]
pub(crate) struct CourseData {
    pub(crate) capacity: usize,
    pub(crate) students: BTreeSet<UserId>,
    pub(crate) availability: Availability,
    pub(crate) groups: Vec<Group>,
    pub(crate) lessons: Vec<Lesson>,
}

impl CourseData {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            students: BTreeSet::new(),
            availability: Availability::Available,
            groups: batch_for_course(),
            lessons: Vec::new(),
        }
    }

    pub(crate) fn assert_invariants(&self) {
        debug_assert_eq!(
            self.groups.iter().map(Group::len).sum::<usize>(),
            self.students.len(),
            "Invariant violated: group memberships do not add up to enrolled students"
        );
        debug_assert_eq!(
            self.availability.is_available(),
            self.students.len() < self.capacity,
            "Invariant violated: availability out of sync with enrolled count {}",
            self.students.len()
        );
    }

    /// Re-derives availability after `change`. Returns `true` if it flipped.
    pub(crate) fn apply_change(&mut self, change: MembershipChange) -> bool {
        let next = availability::transition(
            self.availability,
            change,
            self.students.len(),
            self.capacity,
        );
        let flipped = next != self.availability;
        self.availability = next;
        flipped
    }

    pub(crate) fn group_of(&self, user: UserId) -> Option<GroupNumber> {
        self.groups
            .iter()
            .find(|group| group.contains(user))
            .map(Group::number)
    }

    /// Drops `user` from the enrolled set and from its group.
    pub(crate) fn remove_student(&mut self, user: UserId) -> bool {
        if !self.students.remove(&user) {
            return false;
        }
        for group in &mut self.groups {
            if group.remove(user) {
                break;
            }
        }
        self.apply_change(MembershipChange::Removed);
        self.assert_invariants();
        true
    }

    /// Empties the enrolled set and every group, returning the former members.
    pub(crate) fn clear_students(&mut self) -> BTreeSet<UserId> {
        let removed = std::mem::take(&mut self.students);
        for group in &mut self.groups {
            group.students.clear();
        }
        self.apply_change(MembershipChange::Cleared);
        self.assert_invariants();
        removed
    }
}

/// A purchasable course.
#[derive(Debug)]
pub struct Course {
    id: CourseId,
    author: UserId,
    title: String,
    price: u32,
    start_date: DateTime<Utc>,
    inner: Mutex<CourseData>,
}

impl Course {
    pub(crate) fn new(
        id: CourseId,
        author: UserId,
        title: String,
        price: u32,
        capacity: usize,
    ) -> Self {
        Self {
            id,
            author,
            title,
            price,
            start_date: Utc::now(),
            inner: Mutex::new(CourseData::new(capacity)),
        }
    }

    pub fn id(&self) -> CourseId {
        self.id
    }

    pub fn author(&self) -> UserId {
        self.author
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn price(&self) -> u32 {
        self.price
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    pub fn availability(&self) -> Availability {
        self.inner.lock().availability
    }

    pub fn is_available(&self) -> bool {
        self.availability().is_available()
    }

    pub fn students_count(&self) -> usize {
        self.inner.lock().students.len()
    }

    pub fn is_student(&self, user: UserId) -> bool {
        self.inner.lock().students.contains(&user)
    }

    /// Enrolled students in ascending id order.
    pub fn students(&self) -> Vec<UserId> {
        self.inner.lock().students.iter().copied().collect()
    }

    /// Groups in ascending number order.
    pub fn groups(&self) -> Vec<GroupSnapshot> {
        self.inner.lock().groups.iter().map(Group::snapshot).collect()
    }

    /// Number of the group `user` was allocated to, if enrolled.
    pub fn group_of(&self, user: UserId) -> Option<GroupNumber> {
        self.inner.lock().group_of(user)
    }

    pub fn lessons_count(&self) -> usize {
        self.inner.lock().lessons.len()
    }

    pub(crate) fn lessons(&self) -> Vec<Lesson> {
        self.inner.lock().lessons.clone()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CourseData> {
        self.inner.lock()
    }
}

impl Serialize for Course {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.inner.lock();
        let mut state = serializer.serialize_struct("Course", 8)?;
        state.serialize_field("course", &self.id)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("author", &self.author)?;
        state.serialize_field("price", &self.price)?;
        state.serialize_field("start_date", &self.start_date)?;
        state.serialize_field("students", &data.students.len())?;
        state.serialize_field("lessons", &data.lessons.len())?;
        state.serialize_field("available", &data.availability.is_available())?;
        state.end()
    }
}
