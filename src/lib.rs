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

//! # Course Market
//!
//! This library is the enrollment and payment core of an online course
//! marketplace: students buy courses with bonus points, each buyer is placed in
//! one of the course's ten groups, and a course closes for purchase once it is
//! full.
//!
//! ## Core Components
//!
//! - [`Marketplace`]: Registry of users and courses; orchestrates purchases
//! - [`Balance`]: Per-user bonus balance with guarded atomic debits
//! - [`Availability`]: Open/closed state derived from the enrolled count
//! - [`allocator`]: Least-filled group selection for new students
//! - [`MarketError`]: Error types for marketplace operations
//!
//! ## Example
//!
//! ```
//! use course_market::{GroupNumber, Marketplace, NewUser};
//!
//! let market = Marketplace::new();
//! let admin = market.register(NewUser::staff("admin@example.com")).unwrap();
//! let student = market.register(NewUser::student("student@example.com")).unwrap();
//!
//! let course = market.create_course(admin.id(), "Rust for Pythonistas", 10).unwrap();
//! market.purchase(student.id(), course.id()).unwrap();
//!
//! assert_eq!(student.balance().bonuses(), 990);
//! assert_eq!(course.students_count(), 1);
//! assert_eq!(course.group_of(student.id()), Some(GroupNumber(1)));
//! ```
//!
//! ## Thread Safety
//!
//! The marketplace is `Sync`: purchases of different courses run in parallel,
//! purchases of the same course are serialized by that course's lock.

pub mod allocator;
pub mod availability;
mod balance;
mod base;
pub mod config;
mod course;
mod engine;
mod enrollment;
pub mod error;
mod transaction;
mod user;

pub use availability::{Availability, MembershipChange};
pub use balance::Balance;
pub use base::{CourseId, EnrollmentId, GroupNumber, LessonId, UserId};
pub use config::{ConfigError, MarketConfig};
pub use course::{Course, Group, GroupSnapshot, Lesson, GROUPS_PER_COURSE};
pub use engine::Marketplace;
pub use enrollment::{Enrollment, EnrollmentLog};
pub use error::MarketError;
pub use user::{NewUser, User};
