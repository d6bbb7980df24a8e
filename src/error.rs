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

//! Error types for marketplace operations.

use thiserror::Error;

/// Marketplace errors.
///
/// Precondition failures (`CourseClosed`, `AlreadyEnrolled`,
/// `InsufficientFunds`, the not-found and permission variants) are raised before any state is touched.
/// `Internal` is only produced inside a purchase transaction, after which every
/// effect of that transaction has been rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// Course is full and no longer accepts purchases
    #[error("course closed for purchase")]
    CourseClosed,

    /// User already holds an enrollment for the course
    #[error("course already purchased")]
    AlreadyEnrolled,

    /// Course price exceeds the user's bonus balance
    #[error("insufficient bonuses")]
    InsufficientFunds,

    /// Referenced user does not exist
    #[error("user not found")]
    UserNotFound,

    /// Referenced course does not exist
    #[error("course not found")]
    CourseNotFound,

    /// Caller lacks the role or membership required for the operation
    #[error("permission denied")]
    PermissionDenied,

    /// Email is already registered to another user
    #[error("email already registered")]
    EmailTaken,

    /// Student is not a member of the course
    #[error("student not enrolled in course")]
    NotEnrolled,

    /// Unexpected failure while applying a purchase; nothing was committed
    #[error("internal failure: {0}")]
    Internal(String),
}

impl MarketError {
    /// HTTP status code the web boundary reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AlreadyEnrolled | Self::NotEnrolled => 400,
            Self::InsufficientFunds => 402,
            Self::PermissionDenied => 403,
            Self::UserNotFound | Self::CourseNotFound | Self::CourseClosed => 404,
            Self::EmailTaken => 409,
            Self::Internal(_) => 500,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CourseClosed => "COURSE_CLOSED",
            Self::AlreadyEnrolled => "ALREADY_ENROLLED",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::CourseNotFound => "COURSE_NOT_FOUND",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::NotEnrolled => "NOT_ENROLLED",
            Self::Internal(_) => "INTERNAL",
        }
    }
}
