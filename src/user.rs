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

//! Registered users.

use crate::balance::Balance;
use crate::base::UserId;
use serde::Deserialize;
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Registration request handed over by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_staff: bool,
}

impl NewUser {
    /// Non-staff registration with no display name.
    pub fn student(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            is_staff: false,
        }
    }

    /// Staff registration with no display name.
    pub fn staff(email: impl Into<String>) -> Self {
        Self {
            is_staff: true,
            ..Self::student(email)
        }
    }
}

/// A registered user and the balance it owns.
#[derive(Debug)]
pub struct User {
    id: UserId,
    email: String,
    first_name: String,
    last_name: String,
    is_staff: bool,
    balance: Balance,
}

impl User {
    pub(crate) fn new(id: UserId, registration: NewUser, starting_bonuses: u32) -> Self {
        Self {
            id,
            email: registration.email,
            first_name: registration.first_name,
            last_name: registration.last_name,
            is_staff: registration.is_staff,
            balance: Balance::open(starting_bonuses),
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// `"first last"`, trimmed; empty if neither name was given.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn is_staff(&self) -> bool {
        self.is_staff
    }

    pub fn balance(&self) -> &Balance {
        &self.balance
    }
}

impl Serialize for User {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("User", 5)?;
        state.serialize_field("user", &self.id)?;
        state.serialize_field("email", &self.email)?;
        state.serialize_field("name", &self.full_name())?;
        state.serialize_field("staff", &self.is_staff)?;
        state.serialize_field("bonuses", &self.balance.bonuses())?;
        state.end()
    }
}
