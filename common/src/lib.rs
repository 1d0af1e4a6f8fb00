// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Common Modul for the ride tracker
//!
//! Provides the common data types that are used across every modul.

pub mod clock;
pub mod collections;
pub mod error;
pub mod position;
pub mod test_helper;
pub mod trip;
pub mod vehicle;

#[cfg(test)]
mod tests;
