// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Location sources publishing [`common::position::LocationSample`]s on the event bus.

pub mod constant_source;

pub use constant_source::ConstantLocationModule;

#[cfg(test)]
mod tests;
