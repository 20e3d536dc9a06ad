// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for Arena tools (config, prefs).
//! Keeps the asset and viewer crates free of storage concerns.

pub mod config;
pub mod prefs;
