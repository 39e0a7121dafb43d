// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Fuzzy matching: typo tolerance via bounded edit distance.

mod damerau;

pub use damerau::{damerau_within, MAX_EDIT_DISTANCE};
