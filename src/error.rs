// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The failure taxonomy shared across every subsystem.
//!
//! Structural Euler operators keep their `Option`/`bool` return shape on the
//! happy path (callers only ever branch on success/failure), but anything
//! that benefits a library caller to distinguish reports it through
//! [`GeoError`].

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeoError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("non-manifold operation: {0}")]
    NonManifold(String),

    #[error("structural corruption detected: {0}")]
    StructuralCorruption(String),

    #[error("registry at capacity (2^32 - 1 handles)")]
    Capacity,

    #[error("duplicate property name: {0}")]
    DuplicateName(String),
}

pub type Result<T> = std::result::Result<T, GeoError>;
