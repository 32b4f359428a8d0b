// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during clipping and geometry processing
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Triangulation failed: {0}")]
    TriangulationError(String),

    #[error("Empty mesh: {0}")]
    EmptyMesh(String),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// The CSG kernel could not produce a valid solid. The surface keeps its
    /// previous geometry.
    #[error("CSG failure: {0}")]
    CsgFailure(String),

    /// A newer rebuild superseded this one
    #[error("Rebuild was cancelled")]
    Cancelled,

    #[error("Clip region error: {0}")]
    CoreError(#[from] surfclip_core::Error),
}

impl Error {
    pub fn csg(msg: impl Into<String>) -> Self {
        Error::CsgFailure(msg.into())
    }
}
