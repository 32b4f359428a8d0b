// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for clip region operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or mutating clip regions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("Non-finite coordinate in {0}")]
    NonFinite(&'static str),

    #[error("Invalid clip shape '{id}': {reason}")]
    InvalidShape { id: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
