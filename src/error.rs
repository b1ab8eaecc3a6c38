// Copyright 2026 Savor Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use thiserror::Error;

pub type RecommendResult<T> = std::result::Result<T, RecommendError>;

/// Failures surfaced by the recommendation engine.
///
/// An empty candidate pool is not an error; it is reported as an empty
/// result sequence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecommendError {
    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("data integrity error: restaurant '{id}' has no encoding row")]
    DataIntegrity { id: String },

    #[error("data integrity error: restaurant '{id}' has encoding dim {actual}, expected {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },
}

impl RecommendError {
    /// Stable machine-readable code used in JSON error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            RecommendError::InvalidCriteria(_) => "invalid_criteria",
            RecommendError::DataIntegrity { .. } | RecommendError::DimensionMismatch { .. } => {
                "data_integrity"
            }
        }
    }
}
