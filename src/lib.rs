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

//! Restaurant recommendations ranked by mean pairwise cosine similarity
//! within the filtered candidate pool.

pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod model;
pub mod output;
pub mod similarity;

pub use engine::recommend;
pub use engine::recommend_with_report;
pub use error::RecommendError;
pub use model::AreaFilter;
pub use model::EncodingSource;
pub use model::EncodingTable;
pub use model::FilterCriteria;
pub use model::RankedResult;
pub use model::RestaurantRecord;
