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

//! Cosine similarity over candidate pools.
//!
//! Components are `f64` end to end. A vector with zero magnitude has
//! similarity 0 with everything, itself included.

pub fn l2_norm(vec: &[f64]) -> f64 {
    vec.iter().map(|v| v * v).sum::<f64>().sqrt()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn cosine_with_norms(a: &[f64], b: &[f64], norm_a: f64, norm_b: f64) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot(a, b) / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    cosine_with_norms(a, b, l2_norm(a), l2_norm(b))
}

fn self_similarity(norm: f64) -> f64 {
    if norm == 0.0 { 0.0 } else { 1.0 }
}

/// Full k x k similarity matrix. The diagonal is exactly 1.0 for non-zero rows.
pub fn similarity_matrix(vectors: &[&[f64]]) -> Vec<Vec<f64>> {
    let norms: Vec<f64> = vectors.iter().map(|v| l2_norm(v)).collect();
    let n = vectors.len();
    let mut matrix = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        matrix[i][i] = self_similarity(norms[i]);
        for j in (i + 1)..n {
            let sim = cosine_with_norms(vectors[i], vectors[j], norms[i], norms[j]);
            matrix[i][j] = sim;
            matrix[j][i] = sim;
        }
    }
    matrix
}

/// Mean similarity of every vector to the whole pool, itself included.
///
/// Equal to the column means of [`similarity_matrix`] but computes each pair
/// once and keeps only O(k) scratch space.
pub fn mean_similarity(vectors: &[&[f64]]) -> Vec<f64> {
    let n = vectors.len();
    if n == 0 {
        return Vec::new();
    }
    let norms: Vec<f64> = vectors.iter().map(|v| l2_norm(v)).collect();
    let mut sums: Vec<f64> = norms.iter().map(|n| self_similarity(*n)).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            let sim = cosine_with_norms(vectors[i], vectors[j], norms[i], norms[j]);
            sums[i] += sim;
            sums[j] += sim;
        }
    }
    let count = n as f64;
    sums.into_iter().map(|s| s / count).collect()
}
