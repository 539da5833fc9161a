// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use bytemuck::{Pod, Zeroable};

use crate::constants::ALIAS_RESIDUE_TOLERANCE;

/// Importance-sample entry embedded in every light record. Must match the
/// WGSL `ImptSampData` struct layout.
///
/// Sampling: draw a uniform index `i`, keep it with probability `q`,
/// otherwise take `alias`. `pdf` is the probability of selecting this entry,
/// `alias_pdf` the probability of selecting its alias.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ImptSampData {
    pub alias: i32,
    pub q: f32,
    pub pdf: f32,
    pub alias_pdf: f32,
}

/// Alias-method table over a discrete weighted distribution.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<ImptSampData>,
    total_weight: f32,
}

impl AliasTable {
    /// Build the table from raw source weights.
    ///
    /// Non-finite and negative weights count as zero. When every weight is
    /// zero the table falls back to a uniform distribution.
    pub fn build(weights: &[f32]) -> Self {
        let n = weights.len();
        if n == 0 {
            return Self::default();
        }

        let mut weights: Vec<f32> = weights
            .iter()
            .map(|&w| if w.is_finite() && w > 0.0 { w } else { 0.0 })
            .collect();
        let source_total: f32 = weights.iter().sum();
        let mut total = source_total;
        if total <= 0.0 {
            weights.fill(1.0);
            total = n as f32;
        }

        let pdf: Vec<f32> = weights.iter().map(|w| w / total).collect();
        // Scaled so that an entry with exactly average weight has mass 1.
        let mut mass: Vec<f32> = pdf.iter().map(|p| p * n as f32).collect();

        let mut entries: Vec<ImptSampData> = (0..n)
            .map(|i| ImptSampData {
                alias: i as i32,
                q: 1.0,
                pdf: pdf[i],
                alias_pdf: pdf[i],
            })
            .collect();

        // Worklists are popped from the back: order them so the most deficient
        // and the most surplus entries are paired first. Ties keep index order.
        let mut deficient: Vec<usize> = (0..n).filter(|&i| mass[i] < 1.0).collect();
        let mut surplus: Vec<usize> = (0..n).filter(|&i| mass[i] >= 1.0).collect();
        deficient.sort_by(|&a, &b| mass[b].total_cmp(&mass[a]).then(b.cmp(&a)));
        surplus.sort_by(|&a, &b| mass[a].total_cmp(&mass[b]).then(b.cmp(&a)));

        while let (Some(&light), Some(&heavy)) = (deficient.last(), surplus.last()) {
            deficient.pop();
            surplus.pop();

            entries[light].q = mass[light];
            entries[light].alias = heavy as i32;
            entries[light].alias_pdf = pdf[heavy];

            mass[heavy] -= 1.0 - mass[light];
            if mass[heavy] < 1.0 {
                deficient.push(heavy);
            } else {
                surplus.push(heavy);
            }
        }

        // Whatever remains holds mass ~1 up to rounding: it keeps itself.
        for &i in deficient.iter().chain(surplus.iter()) {
            debug_assert!(
                (mass[i] - 1.0).abs() <= ALIAS_RESIDUE_TOLERANCE,
                "alias residue {} on entry {i}",
                mass[i] - 1.0
            );
            entries[i].q = 1.0;
            entries[i].alias = i as i32;
            entries[i].alias_pdf = pdf[i];
        }

        Self {
            entries,
            total_weight: source_total,
        }
    }

    /// Pick an entry from two uniform numbers in `[0, 1)`.
    /// Returns `(index, probability of that index)`. Host mirror of the
    /// alias picks in `common/lights.wgsl`: O(1), at most one redirection.
    pub fn sample(&self, u_index: f32, u_accept: f32) -> Option<(usize, f32)> {
        if self.entries.is_empty() {
            return None;
        }
        let n = self.entries.len();
        let i = ((u_index * n as f32) as usize).min(n - 1);
        let entry = self.entries[i];
        if u_accept < entry.q {
            Some((i, entry.pdf))
        } else {
            Some((entry.alias as usize, entry.alias_pdf))
        }
    }

    pub fn entries(&self) -> &[ImptSampData] {
        &self.entries
    }

    /// Sum of the sanitized source weights. Zero for a uniform fallback
    /// table, which carries no real power.
    pub fn total_weight(&self) -> f32 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
