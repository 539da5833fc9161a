// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use bytemuck::{Pod, Zeroable};

use super::aabb::Aabb;
use crate::constants::{BVH_LEAF_MAX_PRIMS, BVH_MAX_DEPTH, BVH_NUM_BINS};

/// GPU BVH node. The left child is always stored at `index + 1` in the flat
/// array; `left_or_prim` holds the right child index for inner nodes and the
/// first primitive slot for leaf nodes. `prim_count == 0` means inner node.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuBvhNode {
    pub aabb_min: [f32; 3],
    pub left_or_prim: u32,
    pub aabb_max: [f32; 3],
    pub prim_count: u32,
}

enum BuildNode {
    Leaf {
        bounds: Aabb,
        first: usize,
        count: usize,
    },
    Inner {
        bounds: Aabb,
        left: usize,
        right: usize,
    },
}

/// Flat BVH built over triangle bounds, ready for GPU upload.
pub struct Bvh {
    pub nodes: Vec<GpuBvhNode>,
    /// Leaf slot -> triangle index.
    pub prim_indices: Vec<u32>,
}

impl Bvh {
    /// Build with a binned Surface Area Heuristic.
    ///
    /// An empty input still yields a single zeroed node so the node buffer is
    /// never zero-sized; traversal early-outs on a zero triangle count.
    pub fn build(aabbs: &[Aabb]) -> Self {
        if aabbs.is_empty() {
            return Self {
                nodes: vec![GpuBvhNode::zeroed()],
                prim_indices: Vec::new(),
            };
        }

        let mut indices: Vec<usize> = (0..aabbs.len()).collect();
        let mut build_nodes = Vec::with_capacity(2 * aabbs.len());
        Self::build_recursive(aabbs, &mut indices, 0, aabbs.len(), 0, &mut build_nodes);

        let mut nodes = Vec::with_capacity(build_nodes.len());
        Self::flatten(&build_nodes, 0, &mut nodes);

        Self {
            nodes,
            prim_indices: indices.iter().map(|&i| i as u32).collect(),
        }
    }

    pub fn bounds(&self) -> Aabb {
        let root = &self.nodes[0];
        Aabb::new(root.aabb_min.into(), root.aabb_max.into())
    }

    fn build_recursive(
        aabbs: &[Aabb],
        indices: &mut [usize],
        start: usize,
        end: usize,
        depth: usize,
        nodes: &mut Vec<BuildNode>,
    ) -> usize {
        let count = end - start;
        let bounds = indices[start..end]
            .iter()
            .fold(Aabb::EMPTY, |acc, &i| acc.union(aabbs[i]));
        let node_idx = nodes.len();

        // The shader stack is BVH_MAX_DEPTH deep; past that we accept fat leaves.
        if count <= BVH_LEAF_MAX_PRIMS || depth + 1 >= BVH_MAX_DEPTH {
            nodes.push(BuildNode::Leaf {
                bounds,
                first: start,
                count,
            });
            return node_idx;
        }

        let mid = match Self::find_best_split(aabbs, &indices[start..end]) {
            Some((axis, split)) => {
                start + Self::partition(aabbs, &mut indices[start..end], axis, split)
            }
            None => start,
        };
        // Degenerate partition: fall back to a median split.
        let mid = if mid == start || mid == end {
            (start + end) / 2
        } else {
            mid
        };

        // Placeholder; children are patched in after recursion.
        nodes.push(BuildNode::Inner {
            bounds,
            left: 0,
            right: 0,
        });
        let l = Self::build_recursive(aabbs, indices, start, mid, depth + 1, nodes);
        let r = Self::build_recursive(aabbs, indices, mid, end, depth + 1, nodes);
        if let BuildNode::Inner { left, right, .. } = &mut nodes[node_idx] {
            *left = l;
            *right = r;
        }
        node_idx
    }

    fn find_best_split(aabbs: &[Aabb], indices: &[usize]) -> Option<(usize, f32)> {
        let centroid_bounds = indices
            .iter()
            .fold(Aabb::EMPTY, |acc, &i| acc.expand(aabbs[i].center()));
        let mut best: Option<(f32, usize, f32)> = None;

        for axis in 0..3 {
            let min = centroid_bounds.min[axis];
            let extent = centroid_bounds.max[axis] - min;
            if extent.abs() < 1e-8 {
                continue;
            }

            let mut bin_bounds = [Aabb::EMPTY; BVH_NUM_BINS];
            let mut bin_counts = [0u32; BVH_NUM_BINS];
            let inv_extent = BVH_NUM_BINS as f32 / extent;
            for &idx in indices {
                let b = ((aabbs[idx].center()[axis] - min) * inv_extent) as usize;
                let b = b.min(BVH_NUM_BINS - 1);
                bin_bounds[b] = bin_bounds[b].union(aabbs[idx]);
                bin_counts[b] += 1;
            }

            // Right-to-left sweep collects suffix bounds.
            let mut right_area = [0.0f32; BVH_NUM_BINS - 1];
            let mut right_count = [0u32; BVH_NUM_BINS - 1];
            let (mut rb, mut rc) = (Aabb::EMPTY, 0u32);
            for i in (1..BVH_NUM_BINS).rev() {
                rb = rb.union(bin_bounds[i]);
                rc += bin_counts[i];
                right_area[i - 1] = rb.surface_area();
                right_count[i - 1] = rc;
            }

            let (mut lb, mut lc) = (Aabb::EMPTY, 0u32);
            let bin_width = extent / BVH_NUM_BINS as f32;
            for i in 0..BVH_NUM_BINS - 1 {
                lb = lb.union(bin_bounds[i]);
                lc += bin_counts[i];
                if lc == 0 || right_count[i] == 0 {
                    continue;
                }
                let cost = lc as f32 * lb.surface_area() + right_count[i] as f32 * right_area[i];
                if best.is_none_or(|(c, _, _)| cost < c) {
                    best = Some((cost, axis, min + (i + 1) as f32 * bin_width));
                }
            }
        }

        best.map(|(_, axis, split)| (axis, split))
    }

    fn partition(aabbs: &[Aabb], indices: &mut [usize], axis: usize, split: f32) -> usize {
        let mut lo = 0;
        let mut hi = indices.len();
        while lo < hi {
            if aabbs[indices[lo]].center()[axis] < split {
                lo += 1;
            } else {
                hi -= 1;
                indices.swap(lo, hi);
            }
        }
        lo
    }

    fn flatten(build_nodes: &[BuildNode], idx: usize, output: &mut Vec<GpuBvhNode>) {
        let out_idx = output.len();
        match build_nodes[idx] {
            BuildNode::Leaf {
                bounds,
                first,
                count,
            } => output.push(GpuBvhNode {
                aabb_min: bounds.min.into(),
                left_or_prim: first as u32,
                aabb_max: bounds.max.into(),
                prim_count: count as u32,
            }),
            BuildNode::Inner {
                bounds,
                left,
                right,
            } => {
                output.push(GpuBvhNode {
                    aabb_min: bounds.min.into(),
                    left_or_prim: 0,
                    aabb_max: bounds.max.into(),
                    prim_count: 0,
                });
                Self::flatten(build_nodes, left, output);
                output[out_idx].left_or_prim = output.len() as u32;
                Self::flatten(build_nodes, right, output);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn grid(n: usize) -> Vec<Aabb> {
        (0..n)
            .map(|i| {
                let p = Vec3::new((i % 10) as f32, (i / 10) as f32, 0.0);
                Aabb::new(p, p + Vec3::splat(0.5))
            })
            .collect()
    }

    /// Walks the flat tree, returning every primitive reached and checking
    /// that each node encloses its children.
    fn collect(bvh: &Bvh, idx: usize, aabbs: &[Aabb], out: &mut Vec<u32>) {
        let node = bvh.nodes[idx];
        let bounds = Aabb::new(node.aabb_min.into(), node.aabb_max.into());
        if node.prim_count > 0 {
            let first = node.left_or_prim as usize;
            for &p in &bvh.prim_indices[first..first + node.prim_count as usize] {
                assert!(bounds.contains(&aabbs[p as usize]));
                out.push(p);
            }
        } else {
            let (l, r) = (idx + 1, node.left_or_prim as usize);
            for child in [l, r] {
                let c = bvh.nodes[child];
                assert!(bounds.contains(&Aabb::new(c.aabb_min.into(), c.aabb_max.into())));
                collect(bvh, child, aabbs, out);
            }
        }
    }

    #[test]
    fn test_every_primitive_reachable_once() {
        let aabbs = grid(137);
        let bvh = Bvh::build(&aabbs);
        let mut seen = Vec::new();
        collect(&bvh, 0, &aabbs, &mut seen);
        seen.sort_unstable();
        assert_eq!(seen, (0..137).collect::<Vec<u32>>());
    }

    #[test]
    fn test_leaf_sizes() {
        let bvh = Bvh::build(&grid(64));
        assert!(bvh.nodes.len() > 1);
        assert!(
            bvh.nodes
                .iter()
                .all(|n| n.prim_count as usize <= BVH_LEAF_MAX_PRIMS)
        );
    }

    #[test]
    fn test_coincident_primitives() {
        // Identical centroids cannot be binned; the median split still terminates.
        let aabbs = vec![Aabb::new(Vec3::ZERO, Vec3::ONE); 33];
        let bvh = Bvh::build(&aabbs);
        let mut seen = Vec::new();
        collect(&bvh, 0, &aabbs, &mut seen);
        assert_eq!(seen.len(), 33);
    }

    #[test]
    fn test_empty_build() {
        let bvh = Bvh::build(&[]);
        assert_eq!(bvh.nodes.len(), 1);
        assert_eq!(bvh.nodes[0].prim_count, 0);
        assert!(bvh.prim_indices.is_empty());
    }
}
