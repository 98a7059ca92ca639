//! Recursive random-hyperplane tree construction.
//!
//! Each tree partitions the full item set top-down. At every level a split
//! plane (a single bit) is chosen so that both sides are non-empty; when no
//! bit separates the candidates, ids are assigned to sides by fair coin
//! flips instead. Subtrees smaller than the group capacity collapse into a
//! single group node, and singletons resolve to the item id itself.

use crate::error::Result;
use crate::hamming;
use crate::node::NodeMut;

use super::BitForestIndex;

/// Random split-plane probes per node before scanning every bit in order.
const MAX_RANDOM_SPLIT_TRIES: usize = 20;

/// Heavier-side fraction above which a partition is treated as degenerate
/// and re-drawn by coin flips.
const IMBALANCE_LIMIT: f64 = 0.99;

impl BitForestIndex {
    /// Build the subtree over `indices`, returning its node id. Appends
    /// one internal node per non-trivial recursion; group and value nodes
    /// are the only leaves.
    pub(crate) fn make_tree(&mut self, indices: &[i32], is_root: bool) -> Result<i32> {
        if indices.len() == 1 && !is_root {
            return Ok(indices[0]);
        }

        // Small subtrees collapse into a group node. A root qualifies only
        // when the whole item set fits: unlike interior calls it cannot
        // defer to a parent, and a sub-group-size item set has no split
        // worth finding.
        if indices.len() <= self.k as usize
            && (!is_root || self.n_items <= self.k || indices.len() == 1)
        {
            self.arena.allocate_up_to(self.n_nodes + 1)?;
            let item = self.n_nodes;
            self.n_nodes += 1;
            let mut m = self.arena.node_mut(item);
            m.clear();
            m.set_n_descendants(if is_root { self.n_items } else { indices.len() as i32 });
            m.set_group_ids(indices);
            return Ok(item);
        }

        let split_bit = self.create_split(indices);

        let mut sides: [Vec<i32>; 2] = [Vec::new(), Vec::new()];
        for &j in indices {
            let right = self.arena.node(j).side_of(split_bit);
            sides[usize::from(right)].push(j);
        }

        // The hyperplane left one side (nearly) empty; discard it and
        // partition by coin flips until both sides carry weight.
        while split_imbalance(&sides[0], &sides[1]) > IMBALANCE_LIMIT {
            if self.verbose {
                eprintln!(
                    "no hyperplane found (left: {}, right: {})",
                    sides[0].len(),
                    sides[1].len()
                );
            }
            sides[0].clear();
            sides[1].clear();
            for &j in indices {
                sides[usize::from(self.random.flip())].push(j);
            }
        }

        // Recurse the smaller side first, so node layout is a function of
        // the partition alone.
        let flip = usize::from(sides[0].len() > sides[1].len());

        // Children are appended before their parent; the parent image is
        // staged off-arena until both subtrees exist.
        let mut image = vec![0u8; self.s];
        let mut m = NodeMut::new(&mut image);
        m.set_n_descendants(if is_root { self.n_items } else { indices.len() as i32 });
        m.set_split_bit(split_bit);
        for side in 0..2 {
            let side = side ^ flip;
            let child = self.make_tree(&sides[side], false)?;
            m.set_child(side, child);
        }

        self.arena.allocate_up_to(self.n_nodes + 1)?;
        let item = self.n_nodes;
        self.n_nodes += 1;
        self.arena.set_from_buffer(item, &image);
        Ok(item)
    }

    /// Choose a split-plane bit for the candidate set: up to
    /// [`MAX_RANDOM_SPLIT_TRIES`] uniform probes, then an in-order scan of
    /// all `f * 32` bits. If nothing separates the candidates the last
    /// scanned bit is returned and the caller's fallback partitions by
    /// coin flips.
    fn create_split(&mut self, indices: &[i32]) -> u32 {
        let dim = self.f * hamming::BITS_PER_WORD;
        for _ in 0..MAX_RANDOM_SPLIT_TRIES {
            let bit = self.random.index(dim) as u32;
            if self.separates(bit, indices) {
                return bit;
            }
        }
        for bit in 0..dim as u32 {
            if self.separates(bit, indices) {
                return bit;
            }
        }
        dim as u32 - 1
    }

    /// Whether the plane at `bit` puts at least one candidate on each side.
    fn separates(&self, bit: u32, indices: &[i32]) -> bool {
        let on_right = indices
            .iter()
            .filter(|&&j| self.arena.node(j).side_of(bit))
            .count();
        on_right > 0 && on_right < indices.len()
    }
}

/// Fraction of ids on the heavier side, in `[0.5, 1.0]`; 1.0 when either
/// side is empty.
fn split_imbalance(left: &[i32], right: &[i32]) -> f64 {
    let ls = left.len() as f64;
    let rs = right.len() as f64;
    let f = ls / (ls + rs + 1e-9);
    f.max(1.0 - f)
}
