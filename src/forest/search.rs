//! Best-first forest traversal and candidate re-ranking.
//!
//! Every tree is entered from its root with the maximal priority key; the
//! key drops by one each time the traversal takes the off-query side of a
//! split, so deep subtrees the query agrees with are drained first. The
//! pooled candidates are deduplicated and re-ranked by true distance.

use std::collections::BinaryHeap;

use crate::hamming;

use super::BitForestIndex;

impl BitForestIndex {
    /// Gather up to `search_k` candidate ids across all trees, then keep
    /// the best `min(n, distinct candidates)` in ascending
    /// `(distance, id)` order. `search_k` of `None` means `n * n_trees`.
    pub(crate) fn nns_internal(
        &self,
        query: &[u32],
        n: usize,
        search_k: Option<usize>,
    ) -> (Vec<i32>, Vec<u32>) {
        let search_k = search_k.unwrap_or(n * self.roots.len());

        let mut heap: BinaryHeap<(u32, i32)> = BinaryHeap::with_capacity(self.roots.len() + 1);
        for &root in &self.roots {
            heap.push((hamming::INITIAL_KEY, root));
        }

        // search_k may be far larger than the forest can yield; size the
        // pool by what the leaves can actually produce.
        let expected = search_k.min(self.n_items as usize * self.roots.len());
        let mut nns: Vec<i32> = Vec::with_capacity(expected);
        while nns.len() < search_k {
            let Some((key, i)) = heap.pop() else {
                break;
            };
            let node = self.arena.node(i);
            let count = node.n_descendants();
            if count == 1 && i < self.n_items {
                nns.push(i);
            } else if count <= self.k {
                nns.extend_from_slice(&node.group_ids());
            } else {
                let query_side = hamming::side(node.split_bit(), query);
                for child in 0..2 {
                    heap.push((hamming::descend_key(key, query_side, child), node.child(child)));
                }
            }
        }

        // Trees overlap, so the pool carries duplicates; distinct value
        // nodes are ranked by true distance.
        nns.sort_unstable();
        nns.dedup();
        let mut ranked: Vec<(u32, i32)> = Vec::with_capacity(nns.len());
        for j in nns {
            let node = self.arena.node(j);
            if node.n_descendants() == 1 {
                let v = node.vector(self.f);
                ranked.push((hamming::distance(query, &v), j));
            }
        }

        let p = n.min(ranked.len());
        if p < ranked.len() {
            // Only the best p pairs need full ordering.
            ranked.select_nth_unstable(p);
            ranked.truncate(p);
        }
        ranked.sort_unstable();

        let mut ids = Vec::with_capacity(p);
        let mut distances = Vec::with_capacity(p);
        for (d, j) in ranked {
            ids.push(j);
            distances.push(d);
        }
        (ids, distances)
    }
}
