//! bitforest: forest-based approximate nearest neighbor search over packed
//! binary vectors under Hamming distance.
//!
//! Items are fixed-dimension bit vectors packed into 32-bit words. A forest
//! of random-projection binary trees is built over them; queries traverse
//! every tree with a shared best-first priority queue and re-rank the pooled
//! candidates by true Hamming distance.
//!
//! # Algorithm
//!
//! - **Build**: each tree recursively partitions the item set by a randomly
//!   chosen bit whose two sides are both non-empty, falling back to fair
//!   coin flips when no such bit exists (e.g. duplicate vectors). Subtrees
//!   at or below the inline group capacity collapse into a single node.
//! - **Search**: a max-heap seeded with every root drains the forest
//!   best-first; the priority key counts how often the query stayed on its
//!   own side of the splits, so well-matched deep subtrees surface early.
//!   Candidates are deduplicated and the best `n` by true distance win.
//! - **Persistence**: the node arena saves as one raw block behind a small
//!   header and loads back by read-only memory mapping, so a loaded index
//!   shares pages with the OS cache and costs no deserialization.
//!
//! # Example
//!
//! ```
//! use bitforest::BitForestIndex;
//!
//! // Vectors are one 32-bit word wide: f = 1.
//! let mut index = BitForestIndex::new(1);
//! index.add_item(0, &[0b0011])?;
//! index.add_item(1, &[0b0110])?;
//! index.add_item(2, &[0b1111])?;
//! index.build(8)?;
//!
//! assert_eq!(index.get_distance(0, 1), 2);
//!
//! let (ids, distances) = index.get_nns_by_vector(&[0b0011], 2, None)?;
//! assert_eq!(ids[0], 0);
//! assert_eq!(distances[0], 0);
//! # Ok::<(), bitforest::ForestError>(())
//! ```
//!
//! # Determinism
//!
//! Builds are randomized but reproducible: with a fixed seed
//! ([`BitForestIndex::set_seed`]) the same insertion sequence produces a
//! byte-identical arena, and queries on a fixed index are bit-identical
//! across runs.

mod arena;
mod node;
mod persistence;

pub mod error;
pub mod forest;
pub mod hamming;
pub mod random;

pub use error::{ForestError, Result};
pub use forest::BitForestIndex;
pub use random::RandomSource;
