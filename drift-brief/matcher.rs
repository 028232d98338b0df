use drift_core::{Descriptor, MatchNorm};
use log::debug;
use rayon::prelude::*;

/// A nearest-neighbour pairing between two descriptor sets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptorMatch {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
}

/// Distance between two descriptors under the given norm.
///
/// L1 and L2 treat each byte as one coordinate.
pub fn descriptor_distance(norm: MatchNorm, a: &Descriptor, b: &Descriptor) -> f32 {
    match norm {
        MatchNorm::Hamming => a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum::<u32>() as f32,
        MatchNorm::L1 => a
            .iter()
            .zip(b)
            .map(|(&x, &y)| (x as i32 - y as i32).unsigned_abs())
            .sum::<u32>() as f32,
        MatchNorm::L2 => {
            let sq: u32 = a
                .iter()
                .zip(b)
                .map(|(&x, &y)| {
                    let d = x as i32 - y as i32;
                    (d * d) as u32
                })
                .sum();
            (sq as f32).sqrt()
        }
    }
}

/// Exhaustive matcher with optional mutual-nearest-neighbour check
#[derive(Debug, Clone, Copy)]
pub struct BruteForceMatcher {
    norm: MatchNorm,
    cross_check: bool,
}

impl BruteForceMatcher {
    pub fn new(norm: MatchNorm, cross_check: bool) -> Self {
        Self { norm, cross_check }
    }

    /// One match per query descriptor, in query order.
    ///
    /// With cross-checking, a pair survives only if each side is the
    /// other's nearest neighbour. Ties go to the lower index.
    pub fn match_descriptors(&self, query: &[Descriptor], train: &[Descriptor]) -> Vec<DescriptorMatch> {
        if query.is_empty() || train.is_empty() {
            return Vec::new();
        }

        let forward: Vec<(usize, f32)> = query.par_iter().map(|q| self.nearest(q, train)).collect();

        let matches: Vec<DescriptorMatch> = if self.cross_check {
            let backward: Vec<usize> = train.par_iter().map(|t| self.nearest(t, query).0).collect();
            forward
                .iter()
                .enumerate()
                .filter(|&(qi, &(ti, _))| backward[ti] == qi)
                .map(|(qi, &(ti, distance))| DescriptorMatch {
                    query_idx: qi,
                    train_idx: ti,
                    distance,
                })
                .collect()
        } else {
            forward
                .iter()
                .enumerate()
                .map(|(qi, &(ti, distance))| DescriptorMatch {
                    query_idx: qi,
                    train_idx: ti,
                    distance,
                })
                .collect()
        };

        debug!(
            "matched {} of {} query descriptors against {} ({:?}, cross_check={})",
            matches.len(),
            query.len(),
            train.len(),
            self.norm,
            self.cross_check
        );
        matches
    }

    fn nearest(&self, d: &Descriptor, candidates: &[Descriptor]) -> (usize, f32) {
        let mut best = (0, f32::INFINITY);
        for (i, c) in candidates.iter().enumerate() {
            let dist = descriptor_distance(self.norm, d, c);
            if dist < best.1 {
                best = (i, dist);
            }
        }
        best
    }
}
