use drift_core::{OffsetVector, Translation};
use log::debug;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{RegistrationError, RegistrationResult};

/// Outcome of the density-mode search over a set of offsets
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Consensus {
    /// Index of the offset with the most neighbours
    pub winner: usize,
    /// Neighbours of the winner, itself included
    pub neighbour_count: usize,
    /// Indices of the consensus set, ascending
    pub members: Vec<usize>,
    pub centroid: OffsetVector,
    pub translation: Translation,
}

/// Finds the densest offset and averages its neighbourhood.
///
/// Two offsets are neighbours when their squared distance is below
/// `radius²`; every offset neighbours itself. The offset with the most
/// neighbours wins, the lowest index on ties. The translation is the
/// per-axis mean of the winner's neighbourhood, rounded to the nearest
/// integer with ties to even. Non-finite offsets are rejected.
pub fn density_mode(offsets: &[OffsetVector], radius: f64) -> RegistrationResult<Consensus> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(RegistrationError::invalid(
            "consensus_radius",
            format!("{} must be finite and > 0", radius),
        ));
    }
    if offsets.is_empty() {
        return Err(RegistrationError::InsufficientData { stage: "consensus" });
    }
    if let Some(i) = offsets.iter().position(|o| !(o.dx.is_finite() && o.dy.is_finite())) {
        return Err(RegistrationError::invalid(
            "offsets",
            format!("offset #{} ({}, {}) is not finite", i, offsets[i].dx, offsets[i].dy),
        ));
    }

    let r2 = radius * radius;
    let counts: Vec<usize> = offsets
        .par_iter()
        .map(|a| offsets.iter().filter(|b| a.squared_distance(b) < r2).count())
        .collect();

    let mut winner = 0;
    for (i, &count) in counts.iter().enumerate() {
        if count > counts[winner] {
            winner = i;
        }
    }

    let centre = offsets[winner];
    let members: Vec<usize> = (0..offsets.len())
        .filter(|&i| centre.squared_distance(&offsets[i]) < r2)
        .collect();
    if members.is_empty() {
        return Err(RegistrationError::InsufficientData { stage: "consensus" });
    }
    let n = members.len() as f64;
    let centroid = OffsetVector::new(
        members.iter().map(|&i| offsets[i].dx).sum::<f64>() / n,
        members.iter().map(|&i| offsets[i].dy).sum::<f64>() / n,
    );
    let translation = Translation::from_rounded(centroid);

    debug!(
        "consensus: offset #{} wins with {} of {} neighbours, centroid ({:.3}, {:.3}) -> {}",
        winner,
        members.len(),
        offsets.len(),
        centroid.dx,
        centroid.dy,
        translation
    );

    Ok(Consensus {
        winner,
        neighbour_count: counts[winner],
        members,
        centroid,
        translation,
    })
}

pub fn estimate_translation(offsets: &[OffsetVector], radius: f64) -> RegistrationResult<Translation> {
    density_mode(offsets, radius).map(|c| c.translation)
}
