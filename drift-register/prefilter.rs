use drift_core::OffsetVector;
use log::debug;

/// Per-axis mean and population standard deviation of a set of offsets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetStatistics {
    pub mean: OffsetVector,
    pub std_dev: OffsetVector,
}

/// `None` for an empty set
pub fn offset_statistics(offsets: &[OffsetVector]) -> Option<OffsetStatistics> {
    if offsets.is_empty() {
        return None;
    }
    let n = offsets.len() as f64;
    let mean = OffsetVector::new(
        offsets.iter().map(|o| o.dx).sum::<f64>() / n,
        offsets.iter().map(|o| o.dy).sum::<f64>() / n,
    );
    let var_x = offsets.iter().map(|o| (o.dx - mean.dx).powi(2)).sum::<f64>() / n;
    let var_y = offsets.iter().map(|o| (o.dy - mean.dy).powi(2)).sum::<f64>() / n;
    Some(OffsetStatistics {
        mean,
        std_dev: OffsetVector::new(var_x.sqrt(), var_y.sqrt()),
    })
}

/// Keeps the offsets strictly within one standard deviation of the mean on
/// both axes, in input order. May return an empty set.
pub fn prefilter(offsets: &[OffsetVector]) -> Vec<OffsetVector> {
    let Some(stats) = offset_statistics(offsets) else {
        return Vec::new();
    };
    let kept: Vec<OffsetVector> = offsets
        .iter()
        .filter(|o| {
            (o.dx - stats.mean.dx).abs() < stats.std_dev.dx
                && (o.dy - stats.mean.dy).abs() < stats.std_dev.dy
        })
        .copied()
        .collect();
    debug!(
        "prefilter: kept {} of {} offsets (mean ({:.2}, {:.2}), std ({:.2}, {:.2}))",
        kept.len(),
        offsets.len(),
        stats.mean.dx,
        stats.mean.dy,
        stats.std_dev.dx,
        stats.std_dev.dy
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(dx: f64, dy: f64) -> OffsetVector {
        OffsetVector::new(dx, dy)
    }

    #[test]
    fn test_statistics() {
        assert!(offset_statistics(&[]).is_none());
        let stats = offset_statistics(&[v(0.0, 1.0), v(2.0, 1.0), v(4.0, 1.0)]).unwrap();
        assert_eq!(stats.mean, v(2.0, 1.0));
        assert!((stats.std_dev.dx - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.std_dev.dy, 0.0);
    }

    #[test]
    fn test_drops_far_offsets() {
        let mut offsets = vec![v(5.0, -3.0); 8];
        offsets.push(v(50.0, 40.0));
        offsets.push(v(-40.0, 30.0));
        let kept = prefilter(&offsets);
        assert_eq!(kept, vec![v(5.0, -3.0); 8]);
    }

    #[test]
    fn test_identical_offsets_all_dropped() {
        // Zero spread: |v - mean| < 0 never holds
        assert!(prefilter(&[v(1.0, 1.0); 5]).is_empty());
        assert!(prefilter(&[]).is_empty());
    }

    #[test]
    fn test_one_flat_axis_drops_everything() {
        let offsets = [v(0.0, 2.0), v(1.0, 2.0), v(2.0, 2.0)];
        assert!(prefilter(&offsets).is_empty());
    }

    proptest! {
        #[test]
        fn prop_prefilter_keeps_ordered_subset(
            raw in prop::collection::vec((-50i32..50, -50i32..50), 0..60)
        ) {
            let offsets: Vec<OffsetVector> =
                raw.iter().map(|&(x, y)| v(x as f64, y as f64)).collect();
            let kept = prefilter(&offsets);
            prop_assert!(kept.len() <= offsets.len());

            // Subsequence of the input
            let mut rest = offsets.iter();
            for k in &kept {
                prop_assert!(rest.any(|o| o == k));
            }

            if let Some(stats) = offset_statistics(&offsets) {
                for k in &kept {
                    prop_assert!((k.dx - stats.mean.dx).abs() < stats.std_dev.dx);
                    prop_assert!((k.dy - stats.mean.dy).abs() < stats.std_dev.dy);
                }
            }
        }
    }
}
