use drift_core::Keypoint;
use crate::types::ScoredKeypoint;

/// Subpixel refinement and non-maximum suppression
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Refine keypoint to subpixel accuracy using quadratic surface fitting
    pub fn refine_keypoint_subpixel(img: &[u8], width: usize, height: usize, kp: Keypoint) -> Keypoint {
        let x = kp.x as usize;
        let y = kp.y as usize;

        // Need a full 3x3 neighbourhood
        if x < 1 || y < 1 || x + 1 >= width || y + 1 >= height {
            return kp;
        }

        let at = |xx: usize, yy: usize| img[yy * width + xx] as f32;
        let samples = [
            [at(x - 1, y - 1), at(x, y - 1), at(x + 1, y - 1)],
            [at(x - 1, y), at(x, y), at(x + 1, y)],
            [at(x - 1, y + 1), at(x, y + 1), at(x + 1, y + 1)],
        ];

        // f(x,y) = Ax² + By² + Cxy + Dx + Ey + F via finite differences
        let dx = (samples[1][2] - samples[1][0]) / 2.0;
        let dy = (samples[2][1] - samples[0][1]) / 2.0;
        let dxx = samples[1][2] - 2.0 * samples[1][1] + samples[1][0];
        let dyy = samples[2][1] - 2.0 * samples[1][1] + samples[0][1];
        let dxy = (samples[2][2] - samples[2][0] - samples[0][2] + samples[0][0]) / 4.0;

        let det = dxx * dyy - dxy * dxy;
        if det.abs() < 1e-6 {
            return kp;
        }

        let offset_x = (-(dyy * dx - dxy * dy) / det).clamp(-0.5, 0.5);
        let offset_y = (-(dxx * dy - dxy * dx) / det).clamp(-0.5, 0.5);

        Keypoint {
            x: kp.x + offset_x,
            y: kp.y + offset_y,
            angle: kp.angle,
        }
    }

    /// Greedy suppression, strongest first; output is ordered by descending response
    pub fn non_maximum_suppression(keypoints: &[ScoredKeypoint], min_distance: f32) -> Vec<ScoredKeypoint> {
        if keypoints.is_empty() {
            return Vec::new();
        }

        // Stable sort keeps raster order among equal responses
        let mut sorted_keypoints = keypoints.to_vec();
        sorted_keypoints.sort_by(|a, b| b.response.total_cmp(&a.response));

        let mut suppressed: Vec<ScoredKeypoint> = Vec::new();
        let min_distance_sq = min_distance * min_distance;

        for candidate in sorted_keypoints {
            let is_local_max = suppressed.iter().all(|existing| {
                let dx = candidate.keypoint.x - existing.keypoint.x;
                let dy = candidate.keypoint.y - existing.keypoint.y;
                dx * dx + dy * dy >= min_distance_sq
            });

            if is_local_max {
                suppressed.push(candidate);
            }
        }

        suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(x: f32, y: f32, response: f32) -> ScoredKeypoint {
        ScoredKeypoint {
            keypoint: Keypoint { x, y, angle: 0.0 },
            response,
        }
    }

    #[test]
    fn test_nms_keeps_strongest_of_cluster() {
        let kps = vec![
            scored(10.0, 10.0, 5.0),
            scored(11.0, 10.0, 9.0),
            scored(30.0, 30.0, 1.0),
        ];
        let kept = KeypointRefinement::non_maximum_suppression(&kps, 3.0);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].keypoint.x, 11.0);
        assert_eq!(kept[1].keypoint.x, 30.0);
    }

    #[test]
    fn test_nms_zero_distance_keeps_everything() {
        let kps = vec![scored(1.0, 1.0, 1.0), scored(1.0, 1.0, 2.0)];
        assert_eq!(KeypointRefinement::non_maximum_suppression(&kps, 0.0).len(), 2);
    }

    #[test]
    fn test_subpixel_stays_within_half_pixel() {
        let width = 5;
        let img: Vec<u8> = vec![
            0, 0, 0, 0, 0,
            0, 40, 80, 40, 0,
            0, 80, 200, 120, 0,
            0, 40, 80, 40, 0,
            0, 0, 0, 0, 0,
        ];
        let kp = Keypoint { x: 2.0, y: 2.0, angle: 0.3 };
        let refined = KeypointRefinement::refine_keypoint_subpixel(&img, width, 5, kp);
        assert!((refined.x - 2.0).abs() <= 0.5);
        assert!((refined.y - 2.0).abs() <= 0.5);
        assert!(refined.x > 2.0, "peak leans right: {}", refined.x);
        assert_eq!(refined.angle, 0.3);
    }

    #[test]
    fn test_subpixel_leaves_border_points() {
        let img = vec![0u8; 16];
        let kp = Keypoint { x: 0.0, y: 2.0, angle: 0.0 };
        assert_eq!(KeypointRefinement::refine_keypoint_subpixel(&img, 4, 4, kp), kp);
    }
}
