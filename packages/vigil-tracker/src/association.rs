//! Gated nearest-neighbor association: greedy minimum-cost pair extraction
//! over a small, dense cost matrix (at most 3 tracks by 3 detections, so a
//! full Hungarian solver would be overkill).

pub const INFEASIBLE: f64 = f64::INFINITY;

/// Builds the track-by-detection cost matrix and greedily extracts
/// minimum-cost pairs until none remain below [`INFEASIBLE`]. Ties break by
/// lower track index, then lower detection index, since `track_positions`
/// and `detections` are iterated in slot order.
///
/// Returns `(track_idx, detection_idx)` pairs.
pub fn associate(
    track_positions: &[(f64, f64)],
    gates_mm: &[f64],
    detections: &[(f64, f64)],
) -> Vec<(usize, usize)> {
    let n_tracks = track_positions.len();
    let n_dets = detections.len();
    let mut cost = vec![vec![INFEASIBLE; n_dets]; n_tracks];
    for (i, &(tx, ty)) in track_positions.iter().enumerate() {
        let gate = gates_mm[i];
        for (j, &(dx, dy)) in detections.iter().enumerate() {
            let dist = ((tx - dx).powi(2) + (ty - dy).powi(2)).sqrt();
            if dist <= gate {
                cost[i][j] = dist;
            }
        }
    }

    let mut used_tracks = vec![false; n_tracks];
    let mut used_dets = vec![false; n_dets];
    let mut pairs = Vec::new();

    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..n_tracks {
            if used_tracks[i] {
                continue;
            }
            for j in 0..n_dets {
                if used_dets[j] {
                    continue;
                }
                let c = cost[i][j];
                if !c.is_finite() {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((_, _, bc)) => c < bc,
                };
                if better {
                    best = Some((i, j, c));
                }
            }
        }
        match best {
            Some((i, j, _)) => {
                used_tracks[i] = true;
                used_dets[j] = true;
                pairs.push((i, j));
            }
            None => break,
        }
    }

    pairs
}
