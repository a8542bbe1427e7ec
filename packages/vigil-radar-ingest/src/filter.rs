use vigil_types::DetectionFrame;

/// Post-parse filter bounds for the tracking radar.
#[derive(Debug, Clone, Copy)]
pub struct FilterConfig {
    pub min_range_mm: i32,
    pub max_range_mm: i32,
    pub max_speed_cm_s: i32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_range_mm: 0,
            max_range_mm: 6000,
            max_speed_cm_s: 500,
        }
    }
}

/// Drops targets with `y` outside `[min_range_mm, max_range_mm]`, `x`
/// outside `[-6000, 6000]`, or `|speed| > max_speed_cm_s`; recounts
/// `target_count` afterward.
pub fn apply_filters(frame: &mut DetectionFrame, config: &FilterConfig) {
    let mut count = 0u8;
    for d in frame.detections.iter_mut() {
        if !d.valid {
            continue;
        }
        let in_range = d.y_mm >= config.min_range_mm
            && d.y_mm <= config.max_range_mm
            && (-6000..=6000).contains(&d.x_mm)
            && d.speed_cm_s.abs() <= config.max_speed_cm_s;
        if in_range {
            count += 1;
        } else {
            *d = vigil_types::Detection::INVALID;
        }
    }
    frame.target_count = count;
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::Detection;

    #[test]
    fn drops_out_of_range_target() {
        let mut frame = DetectionFrame::empty(1, 0);
        frame.detections[0] = Detection {
            valid: true,
            x_mm: 100,
            y_mm: 7000, // beyond max_range_mm
            speed_cm_s: 10,
            resolution_mm: 100,
            signal_quality: 100,
        };
        frame.target_count = 1;
        apply_filters(&mut frame, &FilterConfig::default());
        assert_eq!(frame.target_count, 0);
        assert!(!frame.detections[0].valid);
    }

    #[test]
    fn keeps_in_range_target() {
        let mut frame = DetectionFrame::empty(1, 0);
        frame.detections[0] = Detection {
            valid: true,
            x_mm: 100,
            y_mm: 2000,
            speed_cm_s: 10,
            resolution_mm: 100,
            signal_quality: 100,
        };
        frame.target_count = 1;
        apply_filters(&mut frame, &FilterConfig::default());
        assert_eq!(frame.target_count, 1);
    }
}
