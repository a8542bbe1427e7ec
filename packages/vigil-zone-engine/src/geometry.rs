//! Standalone point-in-polygon and polygon-validity checks, kept free of any
//! zone-engine state so they're trivial to exercise directly in tests.

/// Ray-cast point-in-polygon; a point exactly on an edge counts as inside.
/// Cross products promote to `i64` to avoid overflow on the widest
/// coordinates the protocol carries (`i32` millimeters).
pub fn point_in_polygon(px: i32, py: i32, vertices: &[(i32, i32)]) -> bool {
    if on_any_edge(px, py, vertices) {
        return true;
    }
    let n = vertices.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        let straddles = (yi > py) != (yj > py);
        if straddles {
            let x_intersect = xi as i64
                + ((py as i64 - yi as i64) * (xj as i64 - xi as i64)) / (yj as i64 - yi as i64);
            if (px as i64) < x_intersect {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn on_segment(px: i32, py: i32, a: (i32, i32), b: (i32, i32)) -> bool {
    let (ax, ay) = (a.0 as i64, a.1 as i64);
    let (bx, by) = (b.0 as i64, b.1 as i64);
    let (px, py) = (px as i64, py as i64);
    let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
    if cross != 0 {
        return false;
    }
    let within_x = px >= ax.min(bx) && px <= ax.max(bx);
    let within_y = py >= ay.min(by) && py <= ay.max(by);
    within_x && within_y
}

fn on_any_edge(px: i32, py: i32, vertices: &[(i32, i32)]) -> bool {
    let n = vertices.len();
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        if on_segment(px, py, a, b) {
            return true;
        }
    }
    false
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolygonError {
    #[error("vertex count {0} out of range [3,8]")]
    VertexCount(usize),
    #[error("edges {0} and {1} intersect")]
    SelfIntersecting(usize, usize),
}

/// Validates vertex count and that no pair of non-adjacent edges intersects.
pub fn validate_polygon(vertices: &[(i32, i32)]) -> Result<(), PolygonError> {
    let n = vertices.len();
    if !(3..=8).contains(&n) {
        return Err(PolygonError::VertexCount(n));
    }
    for i in 0..n {
        let a1 = vertices[i];
        let a2 = vertices[(i + 1) % n];
        for j in (i + 1)..n {
            if j == i || (j + 1) % n == i || (i + 1) % n == j {
                continue;
            }
            let b1 = vertices[j];
            let b2 = vertices[(j + 1) % n];
            if segments_intersect(a1, a2, b1, b2) {
                return Err(PolygonError::SelfIntersecting(i, j));
            }
        }
    }
    Ok(())
}

fn orientation(a: (i32, i32), b: (i32, i32), c: (i32, i32)) -> i64 {
    let (ax, ay) = (a.0 as i64, a.1 as i64);
    let (bx, by) = (b.0 as i64, b.1 as i64);
    let (cx, cy) = (c.0 as i64, c.1 as i64);
    (bx - ax) * (cy - ay) - (by - ay) * (cx - ax)
}

fn segments_intersect(a1: (i32, i32), a2: (i32, i32), b1: (i32, i32), b2: (i32, i32)) -> bool {
    let o1 = orientation(a1, a2, b1);
    let o2 = orientation(a1, a2, b2);
    let o3 = orientation(b1, b2, a1);
    let o4 = orientation(b1, b2, a2);
    (o1 > 0) != (o2 > 0) && (o1 != 0) && (o2 != 0) && (o3 > 0) != (o4 > 0) && (o3 != 0) && (o4 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<(i32, i32)> {
        vec![(0, 0), (2000, 0), (2000, 2000), (0, 2000)]
    }

    #[test]
    fn center_is_inside() {
        assert!(point_in_polygon(1000, 1000, &square()));
    }

    #[test]
    fn outside_is_outside() {
        assert!(!point_in_polygon(3000, 3000, &square()));
    }

    #[test]
    fn boundary_point_is_inside() {
        assert!(point_in_polygon(0, 1000, &square()));
        assert!(point_in_polygon(2000, 1000, &square()));
    }

    #[test]
    fn rejects_too_few_vertices() {
        assert_eq!(
            validate_polygon(&[(0, 0), (1, 1)]),
            Err(PolygonError::VertexCount(2))
        );
    }

    #[test]
    fn rejects_self_intersecting_bowtie() {
        let bowtie = vec![(0, 0), (2000, 2000), (2000, 0), (0, 2000)];
        assert!(validate_polygon(&bowtie).is_err());
    }

    #[test]
    fn accepts_simple_square() {
        assert!(validate_polygon(&square()).is_ok());
    }
}
