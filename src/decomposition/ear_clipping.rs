//! Ear-clipping triangulation for the planar polygons left by a cut.
//! Based on <https://github.com/ivanfratric/polypartition>.

use crate::math::Real;
use na::Point2;

/// Winding of a polygon corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Winding {
    CounterClockwise,
    Clockwise,
    /// Collinear, degenerate, or not finite.
    Neither,
}

/// Winding of the corner `prev -> tip -> next`.
///
/// Counter-clockwise corners of a counter-clockwise polygon are the convex
/// ones, the only candidates for ear tips. A corner that cannot be oriented
/// (collinear points, NaN from a degenerate projection) is `Neither`: it is
/// never an ear, and clipping runs out of ears and fails cleanly instead of
/// panicking mid-decomposition.
fn corner_winding(prev: &Point2<Real>, tip: &Point2<Real>, next: &Point2<Real>) -> Winding {
    let cross = (prev - tip).perp(&(next - tip));
    if cross < 0.0 {
        Winding::CounterClockwise
    } else if cross > 0.0 {
        Winding::Clockwise
    } else {
        // Covers both exact collinearity and NaN.
        Winding::Neither
    }
}

/// Whether `p` lies inside or on the border of the triangle `(a, b, c)`.
///
/// `None` when the triangle is degenerate and containment is meaningless.
fn point_in_triangle(
    p: &Point2<Real>,
    a: &Point2<Real>,
    b: &Point2<Real>,
    c: &Point2<Real>,
) -> Option<bool> {
    let w1 = corner_winding(p, a, b);
    let w2 = corner_winding(p, b, c);
    let w3 = corner_winding(p, c, a);

    if w1 == Winding::Neither && w2 == Winding::Neither && w3 == Winding::Neither {
        return None;
    }

    let has_cw = [w1, w2, w3].contains(&Winding::Clockwise);
    let has_ccw = [w1, w2, w3].contains(&Winding::CounterClockwise);
    // Strictly inside points see every corner wind the same way; border
    // points see some degenerate corners but never both windings.
    Some(!(has_cw && has_ccw))
}

/// The information stored for each vertex while ears are clipped.
#[derive(Clone, Default)]
struct VertexInfo {
    /// Whether the vertex is still active i.e. it has not been clipped yet.
    is_active: bool,
    /// Whether the vertex is the tip of an ear and should be clipped.
    is_ear: bool,
    /// How small the angle of the ear is. Ears with a smaller angle are clipped first.
    pointiness: Real,
    /// The index of the previous vertex.
    p_prev: usize,
    /// The index of the next vertex.
    p_next: usize,
}

/// Updates the fields `pointiness` and `is_ear` for a given vertex index.
fn update_vertex(idx: usize, vertex_info: &mut VertexInfo, points: &[Point2<Real>]) -> bool {
    // Get the point and its neighbors.
    let p = points[idx];
    let p1 = points[vertex_info.p_prev];
    let p3 = points[vertex_info.p_next];

    // Get the pointiness.
    let vec1 = (p1 - p).normalize();
    let vec3 = (p3 - p).normalize();
    vertex_info.pointiness = vec1.dot(&vec3);
    if vertex_info.pointiness.is_nan() {
        return false;
    }

    // A point is considered an ear when it is convex and no other points are
    // inside the triangle spanned by it and its two neighbors.
    let mut error = false;
    vertex_info.is_ear = corner_winding(&p1, &p, &p3) == Winding::CounterClockwise
        && (0..points.len())
            .filter(|&i| i != vertex_info.p_prev && i != idx && i != vertex_info.p_next)
            .all(|i| {
                if let Some(inside) = point_in_triangle(&points[i], &p1, &p, &p3) {
                    !inside
                } else {
                    error = true;
                    true
                }
            });
    !error
}

/// Clips one counter-clockwise simple polygon into triangles.
///
/// Every triangle is handed to `emit` as polygon indices `[prev, tip, next]`;
/// the last remaining triangle is flagged so callers splicing adjacency can
/// treat the natural closure of the polygon separately. Returns `false` when
/// the polygon cannot be clipped (wrong winding or degenerate geometry).
pub(crate) fn triangulate_polygon(
    points: &[Point2<Real>],
    mut emit: impl FnMut([u32; 3], bool),
) -> bool {
    let n_vertices = points.len();
    if n_vertices < 3 {
        return false;
    }

    // Initialize the information about each vertex.
    let mut vertex_info = vec![VertexInfo::default(); n_vertices];
    let success = vertex_info.iter_mut().enumerate().all(|(i, info)| {
        info.is_active = true;
        info.p_prev = if i == 0 { n_vertices - 1 } else { i - 1 };
        info.p_next = if i == n_vertices - 1 { 0 } else { i + 1 };
        update_vertex(i, info, points)
    });
    if !success {
        return false;
    }

    for i in 0..n_vertices - 3 {
        // Search through all active ears and pick out the pointiest.
        let maybe_ear = vertex_info
            .iter()
            .enumerate()
            .filter(|(_, info)| info.is_active && info.is_ear)
            .max_by(|(_, info1), (_, info2)| {
                // The unwrap here is safe since we check for NaN when
                // we assign the pointiness value.
                info1.pointiness.partial_cmp(&info2.pointiness).unwrap()
            });

        // If we found an ear, clip it. Else the algorithm failed.
        let (ear_i, _) = match maybe_ear {
            Some(ear) => ear,
            None => return false,
        };

        // Deactivate the tip of the ear.
        vertex_info[ear_i].is_active = false;

        // Get the indices of the neighbors and emit the clipped ear.
        let VertexInfo { p_prev, p_next, .. } = vertex_info[ear_i];
        emit([p_prev as u32, ear_i as u32, p_next as u32], false);

        // Connect the remaining two vertices.
        vertex_info[p_prev].p_next = vertex_info[ear_i].p_next;
        vertex_info[p_next].p_prev = vertex_info[ear_i].p_prev;

        // Only three vertices remain and those are guaranteed to be convex
        // so there is no point in updating the remaining vertex information.
        if i == n_vertices - 4 {
            break;
        };

        // Update the info for the remaining two vertices.
        if !update_vertex(p_prev, &mut vertex_info[p_prev], points)
            || !update_vertex(p_next, &mut vertex_info[p_next], points)
        {
            return false;
        }
    }

    // Emit the remaining triangle, flagged as the closing one.
    if let Some((i, info)) = vertex_info
        .iter()
        .enumerate()
        .find(|(_, info)| info.is_active)
    {
        emit([info.p_prev as u32, i as u32, info.p_next as u32], true);
        true
    } else {
        false
    }
}

// --- Unit tests ----------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    fn collect(points: &[Point2<Real>]) -> Option<Vec<([u32; 3], bool)>> {
        let mut triangles = Vec::new();
        if triangulate_polygon(points, |tri, is_last| triangles.push((tri, is_last))) {
            Some(triangles)
        } else {
            None
        }
    }

    #[test]
    fn corner_winding_matches_polygon_orientation() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 0.0);
        let c = Point2::new(1.0, 1.0);
        assert_eq!(corner_winding(&a, &b, &c), Winding::CounterClockwise);
        assert_eq!(corner_winding(&c, &b, &a), Winding::Clockwise);
        assert_eq!(corner_winding(&a, &b, &Point2::new(2.0, 0.0)), Winding::Neither);
        assert_eq!(
            corner_winding(&a, &b, &Point2::new(Real::NAN, 0.0)),
            Winding::Neither
        );
    }

    #[test]
    fn triangle_ccw() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
        ];
        let triangles = collect(&points).unwrap();
        assert_eq!(triangles, vec![([2, 0, 1], true)]);
    }

    #[test]
    fn square_ccw() {
        let points = vec![
            Point2::new(0.0, 0.0), // 0
            Point2::new(1.0, 0.0), // 1
            Point2::new(1.0, 1.0), // 2
            Point2::new(0.0, 1.0), // 3
        ];
        let triangles = collect(&points).unwrap();
        assert_eq!(triangles, vec![([2, 3, 0], false), ([2, 0, 1], true)]);
    }

    #[test]
    fn square_cw() {
        let points = vec![
            Point2::new(0.0, 1.0), // 0
            Point2::new(1.0, 1.0), // 1
            Point2::new(1.0, 0.0), // 2
            Point2::new(0.0, 0.0), // 3
        ];
        // This fails because we expect counter-clockwise ordering.
        assert!(collect(&points).is_none());
    }

    #[test]
    fn square_with_dent() {
        let points = vec![
            Point2::new(0.0, 0.0), // 0
            Point2::new(1.0, 0.0), // 1
            Point2::new(0.5, 0.5), // 2
            Point2::new(1.0, 1.0), // 3
            Point2::new(0.0, 1.0), // 4
        ];
        let triangles = collect(&points).unwrap();
        assert_eq!(
            triangles,
            vec![
                ([2, 3, 4], false),
                ([2, 4, 0], false),
                ([2, 0, 1], true),
            ]
        );
    }

    #[test]
    fn degenerate_input_fails_instead_of_panicking() {
        let with_nan = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(Real::NAN, 0.5),
            Point2::new(0.0, 1.0),
        ];
        assert!(collect(&with_nan).is_none());

        let with_repeat = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ];
        assert!(collect(&with_repeat).is_none());
    }
}
