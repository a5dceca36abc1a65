use super::{ConcaveEdge, DecompositionError, DecompositionParameters};
use crate::math::{Point, Real, Rotation, UnitVector, Vector};
use crate::mesh::VertexArena;

/// Two directions whose cross product has a squared norm below this are
/// treated as collinear when candidate cut planes are enumerated.
const COLLINEAR_EPSILON: Real = 1.0e-10;

/// An oriented cutting plane in normal/bias form.
///
/// A point `p` lies on the plane when `normal · p == bias`.
#[derive(Clone, Copy, Debug)]
pub struct SplitPlane {
    normal: UnitVector<Real>,
    bias: Real,
}

impl SplitPlane {
    /// The plane through `point` with the given unit `normal`.
    pub fn from_point_normal(point: &Point<Real>, normal: UnitVector<Real>) -> Self {
        Self {
            normal,
            bias: normal.dot(&point.coords),
        }
    }

    /// This plane's unit normal.
    pub fn normal(&self) -> &UnitVector<Real> {
        &self.normal
    }

    /// Signed distance from `point` to the plane, positive on the side the
    /// normal points into.
    pub fn signed_distance(&self, point: &Point<Real>) -> Real {
        self.normal.dot(&point.coords) - self.bias
    }

    /// The translation projecting `point` onto the plane.
    pub fn offset_onto(&self, point: &Point<Real>) -> Vector<Real> {
        -self.signed_distance(point) * self.normal.into_inner()
    }

    /// The same plane with its orientation reversed.
    pub fn flipped(&self) -> Self {
        Self {
            normal: UnitVector::new_unchecked(-self.normal.into_inner()),
            bias: -self.bias,
        }
    }

    /// A rotation mapping this plane's normal onto the `+z` axis, used to
    /// project plane-resident polygons into 2D.
    pub fn rotation_to_z(&self) -> Rotation<Real> {
        Rotation::rotation_between(&self.normal, &Vector::z()).unwrap_or_else(|| {
            // The normal points along -z exactly; any half-turn through an
            // in-plane axis does.
            Rotation::from_axis_angle(&Vector::x_axis(), core::f64::consts::PI as Real)
        })
    }
}

/// Chooses the plane cutting through the `seed` edge that kills the largest
/// number of other concave edges.
///
/// Candidate planes contain `seed` and one non-collinear edge leaving either
/// of its endpoints; a candidate's score is the number of tracked concave
/// edges lying entirely on it within the on-plane tolerance. Ties prefer the
/// candidate edge best aligned with the seed's bisecting direction.
pub(crate) fn find_split_plane(
    arena: &VertexArena,
    concave: &[ConcaveEdge],
    seed: ConcaveEdge,
    params: &DecompositionParameters,
    depth: usize,
) -> Result<SplitPlane, DecompositionError> {
    let seed_dir = arena[seed.i1].pos - arena[seed.i0].pos;
    let mut best: Option<(SplitPlane, usize, Real)> = None;

    for (origin, other) in [(seed.i0, seed.i1), (seed.i1, seed.i0)] {
        let origin_pos = arena[origin].pos;
        for &candidate in arena[origin].neighbors.iter() {
            if candidate == other {
                continue;
            }
            let candidate_dir = arena[candidate].pos - origin_pos;
            let normal = seed_dir.cross(&candidate_dir);
            if normal.norm_squared() <= COLLINEAR_EPSILON {
                continue;
            }

            let plane =
                SplitPlane::from_point_normal(&origin_pos, UnitVector::new_normalize(normal));
            let killed = concave
                .iter()
                .filter(|e| {
                    plane.signed_distance(&arena[e.i0].pos).abs()
                        <= params.point_on_plane_tolerance
                        && plane.signed_distance(&arena[e.i1].pos).abs()
                            <= params.point_on_plane_tolerance
                })
                .count();
            let alignment = candidate_dir.normalize().dot(&seed.bisect_dir).abs();

            let better = match &best {
                None => true,
                Some((_, best_killed, best_alignment)) => {
                    killed > *best_killed
                        || (killed == *best_killed && alignment > *best_alignment)
                }
            };
            if better {
                best = Some((plane, killed, alignment));
            }
        }
    }

    match best {
        Some((plane, killed, _)) => {
            log::trace!(
                "depth {depth}: cut plane kills {killed} of {} concave edges",
                concave.len()
            );
            Ok(plane)
        }
        None => Err(DecompositionError::NoSplitPlaneFound {
            i0: seed.i0,
            i1: seed.i1,
            depth,
        }),
    }
}
