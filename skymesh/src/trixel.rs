//! Trixels: the triangular cells of the hierarchical mesh.
//!
//! The sphere is divided into 8 root triangles (ids 8 through 15, level 1);
//! each triangle splits into 4 children by connecting the midpoints of its
//! edges, and a child's id appends two bits to its parent's. A level-L id
//! therefore occupies 2L+2 bits, and moving between levels is bit shifting.

use nalgebra::Vector3;
use once_cell::sync::Lazy;

/// Integer id of a trixel, encoding the path from its root triangle.
pub type TrixelId = u64;

/// Mesh level at which catalog rows store their trixel id.
pub const CATALOG_LEVEL: u32 = 21;

/// Subdivision level of a valid trixel id, or `None` if the id is not a
/// trixel id (roots 8..=15 are level 1).
pub fn level_of(id: TrixelId) -> Option<u32> {
    if id < 8 {
        return None;
    }
    let bits = 64 - id.leading_zeros();
    if bits % 2 != 0 {
        return None;
    }
    Some(bits / 2 - 1)
}

/// Map a trixel id to its ancestor at `level`.
///
/// # Panics
/// If `id` is invalid or `level` is finer than the id's own level.
pub fn ancestor_id(id: TrixelId, level: u32) -> TrixelId {
    let Some(own) = level_of(id) else {
        panic!("{id} is not a valid trixel id");
    };
    assert!(level <= own, "level {level} is finer than the id's level {own}");
    id >> (2 * (own - level))
}

/// Half-open id range `[lo, hi)` covering every descendant of `id` at
/// `level`, used to turn one coarse trixel into a catalog range query.
///
/// # Panics
/// If `id` is invalid or `level` is coarser than the id's own level.
pub fn descendant_range(id: TrixelId, level: u32) -> (TrixelId, TrixelId) {
    let Some(own) = level_of(id) else {
        panic!("{id} is not a valid trixel id");
    };
    assert!(level >= own, "level {level} is coarser than the id's level {own}");
    let shift = 2 * (level - own);
    (id << shift, (id + 1) << shift)
}

/// One triangular mesh cell: its id plus the three unit-vector corners,
/// ordered counterclockwise seen from outside the sphere.
#[derive(Debug, Clone)]
pub struct Trixel {
    id: TrixelId,
    corners: [Vector3<f64>; 3],
}

// Corners of the 8 root triangles, built on the J2000 axes. The southern
// roots wrap the pole at -z, the northern roots the pole at +z.
static ROOTS: Lazy<[Trixel; 8]> = Lazy::new(|| {
    let v0 = Vector3::new(0.0, 0.0, 1.0);
    let v1 = Vector3::new(1.0, 0.0, 0.0);
    let v2 = Vector3::new(0.0, 1.0, 0.0);
    let v3 = Vector3::new(-1.0, 0.0, 0.0);
    let v4 = Vector3::new(0.0, -1.0, 0.0);
    let v5 = Vector3::new(0.0, 0.0, -1.0);
    [
        Trixel { id: 8, corners: [v1, v5, v2] },
        Trixel { id: 9, corners: [v2, v5, v3] },
        Trixel { id: 10, corners: [v3, v5, v4] },
        Trixel { id: 11, corners: [v4, v5, v1] },
        Trixel { id: 12, corners: [v1, v0, v4] },
        Trixel { id: 13, corners: [v4, v0, v3] },
        Trixel { id: 14, corners: [v3, v0, v2] },
        Trixel { id: 15, corners: [v2, v0, v1] },
    ]
});

impl Trixel {
    /// The 8 level-1 trixels covering the whole sphere.
    pub fn roots() -> &'static [Trixel; 8] {
        &ROOTS
    }

    /// Rebuild a trixel from its id by walking the subdivision path.
    ///
    /// # Panics
    /// If `id` is not a valid trixel id.
    pub fn from_id(id: TrixelId) -> Self {
        let Some(level) = level_of(id) else {
            panic!("{id} is not a valid trixel id");
        };
        let root = (id >> (2 * (level - 1))) as usize;
        let mut trixel = ROOTS[root - 8].clone();
        let mut remaining = level - 1;
        while remaining > 0 {
            let digit = ((id >> (2 * (remaining - 1))) & 3) as usize;
            trixel = trixel.child(digit);
            remaining -= 1;
        }
        trixel
    }

    pub fn id(&self) -> TrixelId {
        self.id
    }

    pub fn level(&self) -> u32 {
        // Valid by construction.
        level_of(self.id).unwrap_or(0)
    }

    pub fn corners(&self) -> &[Vector3<f64>; 3] {
        &self.corners
    }

    /// Unit vector through the trixel's centroid.
    pub fn center(&self) -> Vector3<f64> {
        (self.corners[0] + self.corners[1] + self.corners[2]).normalize()
    }

    /// Angular radius in radians: the largest center-to-corner separation,
    /// so the cap at this radius encloses the whole trixel.
    pub fn radius(&self) -> f64 {
        let center = self.center();
        self.corners
            .iter()
            .map(|c| center.dot(c).clamp(-1.0, 1.0).acos())
            .fold(0.0, f64::max)
    }

    /// True when the unit vector `point` lies inside the trixel. Points on
    /// an edge count as inside, so a boundary point may satisfy two
    /// neighboring trixels.
    pub fn contains(&self, point: &Vector3<f64>) -> bool {
        for i in 0..3 {
            let edge_normal = self.corners[i].cross(&self.corners[(i + 1) % 3]);
            if edge_normal.dot(point) < 0.0 {
                return false;
            }
        }
        true
    }

    /// The four children one level down: three corner triangles plus the
    /// inverted middle triangle, in the id order `4k..4k+3`.
    pub fn children(&self) -> [Trixel; 4] {
        let [c0, c1, c2] = self.corners;
        let w0 = (c1 + c2).normalize();
        let w1 = (c0 + c2).normalize();
        let w2 = (c0 + c1).normalize();
        let base = self.id << 2;
        [
            Trixel { id: base, corners: [c0, w2, w1] },
            Trixel { id: base + 1, corners: [c1, w0, w2] },
            Trixel { id: base + 2, corners: [c2, w1, w0] },
            Trixel { id: base + 3, corners: [w0, w1, w2] },
        ]
    }

    fn child(&self, k: usize) -> Trixel {
        let children = self.children();
        children[k].clone()
    }
}

/// Enumerate every trixel at `level`, depth-first from the roots. A level-L
/// mesh has `8 * 4^(L-1)` cells.
///
/// # Panics
/// If `level` is 0.
pub fn leaf_trixels(level: u32) -> Vec<Trixel> {
    assert!(level >= 1, "mesh levels start at 1");
    let mut leaves = Vec::with_capacity(8usize << (2 * (level - 1) as usize));
    let mut stack: Vec<Trixel> = ROOTS.iter().cloned().collect();
    while let Some(trixel) = stack.pop() {
        if trixel.level() == level {
            leaves.push(trixel);
        } else {
            stack.extend(trixel.children());
        }
    }
    leaves.sort_by_key(Trixel::id);
    leaves
}
