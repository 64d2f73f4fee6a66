//! S2 cell identifiers.
//!
//! A cell id packs a cube face (3 bits) and a Hilbert-curve position (up to
//! 60 bits) followed by a single marker bit whose position encodes the level.
//! Decoding walks the curve 4 levels at a time through a lookup table, then
//! projects the cell centre from face (u, v) space back onto the sphere.

use crate::location::LatLng;
use std::f64::consts::PI;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

pub const MAX_LEVEL: u32 = 30;
const POS_BITS: u32 = 2 * MAX_LEVEL + 1;
const MAX_SIZE: u64 = 1 << MAX_LEVEL;
const NUM_FACES: u64 = 6;

const LOOKUP_BITS: usize = 4;
const SWAP_MASK: usize = 0x01;
const INVERT_MASK: usize = 0x02;

/// Sub-cell (i, j) offsets in curve order, per orientation.
const POS_TO_IJ: [[usize; 4]; 4] = [
    [0, 1, 3, 2],
    [0, 2, 3, 1],
    [3, 2, 0, 1],
    [3, 1, 0, 2],
];
const POS_TO_ORIENTATION: [usize; 4] = [SWAP_MASK, 0, 0, INVERT_MASK | SWAP_MASK];

const DEG: f64 = 180.0 / PI;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum S2Error {
    #[error("not a hexadecimal cell id: '{0}'")]
    Parse(String),
    #[error("malformed cell id {0:#018x}")]
    Invalid(u64),
}

// ─── Lookup tables ──────────────────────────────────────────────

struct LookupTables {
    /// (i, j, orientation) → (curve position, orientation)
    pos: Vec<u16>,
    /// (curve position, orientation) → (i, j, orientation)
    ij: Vec<u16>,
}

fn tables() -> &'static LookupTables {
    static TABLES: OnceLock<LookupTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let size = 1 << (2 * LOOKUP_BITS + 2);
        let mut t = LookupTables {
            pos: vec![0; size],
            ij: vec![0; size],
        };
        for orientation in [0, SWAP_MASK, INVERT_MASK, SWAP_MASK | INVERT_MASK] {
            init_lookup_cell(&mut t, 0, 0, 0, orientation, 0, orientation);
        }
        t
    })
}

fn init_lookup_cell(
    t: &mut LookupTables,
    level: usize,
    i: usize,
    j: usize,
    orig_orientation: usize,
    pos: usize,
    orientation: usize,
) {
    if level == LOOKUP_BITS {
        let ij = (i << LOOKUP_BITS) + j;
        t.pos[(ij << 2) + orig_orientation] = ((pos << 2) + orientation) as u16;
        t.ij[(pos << 2) + orig_orientation] = ((ij << 2) + orientation) as u16;
        return;
    }
    let r = POS_TO_IJ[orientation];
    for (k, &sub) in r.iter().enumerate() {
        init_lookup_cell(
            t,
            level + 1,
            (i << 1) + (sub >> 1),
            (j << 1) + (sub & 1),
            orig_orientation,
            (pos << 2) + k,
            orientation ^ POS_TO_ORIENTATION[k],
        );
    }
}

// ─── Cell id ────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(pub u64);

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellId({:#018x})", self.0)
    }
}

impl CellId {
    /// Parse a hex id, with or without a `0x` prefix.
    pub fn from_hex(hex: &str) -> Result<Self, S2Error> {
        let digits = hex
            .strip_prefix("0x")
            .or_else(|| hex.strip_prefix("0X"))
            .unwrap_or(hex);
        u64::from_str_radix(digits, 16)
            .map(CellId)
            .map_err(|_| S2Error::Parse(hex.to_string()))
    }

    /// Leaf cell containing the given point.
    pub fn from_lat_lng(point: LatLng) -> Self {
        let lat = point.lat / DEG;
        let lng = point.lng / DEG;
        let xyz = [lat.cos() * lng.cos(), lat.cos() * lng.sin(), lat.sin()];
        let face = xyz_to_face(xyz);
        let (u, v) = face_xyz_to_uv(face, xyz);
        let i = st_to_ij(uv_to_st(u));
        let j = st_to_ij(uv_to_st(v));
        Self::from_face_ij(face, i, j)
    }

    fn from_face_ij(face: usize, i: usize, j: usize) -> Self {
        let t = tables();
        let mut n = (face as u64) << (POS_BITS - 1);
        let mut bits = face & SWAP_MASK;
        let mask = (1 << LOOKUP_BITS) - 1;
        for k in (0..8).rev() {
            bits += ((i >> (k * LOOKUP_BITS)) & mask) << (LOOKUP_BITS + 2);
            bits += ((j >> (k * LOOKUP_BITS)) & mask) << 2;
            bits = t.pos[bits] as usize;
            n |= ((bits >> 2) as u64) << (k * 2 * LOOKUP_BITS);
            bits &= SWAP_MASK | INVERT_MASK;
        }
        CellId(n * 2 + 1)
    }

    pub fn face(self) -> u64 {
        self.0 >> POS_BITS
    }

    fn lsb(self) -> u64 {
        self.0 & self.0.wrapping_neg()
    }

    /// A face below 6 and a marker bit at an even position.
    pub fn is_valid(self) -> bool {
        self.face() < NUM_FACES && (self.lsb() & 0x1555_5555_5555_5555) != 0
    }

    pub fn is_leaf(self) -> bool {
        self.0 & 1 != 0
    }

    pub fn level(self) -> u32 {
        MAX_LEVEL - (self.0.trailing_zeros() >> 1)
    }

    /// Ancestor at `level`. Only meaningful for `level <= self.level()`.
    pub fn parent(self, level: u32) -> Self {
        let lsb = 1u64 << (2 * (MAX_LEVEL - level));
        CellId((self.0 & lsb.wrapping_neg()) | lsb)
    }

    fn face_ij(self) -> (usize, usize, usize) {
        let t = tables();
        let face = self.face() as usize;
        let mut orientation = face & SWAP_MASK;
        let (mut i, mut j) = (0usize, 0usize);
        // The top chunk only carries the two levels below the face bits.
        let mut nbits = MAX_LEVEL as usize - 7 * LOOKUP_BITS;
        for k in (0..8).rev() {
            let shift = k * 2 * LOOKUP_BITS + 1;
            let chunk = ((self.0 >> shift) & ((1u64 << (2 * nbits)) - 1)) as usize;
            orientation = t.ij[orientation + (chunk << 2)] as usize;
            i += (orientation >> (LOOKUP_BITS + 2)) << (k * LOOKUP_BITS);
            j += ((orientation >> 2) & ((1 << LOOKUP_BITS) - 1)) << (k * LOOKUP_BITS);
            orientation &= SWAP_MASK | INVERT_MASK;
            nbits = LOOKUP_BITS;
        }
        (face, i, j)
    }

    /// Centre of the cell in lat/lng degrees.
    pub fn center(self) -> Result<LatLng, S2Error> {
        if !self.is_valid() {
            return Err(S2Error::Invalid(self.0));
        }
        let (face, i, j) = self.face_ij();
        let delta: u64 = if self.is_leaf() {
            1
        } else if ((i as u64) ^ (self.0 >> 2)) & 1 != 0 {
            2
        } else {
            0
        };
        let si = 2 * i as u64 + delta;
        let ti = 2 * j as u64 + delta;
        let u = st_to_uv(si as f64 / (2 * MAX_SIZE) as f64);
        let v = st_to_uv(ti as f64 / (2 * MAX_SIZE) as f64);
        let [x, y, z] = face_uv_to_xyz(face, u, v);
        Ok(LatLng {
            lat: z.atan2((x * x + y * y).sqrt()) * DEG,
            lng: y.atan2(x) * DEG,
        })
    }
}

/// Decode a hex cell id straight to its centre.
pub fn decode_hex(hex: &str) -> Result<LatLng, S2Error> {
    CellId::from_hex(hex)?.center()
}

// ─── Projections (quadratic) ────────────────────────────────────

fn st_to_uv(s: f64) -> f64 {
    if s >= 0.5 {
        (1.0 / 3.0) * (4.0 * s * s - 1.0)
    } else {
        (1.0 / 3.0) * (1.0 - 4.0 * (1.0 - s) * (1.0 - s))
    }
}

fn uv_to_st(u: f64) -> f64 {
    if u >= 0.0 {
        0.5 * (1.0 + 3.0 * u).sqrt()
    } else {
        1.0 - 0.5 * (1.0 - 3.0 * u).sqrt()
    }
}

fn st_to_ij(s: f64) -> usize {
    let ij = (MAX_SIZE as f64 * s).floor();
    ij.clamp(0.0, (MAX_SIZE - 1) as f64) as usize
}

fn face_uv_to_xyz(face: usize, u: f64, v: f64) -> [f64; 3] {
    match face {
        0 => [1.0, u, v],
        1 => [-u, 1.0, v],
        2 => [-u, -v, 1.0],
        3 => [-1.0, -v, -u],
        4 => [v, -1.0, -u],
        _ => [v, u, -1.0],
    }
}

fn xyz_to_face([x, y, z]: [f64; 3]) -> usize {
    let (ax, ay, az) = (x.abs(), y.abs(), z.abs());
    let (axis, value) = if ax >= ay && ax >= az {
        (0, x)
    } else if ay >= az {
        (1, y)
    } else {
        (2, z)
    };
    if value < 0.0 {
        axis + 3
    } else {
        axis
    }
}

fn face_xyz_to_uv(face: usize, [x, y, z]: [f64; 3]) -> (f64, f64) {
    match face {
        0 => (y / x, z / x),
        1 => (-x / y, z / y),
        2 => (-x / z, -y / z),
        3 => (z / x, y / x),
        4 => (z / y, -x / y),
        _ => (-y / z, -x / z),
    }
}
