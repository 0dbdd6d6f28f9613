//! Convert polygon features into representative points, and grouped points back into polylines.
//!
//! Decomposition ([`Decomposer`]) turns each polygon into points under one [`Strategy`]:
//! every boundary vertex, a label point, the centroid, an interior centre, or the deepest
//! boundary vertex. Reconstruction ([`reconstruct`]) groups points on a key, optionally orders
//! them, and threads each group of two or more points into a [`Polyline`].
//!
//! Both conversions are exposed as plain functions over in-memory geometry, and as drivers in
//! [`pipeline`] that read from a [`FeatureSource`] and write to a [`FeatureSink`].
use rustc_hash::FxHashMap as HashMap;
use rustc_hash::FxHashSet as HashSet;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

mod decompose;
mod error;
mod feature;
pub mod metrics;
pub mod pipeline;
mod point;
mod polygon;
mod polyline;
mod reconstruct;
mod ring;

pub use decompose::*;
pub use error::*;
pub use feature::*;
pub use point::*;
pub use polygon::*;
pub use polyline::*;
pub use reconstruct::*;
pub use ring::*;

pub trait Envelops<O> {
    fn envelops(&self, object: O) -> bool;
}

/// Area can be calculated from an object.
///
/// For rings and polygons this is the _plan_ area. A [`Polygon`] subtracts its holes.
pub trait Area {
    /// Calculate the area of an object.
    fn area(&self) -> f64;
}

/// A polygon of 1 to 3 rings on a coarse integer lattice, so repeated vertices are common.
#[cfg(test)]
#[derive(Clone, Debug)]
struct ArbPolygon(pub Polygon);

#[cfg(test)]
impl quickcheck::Arbitrary for ArbPolygon {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        use quickcheck::Arbitrary;

        let coord = |g: &mut quickcheck::Gen| (i16::arbitrary(g) % 8) as f64;

        let rings = (0..1 + usize::arbitrary(g) % 3)
            .map(|_| {
                let n = usize::arbitrary(g) % 13;
                (0..n)
                    .map(|_| {
                        let v = Vertex::new(coord(g), coord(g));
                        if bool::arbitrary(g) {
                            v.with_z(coord(g))
                        } else {
                            v
                        }
                    })
                    .collect::<Ring>()
            })
            .collect::<Vec<_>>();

        Self(Polygon::new(i64::from(u16::arbitrary(g)), rings))
    }
}
