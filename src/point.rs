/// 2D Point (X,Y).
pub type Point2 = [f64; 2];

pub trait Point: Copy + Sized {
    /// Scale point by multiplying all dimensions by `scalar`.
    fn scale(self, scalar: f64) -> Self;

    fn add(self, rhs: Self) -> Self;

    fn sub(self, rhs: Self) -> Self {
        self.add(rhs.scale(-1.0))
    }

    /// Calculate the magnitude of the vector.
    fn mag(self) -> f64;
}

impl Point for Point2 {
    fn scale(self, scalar: f64) -> Self {
        self.map(|f| f * scalar)
    }

    fn add(self, [bx, by]: Self) -> Self {
        let [ax, ay] = self;
        [ax + bx, ay + by]
    }

    fn sub(self, [bx, by]: Self) -> Self {
        let [ax, ay] = self;
        [ax - bx, ay - by]
    }

    fn mag(self) -> f64 {
        let [x, y] = self;
        x.hypot(y)
    }
}

pub trait ToPoint2 {
    fn to_p2(self) -> Point2;
}

impl ToPoint2 for Point2 {
    fn to_p2(self) -> Point2 {
        self
    }
}
impl ToPoint2 for &Point2 {
    fn to_p2(self) -> Point2 {
        *self
    }
}
impl ToPoint2 for Vertex {
    fn to_p2(self) -> Point2 {
        [self.x, self.y]
    }
}
impl ToPoint2 for &Vertex {
    fn to_p2(self) -> Point2 {
        [self.x, self.y]
    }
}

/// A coordinate with optional elevation (`z`) and measure (`m`).
///
/// All planar arithmetic ignores `z` and `m`.
#[derive(Copy, Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m: Option<f64>,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: None,
        }
    }

    pub fn with_z(self, z: impl Into<Option<f64>>) -> Self {
        Self { z: z.into(), ..self }
    }

    pub fn with_m(self, m: impl Into<Option<f64>>) -> Self {
        Self { m: m.into(), ..self }
    }

    /// Drop the elevation and measure values.
    pub fn planar(self) -> Self {
        Self::new(self.x, self.y)
    }

    pub fn xy(&self) -> Point2 {
        [self.x, self.y]
    }

    /// Planar euclidean distance, ignoring `z` and `m`.
    ///
    /// # Example
    /// ```rust
    /// # use polyconv::*;
    /// let a = Vertex::new(0.0, 0.0).with_z(10.0);
    /// let b = Vertex::new(3.0, 4.0);
    /// assert_eq!(a.distance(&b), 5.0);
    /// ```
    pub fn distance(&self, other: &Vertex) -> f64 {
        other.xy().sub(self.xy()).mag()
    }

    /// Returns if both vertices sit on the same planar location (exact comparison).
    pub fn coincident(&self, other: &Vertex) -> bool {
        self.x == other.x && self.y == other.y
    }

    /// The identity used for duplicate detection.
    ///
    /// `z` and `m` only participate when `with_zm` is set. A `tolerance` snaps every
    /// component to a grid of that spacing before comparison.
    pub fn key(&self, with_zm: bool, tolerance: Option<f64>) -> VertexKey {
        let snap = |v: f64| match tolerance {
            Some(t) => (v / t).round(),
            None => v,
        };
        let bits = |v: f64| (snap(v) + 0.0).to_bits(); // `+ 0.0` folds -0.0 into 0.0

        VertexKey {
            x: bits(self.x),
            y: bits(self.y),
            z: with_zm.then(|| self.z.map(bits)).flatten(),
            m: with_zm.then(|| self.m.map(bits)).flatten(),
        }
    }
}

impl From<Point2> for Vertex {
    fn from([x, y]: Point2) -> Self {
        Vertex::new(x, y)
    }
}

impl From<(f64, f64)> for Vertex {
    fn from((x, y): (f64, f64)) -> Self {
        Vertex::new(x, y)
    }
}

impl From<[f64; 3]> for Vertex {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Vertex::new(x, y).with_z(z)
    }
}

/// Hashable identity of a [`Vertex`], see [`Vertex::key`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VertexKey {
    x: u64,
    y: u64,
    z: Option<u64>,
    m: Option<u64>,
}
