//! Piecewise-linear membership functions.

/// Closed set of membership shapes.  Parameters are ordered
/// left-to-right; equal neighbours give a shoulder (e.g. `tri(-5,-5,0)`
/// is 1 at -5 and falls to 0 at 0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Triangle { a: f32, b: f32, c: f32 },
    Trapezoid { a: f32, b: f32, c: f32, d: f32 },
}

impl Shape {
    pub const fn tri(a: f32, b: f32, c: f32) -> Self {
        Self::Triangle { a, b, c }
    }

    pub const fn trap(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self::Trapezoid { a, b, c, d }
    }

    /// Degree of membership of `x`, in `[0, 1]`.  NaN maps to 0.
    pub fn degree(&self, x: f32) -> f32 {
        match *self {
            Self::Triangle { a, b, c } => trapezoid(x, a, b, b, c),
            Self::Trapezoid { a, b, c, d } => trapezoid(x, a, b, c, d),
        }
    }

    /// Parameters are finite and non-decreasing.
    pub fn is_ordered(&self) -> bool {
        match *self {
            Self::Triangle { a, b, c } => ordered(&[a, b, c]),
            Self::Trapezoid { a, b, c, d } => ordered(&[a, b, c, d]),
        }
    }
}

fn ordered(params: &[f32]) -> bool {
    params.iter().all(|v| v.is_finite()) && params.windows(2).all(|w| w[0] <= w[1])
}

fn trapezoid(x: f32, a: f32, b: f32, c: f32, d: f32) -> f32 {
    if !(a..=d).contains(&x) {
        return 0.0;
    }
    // Each branch only divides when the corresponding edge has width.
    let mu = if x < b {
        (x - a) / (b - a)
    } else if x <= c {
        1.0
    } else {
        (d - x) / (d - c)
    };
    mu.clamp(0.0, 1.0)
}
