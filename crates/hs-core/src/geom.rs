use core::fmt;
use core::ops::{Add, AddAssign, Neg, Sub};

/// Integer pixel offset `(dx, dy)`.
///
/// Under a displacement `d`, aligned position `p` reads the raw sample at
/// `p - d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Displacement {
    pub dx: i32,
    pub dy: i32,
}

impl Displacement {
    pub const ZERO: Self = Self { dx: 0, dy: 0 };

    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Same offset expressed at a resolution `2^steps` times finer.
    pub fn upscaled(self, steps: u32) -> Self {
        Self {
            dx: self.dx << steps,
            dy: self.dy << steps,
        }
    }

    pub fn l1(self) -> u32 {
        self.dx.unsigned_abs() + self.dy.unsigned_abs()
    }

    pub fn norm_sq(self) -> u64 {
        let dx = i64::from(self.dx);
        let dy = i64::from(self.dy);
        (dx * dx + dy * dy) as u64
    }
}

impl Add for Displacement {
    type Output = Displacement;

    fn add(self, rhs: Displacement) -> Self::Output {
        Displacement {
            dx: self.dx + rhs.dx,
            dy: self.dy + rhs.dy,
        }
    }
}

impl AddAssign for Displacement {
    fn add_assign(&mut self, rhs: Displacement) {
        self.dx += rhs.dx;
        self.dy += rhs.dy;
    }
}

impl Sub for Displacement {
    type Output = Displacement;

    fn sub(self, rhs: Displacement) -> Self::Output {
        Displacement {
            dx: self.dx - rhs.dx,
            dy: self.dy - rhs.dy,
        }
    }
}

impl Neg for Displacement {
    type Output = Displacement;

    fn neg(self) -> Self::Output {
        Displacement {
            dx: -self.dx,
            dy: -self.dy,
        }
    }
}

impl fmt::Display for Displacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.dx, self.dy)
    }
}

/// Axis-aligned integer rectangle with a signed origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub const fn new(x: i64, y: i64, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn from_size(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn right(&self) -> i64 {
        self.x + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height as i64
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn translated(&self, d: Displacement) -> Rect {
        Rect {
            x: self.x + i64::from(d.dx),
            y: self.y + i64::from(d.dy),
            ..*self
        }
    }

    /// Overlap of two rectangles; `None` when they do not share any pixel.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, (x1 - x0) as usize, (y1 - y0) as usize))
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }
}
