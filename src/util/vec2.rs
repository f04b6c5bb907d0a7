use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// 2D vector in field units (x grows right, y grows down)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector at `angle` radians from +x, scaled by `length`
    #[inline]
    pub fn from_angle(angle: f32, length: f32) -> Self {
        Self {
            x: angle.cos() * length,
            y: angle.sin() * length,
        }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length_sq().sqrt()
    }

    #[inline]
    pub fn length_sq(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    #[inline]
    pub fn distance_to(&self, other: Vec2) -> f32 {
        (*self - other).length()
    }

    /// Component-wise scale
    #[inline]
    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
        }
    }

    pub fn approx_eq(&self, other: Vec2, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon && (self.y - other.y).abs() < epsilon
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_from_angle() {
        let v = Vec2::from_angle(0.0, 400.0);
        assert!(v.approx_eq(Vec2::new(400.0, 0.0), EPSILON));

        let v = Vec2::from_angle(FRAC_PI_2, 2.0);
        assert!(v.approx_eq(Vec2::new(0.0, 2.0), EPSILON));
    }

    #[test]
    fn test_length_and_distance() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert!((b.length() - 5.0).abs() < EPSILON);
        assert!((a.distance_to(b) - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_scale() {
        let v = Vec2::new(100.0, -50.0).scale(-0.8, -1.2);
        assert!(v.approx_eq(Vec2::new(-80.0, 60.0), EPSILON));
    }

    #[test]
    fn test_ops() {
        let mut v = Vec2::new(1.0, 2.0);
        v += Vec2::new(0.5, 0.5) * 2.0;
        assert_eq!(v, Vec2::new(2.0, 3.0));
        assert_eq!(-v, Vec2::new(-2.0, -3.0));
        assert_eq!(v - Vec2::new(2.0, 3.0), Vec2::ZERO);
    }
}
