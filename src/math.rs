use nalgebra::Vector3;

pub trait Mix {
    type Output;

    fn mix(self, b: Self, t: f32) -> Self::Output;
}

impl Mix for f32 {
    type Output = f32;

    #[inline]
    fn mix(self, y: f32, t: f32) -> f32 {
        self * (1.0 - t) + y * t
    }
}

impl Mix for &Vector3<f32> {
    type Output = Vector3<f32>;

    #[inline]
    fn mix(self, other: Self, t: f32) -> Self::Output {
        Vector3::new(
            self.x.mix(other.x, t),
            self.y.mix(other.y, t),
            self.z.mix(other.z, t),
        )
    }
}

/// Returns `true` when every component of `vec` is finite.
#[inline]
pub fn is_finite(vec: &Vector3<f32>) -> bool {
    vec.iter().all(|c| c.is_finite())
}

#[test]
fn test_mix() {
    assert_eq!(2.0, 2.0.mix(4.0, 0.0));
    assert_eq!(4.0, 2.0.mix(4.0, 1.0));
    assert_eq!(3.0, 2.0.mix(4.0, 0.5));

    let a = Vector3::new(0.0, 1.0, 2.0);
    let b = Vector3::new(2.0, 1.0, 0.0);
    assert_eq!(Vector3::new(1.0, 1.0, 1.0), (&a).mix(&b, 0.5));
}
