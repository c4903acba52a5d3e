//! Math type aliases shared by the audio modules

/// 3D vector used for positional sound emitters
pub type Vec3 = nalgebra::Vector3<f32>;

/// Clamp a volume into the audible `[0, 1]` range, mapping NaN to silence
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_volume() {
        assert_eq!(clamp_volume(5.0), 1.0);
        assert_eq!(clamp_volume(-1.0), 0.0);
        assert_eq!(clamp_volume(0.25), 0.25);
        assert_eq!(clamp_volume(f32::NAN), 0.0);
    }
}
