//! Baseline Orientation Calibration
//!
//! The first valid head orientation of a session becomes the reference
//! frame. Later orientations are re-expressed in that frame, so a driver
//! whose neutral posture is slightly turned reads as (0, 0, 0).

use crate::geometry::{Axes, Mat3};
use crate::FeatureError;
use tracing::{debug, info};

/// Captures a reference orientation once per session and re-expresses later
/// orientations relative to it
#[derive(Debug, Clone, Default)]
pub struct BaselineCalibrator {
    reference: Option<Mat3>,
}

impl BaselineCalibrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the captured reference
    pub fn reset(&mut self) {
        if self.reference.take().is_some() {
            debug!("Baseline orientation cleared");
        }
    }

    /// Store an orthonormal, right-handed reference built from the axis triple.
    ///
    /// X is kept as the primary direction; Z is rebuilt as X × Y and Y as
    /// Z × X, so inputs only need to be approximately orthogonal.
    pub fn capture(&mut self, axes: &Axes) -> Result<(), FeatureError> {
        let x = axes.x.normalized().ok_or(FeatureError::DegenerateAxes)?;
        let z = x
            .cross(&axes.y)
            .normalized()
            .ok_or(FeatureError::DegenerateAxes)?;
        let y = z.cross(&x);

        self.reference = Some(Mat3::from_axes(&Axes { x, y, z }));
        Ok(())
    }

    /// Express `axes` in the reference frame (identity before capture)
    pub fn apply(&self, axes: &Axes) -> Axes {
        match &self.reference {
            None => *axes,
            Some(reference) => {
                let inverse = reference.transpose();
                Axes {
                    x: inverse.mul_vec(&axes.x),
                    y: inverse.mul_vec(&axes.y),
                    z: inverse.mul_vec(&axes.z),
                }
            }
        }
    }

    /// Feed one raw orientation (degrees) and return it relative to the baseline.
    ///
    /// Captures the baseline from the first finite observation.
    pub fn observe(&mut self, yaw: f64, pitch: f64, roll: f64) -> (f64, f64, f64) {
        let rotation = Mat3::from_euler_deg(yaw, pitch, roll);
        let axes = rotation.to_axes();

        if self.reference.is_none() && axes.is_finite() && self.capture(&axes).is_ok() {
            info!(
                "Baseline orientation captured: yaw={:.1} pitch={:.1} roll={:.1}",
                yaw, pitch, roll
            );
        }

        Mat3::from_axes(&self.apply(&axes)).to_euler_deg()
    }

    pub fn is_captured(&self) -> bool {
        self.reference.is_some()
    }

    pub fn reference(&self) -> Option<&Mat3> {
        self.reference.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_apply_without_reference_is_identity() {
        let calibrator = BaselineCalibrator::new();
        let axes = Mat3::from_euler_deg(10.0, 5.0, 0.0).to_axes();
        assert_eq!(calibrator.apply(&axes), axes);
    }

    #[test]
    fn test_first_observation_becomes_zero() {
        let mut calibrator = BaselineCalibrator::new();
        let (yaw, pitch, roll) = calibrator.observe(8.0, -3.0, 2.0);
        assert!(calibrator.is_captured());
        assert_close(yaw, 0.0);
        assert_close(pitch, 0.0);
        assert_close(roll, 0.0);
    }

    #[test]
    fn test_relative_pitch() {
        let mut calibrator = BaselineCalibrator::new();
        calibrator.observe(0.0, 5.0, 0.0);
        let (yaw, pitch, roll) = calibrator.observe(0.0, -5.0, 0.0);
        assert_close(yaw, 0.0);
        assert_close(pitch, -10.0);
        assert_close(roll, 0.0);

        // Same inputs give the same outputs; no hidden time dependency
        assert_eq!(calibrator.observe(0.0, -5.0, 0.0), (yaw, pitch, roll));
    }

    #[test]
    fn test_capture_orthonormalizes() {
        let mut calibrator = BaselineCalibrator::new();
        let skewed = Axes {
            x: Vec3::new(2.0, 0.0, 0.0),
            y: Vec3::new(0.1, 1.0, 0.0),
            z: Vec3::new(0.0, 0.0, 1.0),
        };
        calibrator.capture(&skewed).unwrap();

        let r = calibrator.reference().unwrap();
        let product = r.transpose().mul(&r);
        for i in 0..3 {
            for j in 0..3 {
                assert_close(product.m[i][j], if i == j { 1.0 } else { 0.0 });
            }
        }
        // Right-handed: x × y = z
        let axes = r.to_axes();
        let z = axes.x.cross(&axes.y);
        assert_close(z.dot(&axes.z), 1.0);
    }

    #[test]
    fn test_degenerate_axes_rejected() {
        let mut calibrator = BaselineCalibrator::new();
        let parallel = Axes {
            x: Vec3::new(1.0, 0.0, 0.0),
            y: Vec3::new(2.0, 0.0, 0.0),
            z: Vec3::new(0.0, 0.0, 1.0),
        };
        assert_eq!(calibrator.capture(&parallel), Err(FeatureError::DegenerateAxes));
        assert!(!calibrator.is_captured());
    }

    #[test]
    fn test_reset_allows_recapture() {
        let mut calibrator = BaselineCalibrator::new();
        calibrator.observe(20.0, 0.0, 0.0);
        calibrator.reset();
        assert!(!calibrator.is_captured());

        let (yaw, _, _) = calibrator.observe(-10.0, 0.0, 0.0);
        assert_close(yaw, 0.0);
    }
}
