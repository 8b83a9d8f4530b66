//! The rover's front camera.

use scout_types::{CameraFrame, ScoutError};

/// Source of the RGB24 frames perception warps to a top-down view.
///
/// Perception assumes a fixed mounting: the ground calibration maps image
/// rows to distances for a level rover, so a driver must not crop or
/// rescale frames between calls.
pub trait Camera: Send {
    /// Name used in logs and fault reports, e.g. `"navcam"`.
    fn id(&self) -> &str;

    /// Grab one frame.
    ///
    /// # Errors
    ///
    /// [`ScoutError::HardwareFault`] when no frame could be produced.  The
    /// control loop treats this as fatal for the mission.
    fn capture(&mut self) -> Result<CameraFrame, ScoutError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out a fixed number of grey frames, then reports a fault.
    struct FiniteCamera {
        frames_left: u32,
    }

    impl Camera for FiniteCamera {
        fn id(&self) -> &str {
            "navcam"
        }

        fn capture(&mut self) -> Result<CameraFrame, ScoutError> {
            if self.frames_left == 0 {
                return Err(ScoutError::HardwareFault {
                    component: self.id().to_string(),
                    details: "sensor stopped streaming".to_string(),
                });
            }
            self.frames_left -= 1;
            Ok(CameraFrame::filled(4, 3, [128, 128, 128]))
        }
    }

    #[test]
    fn frames_until_fault() {
        let mut navcam = FiniteCamera { frames_left: 1 };
        let frame = navcam.capture().unwrap();
        assert!(frame.is_well_formed());
        assert_eq!(frame.pixel(3, 2), Some([128, 128, 128]));

        let err = navcam.capture().unwrap_err();
        assert!(err.to_string().contains("navcam"));
    }

    #[test]
    fn usable_as_trait_object() {
        let cameras: Vec<Box<dyn Camera>> = vec![Box::new(FiniteCamera { frames_left: 0 })];
        assert_eq!(cameras[0].id(), "navcam");
    }
}
