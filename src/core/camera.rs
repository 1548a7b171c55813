//! Camera seams and device acquisition

use tracing::{info, warn};

use crate::types::Frame;
use crate::{Error, Result};

/// An open capture stream
pub trait FrameSource: Send {
    /// Next frame.
    ///
    /// `Ok(None)` means the stream has ended; `Err` is a transient defect
    /// and the caller should retry.
    fn read(&mut self) -> Result<Option<Frame>>;
}

/// Opens capture streams by device index
pub trait CameraBackend: Send {
    fn open(&self, index: u32) -> Result<Box<dyn FrameSource>>;
}

/// Probe device indices `0..indices` and keep the first that yields a frame
///
/// The probe frame is discarded.
pub fn acquire_camera(backend: &dyn CameraBackend, indices: u32) -> Result<(u32, Box<dyn FrameSource>)> {
    for index in 0..indices {
        let mut source = match backend.open(index) {
            Ok(source) => source,
            Err(e) => {
                warn!(index, error = %e, "Camera index not usable");
                continue;
            }
        };
        match source.read() {
            Ok(Some(_)) => {
                info!(index, "Camera found");
                return Ok((index, source));
            }
            Ok(None) => warn!(index, "Camera opened but produced no frame"),
            Err(e) => warn!(index, error = %e, "Camera opened but first read failed"),
        }
    }
    Err(Error::CameraUnavailable { tried: indices })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Source(Vec<Result<Option<Frame>>>);

    impl FrameSource for Source {
        fn read(&mut self) -> Result<Option<Frame>> {
            if self.0.is_empty() {
                Ok(None)
            } else {
                self.0.remove(0)
            }
        }
    }

    /// Index 0 missing, index 1 fails its first read, index 2 works
    struct Backend;

    impl CameraBackend for Backend {
        fn open(&self, index: u32) -> Result<Box<dyn FrameSource>> {
            match index {
                0 => Err(Error::FrameDecode("no device".to_string())),
                1 => Ok(Box::new(Source(vec![Err(Error::FrameDecode("bad".to_string()))]))),
                _ => Ok(Box::new(Source(vec![
                    Ok(Some(Frame::solid(0, 4, 4, 1))),
                    Ok(Some(Frame::solid(1, 4, 4, 2))),
                ]))),
            }
        }
    }

    #[test]
    fn test_acquire_skips_bad_indices() {
        let (index, mut source) = acquire_camera(&Backend, 5).unwrap();
        assert_eq!(index, 2);
        // probe frame consumed
        assert_eq!(source.read().unwrap().unwrap().index(), 1);
    }

    #[test]
    fn test_acquire_gives_up() {
        let err = acquire_camera(&Backend, 2).err().unwrap();
        assert!(matches!(err, Error::CameraUnavailable { tried: 2 }));
    }
}
