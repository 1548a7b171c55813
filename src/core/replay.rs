//! Recorded-session collaborators
//!
//! A replay session is a directory of image files plus an optional
//! annotations file with per-frame face boxes, landmarks and aux labels.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::core::camera::{CameraBackend, FrameSource};
use crate::core::face::FaceDetector;
use crate::core::models::{AuxClassifier, LandmarkPredictor};
use crate::types::{FaceRegion, Frame, Point};
use crate::{Error, Result};

const LANDMARK_COUNT: usize = 68;
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

// =============================================================================
// ANNOTATIONS
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameAnnotation {
    #[serde(default)]
    pub faces: Vec<FaceRegion>,
    #[serde(default)]
    pub landmarks: Option<Vec<Point>>,
    #[serde(default)]
    pub aux_label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnnotationFile {
    frames: HashMap<u64, FrameAnnotation>,
}

/// Per-frame annotations keyed by frame index
#[derive(Debug, Clone, Default)]
pub struct ReplayAnnotations {
    frames: HashMap<u64, FrameAnnotation>,
}

impl ReplayAnnotations {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ModelMissing(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let file: AnnotationFile = serde_json::from_str(&text).map_err(|e| Error::ModelFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self { frames: file.frames })
    }

    pub fn from_frames(frames: HashMap<u64, FrameAnnotation>) -> Self {
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn entry(&self, frame: &Frame) -> Option<&FrameAnnotation> {
        self.frames.get(&frame.index())
    }
}

impl FaceDetector for ReplayAnnotations {
    fn detect(&self, frame: &Frame) -> Result<Vec<FaceRegion>> {
        Ok(self.entry(frame).map(|a| a.faces.clone()).unwrap_or_default())
    }
}

impl LandmarkPredictor for ReplayAnnotations {
    fn landmarks(&self, frame: &Frame, _region: &FaceRegion) -> Result<Vec<Point>> {
        match self.entry(frame).and_then(|a| a.landmarks.as_ref()) {
            Some(points) if points.len() == LANDMARK_COUNT => Ok(points.clone()),
            Some(points) => Err(Error::Landmarks(format!(
                "frame {} has {} points, expected {}",
                frame.index(),
                points.len(),
                LANDMARK_COUNT
            ))),
            None => Err(Error::Landmarks(format!("frame {} not annotated", frame.index()))),
        }
    }
}

impl AuxClassifier for ReplayAnnotations {
    fn classify(&self, frame: &Frame, _region: &FaceRegion) -> Result<String> {
        self.entry(frame)
            .and_then(|a| a.aux_label.clone())
            .ok_or_else(|| Error::Inference(format!("frame {} has no aux label", frame.index())))
    }
}

// =============================================================================
// REPLAY CAMERA
// =============================================================================

/// Each configured directory acts as one device index
#[derive(Debug, Clone)]
pub struct ReplayBackend {
    sources: Vec<PathBuf>,
    fps: f64,
    looped: bool,
}

impl ReplayBackend {
    pub fn new(sources: Vec<PathBuf>, fps: f64, looped: bool) -> Self {
        Self { sources, fps, looped }
    }
}

impl CameraBackend for ReplayBackend {
    fn open(&self, index: u32) -> Result<Box<dyn FrameSource>> {
        let dir = self.sources.get(index as usize).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no source at index {}", index))
        })?;
        Ok(Box::new(ReplaySource::open(dir, self.fps, self.looped)?))
    }
}

/// Image files in name order, paced to a frame rate
pub struct ReplaySource {
    files: Vec<PathBuf>,
    position: usize,
    interval: Duration,
    last_read: Option<Instant>,
    looped: bool,
}

impl ReplaySource {
    pub fn open(dir: &Path, fps: f64, looped: bool) -> Result<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(Error::FrameDecode(format!("no image files in {}", dir.display())));
        }

        let interval = if fps > 0.0 {
            Duration::from_secs_f64(1.0 / fps)
        } else {
            Duration::ZERO
        };

        Ok(Self {
            files,
            position: 0,
            interval,
            last_read: None,
            looped,
        })
    }

    fn pace(&mut self) {
        if let Some(last) = self.last_read {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                sleep(self.interval - elapsed);
            }
        }
        self.last_read = Some(Instant::now());
    }
}

impl FrameSource for ReplaySource {
    fn read(&mut self) -> Result<Option<Frame>> {
        if self.position >= self.files.len() {
            if !self.looped {
                return Ok(None);
            }
            self.position = 0;
        }
        self.pace();

        let index = self.position as u64;
        let path = self.files[self.position].clone();
        self.position += 1;

        let image = image::open(&path)
            .map_err(|e| Error::FrameDecode(format!("{}: {}", path.display(), e)))?;
        Ok(Some(Frame::from_rgb(index, image.to_rgb8())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("stressfuse-replay-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_replay_reads_in_name_order_then_ends() {
        let dir = temp_dir("order");
        GrayImage::from_pixel(4, 4, Luma([200])).save(dir.join("b.png")).unwrap();
        GrayImage::from_pixel(4, 4, Luma([20])).save(dir.join("a.png")).unwrap();
        std::fs::write(dir.join("notes.txt"), "skip me").unwrap();

        let mut source = ReplaySource::open(&dir, 0.0, false).unwrap();
        let first = source.read().unwrap().unwrap();
        assert_eq!(first.index(), 0);
        assert_eq!(first.to_gray().get_pixel(0, 0)[0], 20);
        assert_eq!(source.read().unwrap().unwrap().to_gray().get_pixel(0, 0)[0], 200);
        assert!(source.read().unwrap().is_none());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_replay_loops_with_stable_indices() {
        let dir = temp_dir("loop");
        GrayImage::from_pixel(2, 2, Luma([90])).save(dir.join("only.png")).unwrap();
        let mut source = ReplaySource::open(&dir, 0.0, true).unwrap();
        assert_eq!(source.read().unwrap().unwrap().index(), 0);
        assert_eq!(source.read().unwrap().unwrap().index(), 0);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_corrupt_file_is_transient() {
        let dir = temp_dir("corrupt");
        std::fs::write(dir.join("0.png"), b"not a png").unwrap();
        GrayImage::from_pixel(2, 2, Luma([90])).save(dir.join("1.png")).unwrap();
        let mut source = ReplaySource::open(&dir, 0.0, false).unwrap();
        assert!(matches!(source.read(), Err(Error::FrameDecode(_))));
        assert!(source.read().unwrap().is_some());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_annotations_parse_and_answer() {
        let path = std::env::temp_dir().join(format!("stressfuse-ann-{}.json", std::process::id()));
        let landmarks: Vec<serde_json::Value> =
            (0..68).map(|i| serde_json::json!({"x": i as f64, "y": 0.0})).collect();
        let doc = serde_json::json!({
            "frames": {
                "3": {
                    "faces": [{"x": 1, "y": 2, "w": 30, "h": 40}],
                    "landmarks": landmarks,
                    "aux_label": "stressed"
                }
            }
        });
        std::fs::write(&path, doc.to_string()).unwrap();

        let ann = ReplayAnnotations::load(&path).unwrap();
        let annotated = Frame::solid(3, 8, 8, 100);
        let other = Frame::solid(4, 8, 8, 100);
        let region = FaceRegion::new(1, 2, 30, 40);

        assert_eq!(ann.detect(&annotated).unwrap(), vec![region]);
        assert!(ann.detect(&other).unwrap().is_empty());
        assert_eq!(ann.landmarks(&annotated, &region).unwrap().len(), 68);
        assert!(ann.landmarks(&other, &region).is_err());
        assert_eq!(ann.classify(&annotated, &region).unwrap(), "stressed");
        std::fs::remove_file(path).ok();
    }
}
