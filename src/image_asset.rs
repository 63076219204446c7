//! Tool and cursor images.
//!
//! Files are decoded to straight RGBA8 frames. GIFs keep all their frames so
//! an animated cursor can be advanced by the source's tick callback; every
//! other format decodes to a single frame.

use std::fs::File;
use std::io::BufReader;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat};
use lru::LruCache;

use crate::error::{DrawError, DrawResult};

/// Browsers treat shorter GIF delays as "as fast as possible" and clamp them.
const MIN_FRAME_DELAY: Duration = Duration::from_millis(20);
const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(100);

const DEFAULT_CACHE_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    frames: Vec<ImageFrame>,
}

impl DecodedImage {
    pub fn load(path: &Path) -> DrawResult<Self> {
        let image_error = |source| DrawError::Image {
            path: path.to_path_buf(),
            source,
        };

        if ImageFormat::from_path(path).ok() == Some(ImageFormat::Gif) {
            let file = File::open(path).map_err(|e| image_error(image::ImageError::IoError(e)))?;
            let decoder = GifDecoder::new(BufReader::new(file)).map_err(image_error)?;
            let frames = decoder
                .into_frames()
                .collect_frames()
                .map_err(image_error)?;
            let frames: Vec<ImageFrame> = frames
                .into_iter()
                .map(|frame| {
                    let (numerator, denominator) = frame.delay().numer_denom_ms();
                    let millis = if denominator == 0 {
                        0
                    } else {
                        numerator / denominator
                    };
                    let buffer = frame.into_buffer();
                    ImageFrame {
                        width: buffer.width(),
                        height: buffer.height(),
                        pixels: buffer.into_raw(),
                        delay: frame_delay(Duration::from_millis(u64::from(millis))),
                    }
                })
                .collect();
            if !frames.is_empty() {
                return Ok(Self { frames });
            }
        }

        let rgba = image::open(path).map_err(image_error)?.to_rgba8();
        Ok(Self::from_rgba(rgba.width(), rgba.height(), rgba.into_raw()))
    }

    /// A single-frame image from tightly packed RGBA8 rows.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            frames: vec![ImageFrame {
                width,
                height,
                pixels,
                delay: DEFAULT_FRAME_DELAY,
            }],
        }
    }

    pub fn frames(&self) -> &[ImageFrame] {
        &self.frames
    }

    pub fn first_frame(&self) -> &ImageFrame {
        &self.frames[0]
    }

    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }
}

fn frame_delay(delay: Duration) -> Duration {
    if delay < MIN_FRAME_DELAY {
        DEFAULT_FRAME_DELAY
    } else {
        delay
    }
}

/// Playback position in a decoded image.
#[derive(Debug, Clone)]
pub struct AnimatedImage {
    image: Arc<DecodedImage>,
    frame: usize,
    elapsed: Duration,
}

impl AnimatedImage {
    pub fn new(image: Arc<DecodedImage>) -> Self {
        Self {
            image,
            frame: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn current(&self) -> &ImageFrame {
        &self.image.frames[self.frame]
    }

    pub fn frame_index(&self) -> usize {
        self.frame
    }

    /// Advances playback. Returns `true` when the visible frame changed.
    pub fn tick(&mut self, delta: Duration) -> bool {
        if !self.image.is_animated() {
            return false;
        }
        self.elapsed += delta;
        let start = self.frame;
        loop {
            let delay = self.image.frames[self.frame].delay;
            if self.elapsed < delay {
                break;
            }
            self.elapsed -= delay;
            self.frame = (self.frame + 1) % self.image.frames.len();
        }
        self.frame != start
    }
}

/// Decoded images by path, least recently used evicted first.
pub struct ImageCache {
    entries: LruCache<PathBuf, Arc<DecodedImage>>,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}

impl ImageCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn load(&mut self, path: &Path) -> DrawResult<Arc<DecodedImage>> {
        if let Some(image) = self.entries.get(path) {
            return Ok(Arc::clone(image));
        }
        let image = Arc::new(DecodedImage::load(path)?);
        tracing::debug!(
            path = %path.display(),
            frames = image.frames().len(),
            "decoded image"
        );
        self.entries.put(path.to_path_buf(), Arc::clone(&image));
        Ok(image)
    }

    /// Forgets a path so the next load decodes the file again.
    pub fn invalidate(&mut self, path: &Path) {
        self.entries.pop(path);
    }
}
