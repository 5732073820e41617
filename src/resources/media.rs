//! Image decoding and video playback.
//!
//! A [`VideoElement`] plays independently of the render loop. It reports
//! progress through [`PlaybackSignal`]s; the texture registry only treats a
//! video as ready after it has seen both [`PlaybackSignal::Playing`] and
//! [`PlaybackSignal::TimeUpdate`].
//!
//! [`ImageMediaHost`] plays animated GIF and WebP files as looping, muted
//! clips, which covers the short loops scenes use as video textures.

use std::{
    io::Cursor,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures::channel::mpsc;
use image::{AnimationDecoder, ImageFormat, RgbaImage};
use tokio::{runtime::Handle, task::JoinHandle};

use crate::error::MediaError;

/// Shortest frame duration honoured; zero-delay GIF frames would spin.
const MIN_FRAME_DELAY: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackSignal {
    /// A frame is being presented.
    Playing,
    /// Playback time advanced.
    TimeUpdate,
    Ended,
}

pub trait VideoElement: Send {
    /// Starts (or restarts) playback and returns the signal stream.
    fn play(&mut self) -> mpsc::UnboundedReceiver<PlaybackSignal>;
    /// The frame currently on display.
    fn current_frame(&self) -> Option<&RgbaImage>;
    fn pause(&mut self);
    /// Stops playback and drops the decoded frames.
    fn release(&mut self);
    fn dimensions(&self) -> (u32, u32);
}

/// Decode and playback primitives supplied by the host.
pub trait MediaHost: Send + Sync {
    fn decode_image(&self, bytes: &[u8]) -> Result<RgbaImage, MediaError>;
    fn open_video(&self, bytes: Vec<u8>) -> Result<Box<dyn VideoElement>, MediaError>;
}

/// [`MediaHost`] backed by the `image` crate and a tokio playback clock.
#[derive(Clone, Debug)]
pub struct ImageMediaHost {
    runtime: Handle,
}

impl ImageMediaHost {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }
}

impl MediaHost for ImageMediaHost {
    fn decode_image(&self, bytes: &[u8]) -> Result<RgbaImage, MediaError> {
        Ok(image::load_from_memory(bytes)?.to_rgba8())
    }

    fn open_video(&self, bytes: Vec<u8>) -> Result<Box<dyn VideoElement>, MediaError> {
        let frames = decode_clip(bytes)?;
        Ok(Box::new(ClipPlayer::new(frames, self.runtime.clone())))
    }
}

#[derive(Debug)]
pub struct ClipFrame {
    pub image: RgbaImage,
    pub delay: Duration,
}

/// Decodes every frame of an animated GIF or WebP.
pub fn decode_clip(bytes: Vec<u8>) -> Result<Vec<ClipFrame>, MediaError> {
    let format = image::guess_format(&bytes)?;
    let frames = match format {
        ImageFormat::Gif => image::codecs::gif::GifDecoder::new(Cursor::new(bytes))?
            .into_frames()
            .collect_frames()?,
        ImageFormat::WebP => image::codecs::webp::WebPDecoder::new(Cursor::new(bytes))?
            .into_frames()
            .collect_frames()?,
        other => return Err(MediaError::UnsupportedVideo(format!("{other:?}"))),
    };
    if frames.is_empty() {
        return Err(MediaError::Empty);
    }
    Ok(frames
        .into_iter()
        .map(|frame| ClipFrame {
            delay: Duration::from(frame.delay()),
            image: frame.into_buffer(),
        })
        .collect())
}

/// A looping clip whose playback clock runs as a tokio task.
pub struct ClipPlayer {
    frames: Arc<[ClipFrame]>,
    position: Arc<AtomicUsize>,
    runtime: Handle,
    clock: Option<JoinHandle<()>>,
}

impl ClipPlayer {
    pub fn new(frames: Vec<ClipFrame>, runtime: Handle) -> Self {
        Self {
            frames: frames.into(),
            position: Arc::new(AtomicUsize::new(0)),
            runtime,
            clock: None,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl VideoElement for ClipPlayer {
    fn play(&mut self) -> mpsc::UnboundedReceiver<PlaybackSignal> {
        self.pause();
        let (tx, rx) = mpsc::unbounded();
        if self.frames.is_empty() {
            let _ = tx.unbounded_send(PlaybackSignal::Ended);
            return rx;
        }
        let frames = self.frames.clone();
        let position = self.position.clone();
        self.clock = Some(self.runtime.spawn(async move {
            if tx.unbounded_send(PlaybackSignal::Playing).is_err() {
                return;
            }
            loop {
                let current = position.load(Ordering::Relaxed) % frames.len();
                tokio::time::sleep(frames[current].delay.max(MIN_FRAME_DELAY)).await;
                position.store((current + 1) % frames.len(), Ordering::Relaxed);
                if tx.unbounded_send(PlaybackSignal::TimeUpdate).is_err() {
                    break;
                }
            }
        }));
        rx
    }

    fn current_frame(&self) -> Option<&RgbaImage> {
        let len = self.frames.len();
        if len == 0 {
            return None;
        }
        self.frames
            .get(self.position.load(Ordering::Relaxed) % len)
            .map(|frame| &frame.image)
    }

    fn pause(&mut self) {
        if let Some(clock) = self.clock.take() {
            clock.abort();
        }
    }

    fn release(&mut self) {
        self.pause();
        self.frames = Arc::from(Vec::new());
        self.position.store(0, Ordering::Relaxed);
    }

    fn dimensions(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(|frame| frame.image.dimensions())
            .unwrap_or((0, 0))
    }
}

impl Drop for ClipPlayer {
    fn drop(&mut self) {
        self.pause();
    }
}
