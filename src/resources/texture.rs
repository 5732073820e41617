//! Named textures fed by still images or video.
//!
//! Every texture exists on the GPU from the moment it is requested, holding
//! a single [`PLACEHOLDER_PIXEL`]. A single loader task then walks the
//! requested entries in order, fetching and decoding one at a time, and hands
//! the decoded media back over a channel. The registry applies deliveries
//! when it is polled, on the thread that owns the GPU context.
//!
//! A failed load is logged and leaves the texture on its placeholder.

use std::{collections::HashMap, fmt, sync::Arc};

use futures::{StreamExt, channel::mpsc};
use image::RgbaImage;
use serde::Deserialize;
use tokio::{runtime::Handle, task::JoinHandle};

use crate::{
    error::ContractViolation,
    gpu::{GraphicsApi, Sampling, TexelData, TextureId},
    resources::{
        AssetSource, LoadGate,
        media::{MediaHost, PlaybackSignal, VideoElement},
    },
};

/// Opaque RGBA colour shown until real media arrives.
pub const PLACEHOLDER_PIXEL: [u8; 4] = [64, 128, 255, 255];

/// All textures are sampled through this unit.
pub const SAMPLED_UNIT: u32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub name: String,
    pub source: String,
    pub kind: MediaKind,
}

impl TextureDescriptor {
    pub fn image(name: &str, source: &str) -> Self {
        Self {
            name: name.to_owned(),
            source: source.to_owned(),
            kind: MediaKind::Image,
        }
    }

    pub fn video(name: &str, source: &str) -> Self {
        Self {
            name: name.to_owned(),
            source: source.to_owned(),
            kind: MediaKind::Video,
        }
    }
}

/// Which playback signals a video has produced so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VideoSignals {
    playing: bool,
    time_advanced: bool,
}

impl VideoSignals {
    /// Records `signal`; returns whether the video now counts as ready.
    pub fn observe(&mut self, signal: PlaybackSignal) -> bool {
        match signal {
            PlaybackSignal::Playing => self.playing = true,
            PlaybackSignal::TimeUpdate => self.time_advanced = true,
            PlaybackSignal::Ended => {}
        }
        self.is_ready()
    }

    pub fn is_ready(&self) -> bool {
        self.playing && self.time_advanced
    }
}

enum Media {
    Image(RgbaImage),
    Video(Box<dyn VideoElement>),
}

impl fmt::Debug for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Media::Image(image) => write!(f, "Image({}x{})", image.width(), image.height()),
            Media::Video(video) => write!(f, "Video({:?})", video.dimensions()),
        }
    }
}

#[derive(Debug)]
pub struct TextureEntry {
    pub name: String,
    pub source: String,
    pub kind: MediaKind,
    media: Option<Media>,
    signals: Option<mpsc::UnboundedReceiver<PlaybackSignal>>,
    video: VideoSignals,
    ready: bool,
    texture: Option<TextureId>,
    unit: u32,
    failure: Option<String>,
}

impl TextureEntry {
    /// True once decoded media is available for upload.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn unit(&self) -> u32 {
        self.unit
    }

    pub fn has_media(&self) -> bool {
        self.media.is_some()
    }

    pub fn video_signals(&self) -> VideoSignals {
        self.video
    }

    /// Why loading failed, if it did.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}

enum Delivery {
    Image {
        name: String,
        image: RgbaImage,
    },
    Video {
        name: String,
        element: Box<dyn VideoElement>,
        signals: mpsc::UnboundedReceiver<PlaybackSignal>,
    },
    Failed {
        name: String,
        reason: String,
    },
}

#[derive(Default)]
pub struct TextureRegistry {
    textures: HashMap<String, TextureEntry>,
    order: Vec<String>,
    deliveries: Option<mpsc::UnboundedReceiver<Delivery>>,
    loader: Option<JoinHandle<()>>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a placeholder texture per entry, then loads the media of all
    /// entries one after another in a background task.
    pub fn request_load(
        &mut self,
        api: &mut dyn GraphicsApi,
        entries: Vec<TextureDescriptor>,
        assets: Arc<dyn AssetSource>,
        media: Arc<dyn MediaHost>,
        runtime: &Handle,
        gate: &LoadGate,
    ) {
        let mut queue = Vec::with_capacity(entries.len());
        for entry in entries {
            if self.textures.contains_key(&entry.name) {
                log::warn!("Texture '{}' already requested", entry.name);
                continue;
            }
            let texture = api.create_texture();
            api.active_texture(SAMPLED_UNIT);
            api.bind_texture(Some(texture));
            api.tex_sampling(Sampling::default());
            upload_placeholder(api);

            self.order.push(entry.name.clone());
            self.textures.insert(
                entry.name.clone(),
                TextureEntry {
                    name: entry.name.clone(),
                    source: entry.source.clone(),
                    kind: entry.kind,
                    media: None,
                    signals: None,
                    video: VideoSignals::default(),
                    ready: false,
                    texture: Some(texture),
                    unit: SAMPLED_UNIT,
                    failure: None,
                },
            );
            queue.push(entry);
        }
        if queue.is_empty() {
            return;
        }

        let max_dimension = api.capabilities().max_texture_dimension;
        let (tx, rx) = mpsc::unbounded();
        self.deliveries = Some(rx);
        let gate = gate.clone();
        self.loader = Some(runtime.spawn(async move {
            for entry in queue {
                if !gate.is_open() {
                    break;
                }
                let delivery = load_one(&entry, assets.as_ref(), media.as_ref(), max_dimension).await;
                if !gate.is_open() {
                    if let Delivery::Video { mut element, .. } = delivery {
                        element.release();
                    }
                    break;
                }
                if tx.unbounded_send(delivery).is_err() {
                    break;
                }
            }
        }));
    }

    /// Applies finished loads and pending video signals without blocking.
    ///
    /// Returns how many entries became ready.
    pub fn poll_completions(&mut self) -> usize {
        let mut arrived = Vec::new();
        if let Some(rx) = self.deliveries.as_mut() {
            while let Ok(delivery) = rx.try_recv() {
                arrived.push(delivery);
            }
        }
        let mut became_ready = 0;
        for delivery in arrived {
            became_ready += usize::from(self.apply(delivery));
        }
        for entry in self.textures.values_mut() {
            let Some(signals) = entry.signals.as_mut() else {
                continue;
            };
            while let Ok(signal) = signals.try_recv() {
                if entry.video.observe(signal) && !entry.ready {
                    log::debug!("Video texture '{}' is playing", entry.name);
                    entry.ready = true;
                    became_ready += 1;
                }
            }
        }
        became_ready
    }

    /// Waits for the loader's next delivery and applies it.
    ///
    /// Returns `false` once the loader has finished.
    pub async fn next_delivery(&mut self) -> bool {
        let Some(rx) = self.deliveries.as_mut() else {
            return false;
        };
        let next = rx.next().await;
        match next {
            Some(delivery) => {
                self.apply(delivery);
                true
            }
            None => {
                self.deliveries = None;
                false
            }
        }
    }

    fn apply(&mut self, delivery: Delivery) -> bool {
        match delivery {
            Delivery::Image { name, image } => {
                let Some(entry) = self.textures.get_mut(&name) else {
                    return false;
                };
                log::debug!("Image texture '{name}' decoded ({}x{})", image.width(), image.height());
                entry.media = Some(Media::Image(image));
                entry.ready = true;
                true
            }
            Delivery::Video {
                name,
                mut element,
                signals,
            } => {
                let Some(entry) = self.textures.get_mut(&name) else {
                    element.release();
                    return false;
                };
                entry.media = Some(Media::Video(element));
                entry.signals = Some(signals);
                false
            }
            Delivery::Failed { name, reason } => {
                log::warn!("Texture '{name}' stays on its placeholder: {reason}");
                if let Some(entry) = self.textures.get_mut(&name) {
                    entry.failure = Some(reason);
                }
                false
            }
        }
    }

    /// Refreshes the GPU copy of `name` and leaves it bound on its unit.
    ///
    /// Not ready: the placeholder pixel. Ready: the decoded image, or the video's
    /// current frame, flipped vertically.
    pub fn update_gpu_texture(&self, api: &mut dyn GraphicsApi, name: &str) -> Result<(), ContractViolation> {
        let entry = self.textures.get(name).ok_or_else(|| ContractViolation::UnknownEntry {
            kind: "texture",
            name: name.to_owned(),
        })?;
        let texture = entry.texture.ok_or_else(|| ContractViolation::UnknownEntry {
            kind: "texture object",
            name: name.to_owned(),
        })?;
        api.active_texture(entry.unit);
        api.bind_texture(Some(texture));
        let frame = match (&entry.media, entry.ready) {
            (Some(Media::Image(image)), true) => Some(image),
            (Some(Media::Video(video)), true) => video.current_frame(),
            _ => None,
        };
        match frame {
            Some(image) => api.tex_image_2d(
                TexelData {
                    width: image.width(),
                    height: image.height(),
                    rgba: image.as_raw(),
                },
                true,
            ),
            None => upload_placeholder(api),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TextureEntry> {
        self.textures.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.textures.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn ready_count(&self) -> usize {
        self.textures.values().filter(|t| t.ready).count()
    }

    /// True when every requested texture shows real media.
    pub fn is_all_ready(&self) -> bool {
        self.textures.values().all(|t| t.ready)
    }

    /// Pauses and releases every video and stops the loader.
    pub fn stop_all_media(&mut self) {
        if let Some(loader) = self.loader.take() {
            loader.abort();
        }
        for entry in self.textures.values_mut() {
            if let Some(Media::Video(video)) = entry.media.as_mut() {
                log::debug!("Stopping video texture '{}'", entry.name);
                video.pause();
                video.release();
            }
            entry.signals = None;
        }
    }

    /// Deletes every GPU texture, detaches all media and forgets every entry.
    pub fn release_all(&mut self, api: &mut dyn GraphicsApi) {
        self.stop_all_media();
        for name in self.order.drain(..) {
            let Some(mut entry) = self.textures.remove(&name) else {
                continue;
            };
            if let Some(texture) = entry.texture.take() {
                api.delete_texture(texture);
            }
            entry.media = None;
        }
        self.textures.clear();
        self.deliveries = None;
    }
}

fn upload_placeholder(api: &mut dyn GraphicsApi) {
    api.tex_image_2d(
        TexelData {
            width: 1,
            height: 1,
            rgba: &PLACEHOLDER_PIXEL,
        },
        false,
    );
}

async fn load_one(
    entry: &TextureDescriptor,
    assets: &dyn AssetSource,
    media: &dyn MediaHost,
    max_dimension: u32,
) -> Delivery {
    let name = entry.name.clone();
    let bytes = match assets.load_binary(&entry.source).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return Delivery::Failed {
                name,
                reason: error_chain(&e),
            };
        }
    };
    match entry.kind {
        MediaKind::Image => match media.decode_image(&bytes) {
            Ok(image) => match oversized(image.dimensions(), max_dimension) {
                Some(reason) => Delivery::Failed { name, reason },
                None => Delivery::Image { name, image },
            },
            Err(e) => Delivery::Failed {
                name,
                reason: error_chain(&e),
            },
        },
        MediaKind::Video => match media.open_video(bytes) {
            Ok(mut element) => {
                if let Some(reason) = oversized(element.dimensions(), max_dimension) {
                    element.release();
                    return Delivery::Failed { name, reason };
                }
                let signals = element.play();
                Delivery::Video {
                    name,
                    element,
                    signals,
                }
            }
            Err(e) => Delivery::Failed {
                name,
                reason: error_chain(&e),
            },
        },
    }
}

fn oversized((width, height): (u32, u32), max_dimension: u32) -> Option<String> {
    (width > max_dimension || height > max_dimension)
        .then(|| format!("{width}x{height} exceeds the {max_dimension}px texture limit"))
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_video_signal_is_not_ready() {
        let mut signals = VideoSignals::default();
        assert!(!signals.observe(PlaybackSignal::Playing));
        assert!(!signals.observe(PlaybackSignal::Playing));
        assert!(signals.observe(PlaybackSignal::TimeUpdate));
    }

    #[test]
    fn oversized_media_is_rejected_per_axis() {
        assert_eq!(oversized((8192, 8192), 8192), None);
        assert!(oversized((9000, 10), 8192).unwrap().contains("9000x10"));
        assert!(oversized((10, 8193), 8192).is_some());
    }

    #[test]
    fn time_update_alone_is_not_ready() {
        let mut signals = VideoSignals::default();
        assert!(!signals.observe(PlaybackSignal::TimeUpdate));
        assert!(!signals.observe(PlaybackSignal::Ended));
        assert!(!signals.is_ready());
    }
}
