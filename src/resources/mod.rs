//! Named GPU resources and where their bytes come from.
//!
//! The three registries ([`shader::ShaderRegistry`], [`mesh::MeshRegistry`],
//! [`texture::TextureRegistry`]) own every GPU object a scene creates. Bytes
//! are fetched through an [`AssetSource`], decoded media comes from a
//! [`media::MediaHost`].

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::{FutureExt, future::BoxFuture};

use crate::error::LoadError;

pub mod media;
pub mod mesh;
pub mod shader;
pub mod texture;

pub type LoadFuture<T> = BoxFuture<'static, Result<T, LoadError>>;

/// A byte-stream fetch primitive. Locators are opaque to the engine.
pub trait AssetSource: Send + Sync {
    fn load_binary(&self, locator: &str) -> LoadFuture<Vec<u8>>;

    fn load_string(&self, locator: &str) -> LoadFuture<String> {
        let bytes = self.load_binary(locator);
        let locator = locator.to_owned();
        async move { String::from_utf8(bytes.await?).map_err(|_| LoadError::Utf8(locator)) }.boxed()
    }
}

/// Reads files below `root` with tokio.
#[derive(Clone, Debug)]
pub struct FileAssets {
    root: PathBuf,
}

impl FileAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for FileAssets {
    fn load_binary(&self, locator: &str) -> LoadFuture<Vec<u8>> {
        let path = self.root.join(locator);
        let locator = locator.to_owned();
        async move {
            tokio::fs::read(&path)
                .await
                .map_err(|source| LoadError::Io { locator, source })
        }
        .boxed()
    }
}

/// Assets kept in memory, keyed by locator.
#[derive(Clone, Debug, Default)]
pub struct MemoryAssets {
    files: Arc<RwLock<HashMap<String, Arc<[u8]>>>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, locator: &str, bytes: impl Into<Vec<u8>>) {
        let bytes: Vec<u8> = bytes.into();
        if let Ok(mut files) = self.files.write() {
            files.insert(locator.to_owned(), bytes.into());
        }
    }

    pub fn with(self, locator: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(locator, bytes);
        self
    }
}

impl AssetSource for MemoryAssets {
    fn load_binary(&self, locator: &str) -> LoadFuture<Vec<u8>> {
        let found = self
            .files
            .read()
            .ok()
            .and_then(|files| files.get(locator).cloned());
        let locator = locator.to_owned();
        async move {
            found
                .map(|bytes| bytes.to_vec())
                .ok_or(LoadError::NotFound(locator))
        }
        .boxed()
    }
}

/// Fetches locators relative to a base URL.
#[cfg(feature = "http")]
#[derive(Clone, Debug)]
pub struct HttpAssets {
    client: reqwest::Client,
    base: reqwest::Url,
}

#[cfg(feature = "http")]
impl HttpAssets {
    pub fn new(base: reqwest::Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }
}

#[cfg(feature = "http")]
impl AssetSource for HttpAssets {
    fn load_binary(&self, locator: &str) -> LoadFuture<Vec<u8>> {
        let client = self.client.clone();
        let url = self.base.join(locator);
        let locator = locator.to_owned();
        async move {
            let Ok(url) = url else {
                return Err(LoadError::NotFound(locator));
            };
            let fetch = async {
                client
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await
            };
            fetch
                .await
                .map(|bytes| bytes.to_vec())
                .map_err(|source| LoadError::Http { locator, source })
        }
        .boxed()
    }
}

/// Shared "still active" flag checked before publishing any async result.
#[derive(Clone, Debug)]
pub struct LoadGate(Arc<AtomicBool>);

impl LoadGate {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for LoadGate {
    fn default() -> Self {
        Self::new()
    }
}
