//! In-memory platform that records every call, for tests

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use crate::platform::{CapabilityValue, Image, Platform, PlatformError, PlatformResult};

/// One call made against the platform
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    AddCapability(String),
    RemoveCapability(String),
    SetValue(String, CapabilityValue),
    SetValues(Vec<(String, CapabilityValue)>),
    CreateImage(String),
    SetAlbumArt(String),
    SetUnavailable(String),
    SetAvailable,
}

/// One call made against a recorded image
#[derive(Debug, Clone, PartialEq)]
pub enum ImageCall {
    SetUrl(Option<Url>),
    SetBytes(Vec<u8>),
    Update,
    Unregister,
}

#[derive(Debug, Default)]
struct ImageState {
    id: String,
    calls: Mutex<Vec<ImageCall>>,
    unregistered: AtomicBool,
}

/// Image handle sharing its recording with the platform that created it
#[derive(Debug, Clone)]
pub struct RecordingImage {
    state: Arc<ImageState>,
}

impl RecordingImage {
    fn new(id: String) -> Self {
        Self {
            state: Arc::new(ImageState {
                id,
                ..Default::default()
            }),
        }
    }

    pub fn calls(&self) -> Vec<ImageCall> {
        self.state.calls.lock().clone()
    }

    /// Number of content changes (`set_url`/`set_bytes`)
    pub fn content_changes(&self) -> usize {
        self.state
            .calls
            .lock()
            .iter()
            .filter(|call| matches!(call, ImageCall::SetUrl(_) | ImageCall::SetBytes(_)))
            .count()
    }

    pub fn last_content(&self) -> Option<ImageCall> {
        self.state
            .calls
            .lock()
            .iter()
            .rev()
            .find(|call| matches!(call, ImageCall::SetUrl(_) | ImageCall::SetBytes(_)))
            .cloned()
    }

    pub fn is_unregistered(&self) -> bool {
        self.state.unregistered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Image for RecordingImage {
    fn id(&self) -> &str {
        &self.state.id
    }

    async fn set_url(&self, url: Option<&Url>) -> PlatformResult<()> {
        self.state.calls.lock().push(ImageCall::SetUrl(url.cloned()));
        Ok(())
    }

    async fn set_bytes(&self, bytes: &[u8]) -> PlatformResult<()> {
        self.state.calls.lock().push(ImageCall::SetBytes(bytes.to_vec()));
        Ok(())
    }

    async fn update(&self) -> PlatformResult<()> {
        self.state.calls.lock().push(ImageCall::Update);
        Ok(())
    }

    async fn unregister(&self) -> PlatformResult<()> {
        self.state.calls.lock().push(ImageCall::Unregister);
        self.state.unregistered.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Platform mock holding capability values in memory.
///
/// `set_capability_values` applies the whole batch at once and records it
/// as a single call.
#[derive(Debug, Default)]
pub struct RecordingPlatform {
    capabilities: Mutex<Vec<String>>,
    values: Mutex<BTreeMap<String, CapabilityValue>>,
    calls: Mutex<Vec<PlatformCall>>,
    images: Mutex<Vec<RecordingImage>>,
    available: Mutex<Option<bool>>,
    fail_writes: AtomicBool,
    fail_images: AtomicBool,
    image_counter: AtomicU32,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with these capabilities already present
    pub fn with_capabilities<I, S>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let platform = Self::new();
        *platform.capabilities.lock() = capabilities.into_iter().map(Into::into).collect();
        platform
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Current value of a capability
    pub fn value(&self, name: &str) -> Option<CapabilityValue> {
        self.values.lock().get(name).cloned()
    }

    /// Every batched write, in order
    pub fn batches(&self) -> Vec<Vec<(String, CapabilityValue)>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                PlatformCall::SetValues(values) => Some(values.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of capability add and remove calls
    pub fn structure_changes(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, PlatformCall::AddCapability(_) | PlatformCall::RemoveCapability(_)))
            .count()
    }

    pub fn images(&self) -> Vec<RecordingImage> {
        self.images.lock().clone()
    }

    /// `Some(true)` after `set_available`, `Some(false)` after `set_unavailable`
    pub fn availability(&self) -> Option<bool> {
        *self.available.lock()
    }

    /// Make every value write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make image creation fail
    pub fn set_fail_images(&self, fail: bool) {
        self.fail_images.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> PlatformResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PlatformError("write rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn capabilities(&self) -> Vec<String> {
        self.capabilities.lock().clone()
    }

    async fn add_capability(&self, name: &str) -> PlatformResult<()> {
        self.calls.lock().push(PlatformCall::AddCapability(name.to_string()));
        let mut capabilities = self.capabilities.lock();
        if !capabilities.iter().any(|c| c == name) {
            capabilities.push(name.to_string());
        }
        Ok(())
    }

    async fn remove_capability(&self, name: &str) -> PlatformResult<()> {
        self.calls.lock().push(PlatformCall::RemoveCapability(name.to_string()));
        self.capabilities.lock().retain(|c| c != name);
        self.values.lock().remove(name);
        Ok(())
    }

    async fn set_capability_value(&self, name: &str, value: CapabilityValue) -> PlatformResult<()> {
        self.check_write()?;
        self.calls.lock().push(PlatformCall::SetValue(name.to_string(), value.clone()));
        self.values.lock().insert(name.to_string(), value);
        Ok(())
    }

    async fn set_capability_values(&self, values: Vec<(String, CapabilityValue)>) -> PlatformResult<()> {
        self.check_write()?;
        self.calls.lock().push(PlatformCall::SetValues(values.clone()));
        self.values.lock().extend(values);
        Ok(())
    }

    async fn create_image(&self) -> PlatformResult<Box<dyn Image>> {
        if self.fail_images.load(Ordering::SeqCst) {
            return Err(PlatformError("image rejected".to_string()));
        }
        let id = format!("image-{}", self.image_counter.fetch_add(1, Ordering::SeqCst) + 1);
        let image = RecordingImage::new(id.clone());
        self.calls.lock().push(PlatformCall::CreateImage(id));
        self.images.lock().push(image.clone());
        Ok(Box::new(image))
    }

    async fn set_album_art(&self, image: &dyn Image) -> PlatformResult<()> {
        self.calls.lock().push(PlatformCall::SetAlbumArt(image.id().to_string()));
        Ok(())
    }

    async fn set_unavailable(&self, reason: &str) -> PlatformResult<()> {
        self.calls.lock().push(PlatformCall::SetUnavailable(reason.to_string()));
        *self.available.lock() = Some(false);
        Ok(())
    }

    async fn set_available(&self) -> PlatformResult<()> {
        self.calls.lock().push(PlatformCall::SetAvailable);
        *self.available.lock() = Some(true);
        Ok(())
    }
}
