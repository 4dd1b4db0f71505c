//! Publishes artwork to the platform, touching the image only on change

use tracing::debug;

use crate::error::Result;
use crate::now_playing::Artwork;
use crate::platform::{Image, Platform};

/// Owns the device's album-art image.
///
/// The image is created on first publish and attached as album art once;
/// later publishes only rewrite its content when the resolved artwork
/// differs from what was last published.
#[derive(Default)]
pub struct ArtworkPublisher {
    image: Option<Box<dyn Image>>,
    attached: bool,
    published: Option<Artwork>,
    last_requested_for: Option<String>,
}

impl ArtworkPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Option<&Artwork> {
        self.published.as_ref()
    }

    /// Publish `artwork`; returns whether the image was touched
    pub async fn publish(&mut self, platform: &dyn Platform, artwork: Artwork) -> Result<bool> {
        if self.published.as_ref() == Some(&artwork) {
            return Ok(false);
        }

        let image = match self.image.take() {
            Some(image) => image,
            None => platform.create_image().await?,
        };
        let image = self.image.insert(image);

        match &artwork {
            Artwork::Url(url) => image.set_url(Some(url)).await?,
            Artwork::Bytes(bytes) => image.set_bytes(bytes).await?,
            Artwork::Placeholder => image.set_url(None).await?,
        }
        image.update().await?;

        if !self.attached {
            platform.set_album_art(image.as_ref()).await?;
            self.attached = true;
        }

        debug!(artwork = artwork_kind(&artwork), "Artwork published");
        self.published = Some(artwork);
        Ok(true)
    }

    /// Whether a playback-queue request was already sent for `content_id`
    pub fn already_requested(&self, content_id: &str) -> bool {
        self.last_requested_for.as_deref() == Some(content_id)
    }

    pub fn mark_requested(&mut self, content_id: &str) {
        self.last_requested_for = Some(content_id.to_string());
    }

    pub fn clear_request_marker(&mut self) {
        self.last_requested_for = None;
    }

    /// Unregister the image, if one was created
    pub async fn unregister(&mut self) -> Result<()> {
        self.published = None;
        self.attached = false;
        if let Some(image) = self.image.take() {
            image.unregister().await?;
        }
        Ok(())
    }
}

fn artwork_kind(artwork: &Artwork) -> &'static str {
    match artwork {
        Artwork::Placeholder => "placeholder",
        Artwork::Url(_) => "url",
        Artwork::Bytes(_) => "bytes",
    }
}
