//! Pairing credential rendering

use chatbridge_core::config::RendererConfig;

/// Turns a pairing payload into something a browser can display
pub trait CredentialRenderer: Send + Sync {
    /// Image URL for the payload
    fn render(&self, credential: &str) -> String;
}

/// Renders through an external QR image service addressed by URL
#[derive(Debug, Clone)]
pub struct QrServerRenderer {
    service_url: String,
    size: u32,
}

impl QrServerRenderer {
    pub fn new(service_url: impl Into<String>, size: u32) -> Self {
        Self {
            service_url: service_url.into(),
            size,
        }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(config.qr_service_url.clone(), config.size)
    }
}

impl CredentialRenderer for QrServerRenderer {
    fn render(&self, credential: &str) -> String {
        format!(
            "{}?size={}x{}&data={}",
            self.service_url,
            self.size,
            self.size,
            urlencoding::encode(credential)
        )
    }
}
