//! Opening the receiving app once a batch is stored.

use std::sync::Arc;

use {
    async_trait::async_trait,
    sharebridge_config::ShareConfig,
    tracing::{info, warn},
};

use crate::{
    error::{IngestError, Result},
    model::RedirectTag,
};

/// Platform capability that opens a URL in whichever app handles its scheme.
#[async_trait]
pub trait Launcher: Send + Sync {
    fn name(&self) -> &str;

    /// Returns whether the URL was handed to a handler.
    async fn open(&self, url: &str) -> bool;
}

/// A built activation URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    /// Percent-encoded URL, scheme case preserved.
    pub url: String,
    pub tag: RedirectTag,
}

pub struct HostActivator {
    scheme: String,
    shared_key: String,
    launcher: Option<Arc<dyn Launcher>>,
}

impl HostActivator {
    pub fn new(
        scheme: impl Into<String>,
        shared_key: impl Into<String>,
        launcher: Option<Arc<dyn Launcher>>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            shared_key: shared_key.into(),
            launcher,
        }
    }

    pub fn from_config(share: &ShareConfig, launcher: Option<Arc<dyn Launcher>>) -> Self {
        Self::new(share.url_scheme(), share.shared_key.clone(), launcher)
    }

    /// `<scheme>://dataUrl=<key>#<tag>`, percent-encoded as a whole.
    pub fn request(&self, tag: RedirectTag) -> Result<ActivationRequest> {
        let raw = format!("{}://dataUrl={}#{}", self.scheme, self.shared_key, tag);
        let url = percent_encode_query(&raw);
        if url::Url::parse(&url).is_err() {
            return Err(IngestError::ActivationUrlInvalid { url });
        }
        Ok(ActivationRequest { url, tag })
    }

    /// Build the activation URL and open the host app with it.
    pub async fn activate(&self, tag: RedirectTag) -> Result<ActivationRequest> {
        let request = self.request(tag)?;
        let Some(ref launcher) = self.launcher else {
            warn!(url = %request.url, "no launcher available");
            return Err(IngestError::NoLauncherAvailable);
        };
        if !launcher.open(&request.url).await {
            warn!(launcher = launcher.name(), url = %request.url, "host app did not open");
            return Err(IngestError::HostAppUnreachable);
        }
        info!(launcher = launcher.name(), url = %request.url, "host app activated");
        Ok(request)
    }
}

/// Characters left untouched when encoding the activation URL, on top of
/// ASCII alphanumerics.
const QUERY_ALLOWED: &[u8] = b"!$&'()*+,-./:;=?@_~";

fn percent_encode_query(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for &byte in raw.as_bytes() {
        if byte.is_ascii_alphanumeric() || QUERY_ALLOWED.contains(&byte) {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
