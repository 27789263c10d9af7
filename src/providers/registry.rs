use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{GlInsightsError, Result};
use crate::insights::ManifestFormat;
use crate::providers::gitlab::client::check_status;

/// Source of "latest published version" answers for manifest dependencies.
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    async fn latest_version(&self, format: ManifestFormat, name: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct RegistryUrls {
    pub crates_io: Url,
    pub npm: Url,
    pub pypi: Url,
}

impl RegistryUrls {
    pub fn public() -> Result<Self> {
        let parse = |raw: &str| {
            Url::parse(raw)
                .map_err(|e| GlInsightsError::Config(format!("Invalid registry URL '{raw}': {e}")))
        };

        Ok(Self {
            crates_io: parse("https://crates.io/")?,
            npm: parse("https://registry.npmjs.org/")?,
            pypi: parse("https://pypi.org/")?,
        })
    }
}

/// Public registries queried over HTTP (crates.io, npm, PyPI).
pub struct HttpRegistry {
    client: Client,
    urls: RegistryUrls,
}

#[derive(Debug, Deserialize)]
struct CratesIoResponse {
    #[serde(rename = "crate")]
    krate: CratesIoCrate,
}

#[derive(Debug, Deserialize)]
struct CratesIoCrate {
    max_stable_version: Option<String>,
    max_version: String,
}

#[derive(Debug, Deserialize)]
struct NpmLatest {
    version: String,
}

#[derive(Debug, Deserialize)]
struct PypiResponse {
    info: PypiInfo,
}

#[derive(Debug, Deserialize)]
struct PypiInfo {
    version: String,
}

impl HttpRegistry {
    pub fn new(urls: RegistryUrls, timeout: Duration) -> Result<Self> {
        // crates.io rejects requests without a descriptive user agent
        let client = Client::builder()
            .user_agent(concat!(
                "glinsights/",
                env!("CARGO_PKG_VERSION"),
                " (dependency freshness check)"
            ))
            .timeout(timeout)
            .build()
            .map_err(|e| GlInsightsError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, urls })
    }

    fn lookup_url(&self, format: ManifestFormat, name: &str) -> Result<Url> {
        let (base, path) = match format {
            ManifestFormat::Cargo => (
                &self.urls.crates_io,
                format!("api/v1/crates/{}", urlencoding::encode(name)),
            ),
            // Scoped packages keep their '@' but encode the '/'
            ManifestFormat::Npm => (
                &self.urls.npm,
                format!("{}/latest", name.replace('/', "%2F")),
            ),
            ManifestFormat::Pip => (
                &self.urls.pypi,
                format!("pypi/{}/json", urlencoding::encode(name)),
            ),
        };

        base.join(&path)
            .map_err(|e| GlInsightsError::Config(format!("Invalid registry URL for '{name}': {e}")))
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.client.get(url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PackageRegistry for HttpRegistry {
    async fn latest_version(&self, format: ManifestFormat, name: &str) -> Result<String> {
        let url = self.lookup_url(format, name)?;
        debug!("Looking up latest version of {name} at {url}");

        match format {
            ManifestFormat::Cargo => {
                let body: CratesIoResponse = self.fetch(url).await?;
                Ok(body
                    .krate
                    .max_stable_version
                    .unwrap_or(body.krate.max_version))
            }
            ManifestFormat::Npm => Ok(self.fetch::<NpmLatest>(url).await?.version),
            ManifestFormat::Pip => Ok(self.fetch::<PypiResponse>(url).await?.info.version),
        }
    }
}
