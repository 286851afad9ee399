//! OSF storage listing through the public JSON API
//!
//! Walks a template folder of an OSF storage project and collects the
//! download links of its imaging files.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::core::archive::TemplateId;

/// Base URL of the OSF API
pub const OSF_API: &str = "https://api.osf.io/v2";

/// File suffixes whose download links are reported
pub const OSF_EXTENSIONS: &[&str] = &[".nii", ".nii.gz", ".gii"];

#[derive(Debug, Error)]
pub enum OsfError {
    #[error("Request <{url}>: ERROR {status}")]
    Status { url: String, status: u16 },

    #[error("Request <{url}> failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Template <{0}> not found.")]
    TemplateNotFound(String),

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeAttributes {
    pub kind: NodeKind,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeLinks {
    pub download: Option<String>,
    /// Listing URL of a folder's contents
    #[serde(rename = "move")]
    pub move_url: Option<String>,
}

/// A file or folder in OSF storage
#[derive(Debug, Clone, Deserialize)]
pub struct StorageNode {
    pub attributes: NodeAttributes,
    #[serde(default)]
    pub links: NodeLinks,
}

#[derive(Debug, Default, Deserialize)]
struct PageLinks {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: Vec<StorageNode>,
    #[serde(default)]
    links: PageLinks,
}

/// One imaging file and where to download it
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileUrl {
    /// Path relative to the template folder, `/`-separated
    pub name: String,
    pub link: String,
}

/// Source of storage listings
#[async_trait]
pub trait StorageBrowser: Send + Sync {
    /// All entries of the folder listed at `url`
    async fn list(&self, url: &str) -> Result<Vec<StorageNode>, OsfError>;
}

/// HTTP client for the OSF API
#[derive(Clone)]
pub struct OsfClient {
    http: reqwest::Client,
    base_url: String,
}

impl OsfClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Listing URL of the root of a project's OSF storage
    pub fn storage_root(&self, project: &str) -> String {
        format!("{}/nodes/{}/files/osfstorage/", self.base_url, project)
    }

    async fn get_page(&self, url: &str) -> Result<Listing, OsfError> {
        let http_err = |source: reqwest::Error| OsfError::Http {
            url: url.to_string(),
            source,
        };

        let response = self.http.get(url).send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(OsfError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<Listing>().await.map_err(http_err)
    }
}

impl Default for OsfClient {
    fn default() -> Self {
        Self::new(OSF_API)
    }
}

#[async_trait]
impl StorageBrowser for OsfClient {
    async fn list(&self, url: &str) -> Result<Vec<StorageNode>, OsfError> {
        let mut nodes = Vec::new();
        let mut next = Some(url.to_string());

        while let Some(page_url) = next {
            tracing::debug!(url = %page_url, "listing OSF folder");
            let page = self.get_page(&page_url).await?;
            nodes.extend(page.data);
            next = page.links.next;
        }

        Ok(nodes)
    }
}

fn is_imaging_file(name: &str) -> bool {
    OSF_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Download links of every imaging file in the template's folder, sorted
pub async fn collect_urls<B>(
    browser: &B,
    root_url: &str,
    id: &TemplateId,
) -> Result<Vec<FileUrl>, OsfError>
where
    B: StorageBrowser + ?Sized,
{
    let dir_name = id.dir_name();
    let template_url = browser
        .list(root_url)
        .await?
        .into_iter()
        .find(|node| node.attributes.name == dir_name)
        .and_then(|node| node.links.move_url)
        .ok_or_else(|| OsfError::TemplateNotFound(dir_name.clone()))?;

    let mut hits = Vec::new();
    // Folders still to visit, with the path leading to them
    let mut pending: Vec<(String, Vec<String>)> = vec![(template_url, Vec::new())];

    while let Some((url, parents)) = pending.pop() {
        for node in browser.list(&url).await? {
            match node.attributes.kind {
                NodeKind::File if is_imaging_file(&node.attributes.name) => {
                    let Some(link) = node.links.download else {
                        tracing::warn!(file = %node.attributes.name, "file without download link");
                        continue;
                    };
                    let mut path = parents.clone();
                    path.push(node.attributes.name);
                    hits.push(FileUrl {
                        name: path.join("/"),
                        link,
                    });
                }
                NodeKind::File => {}
                NodeKind::Folder => {
                    if let Some(move_url) = node.links.move_url {
                        let mut path = parents.clone();
                        path.push(node.attributes.name);
                        pending.push((move_url, path));
                    }
                }
            }
        }
    }

    hits.sort();
    Ok(hits)
}

/// Render the links as CSV with a `name,link` header
pub fn to_csv(urls: &[FileUrl]) -> Result<String, OsfError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["name", "link"])?;
    for url in urls {
        writer.write_record([url.name.as_str(), url.link.as_str()])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| OsfError::Csv(csv::Error::from(e.into_error())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
