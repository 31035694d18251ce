//! Knowledge index
//!
//! Holds embedded knowledge documents tagged by domain and answers similarity
//! queries filtered by domain. Embedding is delegated to an
//! [`EmbeddingProvider`]; ranking is by cosine distance with ties broken by id.
//!
//! Documents can be indexed one at a time or loaded from a directory of
//! Markdown files with YAML frontmatter:
//!
//! ```markdown
//! ---
//! id: screen-free-evenings
//! domain: activities
//! ---
//! Board games, cooking together, and evening walks...
//! ```

pub mod embedding;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub use embedding::{
    cosine_similarity, create_provider, EmbeddingProvider, HashedEmbedder, OllamaEmbedder,
};

/// An embedded knowledge document; immutable once indexed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub domain: String,
    pub text: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

/// A document to be indexed (the index computes the embedding)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentSource {
    pub id: String,
    pub domain: String,
    #[serde(default)]
    pub text: String,
}

impl DocumentSource {
    pub fn new(id: impl Into<String>, domain: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
            text: text.into(),
        }
    }
}

/// Frontmatter of a knowledge Markdown file
#[derive(Debug, Deserialize)]
struct KnowledgeFrontmatter {
    id: String,
    domain: String,
}

/// In-memory similarity index over knowledge documents
pub struct KnowledgeIndex {
    provider: Arc<dyn EmbeddingProvider>,
    documents: RwLock<BTreeMap<String, KnowledgeDocument>>,
    top_k: usize,
}

impl KnowledgeIndex {
    /// Create an empty index returning at most `top_k` documents per query
    pub fn new(provider: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self {
            provider,
            documents: RwLock::new(BTreeMap::new()),
            top_k: top_k.max(1),
        }
    }

    /// Add a document, replacing any existing document with the same id
    pub async fn index(&self, source: DocumentSource) -> Result<()> {
        if source.id.trim().is_empty() {
            return Err(Error::InvalidRequest("document id must not be empty".into()));
        }
        if source.domain.trim().is_empty() {
            return Err(Error::InvalidRequest(format!(
                "document {} has no domain",
                source.id
            )));
        }

        let embedding = self.embed(&source.text).await?;
        let document = KnowledgeDocument {
            id: source.id,
            domain: source.domain,
            text: source.text,
            embedding,
        };

        let mut documents = self
            .documents
            .write()
            .map_err(|_| Error::IndexUnavailable("knowledge index lock poisoned".into()))?;
        let replaced = documents.insert(document.id.clone(), document).is_some();
        debug!(replaced, total = documents.len(), "Indexed knowledge document");
        Ok(())
    }

    /// Documents in `domains`, most similar to `text` first
    ///
    /// Empty `domains`, or no document in any of them, yields an empty result
    /// without calling the embedding provider.
    pub async fn query(&self, text: &str, domains: &[String]) -> Result<Vec<KnowledgeDocument>> {
        if domains.is_empty() || !self.has_domain(domains)? {
            return Ok(Vec::new());
        }

        let query_vec = self.embed(text).await?;

        let documents = self
            .documents
            .read()
            .map_err(|_| Error::IndexUnavailable("knowledge index lock poisoned".into()))?;

        let mut scored: Vec<(f32, &KnowledgeDocument)> = documents
            .values()
            .filter(|doc| domains.iter().any(|d| d == &doc.domain))
            .map(|doc| (1.0 - cosine_similarity(&query_vec, &doc.embedding), doc))
            .collect();

        scored.sort_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)));

        Ok(scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    /// Index every `*.md` file with frontmatter in `dir`; returns how many were indexed
    ///
    /// Files that fail to parse or embed are skipped with a warning.
    pub async fn load_dir(&self, dir: &Path) -> Result<usize> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
            .collect();
        paths.sort();

        let mut count = 0;
        for path in paths {
            let indexed = match std::fs::read_to_string(&path) {
                Ok(content) => match parse_knowledge_file(&content) {
                    Ok(source) => self.index(source).await,
                    Err(e) => Err(e),
                },
                Err(e) => Err(e.into()),
            };
            match indexed {
                Ok(()) => count += 1,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        error_kind = %e.kind(),
                        "Skipping knowledge file"
                    );
                }
            }
        }

        debug!(dir = %dir.display(), count, "Loaded knowledge directory");
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct domain tags currently indexed
    pub fn domains(&self) -> Vec<String> {
        let Ok(documents) = self.documents.read() else {
            return Vec::new();
        };
        let mut domains: Vec<String> = documents.values().map(|d| d.domain.clone()).collect();
        domains.sort();
        domains.dedup();
        domains
    }

    /// Embed with the provider, rejecting vectors of the wrong width
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.provider.embed(text).await?;
        let expected = self.provider.dimensions();
        if vector.len() != expected {
            return Err(Error::IndexUnavailable(format!(
                "{} embedder returned {} dimensions, expected {}",
                self.provider.name(),
                vector.len(),
                expected
            )));
        }
        Ok(vector)
    }

    fn has_domain(&self, domains: &[String]) -> Result<bool> {
        let documents = self
            .documents
            .read()
            .map_err(|_| Error::IndexUnavailable("knowledge index lock poisoned".into()))?;
        Ok(documents
            .values()
            .any(|doc| domains.iter().any(|d| d == &doc.domain)))
    }
}

/// Split a knowledge file into frontmatter and body
fn parse_knowledge_file(content: &str) -> Result<DocumentSource> {
    let content = content.trim_start();
    let rest = content
        .strip_prefix("---")
        .ok_or_else(|| Error::InvalidData("missing frontmatter".into()))?;
    let end = rest
        .find("\n---")
        .ok_or_else(|| Error::InvalidData("unterminated frontmatter".into()))?;

    let frontmatter: KnowledgeFrontmatter = serde_yaml::from_str(&rest[..end])
        .map_err(|e| Error::InvalidData(format!("invalid frontmatter: {}", e)))?;
    let body = rest[end + 4..].trim().to_string();

    Ok(DocumentSource {
        id: frontmatter.id,
        domain: frontmatter.domain,
        text: body,
    })
}
