//! Configuration for family members, the generative backend and retrieval
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, or the override in the data dir
//!    (~/.local/share/ginger/config/ginger.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! The raw TOML is validated into typed structs before any request runs;
//! malformed config never reaches the pipeline.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/ginger.toml");

/// A family member and the calendar keywords attributed to them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyMember {
    pub id: String,
    /// Lower-cased, trimmed trigger keywords
    pub keywords: Vec<String>,
}

impl FamilyMember {
    /// True if any trigger keyword appears in `text` (case-insensitive)
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

/// Ordered family configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyConfig {
    pub members: Vec<FamilyMember>,
}

impl FamilyConfig {
    pub fn member(&self, id: &str) -> Option<&FamilyMember> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn member_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }
}

/// Which generative backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Ollama,
    Anthropic,
    Mock,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Anthropic => "anthropic",
            Self::Mock => "mock",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "mock" => Ok(Self::Mock),
            other => Err(Error::Config(format!("Unknown backend kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub host: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Name of the environment variable holding the API key (Anthropic only)
    pub api_key_env: String,
}

/// Which embedding provider the knowledge index uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingKind {
    /// Offline feature hashing, no model required
    Hashed,
    /// Ollama `/api/embeddings`
    Ollama,
}

impl std::str::FromStr for EmbeddingKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "hashed" | "local" => Ok(Self::Hashed),
            "ollama" => Ok(Self::Ollama),
            other => Err(Error::Config(format!("Unknown embedding kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub kind: EmbeddingKind,
    pub host: String,
    pub model: String,
    /// Vector width; embeddings of any other width are rejected
    pub dimensions: usize,
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub knowledge_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Trailing analytics window in days
    pub window_days: u32,
}

#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub max_results: usize,
    pub events_file: Option<PathBuf>,
}

/// Validated process-wide configuration, immutable once loaded
#[derive(Debug, Clone)]
pub struct GingerConfig {
    pub family: FamilyConfig,
    pub backend: BackendConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub ledger: LedgerConfig,
    pub calendar: CalendarConfig,
    /// Where this config was read from (None for embedded defaults)
    pub source: Option<PathBuf>,
}

impl GingerConfig {
    /// Load using the default resolution (data dir override, then embedded)
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Self::embedded(),
        }
    }

    /// Load from an explicit file; the file must exist
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml(&content)?;
        config.source = Some(path.to_path_buf());
        info!(path = %path.display(), members = config.family.members.len(), "Loaded config");
        Ok(config)
    }

    /// Embedded defaults
    pub fn embedded() -> Result<Self> {
        debug!("Using embedded default config");
        Self::from_toml(DEFAULT_CONFIG)
    }

    /// Parse and validate TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        raw.validate()
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("ginger").join("config").join("ginger.toml"))
}

// ── Raw TOML shape ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    family: RawFamily,
    backend: RawBackend,
    embedding: RawEmbedding,
    retrieval: RawRetrieval,
    ledger: RawLedger,
    calendar: RawCalendar,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawFamily {
    members: Vec<RawMember>,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    id: String,
    #[serde(default)]
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawBackend {
    kind: String,
    host: String,
    model: String,
    max_tokens: u32,
    timeout_secs: u64,
    api_key_env: String,
}

impl Default for RawBackend {
    fn default() -> Self {
        Self {
            kind: "ollama".into(),
            host: "http://localhost:11434".into(),
            model: "llama3.2".into(),
            max_tokens: 1000,
            timeout_secs: 90,
            api_key_env: "ANTHROPIC_API_KEY".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawEmbedding {
    kind: String,
    host: String,
    model: String,
    dimensions: usize,
}

impl Default for RawEmbedding {
    fn default() -> Self {
        Self {
            kind: "hashed".into(),
            host: "http://localhost:11434".into(),
            model: "nomic-embed-text".into(),
            dimensions: 256,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawRetrieval {
    top_k: usize,
    knowledge_dir: Option<PathBuf>,
}

impl Default for RawRetrieval {
    fn default() -> Self {
        Self {
            top_k: 5,
            knowledge_dir: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawLedger {
    window_days: u32,
}

impl Default for RawLedger {
    fn default() -> Self {
        Self { window_days: 30 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawCalendar {
    max_results: usize,
    events_file: Option<PathBuf>,
}

impl Default for RawCalendar {
    fn default() -> Self {
        Self {
            max_results: 10,
            events_file: None,
        }
    }
}

impl RawConfig {
    fn validate(self) -> Result<GingerConfig> {
        let family = validate_family(self.family)?;

        let backend = BackendConfig {
            kind: self.backend.kind.parse()?,
            host: self.backend.host.trim_end_matches('/').to_string(),
            model: self.backend.model,
            max_tokens: self.backend.max_tokens,
            timeout: Duration::from_secs(self.backend.timeout_secs),
            api_key_env: self.backend.api_key_env,
        };
        if backend.max_tokens == 0 {
            return Err(Error::Config("backend.max_tokens must be positive".into()));
        }
        if backend.timeout.is_zero() {
            return Err(Error::Config("backend.timeout_secs must be positive".into()));
        }
        if backend.kind != BackendKind::Mock && backend.model.trim().is_empty() {
            return Err(Error::Config("backend.model must not be empty".into()));
        }

        let embedding = EmbeddingConfig {
            kind: self.embedding.kind.parse()?,
            host: self.embedding.host.trim_end_matches('/').to_string(),
            model: self.embedding.model,
            dimensions: self.embedding.dimensions,
        };
        if embedding.dimensions == 0 {
            return Err(Error::Config("embedding.dimensions must be positive".into()));
        }

        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be positive".into()));
        }
        if self.ledger.window_days == 0 {
            return Err(Error::Config("ledger.window_days must be positive".into()));
        }
        if self.calendar.max_results == 0 {
            return Err(Error::Config("calendar.max_results must be positive".into()));
        }

        Ok(GingerConfig {
            family,
            backend,
            embedding,
            retrieval: RetrievalConfig {
                top_k: self.retrieval.top_k,
                knowledge_dir: self.retrieval.knowledge_dir,
            },
            ledger: LedgerConfig {
                window_days: self.ledger.window_days,
            },
            calendar: CalendarConfig {
                max_results: self.calendar.max_results,
                events_file: self.calendar.events_file,
            },
            source: None,
        })
    }
}

fn validate_family(raw: RawFamily) -> Result<FamilyConfig> {
    if raw.members.is_empty() {
        return Err(Error::Config(
            "at least one [[family.members]] entry is required".into(),
        ));
    }

    let mut seen = HashSet::new();
    let mut members = Vec::with_capacity(raw.members.len());

    for member in raw.members {
        let id = member.id.trim().to_string();
        if id.is_empty() {
            return Err(Error::Config("family member id must not be empty".into()));
        }
        if !seen.insert(id.clone()) {
            return Err(Error::Config(format!("duplicate family member id: {}", id)));
        }

        let mut keywords: Vec<String> = Vec::new();
        for keyword in member.keywords {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() && !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }
        if keywords.is_empty() {
            return Err(Error::Config(format!(
                "family member '{}' needs at least one keyword",
                id
            )));
        }

        members.push(FamilyMember { id, keywords });
    }

    Ok(FamilyConfig { members })
}
