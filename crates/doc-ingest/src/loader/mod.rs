//! Corpus traversal and per-file extraction
//!
//! A [`Loader`] walks a directory once, filters candidate files, and hands
//! each one to its [`ChunkExtractor`]. With more than one worker thread the
//! same candidate list is fanned out over a bounded rayon pool.

pub mod registry;
pub mod text;

pub use registry::{ChunkExtractor, Extractor, ExtractorKind};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::PdfConfig;
use crate::error::{Error, Result};
use crate::types::Chunk;

/// Extracted chunks keyed by file path
pub type LoadedFiles = BTreeMap<PathBuf, Vec<Chunk>>;

/// Traversal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Root directory
    pub directory: PathBuf,
    /// Walk subdirectories
    #[serde(default = "default_recursive")]
    pub recursive: bool,
    /// Allowed suffixes (exact, case-sensitive); empty disables the filter
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Basenames never loaded
    #[serde(default)]
    pub exclude_files: Vec<String>,
    /// Worker threads; values above one enable the parallel fan-out
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    /// Human-in-the-loop review toggle (reserved, no extractor reads it)
    #[serde(default)]
    pub hitl: bool,
    /// Restructuring system name (reserved, no extractor reads it)
    #[serde(default)]
    pub restructure_system: Option<String>,
}

fn default_recursive() -> bool { true }
fn default_num_threads() -> usize { 1 }

impl LoaderConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            recursive: true,
            extensions: Vec::new(),
            exclude_files: Vec::new(),
            num_threads: 1,
            hitl: false,
            restructure_system: None,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }
}

/// Traversal context owning the extracted chunks of one ingestion call
pub struct Loader<E: ChunkExtractor = Extractor> {
    config: LoaderConfig,
    extractor: E,
    loaded_files: LoadedFiles,
}

impl Loader<Extractor> {
    /// Loader for one format with that format's default extension filter
    pub fn for_kind(directory: impl Into<PathBuf>, kind: ExtractorKind) -> Result<Self> {
        Self::for_kind_with(directory, kind, &PdfConfig::default())
    }

    /// Same as [`Loader::for_kind`] with explicit PDF partitioner settings
    pub fn for_kind_with(
        directory: impl Into<PathBuf>,
        kind: ExtractorKind,
        pdf: &PdfConfig,
    ) -> Result<Self> {
        let config = LoaderConfig::new(directory).extensions(kind.default_extensions().iter().copied());
        Self::new(config, Extractor::for_kind(kind, pdf))
    }
}

impl<E: ChunkExtractor> Loader<E> {
    /// Create a loader; the root must be an existing directory
    pub fn new(config: LoaderConfig, extractor: E) -> Result<Self> {
        if !config.directory.is_dir() {
            return Err(Error::Config(format!(
                "`directory` must be a path of a directory, got {}",
                config.directory.display()
            )));
        }

        Ok(Self {
            config,
            extractor,
            loaded_files: LoadedFiles::new(),
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Whether a path passes the exclusion list and extension filter
    pub fn should_load(&self, path: &Path) -> bool {
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if self.config.exclude_files.iter().any(|f| f.as_str() == basename) {
            return false;
        }

        if !self.config.extensions.is_empty() {
            let full = path.to_string_lossy();
            if !self.config.extensions.iter().any(|ext| full.ends_with(ext.as_str())) {
                return false;
            }
        }

        true
    }

    /// Extract one file, isolating and logging any failure
    fn extract_isolated(&self, path: &Path) -> Option<Vec<Chunk>> {
        match self.extractor.extract(path) {
            Ok(Some(chunks)) => {
                tracing::info!("Loaded {} ({} chunks)", path.display(), chunks.len());
                Some(chunks)
            }
            Ok(None) => {
                tracing::debug!("No chunks produced for {}", path.display());
                None
            }
            Err(e) => {
                tracing::error!("Error reading {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Extract one file into `loaded_files`; a later load of the same path overwrites
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Option<&[Chunk]> {
        let path = path.as_ref();
        let chunks = self.extract_isolated(path)?;
        self.loaded_files.insert(path.to_path_buf(), chunks);
        self.loaded_files.get(path).map(Vec::as_slice)
    }

    /// Candidate files under the root, in walk order
    fn candidates(&self) -> Vec<PathBuf> {
        let mut walker = WalkDir::new(&self.config.directory).min_depth(1);
        if !self.config.recursive {
            walker = walker.max_depth(1);
        }

        walker
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.should_load(path))
            .collect()
    }

    /// Walk the root once and extract every candidate file
    pub fn load(&mut self) -> &LoadedFiles {
        let candidates = self.candidates();
        tracing::info!(
            "Loading {} files from {} ({} threads)",
            candidates.len(),
            self.config.directory.display(),
            self.config.num_threads.max(1)
        );

        let results = if self.config.num_threads > 1 {
            self.extract_parallel(&candidates)
        } else {
            candidates
                .iter()
                .filter_map(|path| self.extract_isolated(path).map(|c| (path.clone(), c)))
                .collect()
        };

        self.loaded_files.extend(results);
        &self.loaded_files
    }

    fn extract_parallel(&self, candidates: &[PathBuf]) -> Vec<(PathBuf, Vec<Chunk>)> {
        let extract = || {
            candidates
                .par_iter()
                .filter_map(|path| self.extract_isolated(path).map(|c| (path.clone(), c)))
                .collect::<Vec<_>>()
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
        {
            Ok(pool) => pool.install(extract),
            Err(e) => {
                tracing::warn!("Failed to build worker pool, loading serially: {}", e);
                candidates
                    .iter()
                    .filter_map(|path| self.extract_isolated(path).map(|c| (path.clone(), c)))
                    .collect()
            }
        }
    }

    pub fn loaded_files(&self) -> &LoadedFiles {
        &self.loaded_files
    }

    /// Hand the accumulated results to the caller
    pub fn into_loaded_files(self) -> LoadedFiles {
        self.loaded_files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Emits one chunk holding the file's text; fails on files containing "boom"
    struct EchoExtractor {
        calls: AtomicUsize,
    }

    impl EchoExtractor {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0) }
        }
    }

    impl ChunkExtractor for EchoExtractor {
        fn extract(&self, path: &Path) -> Result<Option<Vec<Chunk>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = fs::read_to_string(path)?;
            if text.contains("boom") {
                return Err(Error::file_parse(path.display().to_string(), "corrupt"));
            }
            if text.is_empty() {
                return Ok(None);
            }
            let mut chunk = Chunk::generate().with_content(text);
            chunk.set("source", path.display().to_string());
            Ok(Some(vec![chunk]))
        }
    }

    fn corpus() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(dir.path().join("b.md"), "beta").unwrap();
        fs::write(dir.path().join("skip.txt"), "skipped").unwrap();
        fs::write(dir.path().join("bad.txt"), "boom").unwrap();
        fs::write(dir.path().join("empty.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.txt"), "gamma").unwrap();
        dir
    }

    #[test]
    fn test_new_rejects_non_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            Loader::new(LoaderConfig::new(&file), EchoExtractor::new()),
            Err(Error::Config(_))
        ));
        assert!(Loader::new(LoaderConfig::new(dir.path().join("missing")), EchoExtractor::new()).is_err());
    }

    #[test]
    fn test_should_load_exclusion_beats_extension() {
        let dir = tempdir().unwrap();
        let config = LoaderConfig::new(dir.path())
            .extensions([".docx"])
            .exclude_files(["secret.docx"]);
        let loader = Loader::new(config, EchoExtractor::new()).unwrap();

        assert!(loader.should_load(Path::new("/x/report.docx")));
        assert!(!loader.should_load(Path::new("/x/secret.docx")));
        assert!(!loader.should_load(Path::new("/x/report.pdf")));
        // suffix match is case-sensitive
        assert!(!loader.should_load(Path::new("/x/REPORT.DOCX")));
    }

    #[test]
    fn test_should_load_without_filter() {
        let dir = tempdir().unwrap();
        let loader = Loader::new(LoaderConfig::new(dir.path()), EchoExtractor::new()).unwrap();
        assert!(loader.should_load(Path::new("anything.bin")));
    }

    #[test]
    fn test_recursive_load_isolates_failures() {
        let dir = corpus();
        let config = LoaderConfig::new(dir.path())
            .extensions([".txt", ".md"])
            .exclude_files(["skip.txt"]);
        let mut loader = Loader::new(config, EchoExtractor::new()).unwrap();
        let loaded = loader.load().clone();

        let mut names: Vec<String> = loaded
            .keys()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.txt", "b.md", "c.txt"]);
        // bad.txt and empty.txt were attempted but left absent
        assert_eq!(loader.extractor().calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_flat_load_skips_subdirectories() {
        let dir = corpus();
        let config = LoaderConfig::new(dir.path()).recursive(false).extensions([".txt"]);
        let mut loader = Loader::new(config, EchoExtractor::new()).unwrap();
        let loaded = loader.load();
        assert!(loaded.keys().all(|p| p.parent() == Some(dir.path())));
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_parallel_load_matches_serial() {
        let dir = corpus();
        let serial = {
            let config = LoaderConfig::new(dir.path()).extensions([".txt", ".md"]);
            let mut loader = Loader::new(config, EchoExtractor::new()).unwrap();
            loader.load();
            loader.into_loaded_files()
        };

        let config = LoaderConfig::new(dir.path())
            .extensions([".txt", ".md"])
            .num_threads(4);
        let mut loader = Loader::new(config, EchoExtractor::new()).unwrap();
        let parallel = loader.load().clone();

        assert_eq!(serial.len(), parallel.len());
        for (path, chunks) in &serial {
            assert_eq!(parallel[path][0].content, chunks[0].content);
        }
        // each candidate is extracted exactly once
        assert_eq!(loader.extractor().calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_load_file_overwrites() {
        let dir = corpus();
        let path = dir.path().join("a.txt");
        let mut loader = Loader::new(LoaderConfig::new(dir.path()), EchoExtractor::new()).unwrap();

        let first_id = loader.load_file(&path).unwrap()[0].id.clone();
        fs::write(&path, "alpha v2").unwrap();
        let chunks = loader.load_file(&path).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "alpha v2");
        assert_ne!(chunks[0].id, first_id);
        assert_eq!(loader.loaded_files().len(), 1);

        assert!(loader.load_file(dir.path().join("bad.txt")).is_none());
        assert!(!loader.loaded_files().contains_key(&dir.path().join("bad.txt")));
    }

    #[test]
    fn test_for_kind_uses_default_filter() {
        let dir = tempdir().unwrap();
        let loader = Loader::for_kind(dir.path(), ExtractorKind::Pptx).unwrap();
        assert_eq!(loader.config().extensions, vec![".ppt", ".pptx"]);
        assert_eq!(loader.extractor().kind(), ExtractorKind::Pptx);
    }
}
