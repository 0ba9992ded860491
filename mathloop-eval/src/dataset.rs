//! Dataset loading and subset preparation.
//!
//! Provides the GSM8K downloader/cache and helpers for reading and writing
//! the JSON problem files the evaluator consumes.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors that can occur when loading datasets.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DatasetError {
    /// Failed to download dataset
    #[error("Failed to download dataset: {0}")]
    Download(String),

    /// Failed to read dataset file
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse dataset
    #[error("Failed to parse dataset: {0}")]
    Parse(String),

    /// Cache directory could not be created
    #[error("Failed to create cache directory: {0}")]
    CacheDir(String),
}

/// A single math word problem.
///
/// `answer` holds the full step-by-step solution as distributed with
/// GSM8K; the final numeric value is recovered at evaluation time with
/// [`crate::extract_answer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    /// Stable identifier, e.g. `gsm8k_42`.
    pub id: String,
    /// The word problem text.
    pub question: String,
    /// Reference solution ending in `#### <number>`.
    pub answer: String,
}

/// Load problems from a JSON file (an array of [`Problem`] objects).
pub async fn load_problems(path: &Path) -> Result<Vec<Problem>, DatasetError> {
    let content = fs::read_to_string(path).await?;
    serde_json::from_str(&content).map_err(|e| DatasetError::Parse(e.to_string()))
}

/// Write problems to a JSON file, creating parent directories as needed.
pub async fn save_problems(path: &Path, problems: &[Problem]) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(problems)
        .map_err(|e| DatasetError::Parse(e.to_string()))?;
    fs::write(path, json).await?;
    Ok(())
}

/// GSM8K dataset split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Gsm8kSplit {
    /// Training set (7,473 problems)
    #[default]
    Train,
    /// Test set (1,319 problems)
    Test,
}

impl Gsm8kSplit {
    fn filename(self) -> &'static str {
        match self {
            Gsm8kSplit::Train => "train.jsonl",
            Gsm8kSplit::Test => "test.jsonl",
        }
    }
}

impl std::str::FromStr for Gsm8kSplit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Gsm8kSplit::Train),
            "test" => Ok(Gsm8kSplit::Test),
            other => Err(format!("unknown split '{other}' (expected train or test)")),
        }
    }
}

/// GSM8K (Grade School Math 8K) dataset loader.
///
/// Downloads and caches the OpenAI GSM8K math word problem dataset. Each
/// problem requires 2-8 steps of basic arithmetic to solve.
///
/// The dataset is available from GitHub:
/// <https://github.com/openai/grade-school-math>
///
/// # Format
///
/// GSM8K uses JSONL format (one JSON object per line):
/// ```json
/// {"question": "Janet's ducks lay 16 eggs...", "answer": "16 - 3 - 4 = <<16-3-4=9>>9...\n#### 18"}
/// ```
///
/// # Example
///
/// ```no_run
/// use mathloop_eval::{Gsm8k, Gsm8kSplit};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let loader = Gsm8k::new(Gsm8kSplit::Train)?;
/// let problems = loader.load().await?;
/// println!("Loaded {} math problems", problems.len());
/// # Ok(())
/// # }
/// ```
pub struct Gsm8k {
    /// Either a cache directory (when downloading) or the explicit file path
    /// (when loading from a local file).
    path: PathBuf,
    /// URL to download the dataset from (empty if loading from local file).
    url: String,
    split: Gsm8kSplit,
    /// True when `path` points directly at a JSONL file.
    is_direct_path: bool,
}

impl Gsm8k {
    /// Base URL for GSM8K raw data.
    const BASE_URL: &'static str =
        "https://raw.githubusercontent.com/openai/grade-school-math/master/grade_school_math/data";

    /// Create a GSM8K loader with the default cache directory.
    ///
    /// The cache directory is `~/.cache/mathloop/gsm8k/`.
    pub fn new(split: Gsm8kSplit) -> Result<Self, DatasetError> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| DatasetError::CacheDir("Could not find cache directory".to_string()))?
            .join("mathloop")
            .join("gsm8k");

        Ok(Self::with_cache_dir(cache_dir, split))
    }

    /// Create a loader with a custom cache directory.
    pub fn with_cache_dir(cache_dir: PathBuf, split: Gsm8kSplit) -> Self {
        Self {
            path: cache_dir,
            url: format!("{}/{}", Self::BASE_URL, split.filename()),
            split,
            is_direct_path: false,
        }
    }

    /// Create a loader from a local JSONL file (skips download).
    pub fn from_file(path: PathBuf) -> Self {
        Self {
            path,
            url: String::new(), // Empty URL skips download
            split: Gsm8kSplit::default(),
            is_direct_path: true,
        }
    }

    fn cache_path(&self) -> PathBuf {
        if self.is_direct_path {
            self.path.clone()
        } else {
            self.path.join(self.split.filename())
        }
    }

    async fn ensure_downloaded(&self) -> Result<PathBuf, DatasetError> {
        let cache_path = self.cache_path();

        if cache_path.exists() {
            log::debug!("Using GSM8K from {:?}", cache_path);
            return Ok(cache_path);
        }

        // Local file mode never downloads.
        if self.url.is_empty() {
            return Err(DatasetError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("GSM8K file not found: {:?}", cache_path),
            )));
        }

        fs::create_dir_all(&self.path).await.map_err(|e| {
            DatasetError::CacheDir(format!("Failed to create {:?}: {}", self.path, e))
        })?;

        log::info!("Downloading GSM8K {}...", self.split.filename());
        let response = reqwest::get(&self.url)
            .await
            .map_err(|e| DatasetError::Download(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DatasetError::Download(format!(
                "HTTP {}: {}",
                response.status(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DatasetError::Download(e.to_string()))?;

        fs::write(&cache_path, &bytes).await?;
        log::info!("Cached GSM8K to {:?}", cache_path);

        Ok(cache_path)
    }

    /// Load all problems for this split, downloading if necessary.
    ///
    /// Problem ids are assigned by line position (`gsm8k_0`, `gsm8k_1`,
    /// ...) and are stable across runs for a given split file.
    pub async fn load(&self) -> Result<Vec<Problem>, DatasetError> {
        let path = self.ensure_downloaded().await?;
        let content = fs::read_to_string(&path).await?;

        let mut problems = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let entry: Gsm8kEntry =
                serde_json::from_str(line).map_err(|e| DatasetError::Parse(e.to_string()))?;

            problems.push(Problem {
                id: format!("gsm8k_{}", idx),
                question: entry.question,
                answer: entry.answer,
            });
        }

        Ok(problems)
    }
}

/// Internal structure for parsing GSM8K JSONL entries.
#[derive(Deserialize)]
struct Gsm8kEntry {
    question: String,
    answer: String,
}

/// Draw a reproducible random subset of `n` problems.
///
/// The same `seed` over the same input always yields the same subset, in
/// the same order. When `n >= problems.len()` the full set is returned
/// unchanged.
pub fn prepare_subset(problems: &[Problem], n: usize, seed: u64) -> Vec<Problem> {
    if n >= problems.len() {
        return problems.to_vec();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    rand::seq::index::sample(&mut rng, problems.len(), n)
        .into_iter()
        .map(|i| problems[i].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn make_problems(n: usize) -> Vec<Problem> {
        (0..n)
            .map(|i| Problem {
                id: format!("gsm8k_{}", i),
                question: format!("Question {}", i),
                answer: format!("#### {}", i),
            })
            .collect()
    }

    #[test]
    fn test_gsm8k_cache_path() {
        let loader = Gsm8k::with_cache_dir(PathBuf::from("/tmp/test-cache"), Gsm8kSplit::Test);
        assert_eq!(
            loader.cache_path(),
            PathBuf::from("/tmp/test-cache/test.jsonl")
        );

        let loader = Gsm8k::with_cache_dir(PathBuf::from("/tmp/test-cache"), Gsm8kSplit::Train);
        assert_eq!(
            loader.cache_path(),
            PathBuf::from("/tmp/test-cache/train.jsonl")
        );
    }

    #[test]
    fn test_split_from_str() {
        assert_eq!("train".parse::<Gsm8kSplit>().unwrap(), Gsm8kSplit::Train);
        assert_eq!("test".parse::<Gsm8kSplit>().unwrap(), Gsm8kSplit::Test);
        assert!("dev".parse::<Gsm8kSplit>().is_err());
    }

    #[tokio::test]
    async fn test_gsm8k_load_from_file() {
        let jsonl = r#####"{"question": "What is 2+2?", "answer": "2+2=4\n#### 4"}
{"question": "What is 3*3?", "answer": "3*3=9\n#### 9"}"#####;

        let mut file = NamedTempFile::with_suffix(".jsonl").unwrap();
        file.write_all(jsonl.as_bytes()).unwrap();
        file.flush().unwrap();

        let loader = Gsm8k::from_file(file.path().to_path_buf());
        let problems = loader.load().await.unwrap();

        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0].id, "gsm8k_0");
        assert_eq!(problems[0].question, "What is 2+2?");
        assert_eq!(problems[0].answer, "2+2=4\n#### 4");
        assert_eq!(problems[1].id, "gsm8k_1");
    }

    #[tokio::test]
    async fn test_gsm8k_from_file_missing() {
        let loader = Gsm8k::from_file(PathBuf::from("/nonexistent/gsm8k.jsonl"));
        let result = loader.load().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_save_and_load_problems() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw").join("subset.json");
        let problems = make_problems(3);

        save_problems(&path, &problems).await.unwrap();
        let loaded = load_problems(&path).await.unwrap();

        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[1].id, "gsm8k_1");
        assert_eq!(loaded[2].question, "Question 2");
    }

    #[tokio::test]
    async fn test_load_problems_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();
        file.flush().unwrap();

        let result = load_problems(file.path()).await;
        assert!(matches!(result, Err(DatasetError::Parse(_))));
    }

    #[test]
    fn test_prepare_subset_deterministic() {
        let problems = make_problems(100);

        let a = prepare_subset(&problems, 10, 42);
        let b = prepare_subset(&problems, 10, 42);
        assert_eq!(a.len(), 10);
        assert_eq!(
            a.iter().map(|p| &p.id).collect::<Vec<_>>(),
            b.iter().map(|p| &p.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_prepare_subset_seed_changes_selection() {
        let problems = make_problems(100);

        let a = prepare_subset(&problems, 10, 42);
        let b = prepare_subset(&problems, 10, 43);
        let a_ids: Vec<_> = a.iter().map(|p| &p.id).collect();
        let b_ids: Vec<_> = b.iter().map(|p| &p.id).collect();
        assert_ne!(a_ids, b_ids);
    }

    #[test]
    fn test_prepare_subset_clamps_to_len() {
        let problems = make_problems(5);
        let subset = prepare_subset(&problems, 50, 42);
        assert_eq!(subset.len(), 5);
        assert_eq!(subset[0].id, "gsm8k_0");
    }

    #[test]
    fn test_prepare_subset_no_duplicates() {
        let problems = make_problems(20);
        let subset = prepare_subset(&problems, 15, 7);
        let mut ids: Vec<_> = subset.iter().map(|p| p.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 15);
    }
}
