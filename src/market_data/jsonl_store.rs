use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::store::{distinct_symbols, reduce};
use super::{Aggregation, Observation, PriceStore};

const LOG_FILE: &str = "observations.jsonl";
const TAIL_SCAN_CHUNK: u64 = 4096;

/// Price store backed by a single append-only JSONL file, one observation per
/// line.
///
/// A line counts only once its trailing newline is on disk. An unterminated
/// tail left by an interrupted append is ignored by reads and cut off by the
/// next append.
pub struct JsonlPriceStore {
    base_path: PathBuf,
    /// Serializes appends from this process so batches never interleave.
    write_lock: Mutex<()>,
}

impl JsonlPriceStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.base_path.join(LOG_FILE)
    }

    async fn read_log(&self) -> Result<Vec<Observation>> {
        let path = self.log_file();
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        let (committed, torn) = match contents.rfind('\n') {
            Some(pos) => contents.split_at(pos + 1),
            None => ("", contents.as_str()),
        };
        if !torn.trim().is_empty() {
            warn!(path = %path.display(), bytes = torn.len(), "ignoring unterminated log tail");
        }

        let mut items = Vec::new();
        for line in committed.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let item: Observation = serde_json::from_str(line)
                .with_context(|| format!("Failed to parse JSONL line: {line}"))?;
            items.push(item);
        }

        Ok(items)
    }
}

/// Length of the log up to and including its last newline.
async fn committed_len(file: &mut fs::File, len: u64) -> Result<u64> {
    let mut buf = vec![0u8; TAIL_SCAN_CHUNK as usize];
    let mut end = len;
    while end > 0 {
        let start = end.saturating_sub(TAIL_SCAN_CHUNK);
        let chunk = &mut buf[..(end - start) as usize];
        file.seek(SeekFrom::Start(start)).await?;
        file.read_exact(chunk).await?;
        if let Some(pos) = chunk.iter().rposition(|b| *b == b'\n') {
            return Ok(start + pos as u64 + 1);
        }
        end = start;
    }
    Ok(0)
}

async fn write_batch(file: &mut fs::File, offset: u64, bytes: &[u8]) -> Result<()> {
    file.seek(SeekFrom::Start(offset))
        .await
        .context("Failed to seek observation log")?;
    file.write_all(bytes)
        .await
        .context("Failed to append observations")?;
    file.flush().await.context("Failed to flush observations")?;
    file.sync_data().await.context("Failed to sync observations")?;
    Ok(())
}

#[async_trait::async_trait]
impl PriceStore for JsonlPriceStore {
    async fn append(&self, observations: &[Observation]) -> Result<()> {
        if observations.is_empty() {
            return Ok(());
        }

        // Serialize the whole batch before touching the file.
        let mut buf = String::new();
        for obs in observations {
            let line = serde_json::to_string(obs).context("Failed to serialize observation")?;
            buf.push_str(&line);
            buf.push('\n');
        }

        let _guard = self.write_lock.lock().await;

        fs::create_dir_all(&self.base_path)
            .await
            .context("Failed to create data directory")?;

        let path = self.log_file();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {} for append", path.display()))?;

        let len = file
            .metadata()
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        let committed = committed_len(&mut file, len)
            .await
            .with_context(|| format!("Failed to scan {}", path.display()))?;
        if committed < len {
            warn!(
                path = %path.display(),
                bytes = len - committed,
                "discarding unterminated log tail"
            );
            file.set_len(committed)
                .await
                .context("Failed to truncate unterminated log tail")?;
        }

        if let Err(err) = write_batch(&mut file, committed, buf.as_bytes()).await {
            if let Err(rollback) = file.set_len(committed).await {
                warn!(error = %rollback, path = %path.display(), "failed to roll back partial append");
            }
            return Err(err);
        }

        debug!(count = observations.len(), path = %path.display(), "appended observations");
        Ok(())
    }

    async fn query(&self, symbol: &str, aggregation: Aggregation) -> Result<Option<Observation>> {
        let log = self.read_log().await?;
        reduce(log.iter().filter(|obs| obs.symbol() == symbol), aggregation)
    }

    async fn list_known_symbols(&self) -> Result<Vec<String>> {
        let log = self.read_log().await?;
        Ok(distinct_symbols(&log))
    }
}
