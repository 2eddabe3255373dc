use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::model::{Submission, Task};
use crate::store::Store;

const MANIFEST_ENTRY: &str = "manifest.json";
const DATA_ENTRY: &str = "data/quizzer.json";
pub const BUNDLE_FORMAT_V1: &str = "quizzer-workspace-v1";
pub const LEGACY_FORMAT: &str = "legacy-json";

const STATE_VERSION: u32 = 1;

fn default_state_version() -> u32 {
    // Bare exports from the original tool carry no version field.
    0
}

/// The single serialized record holding the whole application state. Also the
/// shape the original tool kept under its `quizzerData` storage key, plus a
/// version field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRecord {
    #[serde(default = "default_state_version")]
    pub version: u32,
    pub tasks: Vec<Task>,
    pub submissions: Vec<Submission>,
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub task_count: usize,
    pub submission_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub task_count: usize,
    pub submission_count: usize,
}

pub fn export_workspace_bundle(
    store: &dyn Store,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let record = StateRecord {
        version: STATE_VERSION,
        tasks: store.tasks().context("failed to read tasks")?,
        submissions: store.submissions().context("failed to read submissions")?,
    };
    let data =
        serde_json::to_string_pretty(&record).context("failed to serialize state record")?;
    let data_sha256 = hex_digest(data.as_bytes());

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let exported_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": STATE_VERSION,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": exported_at,
        "dataSha256": data_sha256,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(DATA_ENTRY, opts)
        .context("failed to start data entry")?;
    zip.write_all(data.as_bytes())
        .context("failed to write data entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        task_count: record.tasks.len(),
        submission_count: record.submissions.len(),
    })
}

pub fn import_workspace_bundle(
    store: &mut dyn Store,
    in_path: &Path,
) -> anyhow::Result<ImportSummary> {
    let (record, detected) = if is_zip_file(in_path)? {
        (read_bundle(in_path)?, BUNDLE_FORMAT_V1.to_string())
    } else {
        // Not a bundle: accept a bare JSON record, e.g. an export of the
        // original tool's `quizzerData` value (versionless).
        let text = std::fs::read_to_string(in_path)
            .with_context(|| format!("failed to read {}", in_path.to_string_lossy()))?;
        let record: StateRecord =
            serde_json::from_str(&text).context("input is neither a bundle nor a state record")?;
        (record, LEGACY_FORMAT.to_string())
    };

    if record.version > STATE_VERSION {
        return Err(anyhow!(
            "state record v{} is newer than this quizzerd (v{})",
            record.version,
            STATE_VERSION
        ));
    }

    store
        .replace_all(&record.tasks, &record.submissions)
        .context("failed to replace workspace state")?;

    Ok(ImportSummary {
        bundle_format_detected: detected,
        task_count: record.tasks.len(),
        submission_count: record.submissions.len(),
    })
}

fn read_bundle(in_path: &Path) -> anyhow::Result<StateRecord> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut data = String::new();
    archive
        .by_name(DATA_ENTRY)
        .context("bundle missing data/quizzer.json")?
        .read_to_string(&mut data)
        .context("failed to read data entry")?;

    if let Some(expected) = manifest.get("dataSha256").and_then(|v| v.as_str()) {
        let actual = hex_digest(data.as_bytes());
        if actual != expected {
            return Err(anyhow!("data entry checksum mismatch"));
        }
    }

    serde_json::from_str(&data).context("data entry is not a valid state record")
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}
