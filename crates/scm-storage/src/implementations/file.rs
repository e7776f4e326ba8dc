//! File-backed ledger implementation.
//!
//! Each key lives in its own file named after the hex-encoded key, so range
//! scans can recover the original key from the directory listing. A file is a
//! fixed header followed by every version of the key, each prefixed with its
//! length. Writes go to a temp file that is then renamed over the original.
//!
//! An exclusive lock on `.lock` inside the ledger directory keeps a second
//! process from writing to the same ledger.

use crate::{in_range, LedgerFactory, LedgerInterface, LedgerRegistry, StorageError};
use async_trait::async_trait;
use fs2::FileExt;
use scm_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

const FILE_EXTENSION: &str = "ledger";

#[allow(clippy::doc_nested_refdefs)]
/// Fixed-size file header.
///
/// Binary layout (64 bytes total):
/// - [0-3]: Magic bytes "SCML"
/// - [4-5]: Version (u16, little-endian)
/// - [6-13]: Number of stored versions (u64, little-endian)
/// - [14-63]: Reserved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileHeader {
	version: u16,
	revisions: u64,
}

impl FileHeader {
	const MAGIC: &'static [u8; 4] = b"SCML";
	const VERSION: u16 = 1;
	const SIZE: usize = 64;

	fn new(revisions: u64) -> Self {
		Self {
			version: Self::VERSION,
			revisions,
		}
	}

	fn serialize(&self) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[0..4].copy_from_slice(Self::MAGIC);
		bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
		bytes[6..14].copy_from_slice(&self.revisions.to_le_bytes());
		bytes
	}

	fn deserialize(bytes: &[u8]) -> Result<Self, StorageError> {
		if bytes.len() < Self::SIZE {
			return Err(StorageError::Backend("File too small for header".into()));
		}
		if &bytes[0..4] != Self::MAGIC {
			return Err(StorageError::Backend("Not a ledger file".into()));
		}

		let version = u16::from_le_bytes([bytes[4], bytes[5]]);
		if version > Self::VERSION {
			return Err(StorageError::Backend(format!(
				"Unsupported file version: {}",
				version
			)));
		}

		let mut revisions = [0u8; 8];
		revisions.copy_from_slice(&bytes[6..14]);

		Ok(Self {
			version,
			revisions: u64::from_le_bytes(revisions),
		})
	}
}

/// Splits the body of a ledger file into its stored versions.
fn decode_versions(data: &[u8]) -> Result<Vec<Vec<u8>>, StorageError> {
	let header = FileHeader::deserialize(data)?;
	let mut body = &data[FileHeader::SIZE..];
	let mut versions = Vec::new();

	while !body.is_empty() {
		if body.len() < 4 {
			return Err(StorageError::Backend("Truncated record length".into()));
		}
		let len = u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
		body = &body[4..];
		if body.len() < len {
			return Err(StorageError::Backend("Truncated record".into()));
		}
		versions.push(body[..len].to_vec());
		body = &body[len..];
	}

	if versions.len() as u64 != header.revisions {
		return Err(StorageError::Backend(format!(
			"Header announces {} versions, found {}",
			header.revisions,
			versions.len()
		)));
	}

	Ok(versions)
}

fn encode_versions(versions: &[Vec<u8>]) -> Result<Vec<u8>, StorageError> {
	let body_len: usize = versions.iter().map(|v| v.len() + 4).sum();
	let mut data = Vec::with_capacity(FileHeader::SIZE + body_len);
	data.extend_from_slice(&FileHeader::new(versions.len() as u64).serialize());

	for version in versions {
		let len = u32::try_from(version.len())
			.map_err(|_| StorageError::Backend("Value exceeds 4 GiB".into()))?;
		data.extend_from_slice(&len.to_le_bytes());
		data.extend_from_slice(version);
	}

	Ok(data)
}

/// File-based ledger implementation.
pub struct FileLedger {
	base_path: PathBuf,
	/// Held for the lifetime of the ledger; releases the directory lock on drop.
	_lock: File,
	/// Serializes read-modify-write of key files within this process.
	write_guard: Mutex<()>,
}

impl FileLedger {
	/// Opens (creating if needed) a ledger directory and locks it.
	pub fn open(base_path: impl AsRef<Path>) -> Result<Self, StorageError> {
		let base_path = base_path.as_ref().to_path_buf();
		std::fs::create_dir_all(&base_path).map_err(|e| StorageError::Backend(e.to_string()))?;

		let lock = OpenOptions::new()
			.create(true)
			.truncate(false)
			.write(true)
			.open(base_path.join(".lock"))
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		lock.try_lock_exclusive().map_err(|_| {
			StorageError::Configuration(format!(
				"Ledger directory {} is already in use",
				base_path.display()
			))
		})?;

		tracing::debug!(path = %base_path.display(), "Opened file ledger");

		Ok(Self {
			base_path,
			_lock: lock,
			write_guard: Mutex::new(()),
		})
	}

	fn key_path(&self, key: &str) -> PathBuf {
		self.base_path
			.join(format!("{}.{}", hex::encode(key), FILE_EXTENSION))
	}

	/// Recovers the key from a ledger file name, skipping foreign files.
	fn key_from_path(path: &Path) -> Option<String> {
		if path.extension()? != FILE_EXTENSION {
			return None;
		}
		let stem = path.file_stem()?.to_str()?;
		String::from_utf8(hex::decode(stem).ok()?).ok()
	}

	async fn read_versions(&self, path: &Path) -> Result<Vec<Vec<u8>>, StorageError> {
		match fs::read(path).await {
			Ok(data) => decode_versions(&data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}
}

#[async_trait]
impl LedgerInterface for FileLedger {
	async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
		let mut versions = self.read_versions(&self.key_path(key)).await?;
		Ok(versions.pop())
	}

	async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let _guard = self.write_guard.lock().await;
		let path = self.key_path(key);

		let mut versions = self.read_versions(&path).await?;
		versions.push(value);
		let data = encode_versions(&versions)?;

		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, data)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn get_state_by_range(
		&self,
		start_key: &str,
		end_key: &str,
	) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
		let mut entries = fs::read_dir(&self.base_path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		let mut keys = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			match Self::key_from_path(&entry.path()) {
				Some(key) if in_range(&key, start_key, end_key) => keys.push(key),
				Some(_) => {},
				None => tracing::trace!(path = ?entry.path(), "Skipping non-ledger file"),
			}
		}
		keys.sort();

		let mut results = Vec::with_capacity(keys.len());
		for key in keys {
			if let Some(value) = self.read_versions(&self.key_path(&key)).await?.pop() {
				results.push((key, value));
			}
		}
		Ok(results)
	}

	async fn get_history_for_key(&self, key: &str) -> Result<Vec<Vec<u8>>, StorageError> {
		self.read_versions(&self.key_path(key)).await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileLedgerSchema)
	}
}

/// Configuration schema for FileLedger.
pub struct FileLedgerSchema;

impl ConfigSchema for FileLedgerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![Field::new("storage_path", FieldType::String)]).validate(config)
	}
}

/// Factory function to create a file ledger from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Ledger directory (default: "./data/ledger")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn LedgerInterface>, StorageError> {
	FileLedgerSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/ledger");

	Ok(Box::new(FileLedger::open(storage_path)?))
}

/// Registry for the file ledger implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = LedgerFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl LedgerRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn test_header_round_trip() {
		let header = FileHeader::new(7);
		let bytes = header.serialize();
		assert_eq!(&bytes[0..4], b"SCML");
		assert_eq!(FileHeader::deserialize(&bytes).unwrap(), header);
		assert!(FileHeader::deserialize(&bytes[..10]).is_err());
		assert!(FileHeader::deserialize(&[0u8; 64]).is_err());
	}

	#[test]
	fn test_truncated_body_detected() {
		let mut data = encode_versions(&[b"abc".to_vec()]).unwrap();
		data.pop();
		assert!(matches!(
			decode_versions(&data),
			Err(StorageError::Backend(_))
		));
	}

	#[tokio::test]
	async fn test_versions_and_history() {
		let dir = TempDir::new().unwrap();
		let ledger = FileLedger::open(dir.path()).unwrap();

		assert_eq!(ledger.get_state("order-1").await.unwrap(), None);

		ledger.put_state("order-1", b"v1".to_vec()).await.unwrap();
		ledger.put_state("order-1", b"v2".to_vec()).await.unwrap();

		assert_eq!(
			ledger.get_state("order-1").await.unwrap(),
			Some(b"v2".to_vec())
		);
		assert_eq!(
			ledger.get_history_for_key("order-1").await.unwrap(),
			vec![b"v1".to_vec(), b"v2".to_vec()]
		);
	}

	#[tokio::test]
	async fn test_range_scan_recovers_keys() {
		let dir = TempDir::new().unwrap();
		let ledger = FileLedger::open(dir.path()).unwrap();

		ledger.put_state("b:2", b"b".to_vec()).await.unwrap();
		ledger.put_state("a/1", b"a".to_vec()).await.unwrap();
		ledger.put_state("c", b"c1".to_vec()).await.unwrap();
		ledger.put_state("c", b"c2".to_vec()).await.unwrap();
		std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

		let all = ledger.get_state_by_range("", "").await.unwrap();
		assert_eq!(
			all,
			vec![
				("a/1".to_string(), b"a".to_vec()),
				("b:2".to_string(), b"b".to_vec()),
				("c".to_string(), b"c2".to_vec()),
			]
		);

		let tail = ledger.get_state_by_range("b", "").await.unwrap();
		assert_eq!(tail.len(), 2);
	}

	#[tokio::test]
	async fn test_persists_across_reopen() {
		let dir = TempDir::new().unwrap();
		{
			let ledger = FileLedger::open(dir.path()).unwrap();
			ledger.put_state("key", b"value".to_vec()).await.unwrap();
		}

		let ledger = FileLedger::open(dir.path()).unwrap();
		assert_eq!(
			ledger.get_state("key").await.unwrap(),
			Some(b"value".to_vec())
		);
	}

	#[test]
	fn test_directory_is_locked() {
		let dir = TempDir::new().unwrap();
		let _first = FileLedger::open(dir.path()).unwrap();

		assert!(matches!(
			FileLedger::open(dir.path()),
			Err(StorageError::Configuration(_))
		));
	}

	#[test]
	fn test_factory_uses_storage_path() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("nested");
		let mut table = toml::map::Map::new();
		table.insert(
			"storage_path".to_string(),
			toml::Value::String(path.to_string_lossy().into_owned()),
		);

		assert!(create_storage(&toml::Value::Table(table)).is_ok());
		assert!(path.join(".lock").exists());
	}
}
