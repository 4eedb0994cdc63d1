// src/provider/hash.rs

//! Content hashes of deployed stacks.
//!
//! After a successful deploy the provider records a hash of everything that
//! defines the stack (deploy command, parameters, template body). A later
//! update with an identical hash is reported as "no change".

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::stack::Stack;
use crate::types::{HashStorageMode, StackName};

/// Relative path (from the config root) to the hashes file.
pub const HASH_FILE_PATH: &str = ".cfngin/hashes";

fn hash_file_path(root: &Path) -> PathBuf {
    root.join(HASH_FILE_PATH)
}

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Hash of the inputs that define a stack's deployed state.
///
/// Parameters are hashed in key order, so the result is stable.
pub fn compute_stack_hash(stack: &Stack) -> Result<String> {
    let mut hasher = Hasher::new();
    hasher.update(stack.fqn.as_bytes());
    hasher.update(b"\0");
    hasher.update(stack.deploy.as_deref().unwrap_or_default().as_bytes());

    for (key, value) in &stack.parameters {
        hasher.update(b"\0");
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }

    if let Some(path) = &stack.template_path {
        if path.is_file() {
            let file_hash = compute_file_hash(path)?;
            hasher.update(b"\0");
            hasher.update(file_hash.as_bytes());
        }
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(stack = %stack.name, hash = %hash, "computed stack hash");
    Ok(hash)
}

/// Abstract storage for stack hashes.
pub trait HashStore: Send + Sync {
    fn load(&self, stack: &str) -> Result<Option<String>>;
    fn save(&mut self, stack: &str, hash: &str) -> Result<()>;
    fn remove(&mut self, stack: &str) -> Result<()>;
}

/// Build the store selected by `[config].hash_storage_mode`.
pub fn hash_store_for(mode: HashStorageMode, root: &Path) -> Box<dyn HashStore> {
    match mode {
        HashStorageMode::File => Box::new(FileHashStore::new(root.to_path_buf())),
        HashStorageMode::Memory => Box::new(MemoryHashStore::new()),
    }
}

/// Stores hashes in a file (`.cfngin/hashes`).
pub struct FileHashStore {
    root: PathBuf,
}

impl FileHashStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl HashStore for FileHashStore {
    fn load(&self, stack: &str) -> Result<Option<String>> {
        let map = load_all_hashes(&self.root)?;
        Ok(map.get(stack).cloned())
    }

    fn save(&mut self, stack: &str, hash: &str) -> Result<()> {
        let mut map = load_all_hashes(&self.root)?;
        map.insert(stack.to_string(), hash.to_string());
        save_all_hashes(&self.root, &map)?;
        info!(stack = %stack, hash = %hash, "stored stack hash (file)");
        Ok(())
    }

    fn remove(&mut self, stack: &str) -> Result<()> {
        let mut map = load_all_hashes(&self.root)?;
        if map.remove(stack).is_some() {
            save_all_hashes(&self.root, &map)?;
            info!(stack = %stack, "removed stack hash (file)");
        }
        Ok(())
    }
}

/// Stores hashes in memory only.
pub struct MemoryHashStore {
    map: HashMap<String, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl Default for MemoryHashStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, stack: &str) -> Result<Option<String>> {
        Ok(self.map.get(stack).cloned())
    }

    fn save(&mut self, stack: &str, hash: &str) -> Result<()> {
        self.map.insert(stack.to_string(), hash.to_string());
        debug!(stack = %stack, hash = %hash, "stored stack hash (memory)");
        Ok(())
    }

    fn remove(&mut self, stack: &str) -> Result<()> {
        self.map.remove(stack);
        Ok(())
    }
}

/// Load all stored stack hashes from `<root>/.cfngin/hashes`.
fn load_all_hashes(root: &Path) -> Result<HashMap<StackName, String>> {
    let path = hash_file_path(root);

    if !path.exists() {
        return Ok(HashMap::new());
    }

    let file = File::open(&path)
        .with_context(|| format!("opening hash file at {:?}", path))?;
    let reader = BufReader::new(file);

    let mut map = HashMap::new();

    for line_res in reader.lines() {
        let line = line_res?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some((name, hash)) = trimmed.split_once(char::is_whitespace) {
            map.insert(name.to_string(), hash.trim().to_string());
        }
    }

    Ok(map)
}

/// Persist all stack hashes to `<root>/.cfngin/hashes`, sorted by name.
fn save_all_hashes(root: &Path, map: &HashMap<StackName, String>) -> Result<()> {
    let path = hash_file_path(root);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("creating hash directory at {:?}", parent)
        })?;
    }

    let file = File::create(&path)
        .with_context(|| format!("creating hash file at {:?}", path))?;
    let mut writer = BufWriter::new(file);

    let mut entries: Vec<_> = map.iter().collect();
    entries.sort();
    for (name, hash) in entries {
        writeln!(writer, "{} {}", name, hash)?;
    }

    writer.flush()?;
    Ok(())
}
