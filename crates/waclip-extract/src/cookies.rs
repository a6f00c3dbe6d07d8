//! Credential storage for authenticated platforms.
//!
//! Cookies are held in a small secret store keyed by a fixed service/key
//! pair. The interactive setup flow imports a Netscape-format cookie export
//! (the format browser cookie extensions produce); the extractor adapters
//! read the stored name/value map back and materialize it for yt-dlp.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use waclip_core::{Error, Result};

/// Service name under which waclip keys its secrets.
pub const SERVICE_NAME: &str = "waclip";
/// Key for the Instagram cookie bundle.
pub const INSTAGRAM_COOKIE_KEY: &str = "instagram_cookies";

/// A lookup for stored cookie bundles, keyed by service/key pair.
pub trait CookieStore: Send + Sync {
    /// Fetch the stored cookie map, or `None` if nothing is stored.
    fn get(&self, service: &str, key: &str) -> Result<Option<HashMap<String, String>>>;

    /// Store (replace) a cookie map.
    fn set(&self, service: &str, key: &str, cookies: &HashMap<String, String>) -> Result<()>;

    /// Remove a stored cookie map. Returns whether anything was removed.
    fn clear(&self, service: &str, key: &str) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Cookie store persisted as a JSON file under the platform data directory.
#[derive(Debug, Clone)]
pub struct FileCookieStore {
    path: PathBuf,
}

impl FileCookieStore {
    /// Create a store backed by an explicit file path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Create a store at the default location
    /// (`<data_dir>/waclip/secrets.json`).
    pub fn default_location() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| Error::Validation("no platform data directory available".into()))?;
        Ok(Self::new(data_dir.join("waclip").join("secrets.json")))
    }

    fn read_all(&self) -> Result<HashMap<String, HashMap<String, String>>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                Error::Validation(format!(
                    "corrupt secret store at {}: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &HashMap<String, HashMap<String, String>>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::Validation(format!("secret store serialization: {e}")))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

fn entry_key(service: &str, key: &str) -> String {
    format!("{service}/{key}")
}

impl CookieStore for FileCookieStore {
    fn get(&self, service: &str, key: &str) -> Result<Option<HashMap<String, String>>> {
        Ok(self.read_all()?.remove(&entry_key(service, key)))
    }

    fn set(&self, service: &str, key: &str, cookies: &HashMap<String, String>) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.insert(entry_key(service, key), cookies.clone());
        self.write_all(&entries)
    }

    fn clear(&self, service: &str, key: &str) -> Result<bool> {
        let mut entries = self.read_all()?;
        let removed = entries.remove(&entry_key(service, key)).is_some();
        if removed {
            self.write_all(&entries)?;
        }
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Volatile cookie store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    entries: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, service: &str, key: &str) -> Result<Option<HashMap<String, String>>> {
        Ok(self
            .entries
            .lock()
            .expect("store mutex")
            .get(&entry_key(service, key))
            .cloned())
    }

    fn set(&self, service: &str, key: &str, cookies: &HashMap<String, String>) -> Result<()> {
        self.entries
            .lock()
            .expect("store mutex")
            .insert(entry_key(service, key), cookies.clone());
        Ok(())
    }

    fn clear(&self, service: &str, key: &str) -> Result<bool> {
        Ok(self
            .entries
            .lock()
            .expect("store mutex")
            .remove(&entry_key(service, key))
            .is_some())
    }
}

// ---------------------------------------------------------------------------
// Netscape cookie format
// ---------------------------------------------------------------------------

/// Parse a Netscape-format cookie export into a name/value map.
///
/// Comment lines and blanks are skipped; each remaining line must carry at
/// least seven tab-separated fields, of which the sixth is the cookie name
/// and the seventh its value.
pub fn parse_netscape(contents: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for line in contents.lines() {
        let line = line.trim_end();
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() >= 7 {
            cookies.insert(fields[5].to_string(), fields[6].to_string());
        }
    }
    cookies
}

/// Render a name/value map back into a Netscape cookie file scoped to the
/// given domain, suitable for yt-dlp's `--cookies` flag.
pub fn to_netscape(cookies: &HashMap<String, String>, domain: &str) -> String {
    let mut out = String::from("# Netscape HTTP Cookie File\n");
    // Deterministic order keeps the rendered file stable across runs.
    let mut names: Vec<&String> = cookies.keys().collect();
    names.sort();
    for name in names {
        out.push_str(&format!(
            "{domain}\tTRUE\t/\tTRUE\t0\t{name}\t{value}\n",
            value = cookies[name]
        ));
    }
    out
}
