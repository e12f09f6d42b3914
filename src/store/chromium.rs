//! Chromium cookie store
//!
//! Opens a Chromium `Cookies` SQLite database directly and implements the
//! `CookieStore` contract on top of it. The reader copes with both legacy
//! and current column names and decrypts `v10` values where the platform
//! key is available; the writer populates whichever optional columns the
//! concrete schema carries, storing values in plaintext.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use aes::Aes128;
use async_trait::async_trait;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use url::Url;

use crate::cookie::{Cookie, WriteCandidate};
use crate::error::{RecookieError, Result};
use crate::store::CookieStore;

const KEY_DERIVE_SALT: &[u8] = b"saltysalt";
const KEY_LENGTH: usize = 16;
const AES_IV: &[u8; 16] = b"                ";

#[cfg(target_os = "macos")]
const KEY_DERIVE_ITERATIONS: u32 = 1003;
#[cfg(not(target_os = "macos"))]
const KEY_DERIVE_ITERATIONS: u32 = 1;

#[cfg(target_os = "linux")]
const LINUX_V10_PASSWORD: &[u8] = b"peanuts";

/// Microseconds between the Chromium epoch (1601-01-01) and the Unix epoch.
const CHROME_EPOCH_OFFSET_MICROS: i64 = 11_644_473_600_000_000;

/// A Chromium `Cookies` database opened for reading and writing.
#[derive(Debug)]
pub struct ChromiumStore {
    conn: Mutex<Connection>,
    columns: HashSet<String>,
    secure_column: &'static str,
    httponly_column: Option<&'static str>,
    crypto: CookieCrypto,
    last_error: Mutex<Option<String>>,
}

impl ChromiumStore {
    /// Open the database at `path`.
    ///
    /// The browser holds an exclusive lock on its live database; point this
    /// at a profile that is not currently running.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(RecookieError::FileNotFound(format!(
                "Cookie database not found: {:?}",
                path
            )));
        }

        let conn = Connection::open(path)
            .map_err(|e| RecookieError::Store(format!("Failed to open cookies DB: {}", e)))?;
        let meta_version = read_meta_version(&conn);
        let columns = read_cookie_columns(&conn)?;
        let secure_column = if columns.contains("is_secure") {
            "is_secure"
        } else {
            "secure"
        };
        let httponly_column = if columns.contains("is_httponly") {
            Some("is_httponly")
        } else if columns.contains("httponly") {
            Some("httponly")
        } else {
            None
        };

        Ok(ChromiumStore {
            conn: Mutex::new(conn),
            columns,
            secure_column,
            httponly_column,
            crypto: CookieCrypto::new(meta_version),
            last_error: Mutex::new(None),
        })
    }

    /// Find the newest `Cookies` database under the default Chrome user
    /// data directory, optionally narrowed to one profile.
    pub fn locate(profile: Option<&str>) -> Result<PathBuf> {
        let user_data_dir = default_user_data_dir()?;
        let search_root = match profile {
            Some(profile) => user_data_dir.join(profile),
            None => user_data_dir,
        };

        if !search_root.exists() {
            return Err(RecookieError::FileNotFound(format!(
                "Browser data dir not found: {:?}",
                search_root
            )));
        }

        let candidates = find_files(&search_root, "Cookies")?;
        newest_path(candidates).ok_or_else(|| {
            RecookieError::FileNotFound("Chromium cookies database not found".to_string())
        })
    }

    fn decline(&self, reason: String) -> bool {
        *self.last_error.lock().unwrap() = Some(reason);
        false
    }

    /// Sanity checks the host performs before storing a candidate.
    fn validate(candidate: &WriteCandidate) -> std::result::Result<(), String> {
        if candidate.name.is_empty() {
            return Err("cookie name is empty".to_string());
        }
        if candidate.domain.is_empty() {
            return Err("cookie domain is empty".to_string());
        }
        let url = Url::parse(&candidate.url)
            .map_err(|e| format!("invalid cookie URL {:?}: {}", candidate.url, e))?;
        let host = url.host_str().unwrap_or_default();
        let domain = candidate.domain.trim_start_matches('.');
        if host != domain && !host.ends_with(&format!(".{}", domain)) {
            return Err(format!(
                "URL host {:?} does not match cookie domain {:?}",
                host, candidate.domain
            ));
        }
        Ok(())
    }

    fn insert(&self, conn: &Connection, candidate: &WriteCandidate) -> rusqlite::Result<()> {
        conn.execute(
            "DELETE FROM cookies WHERE host_key = ?1 AND name = ?2 AND path = ?3",
            (&candidate.domain, &candidate.name, &candidate.path),
        )?;

        let now = now_chrome_epoch();
        let expires = candidate.expires.unwrap_or(0);
        let mut fields: Vec<(&str, Value)> = vec![
            ("host_key", Value::from(candidate.domain.clone())),
            ("name", Value::from(candidate.name.clone())),
            ("value", Value::from(candidate.value.clone())),
            ("path", Value::from(candidate.path.clone())),
            ("expires_utc", Value::from(expires)),
            (self.secure_column, Value::from(candidate.secure as i64)),
        ];
        if let Some(httponly) = self.httponly_column {
            fields.push((httponly, Value::from(candidate.http_only as i64)));
        }

        // Optional columns vary across schema versions; fill the ones that
        // exist so NOT NULL constraints hold.
        let optional: [(&str, Value); 10] = [
            ("encrypted_value", Value::Blob(Vec::new())),
            ("creation_utc", Value::from(now)),
            ("last_access_utc", Value::from(now)),
            ("last_update_utc", Value::from(now)),
            ("has_expires", Value::from(candidate.expires.is_some() as i64)),
            ("is_persistent", Value::from(candidate.expires.is_some() as i64)),
            ("priority", Value::from(1i64)),
            ("samesite", Value::from(0i64)),
            (
                "source_scheme",
                Value::from(if candidate.secure { 2i64 } else { 1i64 }),
            ),
            (
                "source_port",
                Value::from(if candidate.secure { 443i64 } else { 80i64 }),
            ),
        ];
        for (column, value) in optional {
            if self.columns.contains(column) {
                fields.push((column, value));
            }
        }
        if self.columns.contains("top_frame_site_key") {
            fields.push(("top_frame_site_key", Value::from(String::new())));
        }

        let column_list = fields
            .iter()
            .map(|(column, _)| *column)
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=fields.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO cookies ({}) VALUES ({})",
            column_list, placeholders
        );
        conn.execute(&sql, params_from_iter(fields.into_iter().map(|(_, v)| v)))?;
        Ok(())
    }

    fn row_to_cookie(&self, row: &Row<'_>) -> Result<Option<Cookie>> {
        let host_key: String = row
            .get(0)
            .map_err(|e| RecookieError::Store(format!("Failed to read cookie host: {}", e)))?;
        let name: String = row
            .get(1)
            .map_err(|e| RecookieError::Store(format!("Failed to read cookie name: {}", e)))?;
        let value: String = row
            .get(2)
            .map_err(|e| RecookieError::Store(format!("Failed to read cookie value: {}", e)))?;
        let encrypted_value: Vec<u8> = row
            .get(3)
            .map_err(|e| RecookieError::Store(format!("Failed to read cookie ciphertext: {}", e)))?;
        let path: String = row
            .get(4)
            .map_err(|e| RecookieError::Store(format!("Failed to read cookie path: {}", e)))?;
        let expires_utc: i64 = row
            .get(5)
            .map_err(|e| RecookieError::Store(format!("Failed to read cookie expiry: {}", e)))?;
        let secure: i64 = row
            .get(6)
            .map_err(|e| RecookieError::Store(format!("Failed to read cookie secure flag: {}", e)))?;
        let http_only: i64 = row.get(7).map_err(|e| {
            RecookieError::Store(format!("Failed to read cookie httponly flag: {}", e))
        })?;

        let cookie_value = if !value.is_empty() {
            value
        } else if !encrypted_value.is_empty() {
            match self.crypto.decrypt(&encrypted_value) {
                Some(value) => value,
                None => {
                    log::warn!("skipping undecryptable cookie {:?} on {}", name, host_key);
                    return Ok(None);
                }
            }
        } else {
            return Ok(None);
        };

        Ok(Some(Cookie {
            name,
            value: cookie_value,
            host_only: !host_key.starts_with('.'),
            session: expires_utc == 0,
            domain: host_key,
            path,
            secure: secure != 0,
            http_only: http_only != 0,
            expires: if expires_utc == 0 {
                None
            } else {
                Some(expires_utc)
            },
        }))
    }
}

#[async_trait]
impl CookieStore for ChromiumStore {
    async fn list_all(&self) -> Result<Vec<Cookie>> {
        let conn = self.conn.lock().unwrap();
        let query = if let Some(httponly) = self.httponly_column {
            format!(
                "SELECT host_key, name, value, encrypted_value, path, expires_utc, {}, {} FROM cookies",
                self.secure_column, httponly
            )
        } else {
            format!(
                "SELECT host_key, name, value, encrypted_value, path, expires_utc, {}, 0 FROM cookies",
                self.secure_column
            )
        };

        let mut stmt = conn
            .prepare(&query)
            .map_err(|e| RecookieError::Store(format!("Failed to prepare cookie query: {}", e)))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| RecookieError::Store(format!("Failed to query cookies: {}", e)))?;

        let mut cookies = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| RecookieError::Store(format!("Failed to read cookie row: {}", e)))?
        {
            if let Some(cookie) = self.row_to_cookie(row)? {
                cookies.push(cookie);
            }
        }
        Ok(cookies)
    }

    async fn write(&self, candidate: &WriteCandidate) -> Result<bool> {
        if let Err(reason) = Self::validate(candidate) {
            return Ok(self.decline(reason));
        }

        let conn = self.conn.lock().unwrap();
        self.insert(&conn, candidate)
            .map_err(|e| RecookieError::Store(format!("Failed to write cookie: {}", e)))?;
        Ok(true)
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }
}

/// Decrypts `v10` cookie values where the platform key is available.
#[derive(Debug)]
struct CookieCrypto {
    key: Option<[u8; KEY_LENGTH]>,
    meta_version: i64,
}

impl CookieCrypto {
    fn new(meta_version: i64) -> Self {
        let key = platform_passphrase().map(|pass| derive_key(&pass));
        CookieCrypto { key, meta_version }
    }

    fn decrypt(&self, encrypted_value: &[u8]) -> Option<String> {
        if encrypted_value.len() < 3 {
            return None;
        }
        let (version, ciphertext) = encrypted_value.split_at(3);
        if version == b"v10" {
            let key = self.key.as_ref()?;
            let decrypted = decrypt_aes_cbc(ciphertext, key)?;
            // Newer schemas prefix the plaintext with a 32-byte domain hash.
            let trimmed = if self.meta_version >= 24 && decrypted.len() > 32 {
                &decrypted[32..]
            } else {
                &decrypted[..]
            };
            String::from_utf8(trimmed.to_vec()).ok()
        } else {
            String::from_utf8(encrypted_value.to_vec()).ok()
        }
    }
}

#[cfg(target_os = "macos")]
fn platform_passphrase() -> Option<Vec<u8>> {
    use security_framework::passwords::get_generic_password;

    match get_generic_password("Chrome Safe Storage", "Chrome") {
        Ok(password) => Some(password),
        Err(err) => {
            log::warn!("Failed to read keychain password for Chrome: {}", err);
            None
        }
    }
}

#[cfg(target_os = "linux")]
fn platform_passphrase() -> Option<Vec<u8>> {
    Some(LINUX_V10_PASSWORD.to_vec())
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn platform_passphrase() -> Option<Vec<u8>> {
    None
}

fn derive_key(password: &[u8]) -> [u8; KEY_LENGTH] {
    use pbkdf2::pbkdf2_hmac;
    use sha1::Sha1;

    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha1>(password, KEY_DERIVE_SALT, KEY_DERIVE_ITERATIONS, &mut key);
    key
}

fn decrypt_aes_cbc(ciphertext: &[u8], key: &[u8; KEY_LENGTH]) -> Option<Vec<u8>> {
    let mut buffer = ciphertext.to_vec();
    let decryptor = cbc::Decryptor::<Aes128>::new_from_slices(key, AES_IV).ok()?;
    let plaintext = decryptor.decrypt_padded_mut::<Pkcs7>(&mut buffer).ok()?;
    Some(plaintext.to_vec())
}

fn read_meta_version(conn: &Connection) -> i64 {
    let result: std::result::Result<String, _> =
        conn.query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
            row.get(0)
        });
    result
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

fn read_cookie_columns(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn
        .prepare("PRAGMA table_info(cookies)")
        .map_err(|e| RecookieError::Store(format!("Failed to read cookie schema: {}", e)))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| RecookieError::Store(format!("Failed to read cookie schema: {}", e)))?;
    let mut columns = HashSet::new();
    for row in rows {
        let name =
            row.map_err(|e| RecookieError::Store(format!("Failed to read cookie schema: {}", e)))?;
        columns.insert(name);
    }
    if columns.is_empty() {
        return Err(RecookieError::Store(
            "Database has no cookies table".to_string(),
        ));
    }
    Ok(columns)
}

fn default_user_data_dir() -> Result<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        let home = dirs::home_dir()
            .ok_or_else(|| RecookieError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join("Library/Application Support/Google/Chrome"))
    }
    #[cfg(target_os = "linux")]
    {
        let config = dirs::config_dir()
            .ok_or_else(|| RecookieError::Config("Cannot determine config directory".to_string()))?;
        Ok(config.join("google-chrome"))
    }
    #[cfg(target_os = "windows")]
    {
        let local = std::env::var_os("LOCALAPPDATA").ok_or_else(|| {
            RecookieError::Config("Cannot determine LOCALAPPDATA directory".to_string())
        })?;
        Ok(PathBuf::from(local).join("Google/Chrome/User Data"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        Err(RecookieError::Unsupported(
            "No default Chrome location on this platform".to_string(),
        ))
    }
}

fn find_files(root: &Path, filename: &str) -> Result<Vec<PathBuf>> {
    let mut matches = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            RecookieError::Store(format!("Failed to read directory {:?}: {}", dir, e))
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                RecookieError::Store(format!("Failed to read directory entry in {:?}: {}", dir, e))
            })?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.file_name().and_then(|name| name.to_str()) == Some(filename) {
                matches.push(path);
            }
        }
    }
    Ok(matches)
}

fn newest_path(paths: Vec<PathBuf>) -> Option<PathBuf> {
    paths
        .into_iter()
        .filter_map(|path| {
            let modified = std::fs::metadata(&path).ok()?.modified().ok()?;
            Some((modified, path))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}

fn now_chrome_epoch() -> i64 {
    let unix_micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_micros() as i64)
        .unwrap_or(0);
    unix_micros + CHROME_EPOCH_OFFSET_MICROS
}
