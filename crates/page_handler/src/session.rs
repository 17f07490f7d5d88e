use anyhow::{Error, anyhow};
use log::debug;
use std::collections::HashMap;
use std::sync::Mutex;

/// Session flag recording that the font stylesheet was loaded once already.
pub const FONTS_LOADED_KEY: &str = "fonts-loaded";

/// Per-session key/value storage (`window.sessionStorage`).
///
/// Both operations may fail, e.g. when storage is disabled. Callers in this
/// crate treat every failure as "no value" and carry on.
pub trait SessionStorage: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the storage backend is unavailable.
    fn get_item(&self, key: &str) -> Result<Option<String>, Error>;

    /// # Errors
    ///
    /// Returns an error if the storage backend is unavailable or full.
    fn set_item(&self, key: &str, value: &str) -> Result<(), Error>;
}

/// In-memory session storage shared between loads in the same process.
#[derive(Default)]
pub struct MemorySessionStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        let items = self
            .items
            .lock()
            .map_err(|_| anyhow!("session storage lock poisoned"))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Error> {
        self.items
            .lock()
            .map_err(|_| anyhow!("session storage lock poisoned"))?
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// True when an earlier load in this session already fetched the fonts.
///
/// Storage errors read as "not loaded".
pub fn fonts_loaded(storage: &dyn SessionStorage) -> bool {
    match storage.get_item(FONTS_LOADED_KEY) {
        Ok(value) => value.is_some_and(|flag| !flag.is_empty()),
        Err(err) => {
            debug!("Ignoring session storage read failure: {err}");
            false
        }
    }
}

/// Record the fonts flag, except on local development hosts.
///
/// Storage errors are ignored.
pub fn remember_fonts_loaded(storage: &dyn SessionStorage, host: Option<&str>) {
    if host.is_some_and(|name| name.contains("localhost")) {
        return;
    }
    if let Err(err) = storage.set_item(FONTS_LOADED_KEY, "true") {
        debug!("Ignoring session storage write failure: {err}");
    }
}
