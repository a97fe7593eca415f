//! In-memory loader for unit tests.

use std::collections::HashMap;
use std::ffi::{c_void, OsStr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::PlatformError;
use crate::platform::{Image, Loader, SymbolAddress};

#[derive(Clone, Default)]
pub struct FakeImage {
    symbols: HashMap<String, std::result::Result<usize, String>>,
    close_failure: Option<String>,
    closes: Arc<AtomicUsize>,
}

impl FakeImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, name: &str, address: usize) -> Self {
        self.symbols.insert(name.to_string(), Ok(address));
        self
    }

    pub fn with_function(self, name: &str, address: *const c_void) -> Self {
        self.with_symbol(name, address as usize)
    }

    pub fn with_failure(mut self, name: &str, diagnostic: &str) -> Self {
        self.symbols.insert(name.to_string(), Err(diagnostic.to_string()));
        self
    }

    pub fn with_close_failure(mut self, diagnostic: &str) -> Self {
        self.close_failure = Some(diagnostic.to_string());
        self
    }
}

impl Image for FakeImage {
    fn find_symbol(&self, name: &str) -> Result<SymbolAddress, PlatformError> {
        match self.symbols.get(name) {
            Some(Ok(address)) => Ok(SymbolAddress::from_ptr(*address as *mut c_void)),
            Some(Err(diagnostic)) => Err(PlatformError::new(diagnostic.clone())),
            None => Err(PlatformError::new(format!("{name}: symbol not found"))),
        }
    }

    fn close(self: Box<Self>) -> Result<(), PlatformError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        match &self.close_failure {
            Some(diagnostic) => Err(PlatformError::new(diagnostic.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct FakeLoader {
    images: HashMap<String, FakeImage>,
    closes: Arc<AtomicUsize>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, path: &str, mut image: FakeImage) -> Self {
        image.closes = self.closes.clone();
        self.images.insert(path.to_string(), image);
        self
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Loader for FakeLoader {
    fn open(&self, path: &OsStr) -> Result<Box<dyn Image>, PlatformError> {
        let key = path.to_string_lossy();
        match self.images.get(key.as_ref()) {
            Some(image) => Ok(Box::new(image.clone())),
            None => Err(PlatformError::new(format!(
                "{key}: cannot open shared object file: No such file or directory"
            ))),
        }
    }
}
