//! Nym persistence.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::contract::Identifier;
use crate::identity::nym::Nym;
use crate::identity::{Identity, StoreError};

/// Loads and saves Nyms by id.
pub trait NymStore: Send + Sync {
    fn load(&self, id: &Identifier) -> Result<Option<Nym>, StoreError>;

    fn save(&self, nym: &Nym) -> Result<(), StoreError>;
}

impl<S: NymStore + ?Sized> NymStore for Arc<S> {
    fn load(&self, id: &Identifier) -> Result<Option<Nym>, StoreError> {
        (**self).load(id)
    }

    fn save(&self, nym: &Nym) -> Result<(), StoreError> {
        (**self).save(nym)
    }
}

/// One JSON file per Nym, named by its id.
#[derive(Debug, Clone)]
pub struct FileNymStore {
    dir: PathBuf,
}

impl FileNymStore {
    /// Open `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &Identifier) -> Result<PathBuf, StoreError> {
        if id.is_empty() {
            return Err(StoreError::EmptyId);
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}

impl NymStore for FileNymStore {
    fn load(&self, id: &Identifier) -> Result<Option<Nym>, StoreError> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Ok(None);
        }

        let reader = BufReader::new(File::open(&path)?);
        let nym: Nym = serde_json::from_reader(reader)?;
        if nym.id() != id {
            return Err(StoreError::IdMismatch(path));
        }
        Ok(Some(nym))
    }

    fn save(&self, nym: &Nym) -> Result<(), StoreError> {
        let path = self.path_for(nym.id())?;

        // Write beside the target, then rename over it.
        let tmp_path = path.with_extension("json.tmp");
        {
            let writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer_pretty(writer, nym)?;
        }
        fs::rename(&tmp_path, &path)?;

        tracing::debug!(nym_id = %nym.id(), path = %path.display(), "Nym saved");
        Ok(())
    }
}

/// In-memory store. Counts saves so callers can observe write behavior.
#[derive(Debug, Default)]
pub struct MemoryNymStore {
    nyms: DashMap<Identifier, Nym>,
    saves: AtomicUsize,
}

impl MemoryNymStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.nyms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nyms.is_empty()
    }
}

impl NymStore for MemoryNymStore {
    fn load(&self, id: &Identifier) -> Result<Option<Nym>, StoreError> {
        Ok(self.nyms.get(id).map(|entry| entry.value().clone()))
    }

    fn save(&self, nym: &Nym) -> Result<(), StoreError> {
        self.nyms.insert(nym.id().clone(), nym.clone());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// A Nym bound to the store it is saved to.
#[derive(Debug)]
pub struct PersistentNym<S: NymStore> {
    nym: Nym,
    store: S,
}

impl<S: NymStore> PersistentNym<S> {
    pub fn new(nym: Nym, store: S) -> Self {
        Self { nym, store }
    }

    /// Load `id` from `store`.
    pub fn load(store: S, id: &Identifier) -> Result<Self, StoreError> {
        let nym = store
            .load(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(Self { nym, store })
    }

    /// Load `id`, or create and save an empty Nym with that id.
    pub fn load_or_create(store: S, id: &Identifier) -> Result<Self, StoreError> {
        match store.load(id)? {
            Some(nym) => Ok(Self { nym, store }),
            None => {
                let nym = Nym::new(id.clone());
                store.save(&nym)?;
                tracing::info!(nym_id = %id, "Created Nym");
                Ok(Self { nym, store })
            }
        }
    }

    pub fn nym(&self) -> &Nym {
        &self.nym
    }

    /// Mutable access. Changes are kept in memory until [`Identity::persist`].
    pub fn nym_mut(&mut self) -> &mut Nym {
        &mut self.nym
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: NymStore> Identity for PersistentNym<S> {
    fn nym_id(&self) -> &Identifier {
        self.nym.id()
    }

    fn update_request_number(&mut self, notary: &Identifier, number: i64) -> Result<(), StoreError> {
        self.nym.update_request_number(notary, number);
        self.persist()
    }

    fn clawback_transaction_number(
        &mut self,
        notary: &Identifier,
        number: i64,
        persist_now: bool,
    ) -> Result<bool, StoreError> {
        let recovered = self.nym.clawback_transaction_number(notary, number);
        if recovered && persist_now {
            self.persist()?;
        }
        Ok(recovered)
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        self.store.save(&self.nym)
    }
}
