use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::VmError;
use crate::vm::class::class::{ClassStatus, Klass};

/// Outcome of an atomic claim on a method-area slot.
pub enum Claim {
    /// The entry exists at status >= Linked.
    Ready(Arc<Klass>),
    /// Another task owns the load; wait on the entry.
    InProgress(Arc<Klass>),
    /// A previous load failed permanently.
    Poisoned(VmError),
    /// The caller installed the placeholder and now owns the load.
    Claimed(Arc<Klass>),
}

/// Process-wide store of loaded classes, keyed by internal name. Reads are
/// lock-free of each other; writers serialize per map operation only, the
/// per-class readiness condition lives on the entry itself.
#[derive(Debug, Default)]
pub struct MethArea {
    classes: RwLock<HashMap<String, Arc<Klass>>>,
}

impl MethArea {
    pub fn new() -> MethArea {
        Default::default()
    }

    pub fn fetch(&self, name: &str) -> Option<Arc<Klass>> {
        self.classes.read().unwrap().get(name).cloned()
    }

    pub fn install(&self, name: &str, klass: Arc<Klass>) {
        self.classes.write().unwrap().insert(name.to_string(), klass);
    }

    /// Either hand back the existing entry or install a placeholder and make
    /// the caller the owner of the load. Exactly one claimant per name.
    pub fn try_claim(&self, name: &str, loader: &str) -> Claim {
        let mut classes = self.classes.write().unwrap();
        if let Some(k) = classes.get(name) {
            return match k.status() {
                ClassStatus::Poisoned => Claim::Poisoned(k.poison_error()),
                s if s >= ClassStatus::Linked => Claim::Ready(Arc::clone(k)),
                _ => Claim::InProgress(Arc::clone(k)),
            };
        }

        let k = Arc::new(Klass::placeholder(name, loader));
        classes.insert(name.to_string(), Arc::clone(&k));
        Claim::Claimed(k)
    }

    /// Block until `name` reaches at least `min`. Fails if the class is
    /// absent or its load failed.
    pub fn wait_for_status(&self, name: &str, min: ClassStatus) -> Result<Arc<Klass>, VmError> {
        let k = self.fetch(name).ok_or_else(|| {
            VmError::Internal(format!("class {} is not present in the method area", name))
        })?;
        k.wait_for(min)?;
        Ok(k)
    }

    pub fn len(&self) -> usize {
        self.classes.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
