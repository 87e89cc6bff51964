use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use once_cell::sync::OnceCell;
use smallvec::SmallVec;

use crate::class_parser::types::{AccessFlags, Attr};
use crate::error::VmError;
use crate::vm::class::constant_pool::CPool;
use crate::vm::class::field::Field;
use crate::vm::class::method::{BootstrapMethod, Method};

pub const BOOTSTRAP_LOADER: &str = "bootstrap";

/// Lifecycle of a method-area entry. Advance is monotonic; `Poisoned` is
/// terminal and marks a permanently failed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClassStatus {
    Initializing,
    FormatChecked,
    Verified,
    Linked,
    Instantiated,
    Poisoned,
}

/// Whether the class declares `<clinit>` and whether it has run. The loader
/// only records Absent or Pending; execution belongs to the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ClInit {
    Absent = 0,
    Pending = 1,
    Run = 2,
}

/// A method-area entry. The status mutex and condvar form a per-class
/// readiness condition, so waiting on one class never blocks loads of
/// unrelated classes. Class data is written exactly once, by the loader
/// task that claimed the entry.
#[derive(Debug)]
pub struct Klass {
    pub name: String,
    pub loader: String,
    status: Mutex<ClassStatus>,
    ready: Condvar,
    data: OnceCell<ClData>,
    clinit: AtomicU8,
    poison: OnceCell<VmError>,
}

impl Klass {
    pub fn placeholder(name: &str, loader: &str) -> Klass {
        Klass {
            name: name.to_string(),
            loader: loader.to_string(),
            status: Mutex::new(ClassStatus::Initializing),
            ready: Condvar::new(),
            data: OnceCell::new(),
            clinit: AtomicU8::new(ClInit::Absent.into()),
            poison: OnceCell::new(),
        }
    }

    pub fn status(&self) -> ClassStatus {
        *self.status.lock().unwrap()
    }

    /// Monotonic advance; regressions and writes to a poisoned entry are
    /// ignored.
    pub fn advance(&self, to: ClassStatus) {
        let mut status = self.status.lock().unwrap();
        if *status != ClassStatus::Poisoned && to > *status {
            *status = to;
            self.ready.notify_all();
        }
    }

    pub fn poison(&self, err: VmError) {
        let _ = self.poison.set(err);
        let mut status = self.status.lock().unwrap();
        *status = ClassStatus::Poisoned;
        self.ready.notify_all();
    }

    pub fn poison_error(&self) -> VmError {
        self.poison.get().cloned().unwrap_or_else(|| {
            VmError::Internal(format!("class {} poisoned without a recorded error", self.name))
        })
    }

    /// Block until the status reaches at least `min`, or fail permanently if
    /// the load was poisoned.
    pub fn wait_for(&self, min: ClassStatus) -> Result<ClassStatus, VmError> {
        let mut status = self.status.lock().unwrap();
        loop {
            if *status == ClassStatus::Poisoned {
                return Err(self.poison_error());
            }
            if *status >= min {
                return Ok(*status);
            }
            status = self.ready.wait(status).unwrap();
        }
    }

    pub fn set_data(&self, data: ClData) -> Result<(), VmError> {
        self.data.set(data).map_err(|_| {
            VmError::Internal(format!("class data for {} installed twice", self.name))
        })
    }

    pub fn data(&self) -> Option<&ClData> {
        self.data.get()
    }

    pub fn clinit(&self) -> ClInit {
        ClInit::try_from(self.clinit.load(Ordering::Acquire)).unwrap_or(ClInit::Absent)
    }

    pub fn set_clinit(&self, state: ClInit) {
        self.clinit.store(state.into(), Ordering::Release);
    }

    pub fn is_interface(&self) -> bool {
        self.data().map_or(false, |d| d.access.is_interface)
    }
}

/// The loaded-class record: everything a parsed class carries, plus the
/// decoded members, the signature index used for method lookup, and the
/// shared constant pool.
#[derive(Debug)]
pub struct ClData {
    pub superclass: String,
    pub module: String,
    pub pkg: String,
    /// CP indices of ClassRef entries, one per declared interface.
    pub interfaces: SmallVec<[u16; 4]>,
    pub fields: Vec<Field>,
    /// `name+descriptor` -> index into `methods`.
    pub method_table: HashMap<String, usize>,
    pub methods: Vec<Method>,
    pub attributes: Vec<Attr>,
    pub source_file: String,
    pub bootstraps: Vec<BootstrapMethod>,
    pub cp: Arc<CPool>,
    pub access: AccessFlags,
}
