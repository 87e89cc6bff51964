use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::class_parser::types::Attr;
use crate::error::VmError;
use crate::vm::class::class::Klass;
use crate::vm::class::constant_pool::CPool;
use crate::vm::class::method::{CodeException, ParamAttrib};
use crate::vm::vm::VM;

/// Values crossing the native-method boundary.
#[derive(Debug, Clone)]
pub enum NativeValue {
    Void,
    Int(i64),
    Float(f64),
    Str(String),
    Class(Arc<Klass>),
}

pub type GFunction = fn(&VM, &[NativeValue]) -> Result<NativeValue, VmError>;

/// A native method stub, registered before user code runs.
#[derive(Debug, Clone, Copy)]
pub struct GmEntry {
    pub param_slots: u16,
    pub func: GFunction,
}

/// A decoded bytecode method, cached in the method table together with a
/// shared view of its owning class's constant pool.
#[derive(Debug, Clone)]
pub struct JmEntry {
    pub access_flags: u16,
    pub max_stack: usize,
    pub max_locals: usize,
    pub code: Vec<u8>,
    pub exceptions: Vec<CodeException>,
    pub attribs: Vec<Attr>,
    pub params: Vec<ParamAttrib>,
    pub deprecated: bool,
    pub cp: Arc<CPool>,
}

/// The two kinds of invocable method. The discriminator letter is the one
/// dispatch test at the interpreter boundary.
#[derive(Debug, Clone)]
pub enum MtEntry {
    Bytecode(Arc<JmEntry>),
    Native(GmEntry),
}

impl MtEntry {
    pub fn tag(&self) -> char {
        match self {
            MtEntry::Bytecode(_) => 'J',
            MtEntry::Native(_) => 'G',
        }
    }
}

/// Process-wide method cache, keyed by fully-qualified signature
/// (`class-internal-name.method-name+descriptor`).
#[derive(Debug, Default)]
pub struct MTable {
    entries: RwLock<HashMap<String, MtEntry>>,
}

impl MTable {
    pub fn new() -> MTable {
        Default::default()
    }

    pub fn fetch(&self, fq_name: &str) -> Option<MtEntry> {
        self.entries.read().unwrap().get(fq_name).cloned()
    }

    /// Insert, except that a native entry is never displaced: bytecode
    /// methods cannot shadow a pre-registered native under the same key.
    pub fn insert(&self, fq_name: &str, entry: MtEntry) {
        let mut entries = self.entries.write().unwrap();
        if let Some(MtEntry::Native(_)) = entries.get(fq_name) {
            return;
        }
        entries.insert(fq_name.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
