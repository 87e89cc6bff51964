use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::vm::class::constant_pool::CPool;
use crate::vm::class_loader::m_table::GFunction;

/// Typed value of a static entry.
#[derive(Debug, Clone)]
pub enum StaticValue {
    /// Longs, ints, shorts, chars, booleans and bytes.
    Int(i64),
    /// Doubles and floats.
    Fp(f64),
    Str(String),
    Func(GFunction),
    /// Reference, by internal class name.
    Ref(String),
}

/// A static variable or function.
///
/// The kind letter follows field descriptors: B, C, D, F, I, J, S, Z, or an
/// `L…;` reference, plus `G` for a native function.
#[derive(Debug, Clone)]
pub struct Static {
    pub kind: char,
    pub type_desc: String,
    pub value: StaticValue,
    /// Constant pool of the owning class, shared with the method area.
    pub cp: Option<Arc<CPool>>,
}

/// Process-wide store of statics, keyed by fully-qualified name
/// (`class.field`). Entries land here when first referenced and resolved;
/// a single writer per key during class initialization, read-mostly after.
#[derive(Debug, Default)]
pub struct Statics {
    table: RwLock<HashMap<String, Static>>,
}

impl Statics {
    pub fn new() -> Statics {
        Default::default()
    }

    pub fn add(&self, name: &str, entry: Static) {
        self.table.write().unwrap().insert(name.to_string(), entry);
    }

    pub fn lookup(&self, name: &str) -> Option<Static> {
        self.table.read().unwrap().get(name).cloned()
    }

    pub fn int_value(&self, name: &str) -> Option<i64> {
        match self.lookup(name)?.value {
            StaticValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.table.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
