//! Synthetic class files and an in-memory byte provider, shared by the
//! per-module tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::VmError;
use crate::vm::class_loader::loader::ClassByteSource;
use crate::vm::vm::{MAX_JAVA_VERSION_RAW, VM};

/// Assembles a class file byte by byte. Constant-pool helpers return the
/// 1-based index of the entry they appended.
pub struct ClassFileBuilder {
    pub minor: u16,
    pub major: u16,
    pub flags: u16,
    cp: Vec<Vec<u8>>,
    cp_slots: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    attributes: Vec<(u16, Vec<u8>)>,
}

impl ClassFileBuilder {
    pub fn new() -> ClassFileBuilder {
        ClassFileBuilder {
            minor: 0,
            major: MAX_JAVA_VERSION_RAW,
            flags: 0x0021, // public super
            cp: vec![],
            cp_slots: 0,
            this_class: 0,
            super_class: 0,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            attributes: vec![],
        }
    }

    fn push_cp(&mut self, bytes: Vec<u8>, slots: u16) -> u16 {
        let index = self.cp_slots + 1;
        self.cp.push(bytes);
        self.cp_slots += slots;
        index
    }

    pub fn utf8(&mut self, content: &str) -> u16 {
        let mut entry = vec![1u8];
        entry.extend((content.len() as u16).to_be_bytes());
        entry.extend(content.as_bytes());
        self.push_cp(entry, 1)
    }

    pub fn class(&mut self, name_index: u16) -> u16 {
        let mut entry = vec![7u8];
        entry.extend(name_index.to_be_bytes());
        self.push_cp(entry, 1)
    }

    pub fn class_named(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.class(name_index)
    }

    pub fn int(&mut self, value: i32) -> u16 {
        let mut entry = vec![3u8];
        entry.extend(value.to_be_bytes());
        self.push_cp(entry, 1)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        let mut entry = vec![5u8];
        entry.extend(value.to_be_bytes());
        self.push_cp(entry, 2) // takes two index slots
    }

    pub fn double(&mut self, value: f64) -> u16 {
        let mut entry = vec![6u8];
        entry.extend(value.to_be_bytes());
        self.push_cp(entry, 2)
    }

    pub fn module_entry(&mut self, name_index: u16) -> u16 {
        let mut entry = vec![19u8];
        entry.extend(name_index.to_be_bytes());
        self.push_cp(entry, 1)
    }

    pub fn set_this(&mut self, class_index: u16) {
        self.this_class = class_index;
    }

    pub fn set_super(&mut self, class_index: u16) {
        self.super_class = class_index;
    }

    pub fn add_interface(&mut self, class_index: u16) {
        self.interfaces.push(class_index);
    }

    pub fn add_attribute(&mut self, name_index: u16, content: Vec<u8>) {
        self.attributes.push((name_index, content));
    }

    pub fn add_method_raw(
        &mut self,
        flags: u16,
        name_index: u16,
        desc_index: u16,
        attrs: Vec<(u16, Vec<u8>)>,
    ) {
        self.methods
            .push(Self::encode_member(flags, name_index, desc_index, &attrs));
    }

    pub fn add_field_raw(
        &mut self,
        flags: u16,
        name_index: u16,
        desc_index: u16,
        attrs: Vec<(u16, Vec<u8>)>,
    ) {
        self.fields
            .push(Self::encode_member(flags, name_index, desc_index, &attrs));
    }

    /// A method whose Code attribute is a bare `return`.
    pub fn bytecode_method(&mut self, flags: u16, name: &str, desc: &str) {
        let name_index = self.utf8(name);
        let desc_index = self.utf8(desc);
        let code_name = self.utf8("Code");
        self.add_method_raw(
            flags,
            name_index,
            desc_index,
            vec![(code_name, code_attr_bytes(1, 1, &[0xb1]))],
        );
    }

    fn encode_member(
        flags: u16,
        name_index: u16,
        desc_index: u16,
        attrs: &[(u16, Vec<u8>)],
    ) -> Vec<u8> {
        let mut buf = vec![];
        buf.extend(flags.to_be_bytes());
        buf.extend(name_index.to_be_bytes());
        buf.extend(desc_index.to_be_bytes());
        buf.extend((attrs.len() as u16).to_be_bytes());
        for (attr_name, content) in attrs {
            buf.extend(attr_name.to_be_bytes());
            buf.extend((content.len() as u32).to_be_bytes());
            buf.extend(content);
        }
        buf
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buf = vec![0xCA, 0xFE, 0xBA, 0xBE];
        buf.extend(self.minor.to_be_bytes());
        buf.extend(self.major.to_be_bytes());
        buf.extend((self.cp_slots + 1).to_be_bytes());
        for entry in &self.cp {
            buf.extend(entry);
        }
        buf.extend(self.flags.to_be_bytes());
        buf.extend(self.this_class.to_be_bytes());
        buf.extend(self.super_class.to_be_bytes());
        buf.extend((self.interfaces.len() as u16).to_be_bytes());
        for index in &self.interfaces {
            buf.extend(index.to_be_bytes());
        }
        buf.extend((self.fields.len() as u16).to_be_bytes());
        for field in &self.fields {
            buf.extend(field);
        }
        buf.extend((self.methods.len() as u16).to_be_bytes());
        for method in &self.methods {
            buf.extend(method);
        }
        buf.extend((self.attributes.len() as u16).to_be_bytes());
        for (name_index, content) in &self.attributes {
            buf.extend(name_index.to_be_bytes());
            buf.extend((content.len() as u32).to_be_bytes());
            buf.extend(content);
        }
        buf
    }
}

/// Encode a Code attribute with an empty exception table and no nested
/// attributes.
pub fn code_attr_bytes(max_stack: u16, max_locals: u16, code: &[u8]) -> Vec<u8> {
    let mut buf = vec![];
    buf.extend(max_stack.to_be_bytes());
    buf.extend(max_locals.to_be_bytes());
    buf.extend((code.len() as u32).to_be_bytes());
    buf.extend(code);
    buf.extend(0u16.to_be_bytes());
    buf.extend(0u16.to_be_bytes());
    buf
}

/// A minimal well-formed class: `name extends supername`, with the given
/// `(flags, method-name, descriptor)` methods. An empty supername emits a
/// zero super-class index.
pub fn class_bytes(name: &str, supername: &str, methods: &[(u16, &str, &str)]) -> Vec<u8> {
    let mut builder = ClassFileBuilder::new();
    let this = builder.class_named(name);
    builder.set_this(this);
    if supername.is_empty() {
        builder.set_super(0);
    } else {
        let superclass = builder.class_named(supername);
        builder.set_super(superclass);
    }
    for (flags, method_name, desc) in methods {
        builder.bytecode_method(*flags, method_name, desc);
    }
    builder.build()
}

/// Byte provider backed by a map, counting every lookup.
pub struct MapByteSource {
    classes: HashMap<String, Vec<u8>>,
    hits: Arc<AtomicUsize>,
}

impl MapByteSource {
    pub fn new() -> MapByteSource {
        MapByteSource {
            classes: HashMap::new(),
            hits: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn insert(&mut self, name: &str, bytes: Vec<u8>) {
        self.classes.insert(name.to_string(), bytes);
    }

    pub fn hit_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.hits)
    }
}

impl ClassByteSource for MapByteSource {
    fn class_bytes(&self, name: &str) -> Result<Vec<u8>, VmError> {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.classes
            .get(name)
            .cloned()
            .ok_or_else(|| VmError::ClassNotFound(name.to_string()))
    }
}

/// A VM over the given classes, with shutdown intercepted and
/// java/lang/Object always available.
pub fn test_vm(classes: &[(&str, Vec<u8>)]) -> VM {
    test_vm_with_counter(classes).0
}

pub fn test_vm_with_counter(classes: &[(&str, Vec<u8>)]) -> (VM, Arc<AtomicUsize>) {
    let mut source = MapByteSource::new();
    source.insert("java/lang/Object", class_bytes("java/lang/Object", "", &[]));
    for (name, bytes) in classes {
        source.insert(name, bytes.clone());
    }
    let hits = source.hit_counter();

    let mut vm = VM::init(Box::new(source));
    vm.intercept_shutdown = true;
    (vm, hits)
}
