use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{error, trace, warn};

use crate::class_parser::be_reader::BeRead;
use crate::class_parser::types::{MemberInfo, ParsedClass};
use crate::class_parser::{parse_class, read_attr};
use crate::error::{cfe, VmError};
use crate::vm::class::class::{
    ClData, ClInit, ClassStatus, Klass, BOOTSTRAP_LOADER,
};
use crate::vm::class::constant_pool::{CPool, CpEntry};
use crate::vm::class::field::Field;
use crate::vm::class::method::{
    BootstrapMethod, CodeAttrib, CodeException, Method, ParamAttrib,
};
use crate::vm::class_loader::meth_area::Claim;
use crate::vm::vm::VM;

/// Source of raw class-file bytes. Classpath discovery (directories, JARs)
/// lives outside the core; the loader only ever sees this interface.
pub trait ClassByteSource: Send + Sync {
    fn class_bytes(&self, name: &str) -> Result<Vec<u8>, VmError>;
}

/// Reads `<base>/<internal-name>.class`.
pub struct DirByteSource {
    base: PathBuf,
}

impl DirByteSource {
    pub fn new(base: impl Into<PathBuf>) -> DirByteSource {
        DirByteSource { base: base.into() }
    }
}

impl ClassByteSource for DirByteSource {
    fn class_bytes(&self, name: &str) -> Result<Vec<u8>, VmError> {
        let rel = name.replace('.', "/") + ".class";
        fs::read(self.base.join(rel))
            .map_err(|e| VmError::ClassNotFound(format!("{}: {}", name, e)))
    }
}

/// Ensure that `name` is present in the method area at status >= Linked.
/// Idempotent: a second call for an already-loaded name returns the same
/// entry. A failed load is permanent for the lifetime of the VM.
pub fn load_class_from_name(vm: &VM, name: &str) -> Result<Arc<Klass>, VmError> {
    match vm.meth_area.try_claim(name, BOOTSTRAP_LOADER) {
        Claim::Ready(k) => Ok(k),
        Claim::Poisoned(e) => Err(e),
        Claim::InProgress(k) => {
            k.wait_for(ClassStatus::Linked)?;
            Ok(k)
        }
        Claim::Claimed(k) => match load_and_link(vm, name, &k) {
            Ok(()) => Ok(k),
            Err(e) => {
                error!("loading of class {} failed: {}", name, e);
                k.poison(e.clone());
                Err(e)
            }
        },
    }
}

fn load_and_link(vm: &VM, name: &str, klass: &Arc<Klass>) -> Result<(), VmError> {
    trace!("started loading class: {}", name);

    let bytes = vm.byte_source.class_bytes(name)?;
    let parsed = parse_class(&bytes, vm.max_java_version_raw)?;
    format_check(&parsed)?;

    if parsed.class_name != name {
        warn!(
            "class file for {} declares itself as {}",
            name, parsed.class_name
        );
    }

    let data = build_class_data(parsed)?;
    let superclass = data.superclass.clone();
    let mut interface_names = Vec::with_capacity(data.interfaces.len());
    for &index in &data.interfaces {
        interface_names.push(data.cp.class_name_at(index)?.to_string());
    }
    let clinit = if data.method_table.contains_key("<clinit>()V") {
        ClInit::Pending
    } else {
        ClInit::Absent
    };

    klass.set_data(data)?;
    klass.set_clinit(clinit);
    klass.advance(ClassStatus::FormatChecked);

    // the superclass chain and every declared interface must reach Linked
    // before this class does
    if !superclass.is_empty() {
        load_class_from_name(vm, &superclass)?;
    }
    for iface in interface_names {
        load_class_from_name(vm, &iface)?;
    }

    klass.advance(ClassStatus::Verified);
    klass.advance(ClassStatus::Linked);
    trace!("linked class: {}", name);
    Ok(())
}

/// Structural checks performed after parse: constant-pool cross-references,
/// access-bit exclusivity, name rules, and member name/descriptor indices.
/// Distinct from bytecode verification, which is not performed here.
pub fn format_check(parsed: &ParsedClass) -> Result<(), VmError> {
    parsed.cp.format_check()?;

    if parsed.access.is_final && parsed.access.is_abstract {
        return Err(cfe(format!(
            "class {} is marked both final and abstract",
            parsed.class_name
        )));
    }
    if parsed.class_name.is_empty() {
        return Err(cfe("empty class name"));
    }
    if parsed.superclass_name.is_empty() && parsed.class_name != "java/lang/Object" {
        return Err(cfe(format!("class {} has no superclass", parsed.class_name)));
    }

    for &index in &parsed.interfaces {
        parsed.cp.class_name_at(index)?;
    }
    for member in parsed.fields.iter().chain(parsed.methods.iter()) {
        parsed.cp.utf8(member.name_index)?;
        parsed.cp.utf8(member.descriptor_index)?;
        for attr in &member.attributes {
            parsed.cp.utf8(attr.name_index)?;
        }
    }
    for attr in &parsed.attributes {
        parsed.cp.utf8(attr.name_index)?;
    }

    Ok(())
}

// Turn the transient parser output into the long-lived method-area record:
// decode the well-known attributes, build the signature index, and move the
// constant pool behind a shared handle.
fn build_class_data(parsed: ParsedClass) -> Result<ClData, VmError> {
    let cp = Arc::new(parsed.cp);

    let mut methods = Vec::with_capacity(parsed.methods.len());
    let mut method_table = HashMap::with_capacity(parsed.methods.len());
    for (index, raw) in parsed.methods.iter().enumerate() {
        let method = decode_method(&cp, raw)?;
        let signature = format!(
            "{}{}",
            cp.utf8(raw.name_index)?,
            cp.utf8(raw.descriptor_index)?
        );
        method_table.insert(signature, index);
        methods.push(method);
    }

    let mut fields = Vec::with_capacity(parsed.fields.len());
    for raw in &parsed.fields {
        fields.push(Field::new(
            raw.access_flags,
            raw.name_index,
            raw.descriptor_index,
            raw.attributes.clone(),
        ));
    }

    let mut source_file = String::new();
    let mut module = String::new();
    let mut bootstraps = Vec::new();
    for attr in &parsed.attributes {
        match cp.utf8(attr.name_index)? {
            "SourceFile" => {
                source_file = cp.utf8(u16::read_at(&attr.content, 0)?)?.to_string();
            }
            "Module" => {
                let module_index = u16::read_at(&attr.content, 0)?;
                module = match cp.entry(module_index)? {
                    CpEntry::Module(utf8_index) => cp.utf8(*utf8_index)?.to_string(),
                    _ => return Err(cfe("Module attribute does not point at a module entry")),
                };
            }
            "BootstrapMethods" => bootstraps = decode_bootstrap_methods(&attr.content)?,
            _ => {}
        }
    }

    let pkg = parsed
        .class_name
        .rsplit_once('/')
        .map(|(prefix, _)| prefix.to_string())
        .unwrap_or_default();

    Ok(ClData {
        superclass: parsed.superclass_name,
        module,
        pkg,
        interfaces: SmallVec::from_vec(parsed.interfaces),
        fields,
        method_table,
        methods,
        attributes: parsed.attributes,
        source_file,
        bootstraps,
        cp,
        access: parsed.access,
    })
}

fn decode_method(cp: &Arc<CPool>, raw: &MemberInfo) -> Result<Method, VmError> {
    let mut method = Method {
        access_flags: raw.access_flags,
        name: raw.name_index,
        desc: raw.descriptor_index,
        ..Default::default()
    };

    for attr in &raw.attributes {
        match cp.utf8(attr.name_index)? {
            "Code" => method.code_attr = decode_code_attr(&attr.content)?,
            "Exceptions" => {
                let count = u16::read_at(&attr.content, 0)? as usize;
                let mut pos = 2;
                for _ in 0..count {
                    method.exceptions.push(u16::read_at(&attr.content, pos)?);
                    pos += 2;
                }
            }
            "MethodParameters" => {
                let count = u8::read_at(&attr.content, 0)? as usize;
                let mut pos = 1;
                for _ in 0..count {
                    let name_index = u16::read_at(&attr.content, pos)?;
                    let access_flags = u16::read_at(&attr.content, pos + 2)?;
                    let name = if name_index == 0 {
                        String::new()
                    } else {
                        cp.utf8(name_index)?.to_string()
                    };
                    method.parameters.push(ParamAttrib { name, access_flags });
                    pos += 4;
                }
            }
            "Deprecated" => method.deprecated = true,
            _ => method.attributes.push(attr.clone()),
        }
    }

    Ok(method)
}

// Code attribute layout: max_stack u2, max_locals u2, code_length u4, the
// code itself, the exception table (u2 count, four u2 per row), then nested
// attributes.
fn decode_code_attr(info: &[u8]) -> Result<CodeAttrib, VmError> {
    let max_stack = u16::read_at(info, 0)? as usize;
    let max_locals = u16::read_at(info, 2)? as usize;
    let code_length = u32::read_at(info, 4)? as usize;
    let code_end = 8usize
        .checked_add(code_length)
        .ok_or_else(|| cfe("code attribute length overflow"))?;
    let code = info
        .get(8..code_end)
        .ok_or_else(|| cfe("code attribute is truncated"))?
        .to_vec();

    let mut pos = code_end;
    let table_len = u16::read_at(info, pos)? as usize;
    pos += 2;
    let mut exceptions = Vec::with_capacity(table_len);
    for _ in 0..table_len {
        exceptions.push(CodeException {
            start_pc: u16::read_at(info, pos)?,
            end_pc: u16::read_at(info, pos + 2)?,
            handler_pc: u16::read_at(info, pos + 4)?,
            catch_type: u16::read_at(info, pos + 6)?,
        });
        pos += 8;
    }

    let attr_count = u16::read_at(info, pos)? as usize;
    pos += 2;
    let mut attributes = Vec::with_capacity(attr_count);
    for _ in 0..attr_count {
        let (attr, next) = read_attr(info, pos)?;
        attributes.push(attr);
        pos = next;
    }

    Ok(CodeAttrib {
        max_stack,
        max_locals,
        code,
        exceptions,
        attributes,
    })
}

fn decode_bootstrap_methods(info: &[u8]) -> Result<Vec<BootstrapMethod>, VmError> {
    let count = u16::read_at(info, 0)? as usize;
    let mut pos = 2;
    let mut bootstraps = Vec::with_capacity(count);
    for _ in 0..count {
        let method_ref = u16::read_at(info, pos)?;
        let arg_count = u16::read_at(info, pos + 2)? as usize;
        pos += 4;
        let mut args = Vec::with_capacity(arg_count);
        for _ in 0..arg_count {
            args.push(u16::read_at(info, pos)?);
            pos += 2;
        }
        bootstraps.push(BootstrapMethod { method_ref, args });
    }
    Ok(bootstraps)
}
