use tracing::trace;

use crate::class_parser::be_reader::BeRead;
use crate::class_parser::constants::CPTag;
use crate::class_parser::types::{AccessFlags, Attr, MemberInfo, ParsedClass};
use crate::error::{cfe, VmError};
use crate::vm::class::constant_pool::{CPool, CpEntry};

pub(crate) mod be_reader;
pub mod constants;
pub mod types;

const MAGIC: u32 = 0xCAFE_BABE;

/// Parse a class file into a [`ParsedClass`], or report the first structural
/// failure. Parsing proceeds in the fixed order of the class-file format,
/// each subroutine returning the offset just past the section it consumed.
pub fn parse_class(buf: &[u8], max_version_raw: u16) -> Result<ParsedClass, VmError> {
    parse_magic(buf)?;
    let (minor_version, major_version) = parse_version(buf, max_version_raw)?;
    let cp_count = parse_cp_count(buf)?;
    let (cp, pos) = parse_constant_pool(buf, 10, cp_count)?;
    let (access, pos) = parse_access_flags(buf, pos)?;
    let (class_name, pos) = parse_class_name(buf, pos, &cp)?;
    let (superclass_name, pos) = parse_superclass_name(buf, pos, &cp, &class_name)?;
    let (interfaces, pos) = parse_interfaces(buf, pos)?;
    let (fields, pos) = parse_members(buf, pos)?;
    let (methods, pos) = parse_members(buf, pos)?;
    let (attributes, pos) = parse_attributes(buf, pos)?;

    if pos != buf.len() {
        return Err(cfe("class file is longer than expected"));
    }

    Ok(ParsedClass {
        minor_version,
        major_version,
        cp_count,
        cp,
        access,
        class_name,
        superclass_name,
        interfaces,
        fields,
        methods,
        attributes,
    })
}

fn parse_magic(buf: &[u8]) -> Result<(), VmError> {
    let magic = u32::read_at(buf, 0).map_err(|_| cfe("invalid magic number"))?;
    if magic != MAGIC {
        return Err(cfe("invalid magic number"));
    }
    Ok(())
}

fn parse_version(buf: &[u8], max_version_raw: u16) -> Result<(u16, u16), VmError> {
    let minor = u16::read_at(buf, 4)?;
    let major = u16::read_at(buf, 6)?;

    if major > max_version_raw {
        return Err(VmError::UnsupportedVersion(format!(
            "class file major version {} exceeds the supported maximum {}",
            major, max_version_raw
        )));
    }

    trace!("class file version {}.{}", major, minor);
    Ok((minor, major))
}

// The on-disk count is one greater than the number of real entries; slot 0
// is a reserved placeholder.
fn parse_cp_count(buf: &[u8]) -> Result<u16, VmError> {
    let count = u16::read_at(buf, 8)?;
    if count <= 2 {
        return Err(cfe(format!(
            "invalid number of entries in constant pool: {}",
            count
        )));
    }
    trace!("number of CP entries: {}", count);
    Ok(count)
}

fn parse_constant_pool(
    buf: &[u8],
    start: usize,
    cp_count: u16,
) -> Result<(CPool, usize), VmError> {
    let mut cp = CPool::new();
    let mut pos = start;

    while cp.slot_count() < cp_count {
        pos = parse_cp_entry(buf, pos, &mut cp)?;
    }
    if cp.slot_count() != cp_count {
        return Err(cfe("long or double constant overruns the constant pool"));
    }

    Ok((cp, pos))
}

fn parse_cp_entry(buf: &[u8], pos: usize, cp: &mut CPool) -> Result<usize, VmError> {
    let tag_byte = u8::read_at(buf, pos)?;
    let tag = CPTag::try_from(tag_byte)
        .map_err(|_| cfe(format!("unrecognized tag {} in constant pool", tag_byte)))?;
    let mut pos = pos + 1;

    match tag {
        CPTag::Utf8 => {
            let length = u16::read_at(buf, pos)? as usize;
            pos += 2;
            let end = pos
                .checked_add(length)
                .ok_or_else(|| cfe("class file offset overflow"))?;
            let bytes = buf
                .get(pos..end)
                .ok_or_else(|| cfe(format!("unexpected end of class file at byte {}", pos)))?;
            let content = String::from_utf8(bytes.to_vec())
                .map_err(|e| cfe(format!("invalid UTF8 constant: {}", e)))?;
            cp.push(CpEntry::Utf8(content));
            pos = end;
        }
        CPTag::IntConst => {
            cp.push(CpEntry::IntConst(u32::read_at(buf, pos)? as i32));
            pos += 4;
        }
        CPTag::FloatConst => {
            cp.push(CpEntry::FloatConst(f32::from_bits(u32::read_at(buf, pos)?)));
            pos += 4;
        }
        CPTag::LongConst | CPTag::DoubleConst => {
            let hi = u32::read_at(buf, pos)? as u64;
            let lo = u32::read_at(buf, pos + 4)? as u64;
            let raw = hi << 32 | lo;
            cp.push(match tag {
                CPTag::LongConst => CpEntry::LongConst(raw as i64),
                _ => CpEntry::DoubleConst(f64::from_bits(raw)),
            });
            // an 8-byte constant takes two index slots; the second is never
            // addressed directly
            cp.push(CpEntry::Hole);
            pos += 8;
        }
        CPTag::ClassRef => {
            cp.push(CpEntry::ClassRef(u16::read_at(buf, pos)?));
            pos += 2;
        }
        CPTag::StringConst => {
            cp.push(CpEntry::StringConst(u16::read_at(buf, pos)?));
            pos += 2;
        }
        CPTag::MethodType => {
            cp.push(CpEntry::MethodType(u16::read_at(buf, pos)?));
            pos += 2;
        }
        CPTag::Module => {
            cp.push(CpEntry::Module(u16::read_at(buf, pos)?));
            pos += 2;
        }
        CPTag::Package => {
            cp.push(CpEntry::Package(u16::read_at(buf, pos)?));
            pos += 2;
        }
        CPTag::FieldRef | CPTag::MethodRef | CPTag::InterfaceRef => {
            let class = u16::read_at(buf, pos)?;
            let name_and_type = u16::read_at(buf, pos + 2)?;
            cp.push(match tag {
                CPTag::FieldRef => CpEntry::FieldRef {
                    class,
                    name_and_type,
                },
                CPTag::MethodRef => CpEntry::MethodRef {
                    class,
                    name_and_type,
                },
                _ => CpEntry::InterfaceRef {
                    class,
                    name_and_type,
                },
            });
            pos += 4;
        }
        CPTag::NameAndType => {
            let name = u16::read_at(buf, pos)?;
            let desc = u16::read_at(buf, pos + 2)?;
            cp.push(CpEntry::NameAndType { name, desc });
            pos += 4;
        }
        CPTag::Dynamic | CPTag::InvokeDynamic => {
            let bootstrap = u16::read_at(buf, pos)?;
            let name_and_type = u16::read_at(buf, pos + 2)?;
            cp.push(match tag {
                CPTag::Dynamic => CpEntry::Dynamic {
                    bootstrap,
                    name_and_type,
                },
                _ => CpEntry::InvokeDynamic {
                    bootstrap,
                    name_and_type,
                },
            });
            pos += 4;
        }
        CPTag::MethodHandle => {
            let kind = u8::read_at(buf, pos)?;
            let index = u16::read_at(buf, pos + 1)?;
            cp.push(CpEntry::MethodHandle { kind, index });
            pos += 3;
        }
    }

    Ok(pos)
}

fn parse_access_flags(buf: &[u8], pos: usize) -> Result<(AccessFlags, usize), VmError> {
    let raw = u16::read_at(buf, pos)?;
    trace!("class access flags: {:#06x}", raw);
    Ok((AccessFlags::decode(raw), pos + 2))
}

// The two-byte value is a CP index of a ClassRef entry, which in turn points
// to the UTF8 internal name, package path included: java/text/ParsePosition.
fn parse_class_name(buf: &[u8], pos: usize, cp: &CPool) -> Result<(String, usize), VmError> {
    let index = u16::read_at(buf, pos)?;
    let name = cp
        .class_name_at(index)
        .map_err(|e| cfe(format!("invalid entry for class name: {}", e)))?;
    if name.is_empty() {
        return Err(cfe("empty class name"));
    }
    trace!("class name: {}", name);
    Ok((name.to_string(), pos + 2))
}

// Same discipline as the class name. Every class except java/lang/Object has
// a superclass; only the root may carry index 0.
fn parse_superclass_name(
    buf: &[u8],
    pos: usize,
    cp: &CPool,
    class_name: &str,
) -> Result<(String, usize), VmError> {
    let index = u16::read_at(buf, pos)?;
    if index == 0 {
        if class_name == "java/lang/Object" {
            return Ok((String::new(), pos + 2));
        }
        return Err(cfe(format!("class {} has no superclass", class_name)));
    }

    let name = cp
        .class_name_at(index)
        .map_err(|e| cfe(format!("invalid entry for superclass name: {}", e)))?;
    if name.is_empty() && class_name != "java/lang/Object" {
        return Err(cfe("invalid empty string for superclass name"));
    }
    trace!("superclass name: {}", name);
    Ok((name.to_string(), pos + 2))
}

fn parse_interfaces(buf: &[u8], pos: usize) -> Result<(Vec<u16>, usize), VmError> {
    let count = u16::read_at(buf, pos)? as usize;
    let mut pos = pos + 2;
    let mut interfaces = Vec::with_capacity(count);
    for _ in 0..count {
        interfaces.push(u16::read_at(buf, pos)?);
        pos += 2;
    }
    Ok((interfaces, pos))
}

fn parse_members(buf: &[u8], pos: usize) -> Result<(Vec<MemberInfo>, usize), VmError> {
    let count = u16::read_at(buf, pos)? as usize;
    let mut pos = pos + 2;
    let mut members = Vec::with_capacity(count);
    for _ in 0..count {
        let access_flags = u16::read_at(buf, pos)?;
        let name_index = u16::read_at(buf, pos + 2)?;
        let descriptor_index = u16::read_at(buf, pos + 4)?;
        let (attributes, next) = parse_attributes(buf, pos + 6)?;
        members.push(MemberInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        });
        pos = next;
    }
    Ok((members, pos))
}

fn parse_attributes(buf: &[u8], pos: usize) -> Result<(Vec<Attr>, usize), VmError> {
    let count = u16::read_at(buf, pos)? as usize;
    let mut pos = pos + 2;
    let mut attributes = Vec::with_capacity(count);
    for _ in 0..count {
        let (attr, next) = read_attr(buf, pos)?;
        attributes.push(attr);
        pos = next;
    }
    Ok((attributes, pos))
}

/// Read one attribute at `pos`: name index, 4-byte length, raw payload.
/// Shared with the attribute decoders that run at class-load time.
pub(crate) fn read_attr(buf: &[u8], pos: usize) -> Result<(Attr, usize), VmError> {
    let name_index = u16::read_at(buf, pos)?;
    let length = u32::read_at(buf, pos + 2)? as usize;
    let start = pos + 6;
    let end = start
        .checked_add(length)
        .ok_or_else(|| cfe("class file offset overflow"))?;
    let content = buf
        .get(start..end)
        .ok_or_else(|| cfe(format!("unexpected end of class file at byte {}", start)))?
        .to_vec();
    Ok((Attr { name_index, content }, end))
}
