use tracing::error;

use crate::class_parser::constants::CPTag;
use crate::error::{cfe, VmError};

/// One slot of the constant pool. Entries reference each other by 1-based
/// slot index only; an index is validated against the expected tag when it
/// is dereferenced, never during parse.
#[derive(Debug, Clone, PartialEq)]
pub enum CpEntry {
    Utf8(String),
    IntConst(i32),
    FloatConst(f32),
    LongConst(i64),
    DoubleConst(f64),
    /// Index of the Utf8 entry holding the class's internal name.
    ClassRef(u16),
    StringConst(u16),
    FieldRef { class: u16, name_and_type: u16 },
    MethodRef { class: u16, name_and_type: u16 },
    InterfaceRef { class: u16, name_and_type: u16 },
    NameAndType { name: u16, desc: u16 },
    MethodHandle { kind: u8, index: u16 },
    MethodType(u16),
    Dynamic { bootstrap: u16, name_and_type: u16 },
    InvokeDynamic { bootstrap: u16, name_and_type: u16 },
    Module(u16),
    Package(u16),
    /// Slot 0, and the unaddressable slot after a long or double.
    Hole,
}

impl CpEntry {
    pub fn tag(&self) -> Option<CPTag> {
        match self {
            CpEntry::Utf8(_) => Some(CPTag::Utf8),
            CpEntry::IntConst(_) => Some(CPTag::IntConst),
            CpEntry::FloatConst(_) => Some(CPTag::FloatConst),
            CpEntry::LongConst(_) => Some(CPTag::LongConst),
            CpEntry::DoubleConst(_) => Some(CPTag::DoubleConst),
            CpEntry::ClassRef(_) => Some(CPTag::ClassRef),
            CpEntry::StringConst(_) => Some(CPTag::StringConst),
            CpEntry::FieldRef { .. } => Some(CPTag::FieldRef),
            CpEntry::MethodRef { .. } => Some(CPTag::MethodRef),
            CpEntry::InterfaceRef { .. } => Some(CPTag::InterfaceRef),
            CpEntry::NameAndType { .. } => Some(CPTag::NameAndType),
            CpEntry::MethodHandle { .. } => Some(CPTag::MethodHandle),
            CpEntry::MethodType(_) => Some(CPTag::MethodType),
            CpEntry::Dynamic { .. } => Some(CPTag::Dynamic),
            CpEntry::InvokeDynamic { .. } => Some(CPTag::InvokeDynamic),
            CpEntry::Module(_) => Some(CPTag::Module),
            CpEntry::Package(_) => Some(CPTag::Package),
            CpEntry::Hole => None,
        }
    }
}

/// The constant pool of one class. Slot 0 is reserved, so external 1-based
/// indices address the backing vector directly.
#[derive(Debug, PartialEq)]
pub struct CPool {
    entries: Vec<CpEntry>,
}

impl CPool {
    pub fn new() -> CPool {
        CPool {
            entries: vec![CpEntry::Hole],
        }
    }

    pub fn push(&mut self, entry: CpEntry) {
        self.entries.push(entry);
    }

    /// Number of index slots, including the reserved slot 0. Matches the
    /// on-disk constant-pool count once parsing is complete.
    pub fn slot_count(&self) -> u16 {
        self.entries.len() as u16
    }

    pub fn entry(&self, index: u16) -> Result<&CpEntry, VmError> {
        if index < 1 || index as usize >= self.entries.len() {
            return Err(cfe(format!(
                "constant pool index {} is out of bounds (1, {})",
                index,
                self.entries.len()
            )));
        }
        Ok(&self.entries[index as usize])
    }

    fn expect(&self, index: u16, tag: CPTag) -> Result<&CpEntry, VmError> {
        let entry = self.entry(index)?;
        if entry.tag() == Some(tag) {
            Ok(entry)
        } else {
            Err(cfe(format!(
                "constant pool entry {} is {:?}, expected {:?}",
                index,
                entry.tag(),
                tag
            )))
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str, VmError> {
        match self.expect(index, CPTag::Utf8)? {
            CpEntry::Utf8(content) => Ok(content),
            _ => unreachable!(),
        }
    }

    /// Resolve a ClassRef slot to the internal class name it points at.
    pub fn class_name_at(&self, index: u16) -> Result<&str, VmError> {
        match self.expect(index, CPTag::ClassRef)? {
            CpEntry::ClassRef(utf8_index) => self.utf8(*utf8_index),
            _ => unreachable!(),
        }
    }

    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str), VmError> {
        match self.expect(index, CPTag::NameAndType)? {
            CpEntry::NameAndType { name, desc } => Ok((self.utf8(*name)?, self.utf8(*desc)?)),
            _ => unreachable!(),
        }
    }

    /// Lossy variant exposed to the interpreter: logs and returns an empty
    /// string when the index fails validation.
    pub fn fetch_utf8(&self, index: u16) -> String {
        match self.utf8(index) {
            Ok(content) => content.to_string(),
            Err(e) => {
                error!("fetch_utf8: {}", e);
                String::new()
            }
        }
    }

    /// Verify every cross-reference stored in the pool: each index must land
    /// inside the pool on an entry of the expected tag.
    pub fn format_check(&self) -> Result<(), VmError> {
        for entry in &self.entries {
            match entry {
                CpEntry::ClassRef(index)
                | CpEntry::StringConst(index)
                | CpEntry::MethodType(index)
                | CpEntry::Module(index)
                | CpEntry::Package(index) => {
                    self.expect(*index, CPTag::Utf8)?;
                }
                CpEntry::FieldRef {
                    class,
                    name_and_type,
                }
                | CpEntry::MethodRef {
                    class,
                    name_and_type,
                }
                | CpEntry::InterfaceRef {
                    class,
                    name_and_type,
                } => {
                    self.expect(*class, CPTag::ClassRef)?;
                    self.expect(*name_and_type, CPTag::NameAndType)?;
                }
                CpEntry::NameAndType { name, desc } => {
                    self.expect(*name, CPTag::Utf8)?;
                    self.expect(*desc, CPTag::Utf8)?;
                }
                CpEntry::MethodHandle { index, .. } => {
                    // the target tag depends on the reference kind; only the
                    // range is checked here
                    self.entry(*index)?;
                }
                CpEntry::Dynamic { name_and_type, .. }
                | CpEntry::InvokeDynamic { name_and_type, .. } => {
                    self.expect(*name_and_type, CPTag::NameAndType)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}
