use std::sync::Arc;

use tracing::error;

use crate::error::VmError;
use crate::vm::class::class::Klass;
use crate::vm::class_loader::loader::load_class_from_name;
use crate::vm::class_loader::m_table::{GmEntry, MtEntry, NativeValue};
use crate::vm::vm::{ExitCode, VM};

/// Install the native method stubs into the method table. Runs during
/// VM::init, before any user thread exists; once registered, a native entry
/// is never displaced by a bytecode method with the same signature.
pub fn init_native_methods(vm: &VM) {
    vm.m_table.insert(
        "java/lang/Class.getPrimitiveClass(Ljava/lang/String;)Ljava/lang/Class;",
        MtEntry::Native(GmEntry {
            param_slots: 1,
            func: get_primitive_class,
        }),
    );

    vm.m_table.insert(
        "java/lang/Class.desiredAssertionStatus()Z",
        MtEntry::Native(GmEntry {
            param_slots: 0,
            func: get_assertion_status,
        }),
    );

    vm.m_table.insert(
        "java/lang/Class.desiredAssertionStatus0()Z",
        MtEntry::Native(GmEntry {
            param_slots: 1,
            func: get_assertion_status,
        }),
    );

    vm.m_table.insert(
        "java/lang/Class.registerNatives()V",
        MtEntry::Native(GmEntry {
            param_slots: 0,
            func: just_return,
        }),
    );
}

fn just_return(_vm: &VM, _args: &[NativeValue]) -> Result<NativeValue, VmError> {
    Ok(NativeValue::Void)
}

/// Map a one-word primitive descriptor to its wrapper class, loading the
/// wrapper on demand. Mirrors what the OpenJDK runtime hands back.
pub fn get_primitive_class(vm: &VM, args: &[NativeValue]) -> Result<NativeValue, VmError> {
    let word = match args.first() {
        Some(NativeValue::Str(s)) => s.as_str(),
        other => {
            return Err(VmError::Internal(format!(
                "get_primitive_class expects a string argument, got {:?}",
                other
            )))
        }
    };

    let wrapper = match word {
        "boolean" => "java/lang/Boolean",
        "byte" => "java/lang/Byte",
        "char" => "java/lang/Character",
        "double" => "java/lang/Double",
        "float" => "java/lang/Float",
        "int" => "java/lang/Integer",
        "long" => "java/lang/Long",
        "short" => "java/lang/Short",
        "void" => "java/lang/Void",
        _ => {
            let msg = format!("get_primitive_class does not handle: {}", word);
            error!("{}", msg);
            return Err(VmError::Internal(msg));
        }
    };

    let klass = simple_class_load_by_name(vm, wrapper)?;
    Ok(NativeValue::Class(klass))
}

// Method-area cache check first, full load only on a miss.
fn simple_class_load_by_name(vm: &VM, class_name: &str) -> Result<Arc<Klass>, VmError> {
    if let Some(klass) = vm.meth_area.fetch(class_name) {
        return Ok(klass);
    }

    match load_class_from_name(vm, class_name) {
        Ok(klass) => Ok(klass),
        Err(e) => {
            error!(
                "get_primitive_class: failed to load class {}: {}",
                class_name, e
            );
            vm.exit(ExitCode::AppException);
            Err(e) // dummy return needed for tests
        }
    }
}

/// Whether assertions are enabled: `1 − statics["main.$assertionsDisabled"]`.
/// Statics are preloaded before any native can run, so the latest
/// assertion-enabled status is always present.
pub fn get_assertion_status(vm: &VM, _args: &[NativeValue]) -> Result<NativeValue, VmError> {
    let disabled = vm
        .statics
        .int_value("main.$assertionsDisabled")
        .ok_or_else(|| {
            VmError::Internal("main.$assertionsDisabled is missing from the statics store".to_string())
        })?;
    Ok(NativeValue::Int(1 - disabled))
}
