use crate::vm::class_loader::loader::ClassByteSource;
use crate::vm::class_loader::m_table::MTable;
use crate::vm::class_loader::meth_area::MethArea;
use crate::vm::class_loader::native;
use crate::vm::statics::{Static, StaticValue, Statics};

/// Highest Java release whose class files are accepted, and the raw
/// major-version number that release stamps into them.
pub const MAX_JAVA_VERSION: u16 = 17;
pub const MAX_JAVA_VERSION_RAW: u16 = 61;

/// Categorized process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Ok = 0,
    UnknownError = 1,
    JvmException = 2,
    AppException = 3,
}

/// The VM context: the process-wide stores, the byte provider and the
/// version gate. Passed by reference through the core rather than living in
/// ambient globals, so tests can run several VMs side by side.
pub struct VM {
    pub meth_area: MethArea,
    pub m_table: MTable,
    pub statics: Statics,
    pub byte_source: Box<dyn ClassByteSource>,
    pub max_java_version: u16,
    pub max_java_version_raw: u16,
    /// Test harnesses set this to observe fatal errors instead of exiting.
    pub intercept_shutdown: bool,
}

impl VM {
    pub fn init(byte_source: Box<dyn ClassByteSource>) -> VM {
        let vm = VM {
            meth_area: MethArea::new(),
            m_table: MTable::new(),
            statics: Statics::new(),
            byte_source,
            max_java_version: MAX_JAVA_VERSION,
            max_java_version_raw: MAX_JAVA_VERSION_RAW,
            intercept_shutdown: false,
        };

        // natives must be in place before any user thread starts
        native::init_native_methods(&vm);

        // assertions stay disabled until the launcher enables them
        vm.statics.add(
            "main.$assertionsDisabled",
            Static {
                kind: 'Z',
                type_desc: "Z".to_string(),
                value: StaticValue::Int(1),
                cp: None,
            },
        );

        vm
    }

    /// Terminate the process with a categorized exit code. Suppressed when a
    /// test harness intercepts shutdown; every fatal path also returns its
    /// error value for exactly that case.
    pub fn exit(&self, code: ExitCode) {
        if self.intercept_shutdown {
            return;
        }
        std::process::exit(code as i32);
    }
}
