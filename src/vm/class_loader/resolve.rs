use std::sync::Arc;

use tracing::error;

use crate::error::VmError;
use crate::vm::class::class::ClassStatus;
use crate::vm::class_loader::loader::load_class_from_name;
use crate::vm::class_loader::m_table::{JmEntry, MtEntry};
use crate::vm::vm::{ExitCode, VM};

/// Resolve `(class, name, descriptor)` to an invocable method entry.
///
/// The method table is consulted first, which serves both previously cached
/// bytecode methods and the pre-registered natives. On a miss the declaring
/// class is searched, ascending the superclass chain up to java/lang/Object,
/// and the result is cached under the fully-qualified signature of the class
/// the caller asked about. The one exception is main(): if the starting
/// class does not declare it, the superclasses are not searched and the
/// failure is fatal.
pub fn fetch_method_and_cp(
    vm: &VM,
    class_name: &str,
    meth_name: &str,
    meth_type: &str,
) -> Result<MtEntry, VmError> {
    // has the class been loaded? If not, do it now.
    if vm.meth_area.fetch(class_name).is_none() {
        if let Err(e) = load_class_from_name(vm, class_name) {
            if meth_name == "main" {
                // the starting class is always loaded first, so if main()
                // isn't found right away, just bail
                no_main_error(class_name);
                vm.exit(ExitCode::JvmException);
                return Err(VmError::NoMainMethod(class_name.to_string()));
            }
            error!(
                "fetch_method_and_cp: loading of class {} failed: {}",
                class_name, e
            );
            vm.exit(ExitCode::JvmException);
            return Err(e); // dummy return needed for tests
        }
    }

    let meth_fqn = format!("{}.{}{}", class_name, meth_name, meth_type);
    if let Some(entry) = vm.m_table.fetch(&meth_fqn) {
        return Ok(entry);
    }

    // not cached yet: find the declaring class and put it there
    let signature = format!("{}{}", meth_name, meth_type);
    let mut current = class_name.to_string();
    loop {
        let k = match vm.meth_area.wait_for_status(&current, ClassStatus::Linked) {
            Ok(k) => k,
            Err(e) => {
                error!("fetch_method_and_cp: {}", e);
                vm.exit(ExitCode::JvmException);
                return Err(e); // dummy return needed for tests
            }
        };
        if k.loader.is_empty() {
            let msg = format!("fetch_method_and_cp: null loader in class {}", current);
            error!("{}", msg);
            return Err(VmError::Internal(msg));
        }
        let data = match k.data() {
            Some(data) => data,
            None => {
                return Err(VmError::Internal(format!(
                    "class {} is linked but carries no data",
                    current
                )))
            }
        };

        if let Some(&index) = data.method_table.get(&signature) {
            let method = &data.methods[index];
            let entry = MtEntry::Bytecode(Arc::new(JmEntry {
                access_flags: method.access_flags,
                max_stack: method.code_attr.max_stack,
                max_locals: method.code_attr.max_locals,
                code: method.code_attr.code.clone(),
                exceptions: method.code_attr.exceptions.clone(),
                attribs: method.code_attr.attributes.clone(),
                params: method.parameters.clone(),
                deprecated: method.deprecated,
                cp: Arc::clone(&data.cp),
            }));
            vm.m_table.insert(&meth_fqn, entry.clone());
            return Ok(entry);
        }

        // main() never inherits: report it the way the JDK does, and stop
        if meth_name == "main" {
            no_main_error(class_name);
            vm.exit(ExitCode::JvmException);
            return Err(VmError::NoMainMethod(class_name.to_string()));
        }

        if current == "java/lang/Object" || data.superclass.is_empty() {
            break;
        }
        let superclass = data.superclass.clone();
        load_class_from_name(vm, &superclass)?;
        current = superclass;
    }

    Err(VmError::NoSuchMethod(format!(
        "found class {}, but it did not contain method: {}{}",
        class_name, meth_name, meth_type
    )))
}

/// Scripted diagnostic for a missing main(), word for word what the JDK
/// launcher prints.
pub fn no_main_error(class_name: &str) {
    error!(
        "Error: main() method not found in class {}\n\
         Please define the main method as:\n   \
         public static void main(String[] args)",
        class_name
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use crate::testkit::{class_bytes, test_vm, test_vm_with_counter};
    use crate::vm::class_loader::m_table::{GmEntry, NativeValue};

    const MAIN_DESC: &str = "([Ljava/lang/String;)V";

    #[test]
    fn declared_main_resolves_to_a_bytecode_entry() {
        let vm = test_vm(&[(
            "Foo",
            class_bytes("Foo", "java/lang/Object", &[(0x0009, "main", MAIN_DESC)]),
        )]);

        let entry = fetch_method_and_cp(&vm, "Foo", "main", MAIN_DESC).unwrap();
        assert_eq!(entry.tag(), 'J');
        match entry {
            MtEntry::Bytecode(jme) => {
                assert_eq!(jme.access_flags, 0x0009);
                assert_eq!(jme.max_stack, 1);
                assert_eq!(jme.code, vec![0xb1]);
            }
            other => panic!("expected a bytecode entry, got {:?}", other),
        }
    }

    #[test]
    fn inherited_method_is_found_in_the_superclass() {
        let vm = test_vm(&[
            ("Child", class_bytes("Child", "Parent", &[])),
            (
                "Parent",
                class_bytes(
                    "Parent",
                    "java/lang/Object",
                    &[(0x0001, "toString", "()Ljava/lang/String;")],
                ),
            ),
        ]);

        let entry =
            fetch_method_and_cp(&vm, "Child", "toString", "()Ljava/lang/String;").unwrap();
        assert_eq!(entry.tag(), 'J');

        // cached under the receiver class, not the declaring one
        assert!(vm
            .m_table
            .fetch("Child.toString()Ljava/lang/String;")
            .is_some());

        let owner = vm.meth_area.fetch("Parent").unwrap();
        assert!(owner.status() >= ClassStatus::Linked);
    }

    #[test]
    fn second_fetch_is_served_from_the_cache() {
        let (vm, hits) = test_vm_with_counter(&[(
            "Foo",
            class_bytes("Foo", "java/lang/Object", &[(0x0009, "run", "()V")]),
        )]);

        let first = fetch_method_and_cp(&vm, "Foo", "run", "()V").unwrap();
        let after_first = hits.load(Ordering::Relaxed);
        let second = fetch_method_and_cp(&vm, "Foo", "run", "()V").unwrap();

        assert_eq!(hits.load(Ordering::Relaxed), after_first);
        match (first, second) {
            (MtEntry::Bytecode(a), MtEntry::Bytecode(b)) => assert!(Arc::ptr_eq(&a, &b)),
            other => panic!("expected two bytecode entries, got {:?}", other),
        }
    }

    #[test]
    fn missing_main_does_not_search_superclasses() {
        // Parent declares main, but main() never inherits
        let vm = test_vm(&[
            ("Child", class_bytes("Child", "Parent", &[])),
            (
                "Parent",
                class_bytes("Parent", "java/lang/Object", &[(0x0009, "main", MAIN_DESC)]),
            ),
        ]);

        match fetch_method_and_cp(&vm, "Child", "main", MAIN_DESC) {
            Err(VmError::NoMainMethod(name)) => assert_eq!(name, "Child"),
            other => panic!("expected the no-main failure, got {:?}", other),
        }
        assert!(vm.m_table.fetch(&format!("Child.main{}", MAIN_DESC)).is_none());
    }

    #[test]
    fn missing_main_in_an_unloadable_class_is_the_no_main_failure() {
        let vm = test_vm(&[]);
        match fetch_method_and_cp(&vm, "Ghost", "main", MAIN_DESC) {
            Err(VmError::NoMainMethod(name)) => assert_eq!(name, "Ghost"),
            other => panic!("expected the no-main failure, got {:?}", other),
        }
    }

    #[test]
    fn exhausted_chain_is_no_such_method() {
        let vm = test_vm(&[
            ("Child", class_bytes("Child", "Parent", &[])),
            ("Parent", class_bytes("Parent", "java/lang/Object", &[])),
        ]);

        match fetch_method_and_cp(&vm, "Child", "froz", "()V") {
            Err(VmError::NoSuchMethod(msg)) => assert!(msg.contains("froz"), "{}", msg),
            other => panic!("expected a no-such-method failure, got {:?}", other),
        }
    }

    #[test]
    fn unloadable_class_fails_resolution() {
        let vm = test_vm(&[]);
        assert!(matches!(
            fetch_method_and_cp(&vm, "Ghost", "run", "()V"),
            Err(VmError::ClassNotFound(_))
        ));
    }

    #[test]
    fn natives_take_precedence_over_declared_bytecode() {
        fn probe(_vm: &VM, _args: &[NativeValue]) -> Result<NativeValue, VmError> {
            Ok(NativeValue::Void)
        }

        let vm = test_vm(&[(
            "Foo",
            class_bytes("Foo", "java/lang/Object", &[(0x0001, "run", "()V")]),
        )]);
        vm.m_table.insert(
            "Foo.run()V",
            MtEntry::Native(GmEntry {
                param_slots: 0,
                func: probe,
            }),
        );

        let entry = fetch_method_and_cp(&vm, "Foo", "run", "()V").unwrap();
        assert_eq!(entry.tag(), 'G');
    }

    #[test]
    fn registered_native_resolves_through_the_table() {
        let vm = test_vm(&[(
            "java/lang/Class",
            class_bytes("java/lang/Class", "java/lang/Object", &[]),
        )]);

        let entry =
            fetch_method_and_cp(&vm, "java/lang/Class", "registerNatives", "()V").unwrap();
        assert_eq!(entry.tag(), 'G');
    }
}
