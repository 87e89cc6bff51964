use std::env;

use tracing::{error, info};

use crate::vm::class_loader::loader::{load_class_from_name, DirByteSource};
use crate::vm::class_loader::resolve::fetch_method_and_cp;
use crate::vm::vm::{ExitCode, VM};

mod class_parser;
mod error;
mod helper;
#[cfg(test)]
mod testkit;
mod vm;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("usage: kaffeine <class-name> [class-dir]");
        return;
    }
    let class_dir = args.get(2).map(String::as_str).unwrap_or("./classes");
    let class_name = args[1].replace('.', "/");

    let vm = VM::init(Box::new(DirByteSource::new(class_dir)));

    let klass = match load_class_from_name(&vm, &class_name) {
        Ok(klass) => klass,
        Err(e) => {
            error!("could not load {}: {}", class_name, e);
            vm.exit(ExitCode::JvmException);
            return;
        }
    };
    info!("loaded {} at status {:?}", klass.name, klass.status());

    // execution belongs to the interpreter; resolving main() is as far as
    // class loading goes
    match fetch_method_and_cp(&vm, &class_name, "main", "([Ljava/lang/String;)V") {
        Ok(entry) => info!("resolved {}.main, kind '{}'", class_name, entry.tag()),
        Err(e) => {
            error!("{}", e);
            vm.exit(ExitCode::JvmException);
        }
    }
}
