//! The `bob` command line: REPL, interpreter, compiler,
//! disassembler, and VM runner, dispatched on flags and the
//! file extension.

use std::cell::RefCell;
use std::error::Error;
use std::fs;
use std::io::{self, stdout, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;

use structopt::StructOpt;

use bobscheme::{
    compile_code, deserialize, interpret_code, serialize, Interpreter, Source,
    Value, Vm,
};

#[derive(StructOpt, Debug)]
#[structopt(
    name = "Bob",
    bin_name = "bob",
    about = "A suite of implementations of the Scheme language"
)]
struct Cli {
    /// Compile a Scheme file to bytecode
    #[structopt(short, long)]
    compile: bool,

    /// Print a bytecode file (or compilation result) in human-readable form
    #[structopt(short, long)]
    disassemble: bool,

    /// Output filename for compilation
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// File to compile (-c) or run: `.scm` runs on the interpreter,
    /// anything else is treated as compiled bytecode and runs on the VM
    #[structopt(parse(from_os_str))]
    filename: Option<PathBuf>,
}

fn main() {
    if let Err(error) = run(Cli::from_args()) {
        eprintln!("{}", error);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if cli.disassemble && cli.output.is_some() {
        return Err("cannot specify --output when disassembling".into());
    }

    let filename = match &cli.filename {
        Some(filename) => filename,
        None => {
            if cli.compile {
                return Err("specify a source file to compile".into());
            }
            return repl();
        }
    };

    let is_scm = filename.extension().is_some_and(|ext| ext == "scm");
    if cli.compile {
        if !is_scm {
            return Err("can only compile .scm files".into());
        }
        compile_file(filename, cli.output, cli.disassemble)
    } else if cli.disassemble {
        if is_scm {
            return Err("can only disassemble bytecode files".into());
        }
        disassemble_file(filename)
    } else if is_scm {
        interpret_file(filename)
    } else {
        run_compiled(filename)
    }
}

/// `--compile FILE.scm [-o OUT]`, or with `--disassemble` print
/// the compiled code instead of writing anything.
fn compile_file(
    filename: &Path,
    output: Option<PathBuf>,
    disassemble: bool,
) -> Result<(), Box<dyn Error>> {
    let source = Source::file(filename)?;
    let code = compile_code(source)?;

    if disassemble {
        print!("{}", code);
        return Ok(());
    }

    let out_filename = output.unwrap_or_else(|| filename.with_extension("bobc"));
    fs::write(&out_filename, serialize(&code)?)?;
    println!("Output file created: {}", out_filename.display());
    Ok(())
}

fn disassemble_file(filename: &Path) -> Result<(), Box<dyn Error>> {
    let code = deserialize(&fs::read(filename)?)?;
    print!("{}", code);
    Ok(())
}

fn interpret_file(filename: &Path) -> Result<(), Box<dyn Error>> {
    let source = Source::file(filename)?;
    interpret_code(source, Rc::new(RefCell::new(stdout())))?;
    Ok(())
}

fn run_compiled(filename: &Path) -> Result<(), Box<dyn Error>> {
    let code = deserialize(&fs::read(filename)?)?;
    let mut vm = Vm::new();
    vm.run(Rc::new(code))?;
    Ok(())
}

/// The interactive interpreter: one expression per line.
/// Errors are reported and the session continues.
fn repl() -> Result<(), Box<dyn Error>> {
    let interp = Interpreter::new();
    println!("Interactive Bob interpreter. Type a Scheme expression or 'quit'");

    let stdin = io::stdin();
    loop {
        print!("[bob] >> ");
        stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line == "quit" {
            break;
        }

        let parsed = match bobscheme::compiler::parse_source(Source::repl(line)) {
            Ok(parsed) => parsed,
            Err(error) => {
                eprintln!("{}", error);
                continue;
            }
        };

        for expr in &parsed {
            match interp.interpret(expr) {
                Ok(Value::Null) => {}
                Ok(Value::Procedure(_) | Value::Builtin(_) | Value::Closure(_)) => {
                    println!(": <procedure object>");
                }
                Ok(value) => println!(": {}", value),
                Err(error) => {
                    eprintln!("{}", error);
                    break;
                }
            }
        }
    }
    Ok(())
}
