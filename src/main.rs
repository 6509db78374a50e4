use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::error::ErrorKind;
use clap::Parser as ClapParser;

use jlox::error::{LoxError, Result};
use jlox::interpreter::Interpreter;
use jlox::parser::Parser;
use jlox::resolver::Resolver;
use jlox::scanner;

// Exit codes per sysexits: https://man.openbsd.org/sysexits
const EX_USAGE: i32 = 64;
const EX_DATAERR: i32 = 65;
const EX_SOFTWARE: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(name = "jlox", version, about, long_about = None)]
pub struct Cli {
    /// Script to execute; starts the interactive prompt when omitted.
    script: Option<PathBuf>,
}

/// How a single run ended; the driver maps this to an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    Ok,
    StaticError,
    RuntimeError,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,

        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }

        Err(_) => {
            println!("Usage: jlox [script]");
            process::exit(EX_USAGE);
        }
    };

    let status: RunStatus = match args.script {
        Some(path) => run_file(&path)?,
        None => run_prompt()?,
    };

    match status {
        RunStatus::Ok => Ok(()),
        RunStatus::StaticError => process::exit(EX_DATAERR),
        RunStatus::RuntimeError => process::exit(EX_SOFTWARE),
    }
}

/// Execute a whole file as one program.
fn run_file(path: &Path) -> Result<RunStatus> {
    let mut buf: Vec<u8> = Vec::new();
    let mut reader: BufReader<File> = BufReader::new(File::open(path)?);
    reader.read_to_end(&mut buf)?;

    let source: String = String::from_utf8(buf).map_err(LoxError::from)?;

    let mut interpreter = Interpreter::new();

    Ok(run(&mut interpreter, &source))
}

/// Interactive prompt.  The interpreter (and with it the global frame)
/// persists across lines, so definitions accumulate; error state is
/// per-run, so a bad line doesn't poison the next.  EOF exits cleanly.
fn run_prompt() -> Result<RunStatus> {
    println!("Welcome to the jlox REPL.");
    println!("Exit with Control-D");

    let stdin = io::stdin();
    let mut interpreter = Interpreter::new();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }

        run(&mut interpreter, &line);
    }

    Ok(RunStatus::Ok)
}

/// One source → scan → parse → resolve → interpret pipeline.  Any static
/// error suppresses the later stages.
fn run(interpreter: &mut Interpreter, source: &str) -> RunStatus {
    let (tokens, scan_errors) = scanner::scan(source);

    for e in &scan_errors {
        eprintln!("{}", e);
    }

    // The parser still runs over whatever did tokenize; it can surface
    // further errors even when the scan was dirty.
    let (statements, parse_errors) = Parser::new(tokens).parse();

    for e in &parse_errors {
        eprintln!("{}", e);
    }

    if !scan_errors.is_empty() || !parse_errors.is_empty() {
        return RunStatus::StaticError;
    }

    if let Err(errors) = Resolver::new(interpreter).resolve(&statements) {
        for e in &errors {
            eprintln!("{}", e);
        }

        return RunStatus::StaticError;
    }

    match interpreter.interpret(&statements) {
        Ok(()) => RunStatus::Ok,

        Err(e) => {
            eprintln!("{}", e);

            RunStatus::RuntimeError
        }
    }
}
