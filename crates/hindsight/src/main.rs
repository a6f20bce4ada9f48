use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use hindsight_core::frame::{FrameKind, FrameSummary};
use hindsight_core::inspect::{InspectReport, Page};
use hindsight_core::types::ThreadInfo;
use hindsight_core::{Address, CoreTarget, HindsightError, InspectOptions, Inspector, Layout};
use hindsight_utils::{debug, init_logging, init_logging_with_level, info, LogFormat, LogLevel};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Postmortem inspector for V8 heaps and stacks in core dumps.
#[derive(Parser, Debug)]
#[command(name = "hindsight")]
#[command(version)]
#[command(about = "Postmortem inspector for V8 heaps and stacks in core dumps", long_about = None)]
struct Cli
{
    /// Core file to inspect
    core: PathBuf,
    /// Executable that produced the core (supplies layout constants and symbols)
    executable: PathBuf,
    /// Log level; overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct InspectArgs
{
    /// Heap address (hexadecimal, e.g. 0x3a2b4c5d6e71)
    address: String,
    /// Expand properties, elements and nested values
    #[arg(short = 'F', long)]
    detailed: bool,
    /// First element or property to print
    #[arg(long, default_value_t = 0)]
    current: usize,
    /// Number of elements or properties to print (0 = all)
    #[arg(long, default_value_t = 0)]
    limit: usize,
    /// Maximum characters of string content to print
    #[arg(short = 'l', long, default_value_t = 100)]
    length: usize,
    /// Print each object's map address
    #[arg(short = 'm', long)]
    map: bool,
    /// Print a function's source text
    #[arg(short = 's', long)]
    source: bool,
    /// Levels of nested objects to expand
    #[arg(long, default_value_t = 0)]
    depth: u32,
    /// Print the structured result as JSON
    #[arg(long)]
    json: bool,
}

impl InspectArgs
{
    fn options(&self) -> InspectOptions
    {
        InspectOptions {
            detailed: self.detailed || self.depth > 0,
            max_text_length: self.length,
            current: self.current,
            limit: self.limit,
            include_map_address: self.map,
            include_source_text: self.source,
            depth: self.depth,
            ..InspectOptions::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Print the value at a heap address
    Inspect(InspectArgs),
    /// List the threads captured in the core
    Threads
    {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a thread's stack with JavaScript frames decoded
    Backtrace
    {
        /// Thread index from `threads`
        #[arg(short, long, default_value_t = 0)]
        thread: usize,
        /// First frame to print
        #[arg(long, default_value_t = 0)]
        current: usize,
        /// Number of frames to print (0 = all)
        #[arg(long, default_value_t = 0)]
        limit: usize,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the short type name of the value at an address
    Type
    {
        address: String,
    },
    /// List the named property keys of an object
    Keys
    {
        address: String,
    },
    /// Write a string's complete, untruncated value to a file
    ExportString
    {
        address: String,
        file: PathBuf,
    },
}

fn main() -> ExitCode
{
    let cli = Cli::parse();

    let logging = match cli.log_level {
        Some(level) => init_logging_with_level(level, LogFormat::Pretty),
        None => init_logging(),
    };
    let _guard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<ExitCode>
{
    info!(core = %cli.core.display(), executable = %cli.executable.display(), "opening target");
    let target = CoreTarget::open(&cli.core, &cli.executable)?;
    let layout = Arc::new(Layout::load(&target));
    debug!(constants = target.executable().constant_count(), "layout loaded");
    let inspector = Inspector::new(&target, &target, layout);

    match cli.command {
        Commands::Inspect(args) => inspect(&inspector, &args),
        Commands::Threads { json } => {
            let threads = inspector.threads()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&threads)?);
            } else {
                for thread in &threads {
                    println!("{}", thread_line(thread));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Backtrace {
            thread,
            current,
            limit,
            json,
        } => {
            let page = inspector.backtrace(thread, current, limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print_backtrace(thread, &page);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Type { address } => {
            println!("{}", inspector.type_name(parse_address(&address)?)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Keys { address } => {
            for key in inspector.keys(parse_address(&address)?)? {
                println!("{key}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::ExportString { address, file } => {
            let text = inspector.string_value(parse_address(&address)?)?;
            fs::write(&file, text.as_bytes())?;
            println!("Wrote {} bytes to {}", text.len(), file.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn parse_address(text: &str) -> Result<Address, HindsightError>
{
    text.parse()
}

fn inspect(inspector: &Inspector<'_>, args: &InspectArgs) -> CliResult<ExitCode>
{
    let address = parse_address(&args.address)?;
    let report = inspector.report(address, &args.options());
    match (&report, args.json) {
        (InspectReport::Ok { result }, false) => {
            println!("{result}");
            Ok(ExitCode::SUCCESS)
        }
        (InspectReport::Ok { .. }, true) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        (InspectReport::Failed { .. }, _) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn thread_line(thread: &ThreadInfo) -> String
{
    let mut line = format!("* thread #{}: tid = {}, {}", thread.index, thread.id, thread.pc);
    if let Some(signal) = thread.stop_signal {
        let _ = write!(line, ", stop reason = signal {signal}");
    }
    line
}

fn frame_line(frame: &FrameSummary) -> String
{
    let mut line = format!("frame #{}: {}", frame.frame_index, frame.pc);
    match frame.kind {
        FrameKind::Native => {
            if let Some(module) = &frame.module {
                line.push(' ');
                line.push_str(module.rsplit('/').next().unwrap_or(module));
                line.push('`');
            } else {
                line.push(' ');
            }
            line.push_str(&frame.function);
            if let Some(unit) = &frame.compile_unit {
                let _ = write!(line, " at {unit}");
            }
        }
        FrameKind::Js => {
            line.push(' ');
            line.push_str(&frame.function);
            if let (Some(receiver), Some(arguments)) = (&frame.context, &frame.arguments) {
                let _ = write!(line, "(this={receiver}");
                for argument in arguments {
                    let _ = write!(line, ", {argument}");
                }
                line.push(')');
            }
            if let Some(location) = &frame.line {
                let _ = write!(line, " at {location}");
            }
            if let Some(function) = frame.func_addr {
                let _ = write!(line, " fn={function}");
            }
        }
    }
    line
}

fn print_backtrace(thread: usize, page: &Page<FrameSummary>)
{
    println!(" * thread #{thread}");
    for (i, frame) in page.items.iter().enumerate() {
        let marker = if i == 0 && frame.frame_index == 0 { "*" } else { " " };
        println!("  {marker} {}", frame_line(frame));
    }
    println!("frame_end: {}, frames_left: {}", page.next, page.remaining_count);
}
