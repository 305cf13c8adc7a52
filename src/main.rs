use clap::Parser;
use gjson::{from_json_text, GJsonPath, Value};
use std::io::{self, Read};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// A simple way to filter and extract data from JSON-like data structures.
#[derive(Debug, Parser)]
#[command(name = "gjson", version)]
struct Args {
    /// Treat the input as JSON Lines, parse each line and apply the query to
    /// each line.
    #[arg(short, long)]
    lines: bool,

    /// Verbosity level. By default on error no output will be printed. Use
    /// -v to get error messages on stderr and -vv for debug detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Input JSON file to query. Reads from stdin if the argument is missing
    /// or set to "-".
    #[arg(value_name = "FILE")]
    first: String,

    /// A GJSON query to apply to the input data.
    #[arg(value_name = "QUERY")]
    second: Option<String>,
}

impl Args {
    /// The file argument is optional but positional, so with a single
    /// operand it carries the query.
    fn file_and_query(&self) -> (Option<&str>, &str) {
        match &self.second {
            Some(query) => (Some(self.first.as_str()), query.as_str()),
            None => (None, self.first.as_str()),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    ExitCode::from(run(&args))
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::OFF,
        1 => LevelFilter::ERROR,
        _ => LevelFilter::DEBUG,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(args: &Args) -> u8 {
    let (file, query) = args.file_and_query();

    let input = match read_input(file) {
        Ok(input) => input,
        Err(e) => {
            error!("{e}");
            return 1;
        }
    };

    // Without --lines a leading `..` means the input itself is JSON Lines:
    // the CLI frames the lines into one array and queries that.
    let (query, framed) = match query.strip_prefix("..") {
        Some(rest) if !args.lines => (rest, true),
        _ => (query, false),
    };

    let path = match GJsonPath::parse(query) {
        Ok(path) => path,
        Err(e) => {
            error!("{e}");
            return 2;
        }
    };

    if args.lines {
        run_lines(&path, &input)
    } else {
        run_whole(&path, &input, framed)
    }
}

fn read_input(file: Option<&str>) -> io::Result<String> {
    match file {
        None | Some("-") => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
        Some(file) => std::fs::read_to_string(file),
    }
}

/// Applies the query to each non-blank input line independently; failing
/// lines are skipped and reported through the exit code.
fn run_lines(path: &GJsonPath, input: &str) -> u8 {
    let mut exit_code = 0;
    for line in input.lines().filter(|line| !line.trim().is_empty()) {
        let value = match from_json_text(line) {
            Ok(value) => value,
            Err(e) => {
                error!("invalid JSON line: {e}");
                exit_code = 1;
                continue;
            }
        };
        match path.render(&value) {
            Ok(result) => println!("{result}"),
            Err(e) => {
                error!("{e}");
                exit_code = 1;
            }
        }
    }
    exit_code
}

fn run_whole(path: &GJsonPath, input: &str, framed: bool) -> u8 {
    let value = if framed {
        let mut values = Vec::new();
        for line in input.lines().filter(|line| !line.trim().is_empty()) {
            match from_json_text(line) {
                Ok(value) => values.push(value),
                Err(e) => {
                    error!("invalid JSON line: {e}");
                    return 1;
                }
            }
        }
        debug!(lines = values.len(), "framed JSON Lines input");
        Value::Array(values)
    } else {
        match from_json_text(input) {
            Ok(value) => value,
            Err(e) => {
                error!("invalid JSON input: {e}");
                return 1;
            }
        }
    };

    match path.render(&value) {
        Ok(result) => {
            println!("{result}");
            0
        }
        Err(e) => {
            error!("{e}");
            1
        }
    }
}
