use std::path::{Path, PathBuf};

use ja_core::config::{parse_metadata, Config};
use ja_core::logging;
use ja_core::{Agent, Job, Machine};
use ja_unit::UnitFile;

const EXIT_NOT_ADMISSIBLE: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn print_help() {
    println!("jobagent — decide whether this machine may run a unit");
    println!();
    println!("Usage:");
    println!("  jobagent [options] <unit-file>...");
    println!();
    println!("Options:");
    println!("  --config <path>       Config file (default: ~/.config/jobagent/config.toml)");
    println!("  --boot-id <id>        Use this boot id instead of the configured one");
    println!("  --metadata <k=v,...>  Add machine metadata, overriding configured keys");
    println!("  --dump                Print the parsed contents of each unit as JSON");
    println!("  --version             Print version");
    println!("  --help                Print this help");
    println!();
    println!("Exit status: 0 if every unit is admissible, 1 if any is not, 2 on error.");
}

#[derive(Debug, Default)]
struct Options {
    config: Option<PathBuf>,
    boot_id: Option<String>,
    metadata: Option<String>,
    dump: bool,
    units: Vec<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut opts = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--config" => opts.config = Some(PathBuf::from(value("--config")?)),
            "--boot-id" => opts.boot_id = Some(value("--boot-id")?),
            "--metadata" => opts.metadata = Some(value("--metadata")?),
            "--dump" => opts.dump = true,
            flag if flag.starts_with('-') => return Err(format!("unknown option: {flag}")),
            path => opts.units.push(PathBuf::from(path)),
        }
    }

    if opts.units.is_empty() {
        return Err("no unit files given".to_string());
    }
    Ok(opts)
}

/// Job name for a unit file: its file name.
fn job_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("jobagent {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let opts = match parse_args(&args) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("hint: run `jobagent --help` for usage");
            std::process::exit(EXIT_USAGE);
        }
    };

    let mut config = match &opts.config {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(EXIT_USAGE);
            }
        },
        None => Config::load_or_default(),
    };

    if let Some(id) = opts.boot_id {
        config.machine.boot_id = Some(id);
    }
    if let Some(metadata) = &opts.metadata {
        config.machine.metadata.extend(parse_metadata(metadata));
    }

    logging::init(&config.log);

    let machine = Machine::from_config(&config.machine);
    tracing::debug!(
        boot_id = machine.boot_id(),
        metadata = ?machine.metadata(),
        "machine identity"
    );
    let agent = Agent::new(machine);

    let mut code = 0;
    for path in &opts.units {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                eprintln!("error: failed to read {}: {e}", path.display());
                code = EXIT_USAGE;
                continue;
            }
        };
        let job = Job::new(job_name(path), UnitFile::new(raw));

        if opts.dump {
            match serde_json::to_string_pretty(job.unit().contents()) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("error: failed to encode {}: {e}", job.name()),
            }
        }

        if agent.able_to_run(&job) {
            println!("{}: admissible", job.name());
        } else {
            println!("{}: not admissible", job.name());
            if code == 0 {
                code = EXIT_NOT_ADMISSIBLE;
            }
        }
    }

    std::process::exit(code);
}
