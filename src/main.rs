//! CLI entry point for shiori
//!
//! Plays a story directory in the terminal.

use shiori::cli::play::{PlayOptions, run_play};
use shiori::config::PlayerConfig;
use shiori::logging::{LogConfig, StderrLogger};
use std::path::PathBuf;
use std::process;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = &args[1];

    match command.as_str() {
        "play" => {
            let Some(data_dir) = args.get(2).filter(|arg| !arg.starts_with("--")) else {
                eprintln!("Error: Missing story directory");
                eprintln!();
                print_usage();
                process::exit(1);
            };
            let mut options = PlayOptions::default();
            let mut config_file = None;
            let mut rest = args[3..].iter();
            while let Some(flag) = rest.next() {
                match flag.as_str() {
                    "--auto" => options.auto = true,
                    "--debug" => options.debug = true,
                    "--config" => match rest.next() {
                        Some(path) => config_file = Some(PathBuf::from(path)),
                        None => {
                            eprintln!("Error: --config needs a file path");
                            process::exit(1);
                        }
                    },
                    other => {
                        eprintln!("Error: Unknown option '{}'", other);
                        eprintln!();
                        print_usage();
                        process::exit(1);
                    }
                }
            }
            run(PathBuf::from(data_dir), config_file, options).await;
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Error: Unknown command '{}'", command);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("shiori - Visual Novel Story Player");
    println!();
    println!("USAGE:");
    println!("    shiori play <data-dir> [--auto] [--debug] [--config <file>]");
    println!();
    println!("COMMANDS:");
    println!("    play <data-dir>    Play the story whose manifest and events live in <data-dir>");
    println!("    --help, -h         Show this help message");
    println!();
    println!("OPTIONS:");
    println!("    --auto             Start with auto-play on");
    println!("    --debug            Show debug information (event, node, choices)");
    println!("    --config <file>    Read settings from a JSON file");
    println!();
    println!("ENVIRONMENT:");
    println!("    SHIORI_LOG              Log filter, e.g. debug:playback,storage");
    println!("    SHIORI_SAVE_DIR         Where saves are written");
    println!("    SHIORI_MANIFEST         Manifest file name inside <data-dir>");
    println!("    SHIORI_SLOT_MIRROR_URL  Endpoint receiving the save list");
    println!("    SHIORI_TEXT_SPEED       Text speed in ms per character");
}

async fn run(data_dir: PathBuf, config_file: Option<PathBuf>, options: PlayOptions) {
    let log_config = if options.debug {
        LogConfig::debug()
    } else {
        LogConfig::from_env()
    };
    StderrLogger::install(log_config);

    let mut config = match config_file {
        Some(path) => match PlayerConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Error: Failed to read config '{}'", path.display());
                eprintln!("Reason: {:#}", err);
                process::exit(1);
            }
        },
        None => PlayerConfig::default(),
    };
    config.apply_env(|name| std::env::var(name).ok());
    config.data_dir = data_dir;

    if let Err(err) = run_play(config, options).await {
        eprintln!("Error: Player mode failed");
        eprintln!("Reason: {:#}", err);
        process::exit(1);
    }
}
