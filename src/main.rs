use std::env;
use std::fs;
use std::path::Path;
use std::process;

use mailsift::analysis::detector::{Detector, DetectorConfig};
use mailsift::diagnostics;
use mailsift::language::parser::parse_source;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        usage_and_exit();
    }

    let command = &args[1];
    let filename = &args[2];

    if !filename.ends_with(".php") {
        eprintln!("Invalid file extension. Only .php files are allowed.");
        process::exit(1);
    }

    let mut config = DetectorConfig::default();
    let mut index = 3;
    while index < args.len() {
        match args[index].as_str() {
            "--target" => config.target_function = flag_value(&args, index, "--target"),
            "--define" => config.define_builtin = flag_value(&args, index, "--define"),
            other => {
                eprintln!("Unknown option '{}'.", other);
                usage_and_exit();
            }
        }
        index += 2;
    }

    let path = Path::new(filename);
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            diagnostics::report_io_error(path, &err);
            process::exit(1);
        }
    };

    let parsed = parse_source(&source);
    diagnostics::emit_syntax_errors(path, &source, &parsed.errors);

    match command.as_str() {
        "detect" => {
            let detector = Detector::with_config(config);
            println!("{}", detector.detect(&parsed.program));
        }
        "dump" => {
            println!("{:#?}", parsed.program);
        }
        _ => usage_and_exit(),
    }
}

fn flag_value(args: &[String], index: usize, flag: &str) -> String {
    match args.get(index + 1) {
        Some(value) => value.clone(),
        None => {
            eprintln!("Missing value for {}.", flag);
            usage_and_exit();
        }
    }
}

fn usage_and_exit() -> ! {
    eprintln!("Usage: mailsift [detect|dump] <filename.php> [--target NAME] [--define NAME]");
    process::exit(1);
}
