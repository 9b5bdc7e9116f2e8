//! rogscript console and script runner
//!
//! Usage:
//!   rogscript repl [--max-depth N] [--no-color]   - Start the debug console
//!   rogscript run <file> [--max-depth N]          - Feed a file to the console line by line
//!   rogscript help                                - Show help message

use std::env;
use std::fs;
use std::process;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use rogscript::config::MAX_CALL_DEPTH_LIMIT;
use rogscript::{Config, Console, VERSION};

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let (config, positional) = match parse_flags(&args) {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("{}: {}", "error".red(), msg);
            process::exit(2);
        }
    };

    if !config.color {
        colored::control::set_override(false);
    }

    let Some(command) = positional.first() else {
        print_help();
        return;
    };

    match command.as_str() {
        "run" => {
            let Some(path) = positional.get(1) else {
                eprintln!("{}: missing file argument", "error".red());
                eprintln!("Usage: rogscript run <file>");
                process::exit(1);
            };
            run_file(path, config);
        }
        "repl" => run_repl(config),
        "help" | "--help" | "-h" => print_help(),
        "version" | "--version" | "-v" => println!("rogscript {}", VERSION),
        other => {
            eprintln!("{}: unknown command '{}'", "error".red(), other);
            print_help();
            process::exit(1);
        }
    }
}

/// Logging stays silent unless RUST_LOG asks for it
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

/// Split `--max-depth N` / `--no-color` out of the argument list
fn parse_flags(args: &[String]) -> Result<(Config, Vec<String>), String> {
    let mut config = Config::default().with_color(env::var_os("NO_COLOR").is_none());
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--no-color" => config = config.with_color(false),
            "--max-depth" => {
                let value = iter.next().ok_or("--max-depth needs a value")?;
                let depth = value
                    .parse::<usize>()
                    .map_err(|_| format!("invalid --max-depth '{}'", value))?;
                if depth > MAX_CALL_DEPTH_LIMIT {
                    return Err(format!("--max-depth must be at most {}", MAX_CALL_DEPTH_LIMIT));
                }
                config = config.with_max_call_depth(depth);
            }
            _ => positional.push(arg.clone()),
        }
    }

    Ok((config, positional))
}

fn print_help() {
    println!("{}", "rogscript".cyan().bold());
    println!("Debug console language for the simulation");
    println!("{} {}\n", "Version".cyan(), VERSION);
    println!("{}", "USAGE:".yellow());
    println!("  rogscript repl              Start the interactive console");
    println!("  rogscript run <file>        Run a file, one console line at a time");
    println!("  rogscript help              Show this help message");
    println!("  rogscript version           Show version\n");
    println!("{}", "OPTIONS:".yellow());
    println!("  --max-depth <N>             Maximum nested function calls");
    println!("  --no-color                  Disable coloured output\n");
    println!("{}", "LANGUAGE:".yellow());
    println!("  var x = 10;                     Variable declaration");
    println!("  var add = (a, b) => {{ return a + b; }};");
    println!("  if (x > 1) {{ print(x); }} else {{ print(0); }}");
    println!("  for (var i = 0; i < 3; i = i + 1) {{ print(i); }}");
    println!("  [1, 2, 3].length()              Built-in methods");
}

fn run_file(path: &str, config: Config) {
    let source = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("{}: cannot read file '{}': {}", "error".red(), path, e);
            process::exit(1);
        }
    };

    let mut console = Console::new(config);
    let mut failures = 0;

    for (index, line) in source.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let result = console.eval_line(line);
        if result.is_err() {
            failures += 1;
            if let Some(text) = console.render(&result) {
                eprintln!("{}:{}: {}", path, index + 1, text);
            }
        }
    }

    if failures > 0 {
        process::exit(1);
    }
}

fn run_repl(config: Config) {
    println!("{} {} - {}",
        "rogscript".cyan().bold(),
        VERSION.cyan(),
        "debug console".dimmed()
    );
    println!("Type {} to exit, {} for help\n",
        "exit".yellow(),
        "help".yellow()
    );

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("{}: cannot start line editor: {}", "error".red(), e);
            process::exit(1);
        }
    };

    // One console for the whole session so globals survive between lines
    let mut console = Console::new(config.clone());

    loop {
        match rl.readline(&format!("{} ", "rog>".green().bold())) {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    "exit" | "quit" => {
                        println!("{}", "Goodbye!".cyan());
                        break;
                    }
                    "help" => {
                        print_repl_help();
                        continue;
                    }
                    "clear" => {
                        console = Console::new(config.clone());
                        println!("{}", "State cleared.".dimmed());
                        continue;
                    }
                    "vars" => {
                        let names = console.interpreter().global_names();
                        println!("{}", names.join(", ").dimmed());
                        continue;
                    }
                    _ => {}
                }

                let result = console.eval_line(line);
                if let Some(text) = console.render(&result) {
                    if result.is_err() {
                        eprintln!("{}", text);
                    } else {
                        println!("{}", text);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".cyan());
                break;
            }
            Err(err) => {
                eprintln!("{}: {:?}", "error".red(), err);
                break;
            }
        }
    }
}

fn print_repl_help() {
    println!("{}", "Console Commands:".yellow());
    println!("  exit, quit   Exit the console");
    println!("  clear        Drop all globals and start over");
    println!("  vars         List global names");
    println!("  help         Show this help\n");
    println!("{}", "Built-in natives:".yellow());
    println!("  print(value)     Write a value to the console");
    println!("  clock()          Seconds since the Unix epoch");
}
