use clap::{Parser, Subcommand};
use cmdguard::config::Config;
use cmdguard::exec::CommandOutput;
use cmdguard::security::CommandValidator;
use cmdguard::{AppResult, ExecutionGateway, composer, logging};
use serde_json::json;
use std::path::PathBuf;
use std::process;

/// Exit code for a command refused by the validator
const EXIT_REJECTED: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "cmdguard")]
#[command(version, about = "Validate and run allowlisted shell commands", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.config/cmdguard/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Do not write to the audit log
    #[arg(long, global = true)]
    no_audit: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a command without running it
    Check {
        /// Use the shell-query policy instead of the process-execution one
        #[arg(long)]
        query: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,

        command: String,
    },

    /// Validate and run a command, printing its combined output
    Run { command: String },

    /// Validate and run a read-only query, printing its trimmed stdout
    Query { command: String },

    /// Run `composer require <package>` inside <dir>
    Require { dir: PathBuf, package: String },

    /// Run `composer dump-autoload` inside <dir>
    DumpAutoload { dir: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run(cli: Cli) -> AppResult<i32> {
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if cli.no_audit {
        config.audit.enabled = false;
    }

    logging::init_logging(&config.logging.level);

    match cli.command {
        Command::Check {
            query,
            json,
            command,
        } => check(&command, query, json),
        Command::Run { command } => Ok(print_output(&gateway(&config)?.run(&command)?)),
        Command::Query { command } => match gateway(&config)?.query(&command)? {
            Some(result) => {
                println!("{}", result);
                Ok(0)
            }
            None => Ok(1),
        },
        Command::Require { dir, package } => Ok(print_output(&composer::require_package(
            &gateway(&config)?,
            &dir,
            &package,
        )?)),
        Command::DumpAutoload { dir } => Ok(print_output(&composer::dump_autoload(
            &gateway(&config)?,
            &dir,
        )?)),
    }
}

fn gateway(config: &Config) -> AppResult<ExecutionGateway> {
    Ok(ExecutionGateway::from_config(config)?)
}

fn check(command: &str, query: bool, as_json: bool) -> AppResult<i32> {
    let validator = if query {
        CommandValidator::shell_query()
    } else {
        CommandValidator::process_execution()
    };

    let outcome = validator.validate(command);

    if as_json {
        let value = match &outcome {
            Ok(parsed) => json!({
                "approved": true,
                "policy": validator.policy().name(),
                "command": parsed,
                "command_line": parsed.command_line(),
            }),
            Err(err) => json!({
                "approved": false,
                "policy": validator.policy().name(),
                "violation": err,
                "message": err.to_string(),
            }),
        };
        println!("{}", value);
        return Ok(if outcome.is_ok() { 0 } else { EXIT_REJECTED });
    }

    let parsed = outcome?;
    match &parsed.directory_change {
        Some(dir) => println!("approved: {} (in {})", parsed.remainder, dir),
        None => println!("approved: {}", parsed.remainder),
    }
    Ok(0)
}

fn print_output(output: &CommandOutput) -> i32 {
    for line in &output.lines {
        println!("{}", line);
    }
    if output.exit_code < 0 { 1 } else { output.exit_code }
}
