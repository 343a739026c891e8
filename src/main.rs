//! UBL Inspector CLI - Command-line interface for invoice validation
//!
//! CDD Principle: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to inspector operations
//! - Handles external concerns like report files, process exit codes, and terminal output
//! - Provides clean separation between user interface and business logic

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use ubl_inspector::{
    report, FailOn, InspectorConfig, InspectorResult, InvoiceInspector, OutputFormat, Report,
    ReportFormatter, ReportOptions, ReportTarget,
};

/// Exit status for runs that could not produce a report
const FAILURE_EXIT_CODE: i32 = 3;

/// UBL Inspector - XSD and business rule validation for UBL invoices
#[derive(Parser)]
#[command(name = "ubl-inspector")]
#[command(version)]
#[command(about = "XSD and business rule validation for UBL invoices")]
#[command(
    long_about = "UBL Inspector validates UBL invoice documents against an XSD schema set and a configurable profile of business rules (monetary totals, zero-rate exemptions, currency decimal scales). XSD validation needs a build with `--features xsd` (links the system libxml2); other builds report that schema validation was skipped."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory containing XSD schemas (overrides the configuration)
    #[arg(long, global = true)]
    schemas: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run XSD validation and business rules
    Check {
        /// Invoice XML file
        file: PathBuf,

        #[command(flatten)]
        gate: GateArgs,
    },

    /// Run XSD validation only
    Validate {
        /// Invoice XML file
        file: PathBuf,
    },

    /// Run business rules only
    Rules {
        /// Invoice XML file
        file: PathBuf,

        #[command(flatten)]
        gate: GateArgs,
    },

    /// Explain what a specific rule does
    Explain {
        /// Rule ID to explain
        rule_id: String,
    },

    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },
}

#[derive(clap::Args, Clone)]
struct GateArgs {
    /// Rule profile (defaults to the configured default profile)
    #[arg(long)]
    profile: Option<String>,

    /// Write a report file: json:<path> or md:<path>
    #[arg(long)]
    report: Option<String>,

    /// Diagnostics that produce a failing exit status
    #[arg(long, value_enum, default_value = "error")]
    fail_on: FailOnArg,
}

#[derive(Copy, Clone, ValueEnum, PartialEq, Debug)]
enum FailOnArg {
    None,
    Warn,
    Error,
}

impl From<FailOnArg> for FailOn {
    fn from(arg: FailOnArg) -> Self {
        match arg {
            FailOnArg::None => FailOn::None,
            FailOnArg::Warn => FailOn::Warn,
            FailOnArg::Error => FailOn::Error,
        }
    }
}

/// Settings shared by every command
struct GlobalOptions {
    config: Option<PathBuf>,
    schemas: Option<PathBuf>,
    use_colors: bool,
}

impl GlobalOptions {
    fn load_config(&self) -> InspectorResult<InspectorConfig> {
        let mut config = match &self.config {
            Some(path) => InspectorConfig::load_from_file(path)?,
            None => InspectorConfig::discover(std::env::current_dir()?)?,
        };
        if let Some(schemas) = &self.schemas {
            config.schemas.directory = schemas.clone();
        }
        Ok(config)
    }

    fn inspector(&self, profile: Option<&str>) -> InspectorResult<InvoiceInspector> {
        let config = self.load_config()?;
        Ok(InvoiceInspector::new_with_config(&config, profile)?
            .with_report_formatter(self.formatter()))
    }

    fn formatter(&self) -> ReportFormatter {
        ReportFormatter::new(ReportOptions {
            use_colors: self.use_colors,
        })
    }
}

/// Which layers a gated command runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    All,
    RulesOnly,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run the command and handle the result
    match run_command(cli).await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(FAILURE_EXIT_CODE);
        }
    }
}

async fn run_command(cli: Cli) -> InspectorResult<i32> {
    let options = GlobalOptions {
        config: cli.config,
        schemas: cli.schemas,
        use_colors: !cli.no_color,
    };

    match cli.command {
        Commands::Check { file, gate } => run_gated(&options, Scope::All, file, gate).await,
        Commands::Validate { file } => run_validate(&options, file).await,
        Commands::Rules { file, gate } => run_gated(&options, Scope::RulesOnly, file, gate).await,
        Commands::Explain { rule_id } => run_explain(&options, &rule_id),
        Commands::ValidateConfig { config_file } => {
            run_validate_config(config_file.or(options.config))
        }
    }
}

async fn run_gated(
    options: &GlobalOptions,
    scope: Scope,
    file: PathBuf,
    gate: GateArgs,
) -> InspectorResult<i32> {
    // Reject bad report targets before touching the invoice
    let target = gate
        .report
        .as_deref()
        .map(str::parse::<ReportTarget>)
        .transpose()?;

    let inspector = options.inspector(gate.profile.as_deref())?;
    let report = match scope {
        Scope::All => inspector.check(&file).await?,
        Scope::RulesOnly => inspector.evaluate_rules(&file).await?,
    };

    if let Some(target) = &target {
        report::write_report(&options.formatter(), target, &report).await?;
    }
    print_console(&inspector, &report)?;

    Ok(FailOn::from(gate.fail_on).exit_code(&report.summary()))
}

async fn run_validate(options: &GlobalOptions, file: PathBuf) -> InspectorResult<i32> {
    let inspector = options.inspector(None)?;
    let report = inspector.validate_schema(&file).await?;
    print_console(&inspector, &report)?;
    Ok(0)
}

fn print_console(inspector: &InvoiceInspector, report: &Report) -> InspectorResult<()> {
    inspector.write_report_to(report, OutputFormat::Human, std::io::stdout().lock())
}

fn run_explain(options: &GlobalOptions, rule_id: &str) -> InspectorResult<i32> {
    let inspector = options.inspector(None)?;

    if let Some(rule) = inspector.explain(rule_id) {
        println!("Rule: {}", rule.id);
        println!("Title: {}", rule.title);
        println!(
            "Enabled in profile '{}': {}",
            inspector.profile(),
            if rule.enabled { "yes" } else { "no" }
        );
        return Ok(0);
    }

    eprintln!("Rule '{}' not found", rule_id);
    println!();
    println!("Available rules:");
    for rule in inspector.rule_catalogue() {
        println!("  - {} {}", rule.id, rule.title);
    }

    Ok(1)
}

fn run_validate_config(config_path: Option<PathBuf>) -> InspectorResult<i32> {
    let config_path = config_path.unwrap_or_else(|| PathBuf::from("ubl_inspector.yaml"));

    println!("Validating configuration: {}", config_path.display());

    match InspectorConfig::load_from_file(&config_path) {
        Ok(config) => {
            println!("Configuration is valid");
            println!("  Schemas: {}", config.schemas.directory.display());
            println!("  Default profile: {}", config.default_profile);
            for (name, profile) in &config.profiles {
                println!(
                    "  Profile {}: scale {}, rules [{}]{}",
                    name,
                    profile.scale,
                    profile.rules.join(", "),
                    if profile.parallel { ", parallel" } else { "" }
                );
            }
            Ok(0)
        }
        Err(e) => {
            eprintln!("Configuration validation failed: {}", e);
            Ok(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
