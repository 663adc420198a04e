use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pgreconcile::api::{self, ReconcileOptions};
use pgreconcile::descriptor::ConfigurationError;
use pgreconcile::diff::TableDiscrepancies;
use serde::Serialize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pgreconcile")]
#[command(about = "Reconcile a PostgreSQL schema with declared entities", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DescriptorArgs {
    /// Descriptor file, directory or glob pattern (repeatable)
    #[arg(long = "descriptors", short = 'd', required = true)]
    descriptors: Vec<String>,
}

#[derive(Args)]
struct DatabaseArgs {
    #[command(flatten)]
    descriptors: DescriptorArgs,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database: String,

    /// Schema holding the reconciled tables
    #[arg(long, default_value = "public")]
    schema: String,

    /// Add missing primary-key constraints instead of failing
    #[arg(long)]
    add_missing_primary_keys: bool,
}

impl DatabaseArgs {
    fn options(&self) -> ReconcileOptions {
        let options =
            ReconcileOptions::new(self.descriptors.descriptors.clone(), self.database.as_str())
                .with_target_schema(self.schema.as_str());
        if self.add_missing_primary_keys {
            options.add_missing_primary_keys()
        } else {
            options
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the create and alter scripts without executing them
    Plan {
        #[command(flatten)]
        args: DatabaseArgs,
    },

    /// Execute the reconciliation in one transaction
    Apply {
        #[command(flatten)]
        args: DatabaseArgs,
        #[arg(long)]
        dry_run: bool,
    },

    /// List discrepancies; exits with status 1 when drift exists
    Check {
        #[command(flatten)]
        args: DatabaseArgs,
    },

    /// Load descriptors and report skipped entities
    Validate {
        #[command(flatten)]
        args: DescriptorArgs,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("pgreconcile=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pgreconcile=info"))
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Plan { args } => {
            let result = api::plan(args.options())
                .await
                .context("Failed to plan reconciliation")?;

            if cli.json {
                print_json(&result)?;
            } else {
                print_skipped(&result.skipped_entities);
                print_discrepancies(&result.missing_tables, &result.discrepancies);
                if result.is_empty() {
                    println!("No changes needed.");
                } else {
                    print_script("Create script", &result.create);
                    print_script("Alter script", &result.alter);
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Apply { args, dry_run } => {
            let mut options = args.options();
            if dry_run {
                options = options.dry_run();
            }
            let result = api::apply(options)
                .await
                .context("Failed to apply reconciliation")?;

            if cli.json {
                print_json(&result)?;
            } else {
                print_skipped(&result.skipped_entities);
                if result.dry_run {
                    print_script("Dry run", &result.statements);
                } else if result.statements_executed == 0 {
                    println!("No changes needed.");
                } else {
                    println!("Executed {} statement(s).", result.statements_executed);
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Check { args } => {
            let result = api::check(args.options())
                .await
                .context("Failed to check for drift")?;

            if cli.json {
                print_json(&result)?;
            } else if result.has_drift {
                print_discrepancies(&result.missing_tables, &result.discrepancies);
            } else {
                println!("No drift detected.");
            }

            Ok(if result.has_drift {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            })
        }

        Commands::Validate { args } => {
            let result =
                api::validate(&args.descriptors).context("Failed to validate descriptors")?;

            if cli.json {
                print_json(&result)?;
            } else {
                print_skipped(&result.skipped_entities);
                println!(
                    "{} table(s) declared, fingerprint {}",
                    result.tables.len(),
                    result.fingerprint
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_script(title: &str, statements: &[String]) {
    if statements.is_empty() {
        return;
    }
    println!("-- {title}");
    for statement in statements {
        println!("{statement}");
    }
    println!();
}

fn print_skipped(skipped: &[ConfigurationError]) {
    for err in skipped {
        eprintln!("skipped: {err}");
    }
}

fn print_discrepancies(missing_tables: &[String], discrepancies: &[TableDiscrepancies]) {
    for table in missing_tables {
        println!("{table}: missing table");
    }
    for table in discrepancies {
        for discrepancy in &table.discrepancies {
            println!("{}: {discrepancy}", table.table);
        }
    }
}
