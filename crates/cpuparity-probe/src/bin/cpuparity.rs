//! cpuparity CLI: inspect the expected-feature tables and reconcile
//! captured `lscpu` flag lines against them.

use cpuparity_reconcile::{
    assert_expected_diff, assert_match, resolve_expected, Asymmetry, HardwareModel,
    KernelCapability, ReconcileError, SoftwareTemplate, ASYMMETRY_POLICIES, EXPECTED_FEATURES,
};
use cpuparity_registry::{validate_registry, FeatureSet, RegistryError, REGISTRY};
use clap::{Parser, Subcommand};
use log::debug;
use snafu::{ensure, ResultExt, Snafu};
use std::path::{Path, PathBuf};

/// CLI errors for the cpuparity binary.
#[derive(Debug, Snafu)]
enum CliError {
    #[snafu(display("{source}"), context(false))]
    Reconcile { source: ReconcileError },
    #[snafu(display("invalid baseline registry: {source}"), context(false))]
    Registry { source: RegistryError },
    #[snafu(display("cannot read {}: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("{} holds no flags; expected the value of an lscpu Flags line", path.display()))]
    EmptyFlags { path: PathBuf },
    #[snafu(display("--host and --guest cannot both be read from stdin"))]
    StdinTwice,
    #[snafu(display("JSON error: {source}"), context(false))]
    Json { source: serde_json::Error },
}

#[derive(Parser)]
#[command(name = "cpuparity")]
#[command(about = "Expected CPU feature sets for templated guests")]
#[command(version)]
struct Cli {
    /// Emit results and failures as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the feature set expected for a configuration
    Expected {
        /// Host CPU model (e.g. neoverse-v1)
        #[arg(short, long)]
        model: HardwareModel,

        /// CPU template applied to the guest
        #[arg(short, long, default_value = "none")]
        template: SoftwareTemplate,

        /// Guest kernel level (legacy, modern or a version like 5.10)
        #[arg(short, long)]
        kernel: Option<KernelCapability>,
    },

    /// Print every decision-table entry and host-vs-guest policy
    Table,

    /// Validate and print the baseline registry
    Baselines,

    /// Compare a captured flags line against the expected set
    Compare {
        #[arg(short, long)]
        model: HardwareModel,

        #[arg(short, long, default_value = "none")]
        template: SoftwareTemplate,

        #[arg(short, long)]
        kernel: Option<KernelCapability>,

        /// File holding the guest's flags line, or `-` for stdin
        #[arg(short, long)]
        observed: PathBuf,
    },

    /// Check host-vs-guest flag differences against the model's policy
    Diff {
        #[arg(short, long)]
        model: HardwareModel,

        /// File holding the host's flags line
        #[arg(long)]
        host: PathBuf,

        /// File holding the guest's flags line
        #[arg(long)]
        guest: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let json = cli.json;

    let result = match cli.command {
        Commands::Expected {
            model,
            template,
            kernel,
        } => cmd_expected(model, template, kernel, json),
        Commands::Table => cmd_table(),
        Commands::Baselines => cmd_baselines(),
        Commands::Compare {
            model,
            template,
            kernel,
            observed,
        } => cmd_compare(model, template, kernel, &observed, json),
        Commands::Diff { model, host, guest } => cmd_diff(model, &host, &guest, json),
    };

    if let Err(e) = result {
        report(&e, json);
        std::process::exit(1);
    }
}

fn report(error: &CliError, json: bool) {
    if json {
        if let CliError::Reconcile { source } = error {
            match serde_json::to_string_pretty(source) {
                Ok(text) => {
                    println!("{text}");
                    return;
                }
                Err(e) => debug!("cannot encode error as JSON: {e}"),
            }
        }
    }
    eprintln!("Error: {error}");
}

fn is_stdin(path: &Path) -> bool {
    path == Path::new("-")
}

/// `lscpu` never prints an empty Flags line, so an empty input is refused
/// rather than compared.
fn read_flags(path: &Path) -> Result<FeatureSet, CliError> {
    let line = if is_stdin(path) {
        std::io::read_to_string(std::io::stdin()).context(ReadSnafu { path })?
    } else {
        std::fs::read_to_string(path).context(ReadSnafu { path })?
    };
    parse_flags(&line, path)
}

fn parse_flags(line: &str, path: &Path) -> Result<FeatureSet, CliError> {
    let flags = FeatureSet::parse(line);
    ensure!(!flags.is_empty(), EmptyFlagsSnafu { path });
    debug!("read {} flags from {}", flags.len(), path.display());
    Ok(flags)
}

fn print_set(set: &FeatureSet, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string(set)?);
    } else {
        println!("{set}");
    }
    Ok(())
}

fn cmd_expected(
    model: HardwareModel,
    template: SoftwareTemplate,
    kernel: Option<KernelCapability>,
    json: bool,
) -> Result<(), CliError> {
    let expected = resolve_expected(model, template, kernel)?;
    print_set(&expected, json)
}

fn cmd_table() -> Result<(), CliError> {
    println!("=== Expected guest features ===");
    for entry in EXPECTED_FEATURES {
        let resolved = entry.expected.resolve();
        println!(
            "{:<12} {:<26} kernel {:<8} {} ({} flags)",
            entry.hardware_model.name(),
            entry.template.name(),
            entry.kernel.to_string(),
            entry.expected,
            resolved.len()
        );
    }

    println!("\n=== Host vs guest policies ===");
    for policy in ASYMMETRY_POLICIES {
        println!(
            "{:<12} host-only {}  guest-only {}",
            policy.hardware_model.name(),
            policy.host_only,
            policy.guest_only
        );
    }
    Ok(())
}

fn cmd_baselines() -> Result<(), CliError> {
    validate_registry()?;
    for baseline in REGISTRY {
        let features = baseline.features();
        let parents: Vec<&str> = baseline.extends().iter().map(|b| b.name()).collect();
        if parents.is_empty() {
            println!("{} ({} flags)", baseline.name(), features.len());
        } else {
            println!(
                "{} extends {} ({} flags)",
                baseline.name(),
                parents.join(", "),
                features.len()
            );
        }
        println!("  {features}");
    }
    Ok(())
}

fn cmd_compare(
    model: HardwareModel,
    template: SoftwareTemplate,
    kernel: Option<KernelCapability>,
    observed: &Path,
    json: bool,
) -> Result<(), CliError> {
    let expected = resolve_expected(model, template, kernel)?;
    let observed = read_flags(observed)?;
    assert_match(&observed, &expected)?;

    if json {
        print_set(&observed, true)?;
    } else {
        println!("match: {} flags", observed.len());
    }
    Ok(())
}

fn cmd_diff(model: HardwareModel, host: &Path, guest: &Path, json: bool) -> Result<(), CliError> {
    ensure!(!(is_stdin(host) && is_stdin(guest)), StdinTwiceSnafu);
    let host = read_flags(host)?;
    let guest = read_flags(guest)?;
    assert_expected_diff(&host, &guest, model)?;

    let asymmetry = Asymmetry::between(&host, &guest);
    if json {
        println!("{}", serde_json::to_string(&asymmetry)?);
    } else {
        println!("policy holds: {asymmetry}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_flags_line_is_refused() {
        for line in ["", "\n", "   \t\n"] {
            match parse_flags(line, Path::new("guest.txt")) {
                Err(CliError::EmptyFlags { path }) => assert_eq!(path, Path::new("guest.txt")),
                other => panic!("expected EmptyFlags for {line:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn flags_line_is_parsed() {
        let flags = parse_flags("fp asimd aes\n", Path::new("-")).unwrap();
        assert_eq!(flags, FeatureSet::parse("aes asimd fp"));
    }

    #[test]
    fn empty_file_is_refused() {
        let path = std::env::temp_dir().join(format!("cpuparity-empty-{}", std::process::id()));
        std::fs::write(&path, "\n").unwrap();
        let result = read_flags(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(CliError::EmptyFlags { .. })));
    }

    #[test]
    fn diff_refuses_stdin_for_both_sides() {
        let stdin = Path::new("-");
        let result = cmd_diff(HardwareModel::NeoverseN1, stdin, stdin, false);
        assert!(matches!(result, Err(CliError::StdinTwice)));
    }

    #[test]
    fn diff_reports_missing_file() {
        let missing = Path::new("/nonexistent/cpuparity/host.txt");
        let result = cmd_diff(HardwareModel::NeoverseN1, missing, Path::new("-"), false);
        match result {
            Err(CliError::Read { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected Read, got {other:?}"),
        }
    }
}
