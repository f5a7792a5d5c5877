use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use dalimem_core::{
    DeviceAddress, ImageBus, MemoryImage, MemorySession, Outcome, StandardRevision, UnlockPolicy,
    WriteError, WriteOptions, catalog,
};
use glob::glob;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("DALIMEM_BUILD_COMMIT"),
    ", ",
    env!("DALIMEM_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "dalimem")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Read and write DALI bus-unit memory banks (identification, maintenance data).",
    long_about = None,
    after_help = "Examples:\n  dalimem image read device.json -o report.json\n  dalimem image read device.json --device 3 --stdout --pretty\n  dalimem image write device.json --device 0 --value RatedMedianUsefulLifeOfLuminaire --set \"0.1 h\""
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on JSON memory images.
    Image {
        #[command(subcommand)]
        command: ImageCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ImageCommands {
    /// Read every catalog value of one device into a versioned JSON report.
    #[command(
        after_help = "Examples:\n  dalimem image read device.json -o report.json\n  dalimem image read 'captures/*.json' --revision 2009 --stdout"
    )]
    Read {
        /// Path to a .json memory image
        input: PathBuf,

        /// Device address within the image
        #[arg(long, default_value_t = 0)]
        device: u8,

        /// Standard revision of bank 0 (defaults to the image's version number)
        #[arg(long)]
        revision: Option<StandardRevision>,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write JSON report to stdout
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
    /// Write one catalog value through the memory protocol and save the image.
    #[command(group(ArgGroup::new("new_value").required(true).args(["set", "mask", "tmask"])))]
    Write {
        /// Path to a .json memory image
        input: PathBuf,

        /// Device address within the image
        #[arg(long)]
        device: u8,

        /// Catalog value name (e.g., RatedMedianUsefulLifeOfLuminaire)
        #[arg(long)]
        value: String,

        /// New value as displayed in reports (e.g., "0.1 h", "25 °C", "2.1")
        #[arg(long)]
        set: Option<String>,

        /// Store MASK (unknown)
        #[arg(long)]
        mask: bool,

        /// Store TMASK (temporarily unknown)
        #[arg(long)]
        tmask: bool,

        /// What to do when the bank is locked
        #[arg(long, value_enum, default_value_t = UnlockArg::Never)]
        unlock: UnlockArg,

        /// Standard revision of bank 0 (defaults to the image's version number)
        #[arg(long)]
        revision: Option<StandardRevision>,

        /// Save the modified image here instead of in place
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
    /// Recompute the checksum of a bank and save the image.
    Repair {
        /// Path to a .json memory image
        input: PathBuf,

        /// Device address within the image
        #[arg(long)]
        device: u8,

        /// Bank index (only checksummed banks can be repaired)
        #[arg(long, default_value_t = 0)]
        bank: u8,

        /// Standard revision of bank 0 (defaults to the image's version number)
        #[arg(long)]
        revision: Option<StandardRevision>,

        /// Save the repaired image here instead of in place
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum UnlockArg {
    Never,
    Scoped,
    Persistent,
}

impl From<UnlockArg> for UnlockPolicy {
    fn from(value: UnlockArg) -> Self {
        match value {
            UnlockArg::Never => UnlockPolicy::Never,
            UnlockArg::Scoped => UnlockPolicy::Scoped,
            UnlockArg::Persistent => UnlockPolicy::Persistent,
        }
    }
}

struct WriteRequest {
    input: PathBuf,
    device: u8,
    value: String,
    new_value: NewValue,
    unlock: UnlockPolicy,
    revision: Option<StandardRevision>,
    output: Option<PathBuf>,
    quiet: bool,
}

enum NewValue {
    Text(String),
    Mask,
    TemporaryMask,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Image { command } => match command {
            ImageCommands::Read {
                input,
                device,
                revision,
                report,
                stdout,
                pretty,
                compact,
                quiet,
            } => cmd_image_read(input, device, revision, report, stdout, pretty, compact, quiet),
            ImageCommands::Write {
                input,
                device,
                value,
                set,
                mask,
                tmask,
                unlock,
                revision,
                output,
                quiet,
            } => {
                let new_value = match (set, mask, tmask) {
                    (Some(text), _, _) => NewValue::Text(text),
                    (None, true, _) => NewValue::Mask,
                    _ => NewValue::TemporaryMask,
                };
                cmd_image_write(WriteRequest {
                    input,
                    device,
                    value,
                    new_value,
                    unlock: unlock.into(),
                    revision,
                    output,
                    quiet,
                })
            }
            ImageCommands::Repair {
                input,
                device,
                bank,
                revision,
                output,
                quiet,
            } => cmd_image_repair(input, device, bank, revision, output, quiet),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_image_read(
    input: PathBuf,
    device: u8,
    revision: Option<StandardRevision>,
    report: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    compact: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&input)?;
    validate_input_file(&resolved_input)?;
    let report = if stdout {
        None
    } else {
        Some(report.ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?)
    };
    if let Some(report_path) = report.as_ref() {
        ensure_distinct_output(&resolved_input, report_path, "report")?;
    }

    let mut rep = dalimem_core::inspect_image_file(&resolved_input, device, revision)
        .map_err(|err| {
            CliError::new(
                format!("memory image readout failed: {err}"),
                Some(format!(
                    "check that the image is valid and holds device {device}"
                )),
            )
        })?;
    rep.generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("Failed to format report timestamp")?;
    let json = serialize_report(&rep, pretty, compact)?;

    let Some(report) = report else {
        print!("{}", json);
        return Ok(());
    };
    create_parent_dir(&report)?;
    fs::write(&report, json)
        .with_context(|| format!("Failed to write report: {}", report.display()))?;

    if !quiet {
        let failed = rep.values.iter().filter(|v| v.error.is_some()).count();
        if failed > 0 {
            eprintln!("{failed} value(s) could not be read; see the report for details");
        }
        eprintln!("OK: report written -> {}", report.display());
    }
    Ok(())
}

fn cmd_image_write(request: WriteRequest) -> Result<(), CliError> {
    let (image, output, revision) =
        load_image(&request.input, request.output, request.device, request.revision)?;

    let def = catalog::find(revision, &request.value).map_err(|err| {
        let names: Vec<_> = catalog::entries(revision).map(|e| e.name).collect();
        CliError::new(err.to_string(), Some(format!("known values: {}", names.join(", "))))
    })?;
    let outcome = match &request.new_value {
        NewValue::Text(text) => def.kind().parse_outcome(text).map_err(|err| {
            CliError::new(
                format!("invalid value for {}: {err}", def.name()),
                Some(format!("expected a {} or MASK/TMASK", def.kind().name())),
            )
        })?,
        NewValue::Mask => Outcome::Mask,
        NewValue::TemporaryMask => Outcome::TemporaryMask,
    };

    let session = MemorySession::new(ImageBus::new(image));
    let options = WriteOptions::default().with_unlock(request.unlock);
    session
        .write_with(DeviceAddress(request.device), &def, &outcome, &options)
        .map_err(write_error)?;

    let image = session.into_bus().into_image();
    create_parent_dir(&output)?;
    image
        .save(&output)
        .with_context(|| format!("Failed to write memory image: {}", output.display()))?;
    if !request.quiet {
        eprintln!(
            "OK: {} = {} -> {}",
            def.name(),
            outcome,
            output.display()
        );
    }
    Ok(())
}

fn cmd_image_repair(
    input: PathBuf,
    device: u8,
    bank: u8,
    revision: Option<StandardRevision>,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let (image, output, revision) = load_image(&input, output, device, revision)?;
    let bank = catalog::bank(revision, bank).map_err(|err| {
        CliError::new(
            err.to_string(),
            Some("the 2009 bank 0 is the only catalog bank with a checksum".to_string()),
        )
    })?;

    let session = MemorySession::new(ImageBus::new(image));
    let checksum = session
        .repair_checksum(DeviceAddress(device), &bank)
        .map_err(write_error)?;

    let image = session.into_bus().into_image();
    create_parent_dir(&output)?;
    image
        .save(&output)
        .with_context(|| format!("Failed to write memory image: {}", output.display()))?;
    if !quiet {
        eprintln!(
            "OK: bank {} checksum = {checksum:#04x} -> {}",
            bank.index(),
            output.display()
        );
    }
    Ok(())
}

/// Load the image named by `input` and resolve where it is saved and which
/// catalog revision applies to `device`.
fn load_image(
    input: &Path,
    output: Option<PathBuf>,
    device: u8,
    revision: Option<StandardRevision>,
) -> Result<(MemoryImage, PathBuf, StandardRevision), CliError> {
    let resolved_input = resolve_input_path(input)?;
    validate_input_file(&resolved_input)?;
    let output = output.unwrap_or_else(|| resolved_input.clone());
    if output != resolved_input {
        ensure_distinct_output(&resolved_input, &output, "output")?;
    }

    let image = MemoryImage::load(&resolved_input)
        .with_context(|| format!("Failed to load memory image: {}", resolved_input.display()))?;
    let stored = image
        .device(device)
        .ok_or_else(|| {
            CliError::new(
                format!("device {device} not present in image"),
                Some("pass --device with an address listed in the image".to_string()),
            )
        })?
        .version_number;
    let revision = revision.unwrap_or_else(|| {
        stored
            .map(StandardRevision::from_version_number)
            .unwrap_or(StandardRevision::Iec62386_102_2014)
    });
    Ok((image, output, revision))
}

fn write_error(err: WriteError) -> CliError {
    let hint = match &err {
        WriteError::BankLocked { .. } => Some("use --unlock scoped to open the bank".to_string()),
        WriteError::NotWritable { .. } => Some("only NVM-RW values can be written".to_string()),
        WriteError::NoChecksum { .. } => Some("only checksummed banks can be repaired".to_string()),
        WriteError::ValueOutOfRange(_) => Some("choose a value within the allowed range".to_string()),
        WriteError::BankCorrupt { .. } => {
            Some("the bank checksum does not match; run `dalimem image repair` first".to_string())
        }
        _ if err.is_retryable() => Some("transient bus failure; retry the write".to_string()),
        _ => None,
    };
    CliError::new(format!("write failed: {err}"), hint)
}

fn ensure_distinct_output(input: &Path, output: &Path, what: &str) -> Result<(), CliError> {
    let input_abs = fs::canonicalize(input)
        .with_context(|| format!("Failed to resolve input path: {}", input.display()))?;
    let output_dir = output
        .parent()
        .map(|parent| {
            if parent.as_os_str().is_empty() {
                fs::canonicalize(".")
            } else {
                fs::canonicalize(parent)
            }
        })
        .transpose();
    // A missing parent directory is created later, so it cannot alias the input.
    let Ok(Some(output_dir)) = output_dir else {
        return Ok(());
    };
    let target = output_dir.join(
        output
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid {what} path"))?,
    );
    if target == input_abs {
        return Err(CliError::new(
            format!("{what} path must differ from input: {}", output.display()),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

fn create_parent_dir(path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    Ok(())
}

fn serialize_report(
    rep: &dalimem_core::Report,
    pretty: bool,
    compact: bool,
) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .json memory image".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .json memory image".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "json" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .json memory image".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    match matches.len() {
        0 => Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .json".to_string()),
        )),
        1 => Ok(matches.remove(0)),
        count => {
            let mut listed = matches
                .iter()
                .take(3)
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            if count > 3 {
                listed.push_str(", ...");
            }
            Err(CliError::new(
                format!(
                    "multiple files match pattern '{}' ({} matches); matches: {}",
                    pattern, count, listed
                ),
                Some("pass a single memory image, or run once per file".to_string()),
            ))
        }
    }
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
