//! `validate` command
//!
//! Loads each deck file and reports every issue found, in human or JSON
//! format. With `--strict`, warnings fail the deck too.

use std::path::Path;

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::cli::commands::loader_options;
use crate::config::loader::ConfigLoader;
use crate::error::{ConfigError, PicConfError, Severity, ValidationIssue};

/// Validation outcome for one deck file.
#[derive(Debug, Serialize)]
struct DeckReport {
    file: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
    /// Load failure that is not a validation issue (parse error, size limit)
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
    #[serde(skip)]
    missing: bool,
}

#[derive(Debug, Serialize)]
struct Summary {
    species: usize,
    lasers: usize,
    diagnostics: usize,
}

/// Validate deck files without running anything.
///
/// # Errors
///
/// Every file is reported first. Then returns an I/O error if any file
/// does not exist, or [`PicConfError::DecksInvalid`] if any deck fails
/// validation.
pub fn run(args: &ValidateArgs) -> Result<(), PicConfError> {
    let mut reports = Vec::with_capacity(args.files.len());

    for path in &args.files {
        tracing::info!(file = %path.display(), "validating deck");
        reports.push(check(path, args));
    }

    match args.format {
        OutputFormat::Human => {
            for report in &reports {
                print_human(report);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    let missing: Vec<&str> = reports
        .iter()
        .filter(|r| r.missing)
        .map(|r| r.file.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(PicConfError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file(s) not found: {}", missing.join(", ")),
        )));
    }

    let failed = reports.iter().filter(|r| !r.valid).count();
    if failed > 0 {
        return Err(PicConfError::DecksInvalid {
            failed,
            total: reports.len(),
        });
    }
    Ok(())
}

fn check(path: &Path, args: &ValidateArgs) -> DeckReport {
    let file = path.display().to_string();
    let loader = ConfigLoader::new(loader_options(args.rank));

    match loader.load(path) {
        Ok(result) => {
            let valid = !(args.strict && !result.warnings.is_empty());
            DeckReport {
                file,
                valid,
                summary: Some(Summary {
                    species: result.config.species().len(),
                    lasers: result.config.lasers().len(),
                    diagnostics: result.config.diagnostics().len(),
                }),
                error: None,
                errors: Vec::new(),
                warnings: result.warnings,
                missing: false,
            }
        }
        Err(ConfigError::Validation { issues, .. }) => {
            let (errors, warnings) = issues
                .into_iter()
                .partition(|issue| issue.severity == Severity::Error);
            DeckReport {
                file,
                valid: false,
                summary: None,
                error: None,
                errors,
                warnings,
                missing: false,
            }
        }
        Err(e) => DeckReport {
            file,
            valid: false,
            summary: None,
            missing: matches!(e, ConfigError::MissingFile { .. }),
            error: Some(e.to_string()),
            errors: Vec::new(),
            warnings: Vec::new(),
        },
    }
}

fn print_human(report: &DeckReport) {
    match (&report.summary, &report.error) {
        (Some(s), _) if report.valid => println!(
            "{}: ok ({} species, {} lasers, {} diagnostics)",
            report.file, s.species, s.lasers, s.diagnostics
        ),
        (Some(_), _) => println!("{}: failed (warnings with --strict)", report.file),
        (None, Some(error)) => println!("{}: failed\n  {error}", report.file),
        (None, None) => println!(
            "{}: failed ({} error(s))",
            report.file,
            report.errors.len()
        ),
    }
    for issue in report.errors.iter().chain(&report.warnings) {
        println!("  {issue}");
    }
}
