//! Terminal rendering of discovery listings and run reports.
//!
//! Successes and notes go to stdout, failures and warnings to stderr. Colors
//! are applied only when the target stream supports them. With `--output json`
//! commands print the serialized value and nothing else on stdout.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use romgen_lib::pipeline::{RunReport, VariantOutcome, VariantStatus};
use romgen_lib::variant::{Discovery, VariantDefinition};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// Severity of one rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
  Done,
  Failed,
  Skipped,
  Note,
}

impl Tone {
  fn symbol(self) -> &'static str {
    match self {
      Tone::Done => "✓",
      Tone::Failed => "✗",
      Tone::Skipped => "⚠",
      Tone::Note => "•",
    }
  }
}

/// Print `message` prefixed with the tone's symbol on the tone's stream.
pub fn emit(tone: Tone, message: &str) {
  let symbol = tone.symbol();
  match tone {
    Tone::Done => println!("{} {}", symbol.if_supports_color(Stream::Stdout, |s| s.green()), message),
    Tone::Note => println!("{} {}", symbol.if_supports_color(Stream::Stdout, |s| s.blue()), message),
    Tone::Failed => eprintln!(
      "{} {}",
      symbol.if_supports_color(Stream::Stderr, |s| s.red()),
      message.if_supports_color(Stream::Stderr, |s| s.red())
    ),
    Tone::Skipped => eprintln!(
      "{} {}",
      symbol.if_supports_color(Stream::Stderr, |s| s.yellow()),
      message.if_supports_color(Stream::Stderr, |s| s.yellow())
    ),
  }
}

/// Aligned `label: value` line under a summary.
pub fn stat(label: &str, value: &str) {
  let label = format!("{}:", label);
  println!("  {:<11}{}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

pub fn json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize output to JSON")?;
  println!("{}", json);
  Ok(())
}

/// `850ms`, `12.4s` or `3m07s`.
pub fn format_duration(duration: Duration) -> String {
  let millis = duration.as_millis();
  match millis {
    0..1_000 => format!("{}ms", millis),
    1_000..60_000 => format!("{:.1}s", duration.as_secs_f64()),
    _ => format!("{}m{:02}s", duration.as_secs() / 60, duration.as_secs() % 60),
  }
}

/// Archive key of an outcome, matching the file name it was (or would be) archived under.
pub fn outcome_key(outcome: &VariantOutcome) -> String {
  match &outcome.group {
    Some(group) => format!("{}_{}", group, outcome.id),
    None => outcome.id.clone(),
  }
}

/// Tone and text of the line describing one variant's outcome.
pub fn outcome_line(outcome: &VariantOutcome) -> (Tone, String) {
  let key = outcome_key(outcome);
  match &outcome.status {
    VariantStatus::Succeeded { artifacts } => (
      Tone::Done,
      format!("{} ({}) archived {} artifact(s)", key, outcome.display_name, artifacts.len()),
    ),
    VariantStatus::Failed { kind, message } => (Tone::Failed, format!("{} [{}] {}", key, kind.as_str(), message)),
    VariantStatus::Skipped { reason } => (Tone::Skipped, format!("{} skipped: {}", key, reason)),
  }
}

/// Text of the line listing a discovered variant.
pub fn variant_line(variant: &VariantDefinition) -> String {
  format!("{} ({}) from {}", variant.output_key(), variant.display_name, variant.source_path.display())
}

pub fn print_listing(discovery: &Discovery) {
  for diagnostic in &discovery.diagnostics {
    emit(Tone::Skipped, &diagnostic.to_string());
  }
  if discovery.variants.is_empty() {
    emit(Tone::Note, "No variants found");
    return;
  }
  for variant in &discovery.variants {
    emit(Tone::Note, &variant_line(variant));
  }
}

pub fn print_report(report: &RunReport, elapsed: Duration) {
  for diagnostic in &report.diagnostics {
    emit(Tone::Skipped, diagnostic);
  }

  if report.outcomes.is_empty() {
    emit(Tone::Note, "No variants to build");
  } else {
    for outcome in &report.outcomes {
      let (tone, line) = outcome_line(outcome);
      emit(tone, &line);
    }
    println!();
    stat("Succeeded", &report.succeeded().to_string());
    stat("Failed", &report.failed().to_string());
    stat("Skipped", &report.skipped().to_string());
  }
  stat("Duration", &format_duration(elapsed));
}

#[cfg(test)]
mod tests {
  use super::*;
  use romgen_lib::pipeline::FailureKind;
  use std::path::PathBuf;

  fn outcome(file: &str, status: VariantStatus) -> VariantOutcome {
    let variant = VariantDefinition::from_payload(PathBuf::from(file), None);
    VariantOutcome::new(&variant, status)
  }

  #[test]
  fn durations_scale_units() {
    assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
    assert_eq!(format_duration(Duration::from_millis(12_400)), "12.4s");
    assert_eq!(format_duration(Duration::from_secs(187)), "3m07s");
  }

  #[test]
  fn outcome_lines_carry_status() {
    let done = outcome(
      "in/Tetris.gb",
      VariantStatus::Succeeded {
        artifacts: vec![PathBuf::from("a"), PathBuf::from("b")],
      },
    );
    assert_eq!(
      outcome_line(&done),
      (Tone::Done, "tetris (Tetris) archived 2 artifact(s)".to_string())
    );

    let failed = outcome(
      "in/Zelda.gb",
      VariantStatus::Failed {
        kind: FailureKind::Build,
        message: "exit 1".to_string(),
      },
    );
    assert_eq!(outcome_line(&failed), (Tone::Failed, "zelda [build] exit 1".to_string()));

    let skipped = outcome(
      "in/Metroid.gb",
      VariantStatus::Skipped {
        reason: "run cancelled".to_string(),
      },
    );
    assert_eq!(outcome_line(&skipped).0, Tone::Skipped);
  }

  #[test]
  fn outcome_key_includes_group() {
    let mut o = outcome("in/gb/Tetris.gb", VariantStatus::Skipped { reason: String::new() });
    assert_eq!(outcome_key(&o), "tetris");
    o.group = Some("gambatte".to_string());
    assert_eq!(outcome_key(&o), "gambatte_tetris");
  }

  #[test]
  fn variant_line_names_source() {
    let v = VariantDefinition::from_payload(PathBuf::from("in/My ROM!.gba"), None);
    assert_eq!(variant_line(&v), format!("myrom (My ROM!) from {}", PathBuf::from("in/My ROM!.gba").display()));
  }
}
