use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use romgen_lib::settings::{Overrides, Profile};
use romgen_lib::variant::{VariantDefinition, discover};

use super::load_settings;
use crate::output::{OutputFormat, json, print_listing, stat};

#[derive(Serialize)]
struct ListedVariant<'a> {
  id: &'a str,
  output_key: String,
  display_name: &'a str,
  group: Option<&'a str>,
  source: &'a PathBuf,
}

impl<'a> From<&'a VariantDefinition> for ListedVariant<'a> {
  fn from(v: &'a VariantDefinition) -> Self {
    Self {
      id: &v.normalized_id,
      output_key: v.output_key(),
      display_name: &v.display_name,
      group: v.group_tag(),
      source: &v.source_path,
    }
  }
}

#[derive(Serialize)]
struct Listing<'a> {
  profile: &'static str,
  input_dir: &'a PathBuf,
  variants: Vec<ListedVariant<'a>>,
  diagnostics: Vec<String>,
}

/// Run discovery only and print what a build would process.
pub fn cmd_list(project: Option<PathBuf>, profile: Option<Profile>, output: OutputFormat) -> Result<()> {
  let overrides = Overrides {
    profile,
    ..Default::default()
  };
  let settings = load_settings(project, &overrides)?;
  let discovery =
    discover(&settings.input_dir, settings.layout, settings.core_key()).context("Failed to discover variants")?;

  if output.is_json() {
    return json(&Listing {
      profile: settings.profile.as_str(),
      input_dir: &settings.input_dir,
      variants: discovery.variants.iter().map(ListedVariant::from).collect(),
      diagnostics: discovery.diagnostics.iter().map(|d| d.to_string()).collect(),
    });
  }

  print_listing(&discovery);
  println!();
  stat("Profile", settings.profile.as_str());
  stat("Input", &settings.input_dir.display().to_string());
  stat("Variants", &discovery.variants.len().to_string());
  Ok(())
}
