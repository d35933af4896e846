// copy.rs - `cb copy`: encode a selection and hand it to the clipboard.

use std::path::Path;

use cb_bundle::{encode, BundleStats, EncodeRequest};
use clap::Args;
use serde::Serialize;

use super::{as_lookup, build_selection, effective_config, load_git_status};
use super::{ConfigOverrides, SelectionArgs};
use crate::clipboard::{self, Channel};

#[derive(Args, Debug)]
pub struct CopyArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
    #[command(flatten)]
    pub overrides: ConfigOverrides,
    /// Print the bundle instead of using the clipboard.
    #[arg(long)]
    pub stdout: bool,
    /// Report statistics as JSON on stderr.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct CopyReport<'a> {
    channel: Channel,
    stats: &'a BundleStats,
}

pub fn execute(args: &CopyArgs, project_root: &Path) -> anyhow::Result<()> {
    let config = effective_config(project_root, &args.overrides)?;
    let git = load_git_status(project_root, &args.selection)?;
    let selection = build_selection(project_root, &args.selection, git.as_ref());
    if selection.is_empty() {
        eprintln!("No changed files to copy.");
        return Ok(());
    }

    let template = config.template();
    let mut request = EncodeRequest::new(project_root, &selection, &config.filters, &template)
        .with_texts(&config.pre_text, &config.post_text)
        .with_limits(config.limits)
        .with_separator(config.separate_files);
    if let Some(lookup) = as_lookup(git.as_ref()) {
        request = request.with_lookup(lookup);
    }

    let output = encode(&request);
    if output.is_empty() {
        eprintln!("No eligible files in the selection; clipboard left unchanged.");
        return Ok(());
    }

    let channel = clipboard::deliver(&output.text, args.stdout)?;

    if args.json {
        let report = CopyReport {
            channel,
            stats: &output.stats,
        };
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let target = match channel {
            Channel::Clipboard => "Copied to clipboard",
            _ => "Bundle written to stdout",
        };
        eprintln!("{}: {}", target, output.stats.summary());
        for skipped in &output.stats.skipped {
            eprintln!("  skipped {}: {}", skipped.path, skipped.reason);
        }
    }
    Ok(())
}
