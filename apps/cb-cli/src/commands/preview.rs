// preview.rs - `cb preview`: dry-run of `cb copy`.

use std::path::Path;

use cb_bundle::{decode, encode, EncodeRequest};
use clap::Args;

use super::{as_lookup, build_selection, effective_config, load_git_status};
use super::{ConfigOverrides, SelectionArgs};

#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
    #[command(flatten)]
    pub overrides: ConfigOverrides,
    /// Print the full bundle text after the file list.
    #[arg(long)]
    pub full: bool,
    /// Print statistics as JSON instead of the file list.
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: &PreviewArgs, project_root: &Path) -> anyhow::Result<()> {
    let config = effective_config(project_root, &args.overrides)?;
    let git = load_git_status(project_root, &args.selection)?;
    let selection = build_selection(project_root, &args.selection, git.as_ref());

    let template = config.template();
    let mut request = EncodeRequest::new(project_root, &selection, &config.filters, &template)
        .with_texts(&config.pre_text, &config.post_text)
        .with_limits(config.limits)
        .with_separator(config.separate_files);
    if let Some(lookup) = as_lookup(git.as_ref()) {
        request = request.with_lookup(lookup);
    }
    let output = encode(&request);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output.stats)?);
        return Ok(());
    }

    let entries = decode(&output.text, &template);
    if entries.is_empty() {
        println!("No eligible files.");
    }
    for entry in &entries {
        let note = if entry.is_placeholder {
            "skipped: too large".to_string()
        } else {
            format!("{} lines", entry.content.lines().count())
        };
        println!("  {:<60} {}", entry.raw_path, note);
    }
    for skipped in &output.stats.skipped {
        println!("  {:<60} skipped: {}", skipped.path, skipped.reason);
    }
    println!();
    println!("{}", output.stats.summary());

    if args.full && !output.text.is_empty() {
        println!();
        println!("{}", output.text);
    }
    Ok(())
}
