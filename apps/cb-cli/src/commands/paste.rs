// paste.rs - `cb paste`: decode a bundle and restore it into the project.
//
// Conflicts are settled before any write: the full list of existing targets
// is shown once, then either a blanket policy applies or the user answers
// per file. Only then does the restore run.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use cb_bundle::restore::{self, ConflictPolicy, RestorePlan};
use cb_bundle::{decode, HeaderTemplate};
use clap::{Args, ValueEnum};

use super::{effective_config, ConfigOverrides};
use crate::clipboard;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// List conflicts, then ask per file.
    Ask,
    /// Overwrite every existing file.
    Overwrite,
    /// Leave existing files untouched.
    Skip,
    /// Do nothing if any file already exists.
    Abort,
}

#[derive(Args, Debug)]
pub struct PasteArgs {
    /// Read the bundle from a file instead of the clipboard.
    #[arg(long, conflicts_with = "stdin")]
    pub input: Option<PathBuf>,
    /// Read the bundle from stdin instead of the clipboard.
    #[arg(long)]
    pub stdin: bool,
    /// What to do with files that already exist.
    #[arg(long, value_enum, default_value_t = PolicyArg::Ask)]
    pub policy: PolicyArg,
    /// Show the restore plan without touching the filesystem.
    #[arg(long)]
    pub dry_run: bool,
    /// Print the plan or result as JSON.
    #[arg(long)]
    pub json: bool,
    /// Header template the bundle was written with.
    #[arg(long)]
    pub header: Option<String>,
}

pub fn execute(args: &PasteArgs, project_root: &Path) -> anyhow::Result<()> {
    let overrides = ConfigOverrides {
        header: args.header.clone(),
        ..ConfigOverrides::default()
    };
    let config = effective_config(project_root, &overrides)?;

    let (text, prompt_allowed) = match &args.input {
        Some(path) => (
            fs::read_to_string(path)
                .with_context(|| format!("failed to read bundle from {}", path.display()))?,
            true,
        ),
        None => {
            let (text, channel) = clipboard::receive(args.stdin)?;
            (text, channel != clipboard::Channel::Stdin)
        }
    };

    let plan = plan_from_text(&text, &config.template(), project_root);
    if plan.writes.is_empty() && plan.deletes.is_empty() {
        println!("No file headers found in the bundle.");
        return Ok(());
    }
    if plan.is_empty() {
        println!("Nothing to restore.");
        return Ok(());
    }

    if args.dry_run {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            for line in describe_plan(&plan) {
                println!("{}", line);
            }
        }
        return Ok(());
    }

    let conflicts = plan.conflicts();
    let policy = match args.policy {
        PolicyArg::Overwrite => ConflictPolicy::OverwriteAll,
        PolicyArg::Skip => ConflictPolicy::SkipExisting,
        PolicyArg::Abort => ConflictPolicy::Abort,
        PolicyArg::Ask if conflicts.is_empty() => ConflictPolicy::OverwriteAll,
        PolicyArg::Ask => {
            if !prompt_allowed {
                anyhow::bail!(
                    "{} file(s) already exist and the bundle came from stdin, so there is no \
                     terminal to ask; pass --policy overwrite, skip, or abort",
                    conflicts.len()
                );
            }
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            resolve_conflicts(&conflicts, &mut stdin.lock(), &mut stdout)?
        }
    };

    let result = restore::execute(&plan, &policy);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.summary());
        for failure in &result.failures {
            println!("  failed {}: {}", failure.path, failure.reason);
        }
    }

    if !result.failures.is_empty() {
        anyhow::bail!("{} file(s) could not be restored", result.failures.len());
    }
    Ok(())
}

/// Decode bundle text and check the project for a restore plan.
pub fn plan_from_text(text: &str, template: &HeaderTemplate, project_root: &Path) -> RestorePlan {
    let entries = decode(text, template);
    restore::plan(&entries, project_root)
}

/// Human-readable plan lines for `--dry-run`.
pub fn describe_plan(plan: &RestorePlan) -> Vec<String> {
    let mut lines = Vec::new();
    for write in &plan.writes {
        let shown = if write.path.is_empty() {
            &write.raw_path
        } else {
            &write.path
        };
        let action = match (write.placeholder, write.exists) {
            (true, _) => "skip (too large in bundle)",
            (false, true) => "overwrite",
            (false, false) => "create",
        };
        lines.push(format!("{:<28} {}", action, shown));
    }
    for delete in &plan.deletes {
        let action = if delete.exists {
            "delete"
        } else {
            "delete (not found)"
        };
        lines.push(format!("{:<28} {}", action, delete.path));
    }
    lines
}

/// Show every conflict once, then ask about each. Answers: `y` overwrite,
/// `n` keep, `a` overwrite this and all remaining, `q` keep this and all
/// remaining. End of input keeps the rest.
pub fn resolve_conflicts<R: BufRead, W: Write>(
    conflicts: &[&str],
    input: &mut R,
    output: &mut W,
) -> io::Result<ConflictPolicy> {
    writeln!(output, "{} file(s) already exist:", conflicts.len())?;
    for path in conflicts {
        writeln!(output, "  {}", path)?;
    }
    writeln!(output)?;

    let mut approved = BTreeSet::new();
    for (i, path) in conflicts.iter().enumerate() {
        write!(output, "Overwrite {}? [y/N/a/q] ", path)?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            writeln!(output)?;
            break;
        }
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => {
                approved.insert(path.to_string());
            }
            "a" | "all" => {
                approved.extend(conflicts[i..].iter().map(|p| p.to_string()));
                break;
            }
            "q" | "quit" => break,
            _ => {}
        }
    }
    Ok(ConflictPolicy::PerFile(approved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn ask(conflicts: &[&str], answers: &str) -> (ConflictPolicy, String) {
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut output = Vec::new();
        let policy = resolve_conflicts(conflicts, &mut input, &mut output).unwrap();
        (policy, String::from_utf8(output).unwrap())
    }

    fn approved(paths: &[&str]) -> ConflictPolicy {
        ConflictPolicy::PerFile(paths.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn lists_conflicts_once_then_asks_each() {
        let (policy, shown) = ask(&["a.txt", "b.txt", "c.txt"], "y\nn\nyes\n");
        assert_eq!(policy, approved(&["a.txt", "c.txt"]));
        assert!(shown.starts_with("3 file(s) already exist:\n  a.txt\n  b.txt\n  c.txt\n"));
        assert_eq!(shown.matches("Overwrite ").count(), 3);
    }

    #[test]
    fn all_and_quit_shortcuts() {
        let (policy, _) = ask(&["a", "b", "c"], "n\na\n");
        assert_eq!(policy, approved(&["b", "c"]));

        let (policy, _) = ask(&["a", "b", "c"], "y\nq\n");
        assert_eq!(policy, approved(&["a"]));
    }

    #[test]
    fn end_of_input_keeps_remaining_files() {
        let (policy, _) = ask(&["a", "b"], "");
        assert_eq!(policy, approved(&[]));
    }

    #[test]
    fn dry_run_lines_describe_each_operation() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("exists.txt"), "x").unwrap();
        let bundle = "// file: exists.txt\nnew\n// file: fresh.txt\nnew\n// file: [DELETED] missing.txt\n";
        let plan = plan_from_text(bundle, &HeaderTemplate::default(), dir.path());

        let lines = describe_plan(&plan);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("overwrite") && lines[0].ends_with("exists.txt"));
        assert!(lines[1].starts_with("create") && lines[1].ends_with("fresh.txt"));
        assert!(lines[2].starts_with("delete (not found)"));
    }
}
