//! `nancy build` command implementation.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use nancy_config::{CliSettings, Config, XmlConfig};
use nancy_expand::{
    Expander, ExpanderOptions, MaterializeOptions, OutputEntry, OutputKind, XmlExpander,
};
use nancy_query::PathEvaluator;
use nancy_storage::FsStorage;
use rayon::prelude::*;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Source directory (overrides config).
    input: Option<PathBuf>,

    /// Output directory (overrides config).
    output: Option<PathBuf>,

    /// Sub-tree of the source directory to build (overrides config).
    #[arg(long)]
    path: Option<PathBuf>,

    /// Annotate failing macros in the output instead of stopping.
    #[arg(short, long)]
    keep_going: bool,

    /// Path to configuration file (default: auto-discover nancy.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Counts reported after a build.
#[derive(Debug, Default, PartialEq, Eq)]
struct BuildSummary {
    directories: usize,
    expanded: usize,
    copied: usize,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the source tree cannot be
    /// materialized, or a file fails to expand or write.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            input: self.input,
            output: self.output,
            path: self.path,
            keep_going: self.keep_going.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let (input, output_dir) = config.require_paths()?;

        output.build_paths(input, output_dir);
        if config.build_resolved.keep_going {
            output.keep_going();
        }

        let options = ExpanderOptions {
            input: input.to_path_buf(),
            output: output_dir.to_path_buf(),
            path: config.build_resolved.path.clone(),
            abort_on_error: !config.build_resolved.keep_going,
        };
        let expander = XmlExpander::with_materialize_options(
            options,
            &materialize_options(&config.xml),
            &FsStorage::new(),
            Box::new(PathEvaluator::new()),
        )?;

        let summary = build(&expander)?;

        output.finished(
            summary.directories,
            summary.expanded,
            summary.copied,
            output_dir,
        );
        Ok(())
    }
}

fn materialize_options(xml: &XmlConfig) -> MaterializeOptions {
    MaterializeOptions {
        structured_extensions: xml.structured_extensions.clone(),
        module_extensions: xml.module_extensions.clone(),
        hidden_prefix: xml.hidden_prefix.clone(),
    }
}

/// Write the output tree for every entry the expander reports.
///
/// Directories and copies happen in order; structured files are expanded in
/// parallel once their directories exist. A file whose expansion fails is
/// not written.
fn build(expander: &XmlExpander) -> Result<BuildSummary, CliError> {
    let mut summary = BuildSummary::default();
    let mut pending: Vec<OutputEntry> = Vec::new();

    for entry in expander.output_entries()? {
        match entry.kind {
            OutputKind::Directory => {
                fs::create_dir_all(&entry.output).map_err(write_error(&entry.output))?;
                summary.directories += 1;
            }
            OutputKind::Copy => {
                fs::copy(&entry.source, &entry.output).map_err(write_error(&entry.output))?;
                tracing::debug!(source = %entry.source.display(), "Copied file");
                summary.copied += 1;
            }
            OutputKind::Expand => pending.push(entry),
        }
    }

    pending.par_iter().try_for_each(|entry| -> Result<(), CliError> {
        let text = expander.expand_file(&entry.source)?;
        fs::write(&entry.output, text).map_err(write_error(&entry.output))?;
        tracing::info!(
            source = %entry.source.display(),
            output = %entry.output.display(),
            "Expanded file"
        );
        Ok(())
    })?;
    summary.expanded = pending.len();

    Ok(summary)
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> CliError + '_ {
    move |source| CliError::Write {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn expander(input: &Path, output: &Path, abort_on_error: bool) -> XmlExpander {
        let options = ExpanderOptions {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            path: None,
            abort_on_error,
        };
        XmlExpander::new(options, &FsStorage::new(), Box::new(PathEvaluator::new())).unwrap()
    }

    fn site(root: &Path) -> PathBuf {
        let input = root.join("src");
        fs::create_dir_all(input.join("people")).unwrap();
        fs::create_dir_all(input.join(".cache")).unwrap();
        fs::write(input.join("menu.xhtml"), "<ul><li>Home</li></ul>").unwrap();
        fs::write(input.join("index.nancy.xhtml"), "<nav><nc:x>menu</nc:x></nav>").unwrap();
        fs::write(input.join("people/ada.xhtml"), "<p><nc:x>menu</nc:x></p>").unwrap();
        fs::write(input.join("style.css"), "p { margin: 0 }").unwrap();
        fs::write(input.join(".cache/state"), "").unwrap();
        input
    }

    #[test]
    fn test_build_writes_output_tree() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input = site(temp_dir.path());
        let out = temp_dir.path().join("out");

        let summary = build(&expander(&input, &out, true)).unwrap();

        assert_eq!(
            summary,
            BuildSummary {
                directories: 2,
                expanded: 3,
                copied: 1,
            }
        );
        assert_eq!(
            fs::read_to_string(out.join("index.xhtml")).unwrap(),
            "<nav><ul><li>Home</li></ul></nav>"
        );
        assert_eq!(
            fs::read_to_string(out.join("people/ada.xhtml")).unwrap(),
            "<p><ul><li>Home</li></ul></p>"
        );
        assert_eq!(
            fs::read_to_string(out.join("style.css")).unwrap(),
            "p { margin: 0 }"
        );
        assert!(!out.join(".cache").exists());
    }

    #[test]
    fn test_build_sub_tree() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input = site(temp_dir.path());
        let out = temp_dir.path().join("out");
        let options = ExpanderOptions {
            input: input.clone(),
            output: out.clone(),
            path: Some(PathBuf::from("people")),
            abort_on_error: true,
        };
        let expander =
            XmlExpander::new(options, &FsStorage::new(), Box::new(PathEvaluator::new())).unwrap();

        build(&expander).unwrap();

        assert_eq!(
            fs::read_to_string(out.join("ada.xhtml")).unwrap(),
            "<p><ul><li>Home</li></ul></p>"
        );
        assert!(!out.join("index.xhtml").exists());
    }

    #[test]
    fn test_strict_build_skips_failing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input = temp_dir.path().join("src");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("broken.xhtml"), "<nc:x>missing</nc:x>").unwrap();
        let out = temp_dir.path().join("out");

        let err = build(&expander(&input, &out, true)).unwrap_err();

        assert!(matches!(err, CliError::Expand(_)), "{err}");
        assert!(!out.join("broken.xhtml").exists());
    }

    #[test]
    fn test_keep_going_build_writes_annotated_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input = temp_dir.path().join("src");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("broken.xhtml"), "<nc:x>missing</nc:x>").unwrap();
        let out = temp_dir.path().join("out");

        build(&expander(&input, &out, false)).unwrap();

        let text = fs::read_to_string(out.join("broken.xhtml")).unwrap();
        assert!(text.contains("nc:error=\"missing not found for broken.xhtml\""), "{text}");
    }

    #[cfg(unix)]
    #[test]
    fn test_executables_keep_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let input = temp_dir.path().join("src");
        fs::create_dir_all(&input).unwrap();
        let script = input.join("deploy.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        let out = temp_dir.path().join("out");

        build(&expander(&input, &out, true)).unwrap();

        let mode = fs::metadata(out.join("deploy.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_materialize_options_from_config() {
        let xml = XmlConfig {
            hidden_prefix: "_".to_owned(),
            ..XmlConfig::default()
        };

        let options = materialize_options(&xml);

        assert_eq!(options.hidden_prefix, "_");
        assert_eq!(
            options.structured_extensions,
            MaterializeOptions::default().structured_extensions
        );
    }
}
