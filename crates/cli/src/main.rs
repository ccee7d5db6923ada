//! mergemarks command-line tool.
//!
//! Loads a conflicted file into an in-memory editor and drives the conflict
//! engine over it: listing blocks, printing the annotated buffer with its
//! controls, and resolving blocks either by flag or with a prompt per
//! control. Also generates and validates configuration files.

mod interactive;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use mergemarks_core::config::{EngineConfig, MalformedPolicy};
use mergemarks_core::conflict::{Branch, ConflictBlock, ControlWidget, MarkerScanner};
use mergemarks_core::editor::{HostEditor, MemoryEditor};
use mergemarks_core::session::{ConflictSession, EditorEvent};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// mergemarks command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "mergemarks",
    version,
    about = "Inspect and resolve merge-conflict markers in a file"
)]
struct Cli {
    /// Path to the TOML configuration file. Defaults to
    /// `<config dir>/mergemarks/config.toml` when it exists.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error. Overrides the config.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the conflict blocks in a file.
    List {
        file: PathBuf,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print the file with markers annotated and controls shown.
    Annotate { file: PathBuf },

    /// Resolve conflict blocks without prompting.
    Resolve {
        file: PathBuf,

        /// Side to keep: ours (current), theirs (incoming), or both.
        #[arg(long)]
        accept: String,

        /// 1-based line of the block's opening marker.
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        line: Option<usize>,

        /// Resolve every block in the file.
        #[arg(long)]
        all: bool,

        /// Write the result here instead of rewriting the file in place.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Step through each conflict and pick a side.
    Interactive {
        file: PathBuf,

        /// Write the result here instead of rewriting the file in place.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a configuration file.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    // The log level may come from the config, so load it before logging is
    // set up. A load error is reported by `run`.
    let loaded = load_config(cli.config.as_deref());
    let level = cli
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|c| c.cli.log_level.clone()))
        .unwrap_or_else(|| "warn".into());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_target(false)
        .without_time()
        .init();

    match run(cli, loaded) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, loaded: Result<EngineConfig>) -> Result<()> {
    match cli.command {
        Commands::Init { output } => cmd_init(output.as_deref()),
        Commands::Validate => cmd_validate(cli.config.as_deref()),
        command => {
            let config = loaded?;
            config.validate().context("invalid configuration")?;

            match command {
                Commands::List { file, json } => cmd_list(&config, &file, json),
                Commands::Annotate { file } => cmd_annotate(&config, &file),
                Commands::Resolve {
                    file,
                    accept,
                    line,
                    all,
                    output,
                } => cmd_resolve(&config, &file, &accept, line, all, output.as_deref()),
                Commands::Interactive { file, output } => {
                    cmd_interactive(&config, &file, output.as_deref())
                }
                Commands::Init { .. } | Commands::Validate => unreachable!(),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mergemarks").join("config.toml"))
}

/// An explicit path must exist; the default path may be absent.
fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    match explicit {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("failed to load configuration file {}", path.display())),
        None => match default_config_path() {
            Some(path) => EngineConfig::load_or_default(&path)
                .with_context(|| format!("failed to load configuration file {}", path.display())),
            None => Ok(EngineConfig::default()),
        },
    }
}

// ---------------------------------------------------------------------------
// Buffer helpers
// ---------------------------------------------------------------------------

/// Load `file` into a fresh editor and let the session annotate it.
fn open_session(config: &EngineConfig, file: &Path) -> Result<ConflictSession<MemoryEditor>> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let mut session = ConflictSession::new(MemoryEditor::default(), config)
        .context("failed to build conflict engine")?;
    session.editor_mut().swap_doc(&text);
    session.handle(EditorEvent::SwapDoc)?;
    let report = session.tick()?.unwrap_or_default();
    // The scanner's own writes are not interesting to the session.
    session.pump()?;

    debug!(
        file = %file.display(),
        controls = report.controls_attached.len(),
        "file loaded"
    );
    Ok(session)
}

/// The buffer as it should land on disk.
fn render_output(editor: &MemoryEditor, scanner: &MarkerScanner, strip: bool) -> String {
    if !strip {
        return editor.text();
    }
    let patterns = scanner.patterns();
    let annotations = scanner.annotations();
    editor.render(|line| {
        if patterns.is_marker(line) {
            annotations.strip(line)
        } else {
            line
        }
    })
}

fn write_output(
    config: &EngineConfig,
    session: &ConflictSession<MemoryEditor>,
    target: &Path,
) -> Result<()> {
    let text = render_output(
        session.editor(),
        session.scanner(),
        config.cli.strip_annotations,
    );
    std::fs::write(target, text)
        .with_context(|| format!("failed to write {}", target.display()))?;
    info!(path = %target.display(), "result written");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_list(config: &EngineConfig, file: &Path, json: bool) -> Result<()> {
    let session = open_session(config, file)?;
    let blocks = session.blocks();

    if json {
        let doc = blocks_json(file, &blocks);
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    if blocks.is_empty() {
        println!();
        println!("{}", style::success("No conflicts"));
        println!();
        return Ok(());
    }

    println!();
    println!(
        "{}",
        style::header(&format!("Conflicts in {} ({})", file.display(), blocks.len()))
    );
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Lines", "Incoming", "Current"]);

    for (i, b) in blocks.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(format!("{}-{}", b.start + 1, b.end + 1)),
            Cell::new(format!(
                "{} ({} lines)",
                label_or_dash(&b.incoming_label),
                b.incoming_lines().len()
            )),
            Cell::new(format!(
                "{} ({} lines)",
                label_or_dash(&b.current_label),
                b.current_lines().len()
            )),
        ]);
    }

    println!("{}", table);
    println!();
    Ok(())
}

/// `list --json` document. Line numbers are 1-based.
fn blocks_json(file: &Path, blocks: &[ConflictBlock]) -> serde_json::Value {
    let entries: Vec<_> = blocks
        .iter()
        .map(|b| {
            serde_json::json!({
                "start_line": b.start + 1,
                "divider_line": b.divider + 1,
                "end_line": b.end + 1,
                "incoming_label": b.incoming_label,
                "current_label": b.current_label,
                "incoming_lines": b.incoming_lines().len(),
                "current_lines": b.current_lines().len(),
            })
        })
        .collect();
    serde_json::json!({
        "file": file.display().to_string(),
        "blocks": entries,
    })
}

fn label_or_dash(label: &str) -> &str {
    if label.is_empty() {
        "-"
    } else {
        label
    }
}

fn cmd_annotate(config: &EngineConfig, file: &Path) -> Result<()> {
    let session = open_session(config, file)?;
    print!("{}", annotated_view(session.editor(), &config.annotations.marker_class));
    Ok(())
}

/// The buffer with line numbers, controls drawn above their lines and
/// marker lines highlighted.
fn annotated_view(editor: &MemoryEditor, marker_class: &str) -> String {
    let width = editor.line_count().to_string().len();
    let mut out = String::new();

    for line in 0..editor.line_count() {
        for id in editor.widgets_on(line) {
            if let Some((widget, options)) = editor.widget(id) {
                if options.above {
                    let control = style::control(&widget.render_text(), widget.bold);
                    out.push_str(&format!("{:width$} {}\n", "", control));
                }
            }
        }

        let text = editor.line_text(line).unwrap_or_default();
        let number = style::dim(&format!("{:>width$}", line + 1));
        if editor.line_classes(line).iter().any(|c| c == marker_class) {
            out.push_str(&format!("{} {}\n", number, style::marker(text)));
        } else {
            out.push_str(&format!("{} {}\n", number, text));
        }
    }
    out
}

fn cmd_resolve(
    config: &EngineConfig,
    file: &Path,
    accept: &str,
    line: Option<usize>,
    all: bool,
    output: Option<&Path>,
) -> Result<()> {
    let branch: Branch = accept.parse().map_err(anyhow::Error::msg)?;
    let mut session = open_session(config, file)?;

    let resolved = if all {
        let mut count = 0;
        while let Some(block) = session.blocks().first().cloned() {
            session
                .resolve_at(block.start, branch)
                .with_context(|| format!("failed to resolve block at line {}", block.start + 1))?;
            count += 1;
        }
        count
    } else {
        let line = line
            .and_then(|l| l.checked_sub(1))
            .context("--line is 1-based and must be at least 1")?;
        session
            .resolve_at(line, branch)
            .with_context(|| format!("failed to resolve block at line {}", line + 1))?;
        1
    };

    if resolved == 0 {
        println!("{}", style::success("No conflicts"));
        return Ok(());
    }

    let target = output.unwrap_or(file);
    write_output(config, &session, target)?;

    let remaining = session.blocks().len();
    println!(
        "{}",
        style::success(&format!(
            "Resolved {} block(s) with {} → {}",
            resolved,
            branch,
            target.display()
        ))
    );
    if remaining > 0 {
        println!("{}", style::warn(&format!("{} block(s) left", remaining)));
    }
    Ok(())
}

fn cmd_interactive(config: &EngineConfig, file: &Path, output: Option<&Path>) -> Result<()> {
    let mut session = open_session(config, file)?;
    if session.editor().widget_ids().is_empty() {
        println!("{}", style::success("No conflicts"));
        return Ok(());
    }

    let summary = interactive::run(&mut session)?;
    if summary.resolved == 0 {
        println!("{}", style::dim("Nothing resolved, file left unchanged"));
        return Ok(());
    }

    let target = output.unwrap_or(file);
    write_output(config, &session, target)?;
    println!(
        "{}",
        style::success(&format!(
            "Resolved {} block(s) → {}",
            summary.resolved,
            target.display()
        ))
    );
    if summary.skipped > 0 {
        println!("{}", style::warn(&format!("{} block(s) skipped", summary.skipped)));
    }
    Ok(())
}

fn cmd_init(output: Option<&Path>) -> Result<()> {
    let output = match output {
        Some(path) => path.to_path_buf(),
        None => default_config_path().context("no platform config directory; pass --output")?,
    };

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let body = EngineConfig::default()
        .to_toml_string()
        .context("failed to render default configuration")?;
    let contents = format!("# mergemarks configuration\n\n{body}");
    std::fs::write(&output, contents).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Adjust labels, annotations or marker patterns as needed");
    println!(
        "  2. Validate with: mergemarks validate --config {}",
        output.display()
    );
    Ok(())
}

fn cmd_validate(explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => default_config_path().context("no platform config directory; pass --config")?,
    };
    println!("Validating configuration: {}", path.display());
    println!();

    let config = EngineConfig::load_from_file(&path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    match config.validate() {
        Ok(()) => println!("  [OK] All fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    println!("  Incoming marker : {}", config.markers.incoming_start);
    println!("  Divider         : {}", config.markers.divider);
    println!("  Current marker  : {}", config.markers.current_end);
    println!(
        "  Controls        : {}",
        ControlWidget::from_config(&config.controls).render_text()
    );
    let malformed = match config.resolver.malformed {
        MalformedPolicy::Reject => "reject",
        MalformedPolicy::Degrade => "degrade",
    };
    println!("  Malformed blocks: {}", malformed);
    println!("  Log level       : {}", config.cli.log_level);
    Ok(())
}
