//! Prompt-per-control conflict resolution.
//!
//! Each pick is delivered to the session as a control activation, the same
//! way a graphical host would report a click, and the resulting change
//! notifications are pumped back so undo restores a working control.

use std::collections::HashSet;

use anyhow::{Context, Result};
use dialoguer::Select;

use mergemarks_core::conflict::Branch;
use mergemarks_core::editor::{HostEditor, MemoryEditor, WidgetId};
use mergemarks_core::session::{ConflictSession, EditorEvent, EventOutcome};

use crate::style;

/// What the user did over one interactive run.
#[derive(Debug, Default)]
pub struct Summary {
    pub resolved: usize,
    pub skipped: usize,
}

#[derive(Clone, Copy)]
enum Pick {
    Accept(Branch),
    Skip,
    Undo,
}

/// Walk the controls in buffer order until none are left unanswered.
pub fn run(session: &mut ConflictSession<MemoryEditor>) -> Result<Summary> {
    let mut summary = Summary::default();
    let mut skipped: HashSet<WidgetId> = HashSet::new();

    loop {
        let Some(widget) = session
            .editor()
            .widget_ids()
            .into_iter()
            .find(|id| !skipped.contains(id))
        else {
            break;
        };
        let line = session
            .editor()
            .widget_line(widget)
            .context("control lost its line")?;

        println!();
        show_block(session, line);

        let (labels, picks) = menu(session, widget, summary.resolved > 0)?;
        let choice = Select::new()
            .with_prompt(format!("Conflict at line {}", line + 1))
            .items(&labels)
            .default(0)
            .interact()
            .context("failed to read selection")?;

        match picks[choice] {
            Pick::Accept(branch) => {
                match session.handle(EditorEvent::Activate { widget, branch }) {
                    Ok(EventOutcome::Resolved(_)) => summary.resolved += 1,
                    Ok(_) => {}
                    Err(e) => {
                        println!("{}", style::error(&e.to_string()));
                        skipped.insert(widget);
                        summary.skipped += 1;
                    }
                }
                session.pump()?;
            }
            Pick::Skip => {
                skipped.insert(widget);
                summary.skipped += 1;
            }
            Pick::Undo => {
                if session.editor_mut().undo() {
                    summary.resolved -= 1;
                    if let EventOutcome::Scanned(report) = session.pump()? {
                        println!(
                            "{}",
                            style::dim(&format!(
                                "Restored {} conflict(s)",
                                report.controls_attached.len()
                            ))
                        );
                    }
                }
            }
        }
    }

    Ok(summary)
}

/// Menu entries for `widget`: its choices, then skip, then undo when there
/// is a resolution to take back.
fn menu(
    session: &ConflictSession<MemoryEditor>,
    widget: WidgetId,
    can_undo: bool,
) -> Result<(Vec<String>, Vec<Pick>)> {
    let (control, _) = session
        .editor()
        .widget(widget)
        .context("control disappeared")?;

    let mut labels: Vec<String> = control.choices.iter().map(|c| c.label.clone()).collect();
    let mut picks: Vec<Pick> = control
        .choices
        .iter()
        .map(|c| Pick::Accept(c.branch))
        .collect();

    labels.push("Skip".into());
    picks.push(Pick::Skip);
    if can_undo && session.editor().can_undo() {
        labels.push("Undo last resolution".into());
        picks.push(Pick::Undo);
    }
    Ok((labels, picks))
}

/// Print the block starting at `line`, or just the line when it does not
/// form a complete block.
fn show_block(session: &ConflictSession<MemoryEditor>, line: usize) {
    let editor = session.editor();
    let range = session
        .blocks()
        .into_iter()
        .find(|b| b.start == line)
        .map_or(line..=line, |b| b.start..=b.end);

    for i in range {
        let text = editor.line_text(i).unwrap_or_default();
        let number = style::dim(&format!("{:>5}", i + 1));
        if session.scanner().patterns().is_marker(text) {
            println!("{} {}", number, style::marker(text));
        } else {
            println!("{} {}", number, text);
        }
    }
}
