//! Interactive menu and prompts
//!
//! The top-level menu reads exactly one line and dispatches: `1` runs the
//! processing exactly once, `2` exits, anything else prints an invalid-choice
//! message and terminates normally. There is no retry loop at this level.
//! The model-selection prompt below it retries until a valid key (or an empty
//! line for the default) is entered.
//!
//! All readers and writers are injected so the dispatch logic is testable
//! without a terminal.

use crate::error::Result;
use crate::models::ModelKind;
use std::io::{BufRead, Write};

/// Parsed top-level menu choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuChoice {
    /// Run the processing pipeline
    RunProcessing,
    /// Exit without processing
    Exit,
    /// Anything else, kept for the invalid-choice message
    Other(String),
}

impl MenuChoice {
    /// Parse one line of operator input
    #[must_use]
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "1" => MenuChoice::RunProcessing,
            "2" => MenuChoice::Exit,
            other => MenuChoice::Other(other.to_string()),
        }
    }
}

/// What the dispatcher did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    /// The processing run was invoked (exactly once)
    Ran,
    /// The operator chose to exit
    Exited,
    /// The input was not a valid choice; terminated normally
    Invalid,
}

/// Print the two-choice menu
///
/// # Errors
/// - Write failures on the output stream
pub fn print_menu<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "🎨 BACKGROUND REMOVAL TOOL")?;
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "1) Remove backgrounds from images in the input folder")?;
    writeln!(out, "2) Exit")?;
    Ok(())
}

/// Present the menu, read one line, and dispatch
///
/// `run` is invoked exactly once when the operator picks `1` and never
/// otherwise; the streams are re-lent to it so the run can drive its own
/// prompts. Invalid input and end-of-input both terminate normally after a
/// message; the caller maps the outcome to exit status 0. (The missing
/// environment precondition is checked before this function is reached and is
/// the only path that exits with status 1.)
///
/// # Errors
/// - Read/write failures on the streams
/// - Whatever error the processing run returns
pub fn dispatch<R: BufRead, W: Write, F>(input: &mut R, out: &mut W, run: F) -> Result<MenuOutcome>
where
    F: FnOnce(&mut R, &mut W) -> Result<()>,
{
    print_menu(out)?;
    write!(out, "Enter your choice (1-2): ")?;
    out.flush()?;

    let mut line = String::new();
    let bytes_read = input.read_line(&mut line)?;
    let choice = if bytes_read == 0 {
        MenuChoice::Other(String::new())
    } else {
        MenuChoice::parse(&line)
    };

    match choice {
        MenuChoice::RunProcessing => {
            run(input, out)?;
            Ok(MenuOutcome::Ran)
        },
        MenuChoice::Exit => {
            writeln!(out, "👋 Goodbye!")?;
            Ok(MenuOutcome::Exited)
        },
        MenuChoice::Other(other) => {
            writeln!(out, "Invalid choice: '{other}'. Expected 1 or 2.")?;
            Ok(MenuOutcome::Invalid)
        },
    }
}

/// Prompt for the quality level, retrying until a valid key is entered
///
/// An empty line selects the default model. End-of-input also falls back to
/// the default instead of looping forever.
///
/// # Errors
/// - Read/write failures on the streams
pub fn select_model<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<ModelKind> {
    writeln!(out, "\n📊 Select Quality Level:")?;
    writeln!(out, "{}", "-".repeat(40))?;
    for kind in ModelKind::all() {
        writeln!(out, "{}) {}", kind.menu_key(), kind.description())?;
    }
    writeln!(out, "{}", "-".repeat(40))?;

    loop {
        write!(out, "Enter your choice (1-5) [default: 1]: ")?;
        out.flush()?;

        let mut line = String::new();
        let bytes_read = input.read_line(&mut line)?;
        if bytes_read == 0 || line.trim().is_empty() {
            return Ok(ModelKind::default());
        }
        if let Some(kind) = ModelKind::from_menu_key(&line) {
            return Ok(kind);
        }
        writeln!(out, "Invalid choice. Please enter 1-5.")?;
    }
}

/// Prompt for processing options: alpha matting and mask-only output
///
/// Returns `(alpha_matting, only_mask)`. Defaults match the original tool:
/// matting on, mask-only off.
///
/// # Errors
/// - Read/write failures on the streams
pub fn select_options<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<(bool, bool)> {
    writeln!(out, "\n⚙️  Processing Options:")?;
    writeln!(out, "{}", "-".repeat(40))?;

    write!(out, "Enable alpha matting for smoother edges? (y/n) [default: y]: ")?;
    out.flush()?;
    let alpha_matting = !read_answer(input)?.eq_ignore_ascii_case("n");

    write!(out, "Save mask only (black/white)? (y/n) [default: n]: ")?;
    out.flush()?;
    let only_mask = read_answer(input)?.eq_ignore_ascii_case("y");

    Ok((alpha_matting, only_mask))
}

fn read_answer<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Cursor;

    fn dispatch_with(input: &str) -> (MenuOutcome, String, usize) {
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let mut out = Vec::new();
        let invocations = Cell::new(0usize);

        let outcome = dispatch(&mut reader, &mut out, |_, _| {
            invocations.set(invocations.get() + 1);
            Ok(())
        })
        .unwrap();

        (
            outcome,
            String::from_utf8(out).unwrap(),
            invocations.get(),
        )
    }

    #[test]
    fn test_choice_one_runs_exactly_once() {
        let (outcome, output, invocations) = dispatch_with("1\n");
        assert_eq!(outcome, MenuOutcome::Ran);
        assert_eq!(invocations, 1);
        assert!(output.contains("BACKGROUND REMOVAL TOOL"));
    }

    #[test]
    fn test_choice_two_exits_without_running() {
        let (outcome, output, invocations) = dispatch_with("2\n");
        assert_eq!(outcome, MenuOutcome::Exited);
        assert_eq!(invocations, 0);
        assert!(output.contains("Goodbye"));
    }

    #[test]
    fn test_other_input_is_invalid_and_does_not_run() {
        for bad in ["9\n", "yes\n", "\n", "12\n"] {
            let (outcome, output, invocations) = dispatch_with(bad);
            assert_eq!(outcome, MenuOutcome::Invalid, "input: {bad:?}");
            assert_eq!(invocations, 0);
            assert!(output.contains("Invalid choice"));
        }
    }

    #[test]
    fn test_end_of_input_is_invalid() {
        let (outcome, _, invocations) = dispatch_with("");
        assert_eq!(outcome, MenuOutcome::Invalid);
        assert_eq!(invocations, 0);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let (outcome, _, invocations) = dispatch_with("  1  \n");
        assert_eq!(outcome, MenuOutcome::Ran);
        assert_eq!(invocations, 1);
    }

    #[test]
    fn test_run_error_propagates() {
        let mut reader = Cursor::new(b"1\n".to_vec());
        let mut out = Vec::new();
        let result = dispatch(&mut reader, &mut out, |_, _| {
            Err(crate::error::RemovalError::processing("boom"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_select_model_default_on_empty() {
        let mut reader = Cursor::new(b"\n".to_vec());
        let mut out = Vec::new();
        let kind = select_model(&mut reader, &mut out).unwrap();
        assert_eq!(kind, ModelKind::U2Net);
    }

    #[test]
    fn test_select_model_retries_until_valid() {
        let mut reader = Cursor::new(b"7\nabc\n3\n".to_vec());
        let mut out = Vec::new();
        let kind = select_model(&mut reader, &mut out).unwrap();
        assert_eq!(kind, ModelKind::U2NetHumanSeg);

        let output = String::from_utf8(out).unwrap();
        assert_eq!(output.matches("Invalid choice").count(), 2);
    }

    #[test]
    fn test_select_model_eof_falls_back_to_default() {
        let mut reader = Cursor::new(b"7\n".to_vec());
        let mut out = Vec::new();
        let kind = select_model(&mut reader, &mut out).unwrap();
        assert_eq!(kind, ModelKind::U2Net);
    }

    #[test]
    fn test_select_options_defaults() {
        let mut reader = Cursor::new(b"\n\n".to_vec());
        let mut out = Vec::new();
        let (alpha_matting, only_mask) = select_options(&mut reader, &mut out).unwrap();
        assert!(alpha_matting);
        assert!(!only_mask);
    }

    #[test]
    fn test_select_options_explicit() {
        let mut reader = Cursor::new(b"n\ny\n".to_vec());
        let mut out = Vec::new();
        let (alpha_matting, only_mask) = select_options(&mut reader, &mut out).unwrap();
        assert!(!alpha_matting);
        assert!(only_mask);
    }
}
