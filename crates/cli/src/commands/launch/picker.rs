use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

/// One selectable row presented by a picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickItem {
    pub label: String,
}

/// Outcome of presenting a candidate list plus the synthetic "add new" item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Index into the candidate list handed to the picker.
    Existing(usize),
    AddNew,
}

#[derive(thiserror::Error, Debug)]
pub enum PickError {
    /// The user dismissed the selection dialog. Swallowed at the top of the
    /// workflow; never rendered as an error.
    #[error("selection cancelled")]
    Cancelled,

    #[error("failed to read selection: {0}")]
    Io(#[from] io::Error),
}

impl PickError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PickError::Cancelled)
    }
}

/// Interaction seam of the launch workflow. Implementations carry no
/// business logic: they present labels and report a single choice.
pub trait ExecutablePicker {
    /// Presents `items` with the "add new" action appended last. Dismissal
    /// maps to [PickError::Cancelled].
    fn pick(&mut self, items: &[PickItem], add_new_label: &str) -> Result<Choice, PickError>;

    /// Asks for the path to a new executable. Dismissal maps to
    /// [PickError::Cancelled].
    fn pick_new_path(&mut self, open_label: &str) -> Result<PathBuf, PickError>;
}

/// Interactive picker: a numbered console menu, with a native file dialog
/// for choosing new executables.
pub struct ConsolePicker;

impl ExecutablePicker for ConsolePicker {
    fn pick(&mut self, items: &[PickItem], add_new_label: &str) -> Result<Choice, PickError> {
        let mut stderr = io::stderr().lock();

        for (index, item) in items.iter().enumerate() {
            writeln!(stderr, "  {}) {}", index + 1, item.label)?;
        }
        writeln!(stderr, "  {}) {add_new_label}", items.len() + 1)?;
        write!(stderr, "> ")?;
        stderr.flush()?;

        let mut line = String::new();
        let bytes_read = io::stdin().lock().read_line(&mut line)?;

        // EOF, an empty line, and malformed input all count as dismissal.
        if bytes_read == 0 {
            return Err(PickError::Cancelled);
        }

        match line.trim().parse::<usize>() {
            Ok(selected) if (1..=items.len()).contains(&selected) => {
                Ok(Choice::Existing(selected - 1))
            }
            Ok(selected) if selected == items.len() + 1 => Ok(Choice::AddNew),
            _ => Err(PickError::Cancelled),
        }
    }

    fn pick_new_path(&mut self, open_label: &str) -> Result<PathBuf, PickError> {
        rfd::FileDialog::new()
            .set_title(open_label)
            .pick_file()
            .ok_or(PickError::Cancelled)
    }
}
