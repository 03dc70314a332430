//! Undo/Redo system for result edits.
//!
//! Every change to an annotation's results is recorded as a `ResultCommand`
//! holding full result snapshots. Commands are replayed through a `ResultSink`,
//! so they only ever talk to the model and never read canvas state.

use thiserror::Error;

use crate::error::ModelError;
use crate::model::AnnotationResult;

// ============================================================================
// Command Types
// ============================================================================

/// What a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandMode {
    Add,
    Remove,
    /// Geometry or metadata edit made outside the canvas; redo refreshes the canvas.
    Modify,
    /// Edit made on the canvas itself; redo leaves the canvas alone.
    ModifyNoUpdate,
    /// `results_old` were replaced by `results`.
    Merge,
}

impl CommandMode {
    pub fn name(&self) -> &'static str {
        match self {
            CommandMode::Add => "Add",
            CommandMode::Remove => "Remove",
            CommandMode::Modify => "Modify",
            CommandMode::ModifyNoUpdate => "ModifyNoUpdate",
            CommandMode::Merge => "Merge",
        }
    }

    fn needs_old(&self) -> bool {
        matches!(
            self,
            CommandMode::Modify | CommandMode::ModifyNoUpdate | CommandMode::Merge
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UndoError {
    #[error("{mode} command needs the previous results")]
    MissingOldResults { mode: &'static str },

    #[error("{mode} command carries no results")]
    Empty { mode: &'static str },
}

/// Receiver of replayed commands, implemented by whoever owns the results.
pub trait ResultSink {
    fn add_results(&mut self, results: &[AnnotationResult]) -> Result<(), ModelError>;

    fn remove_results(&mut self, results: &[AnnotationResult]) -> Result<(), ModelError>;

    /// Replace results by id. `update_canvas` tells whether the canvas must be
    /// refreshed from the model afterwards.
    fn modify_results(
        &mut self,
        results: &[AnnotationResult],
        update_canvas: bool,
    ) -> Result<(), ModelError>;
}

/// A recorded, reversible change to the current annotation's results.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultCommand {
    mode: CommandMode,
    results: Vec<AnnotationResult>,
    results_old: Vec<AnnotationResult>,
}

impl ResultCommand {
    /// Build a command, checking that modes which replace results carry the old ones.
    pub fn new(
        mode: CommandMode,
        results: Vec<AnnotationResult>,
        results_old: Option<Vec<AnnotationResult>>,
    ) -> Result<Self, UndoError> {
        if results.is_empty() {
            return Err(UndoError::Empty { mode: mode.name() });
        }
        let results_old = results_old.unwrap_or_default();
        if mode.needs_old() && results_old.is_empty() {
            return Err(UndoError::MissingOldResults { mode: mode.name() });
        }
        Ok(Self {
            mode,
            results,
            results_old,
        })
    }

    pub fn add(results: Vec<AnnotationResult>) -> Result<Self, UndoError> {
        Self::new(CommandMode::Add, results, None)
    }

    pub fn remove(results: Vec<AnnotationResult>) -> Result<Self, UndoError> {
        Self::new(CommandMode::Remove, results, None)
    }

    pub fn modify(
        results: Vec<AnnotationResult>,
        results_old: Vec<AnnotationResult>,
    ) -> Result<Self, UndoError> {
        Self::new(CommandMode::Modify, results, Some(results_old))
    }

    pub fn modify_no_update(
        results: Vec<AnnotationResult>,
        results_old: Vec<AnnotationResult>,
    ) -> Result<Self, UndoError> {
        Self::new(CommandMode::ModifyNoUpdate, results, Some(results_old))
    }

    pub fn merge(
        merged: Vec<AnnotationResult>,
        sources: Vec<AnnotationResult>,
    ) -> Result<Self, UndoError> {
        Self::new(CommandMode::Merge, merged, Some(sources))
    }

    pub fn mode(&self) -> CommandMode {
        self.mode
    }

    pub fn results(&self) -> &[AnnotationResult] {
        &self.results
    }

    pub fn results_old(&self) -> &[AnnotationResult] {
        &self.results_old
    }

    /// Get a human-readable description of this command
    pub fn description(&self) -> String {
        let n = self.results.len();
        let plural = if n == 1 { "" } else { "s" };
        match self.mode {
            CommandMode::Add => format!("Add {} result{}", n, plural),
            CommandMode::Remove => format!("Delete {} result{}", n, plural),
            CommandMode::Modify | CommandMode::ModifyNoUpdate => {
                format!("Edit {} result{}", n, plural)
            }
            CommandMode::Merge => format!("Merge {} results", self.results_old.len()),
        }
    }

    /// Re-apply the command.
    pub fn redo(&self, sink: &mut dyn ResultSink) -> Result<(), ModelError> {
        match self.mode {
            CommandMode::Add => sink.add_results(&self.results),
            CommandMode::Remove => sink.remove_results(&self.results),
            CommandMode::Modify => sink.modify_results(&self.results, true),
            CommandMode::ModifyNoUpdate => sink.modify_results(&self.results, false),
            CommandMode::Merge => {
                sink.remove_results(&self.results_old)?;
                sink.add_results(&self.results)
            }
        }
    }

    /// Reverse the command.
    pub fn undo(&self, sink: &mut dyn ResultSink) -> Result<(), ModelError> {
        match self.mode {
            CommandMode::Add => sink.remove_results(&self.results),
            CommandMode::Remove => sink.add_results(&self.results),
            CommandMode::Modify => sink.modify_results(&self.results_old, false),
            CommandMode::ModifyNoUpdate => sink.modify_results(&self.results_old, true),
            CommandMode::Merge => {
                sink.remove_results(&self.results)?;
                sink.add_results(&self.results_old)
            }
        }
    }
}

// ============================================================================
// Undo Stack
// ============================================================================

/// Configuration for the undo stack
#[derive(Debug, Clone)]
pub struct UndoConfig {
    /// Maximum number of commands to keep in history
    pub max_history: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self { max_history: 100 }
    }
}

/// The undo/redo history stack.
///
/// Pushing a new command clears the redo stack. Undo moves the newest command
/// to the redo stack, redo moves it back.
#[derive(Debug, Clone, Default)]
pub struct UndoStack {
    undo_stack: Vec<ResultCommand>,
    redo_stack: Vec<ResultCommand>,
    config: UndoConfig,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: UndoConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Push a command to the undo stack.
    /// This clears the redo stack (can't redo after a new action).
    pub fn push(&mut self, command: ResultCommand) {
        log::debug!("📝 Undo: pushed '{}'", command.description());
        self.undo_stack.push(command);
        self.redo_stack.clear();

        while self.undo_stack.len() > self.config.max_history {
            self.undo_stack.remove(0);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Pop a command for undoing. The command is moved to the redo stack.
    pub fn pop_undo(&mut self) -> Option<ResultCommand> {
        let cmd = self.undo_stack.pop()?;
        log::debug!("⏪ Undo: '{}'", cmd.description());
        self.redo_stack.push(cmd.clone());
        Some(cmd)
    }

    /// Pop a command for redoing. The command is moved back to the undo stack.
    pub fn pop_redo(&mut self) -> Option<ResultCommand> {
        let cmd = self.redo_stack.pop()?;
        log::debug!("⏩ Redo: '{}'", cmd.description());
        self.undo_stack.push(cmd.clone());
        Some(cmd)
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.last().map(|c| c.description())
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|c| c.description())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        log::debug!("🗑️ Undo history cleared");
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

/// Undo the newest command against `sink`. Returns false if there was nothing to undo.
pub fn undo_command(stack: &mut UndoStack, sink: &mut dyn ResultSink) -> Result<bool, ModelError> {
    let Some(cmd) = stack.pop_undo() else {
        return Ok(false);
    };
    cmd.undo(sink)?;
    Ok(true)
}

/// Redo the newest undone command against `sink`. Returns false if there was nothing to redo.
pub fn redo_command(stack: &mut UndoStack, sink: &mut dyn ResultSink) -> Result<bool, ModelError> {
    let Some(cmd) = stack.pop_redo() else {
        return Ok(false);
    };
    cmd.redo(sink)?;
    Ok(true)
}

// ============================================================================
// Tests
// ============================================================================
