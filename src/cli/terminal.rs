use anyhow::{Result, bail};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::ai::session::UserInterface;

/// Interactive prompt on stdin/stdout.
pub struct TerminalUi {
    editor: DefaultEditor,
}

impl TerminalUi {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl UserInterface for TerminalUi {
    fn show(&mut self, text: &str) {
        println!("{}", text);
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        println!("{}", prompt);
        match self.editor.readline(">>> ") {
            Ok(line) => {
                let _ = self.editor.add_history_entry(line.as_str());
                Ok(line)
            }
            Err(ReadlineError::Interrupted) => bail!("Interrupted"),
            Err(ReadlineError::Eof) => bail!("Reached end of input"),
            Err(err) => Err(err.into()),
        }
    }
}
