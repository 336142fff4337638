// ============================================================
// Layer 2 - Menu Controller
// ============================================================
// The interactive loop: draw the panel, read one line, dispatch.
//
//   "1" -> run the training command      (ProcessRunner)
//   "2" -> trigger the external workflow (WorkflowTrigger)
//   "3" -> print status
//   "4" -> say goodbye and stop
//   anything else -> warn and ask again
//
// Runner and trigger failures become styled messages and the
// loop carries on. Only console I/O errors leave `run`.

use std::io::{self, BufRead, Write};

use crate::domain::{
    menu::MenuChoice,
    traits::{CommandSpec, ProcessError, ProcessRunner, WorkflowTrigger},
};
use crate::infra::console::{Console, Role};

pub const MENU_TITLE: &str = "Career Compass CLI";
pub const PROMPT: &str = "Enter your choice: ";

const GOODBYE: &str = "Exiting Career Compass CLI. Goodbye!";
const INVALID_CHOICE: &str = "Invalid choice, please try again.";

/// Whether the loop keeps going after handling one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct MenuController<I, O> {
    console:       Console<I, O>,
    runner:        Box<dyn ProcessRunner>,
    workflow:      Box<dyn WorkflowTrigger>,
    train_command: CommandSpec,
}

impl<I: BufRead, O: Write> MenuController<I, O> {
    pub fn new(
        console:       Console<I, O>,
        runner:        Box<dyn ProcessRunner>,
        workflow:      Box<dyn WorkflowTrigger>,
        train_command: CommandSpec,
    ) -> Self {
        Self { console, runner, workflow, train_command }
    }

    /// Loop until the user picks Exit or input runs out.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            self.show_menu()?;
            let Some(line) = self.console.prompt(PROMPT)? else {
                tracing::debug!("Input closed; leaving the menu");
                self.console.print(Role::Info, GOODBYE)?;
                return Ok(());
            };
            if self.handle(&line)? == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Handle one line exactly as typed (line ending already removed).
    pub fn handle(&mut self, input: &str) -> io::Result<Flow> {
        match MenuChoice::parse(input) {
            Some(choice) => self.dispatch(choice),
            None => {
                self.console.print(Role::Warning, INVALID_CHOICE)?;
                Ok(Flow::Continue)
            }
        }
    }

    pub fn dispatch(&mut self, choice: MenuChoice) -> io::Result<Flow> {
        tracing::debug!("Menu choice: {}", choice);
        match choice {
            MenuChoice::TrainBrain  => self.train_brain()?,
            MenuChoice::RunWorkflow => self.run_workflow()?,
            MenuChoice::Status      => self.console.print(Role::Success, "System Online")?,
            MenuChoice::Exit => {
                self.console.print(Role::Info, GOODBYE)?;
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }

    #[cfg(test)]
    pub fn console(&self) -> &Console<I, O> {
        &self.console
    }

    fn show_menu(&mut self) -> io::Result<()> {
        let mut lines = vec![Vec::new()];
        for choice in MenuChoice::ALL {
            lines.push(vec![
                (Role::Menu, format!("{}. ", choice.key())),
                (Role::Info, choice.label().to_string()),
            ]);
        }
        lines.push(Vec::new());
        self.console.panel(MENU_TITLE, &lines)
    }

    fn train_brain(&mut self) -> io::Result<()> {
        self.console.print(Role::Info, "Initiating model training...")?;
        match self.runner.run(&self.train_command) {
            Ok(()) => self.console.print(Role::Success, "Model training completed successfully!"),
            Err(e @ ProcessError::NotFound { .. }) => self.console.print(
                Role::Error,
                &format!("{e}. Make sure the training executable exists."),
            ),
            Err(e) => {
                tracing::warn!("Training command failed: {}", e);
                self.console.print(Role::Error, &format!("Error during training: {e}"))
            }
        }
    }

    fn run_workflow(&mut self) -> io::Result<()> {
        self.console.print(Role::Info, "Triggering Kestra workflow...")?;
        match self.workflow.trigger() {
            Ok(()) => self.console.print(Role::Success, "Kestra workflow triggered successfully!"),
            Err(e) => {
                tracing::warn!("Workflow trigger failed: {}", e);
                self.console.print(Role::Error, &format!("Error triggering Kestra workflow: {e}"))
            }
        }
    }
}
