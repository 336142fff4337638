// ============================================================
// Layer 3 - Menu Choices
// ============================================================
// The four actions the interactive menu offers, as a closed enum.
// Parsing is an exact match on the digit the user typed, so
// " 1", "1 " or "one" are all rejected.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    TrainBrain,
    RunWorkflow,
    Status,
    Exit,
}

impl MenuChoice {
    /// Display order of the menu
    pub const ALL: [MenuChoice; 4] = [
        MenuChoice::TrainBrain,
        MenuChoice::RunWorkflow,
        MenuChoice::Status,
        MenuChoice::Exit,
    ];

    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "1" => Some(Self::TrainBrain),
            "2" => Some(Self::RunWorkflow),
            "3" => Some(Self::Status),
            "4" => Some(Self::Exit),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::TrainBrain  => "1",
            Self::RunWorkflow => "2",
            Self::Status      => "3",
            Self::Exit        => "4",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::TrainBrain  => "Train Brain",
            Self::RunWorkflow => "Run Workflow",
            Self::Status      => "Status",
            Self::Exit        => "Exit",
        }
    }
}

impl fmt::Display for MenuChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.key(), self.label())
    }
}
