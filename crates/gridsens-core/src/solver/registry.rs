use super::backend::{FaerSolver, GaussSolver, LinearSystemBackend};
use crate::error::GridError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Dense linear backend selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SolverKind {
    Gauss,
    #[default]
    Faer,
}

impl SolverKind {
    pub fn build(self) -> Arc<dyn LinearSystemBackend> {
        match self {
            SolverKind::Gauss => Arc::new(GaussSolver),
            SolverKind::Faer => Arc::new(FaerSolver),
        }
    }

    pub fn available() -> &'static [&'static str] {
        &["gauss", "faer"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolverKind::Gauss => "gauss",
            SolverKind::Faer => "faer",
        }
    }
}

impl FromStr for SolverKind {
    type Err = GridError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "gauss" => Ok(SolverKind::Gauss),
            "faer" | "default" => Ok(SolverKind::Faer),
            other => Err(GridError::Config(format!(
                "unknown solver '{}'; supported values: {}",
                other,
                Self::available().join(", ")
            ))),
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
