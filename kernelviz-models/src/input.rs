use std::{fmt, str::FromStr};

use snafu::prelude::*;

const MAX_GRID_SIZE: i64 = 20;

#[derive(Snafu, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[snafu(display("Grid size must be a positive integer and less than or equal to 20"))]
    GridSizeOutOfRange { value: i64 },
    #[snafu(display("Kernel size must be a positive integer"))]
    KernelSizeNotPositive { value: i64 },
    #[snafu(display("Expression must not be empty"))]
    EmptyExpression,
    #[snafu(display("{input:?} is not an integer"))]
    NotAnInteger { input: String },
}

/// Side length of the square number grid, `1..=20`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GridSize(u32);

impl GridSize {
    pub const DEFAULT: GridSize = GridSize(10);

    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value > 0 && value <= MAX_GRID_SIZE {
            Ok(Self(value as u32))
        } else {
            Err(ValidationError::GridSizeOutOfRange { value })
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for GridSize {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(parse_integer(s)?)
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KernelSize(u32);

impl KernelSize {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value > 0 && value <= u32::MAX as i64 {
            Ok(Self(value as u32))
        } else {
            Err(ValidationError::KernelSizeNotPositive { value })
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl FromStr for KernelSize {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(parse_integer(s)?)
    }
}

impl fmt::Display for KernelSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kernel expression in `x` and `y`, evaluated by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression(String);

impl Expression {
    pub fn new(expression: impl Into<String>) -> Result<Self, ValidationError> {
        let expression = expression.into();
        let trimmed = expression.trim();

        ensure!(!trimmed.is_empty(), EmptyExpressionSnafu);

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Expression {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn parse_integer(input: &str) -> Result<i64, ValidationError> {
    input
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::NotAnInteger {
            input: input.to_string(),
        })
}
