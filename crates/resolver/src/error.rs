//! Error types for expression evaluation and bundle execution.

use std::result::Result as StdResult;

use surface_config::BundleError;
use thiserror::Error;

/// Status code reported for any failed evaluation or compile.
pub const FAILURE_STATUS: i32 = 2;

/// Failure to evaluate a single expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("error evaluating `{expr}`: {message}")]
    /// The expression did not parse or raised while running.
    Eval {
        /// The expression, without its `$` prefix.
        expr: String,
        /// Engine diagnostic.
        message: String,
    },
    #[error("error resolving variable `{name}`: {message}")]
    /// A variable declaration failed.
    Variable {
        /// Declared variable name.
        name: String,
        /// Engine diagnostic.
        message: String,
    },
    #[error("variable `{name}` must be a scalar expression")]
    /// A declaration value that cannot be read as an expression.
    NotAnExpression {
        /// Declared variable name.
        name: String,
    },
}

impl ExprError {
    /// Non-zero status reported to callers.
    pub fn status(&self) -> i32 {
        FAILURE_STATUS
    }
}

/// Failure to compile a template string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("couldn't compile `{template}`: {error}")]
pub struct CompileError {
    /// The uncompiled template, returned untouched.
    pub template: String,
    /// The expression failure that aborted the compile.
    pub error: ExprError,
}

impl CompileError {
    /// Non-zero status reported to callers.
    pub fn status(&self) -> i32 {
        self.error.status()
    }

    /// The original template text.
    pub fn original(&self) -> &str {
        &self.template
    }
}

/// Failure of one item of an action bundle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error(transparent)]
    /// Template text in the item did not compile.
    Compile(#[from] CompileError),
    #[error(transparent)]
    /// The bundle value had an unsupported shape.
    Bundle(#[from] BundleError),
    #[error("unknown command type: {tag}")]
    /// A tag with no handler.
    UnknownDirective {
        /// The tag as written.
        tag: String,
    },
    #[error("invalid page change: {page}")]
    /// The page collaborator refused the change.
    PageChange {
        /// Requested page.
        page: String,
    },
    #[error("`{tag}` failed: {message}")]
    /// A collaborator reported failure.
    Host {
        /// Directive tag.
        tag: String,
        /// Collaborator message.
        message: String,
    },
}

/// Errors constructing a resolver.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid placeholder pattern: {0}")]
    /// The placeholder pattern failed to compile.
    Pattern(#[from] regex::Error),
}

/// Result alias for resolver construction.
pub type Result<T> = StdResult<T, Error>;
