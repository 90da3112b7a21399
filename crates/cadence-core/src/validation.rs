//! Validator - create/modify の前に走る純粋なチェック
//!
//! 不足しているフィールドはすべてまとめて 1 つのエラーにします
//! （最初の 1 件で止めない）。

use crate::domain::{OrgId, TaskId, UserId};
use crate::error::StoreError;
use crate::options::TaskOptions;
use crate::ports::ScriptParser;

/// Namespace for the store validation functions:
/// `StoreValidator::create_args(...)`.
pub struct StoreValidator;

impl StoreValidator {
    /// Returns the script's parsed options, or `InvalidArgument` if any of the
    /// fields needed to create a task is missing or the script does not parse.
    pub fn create_args(
        parser: &dyn ScriptParser,
        org: OrgId,
        user: UserId,
        script: &str,
    ) -> Result<TaskOptions, StoreError> {
        let mut missing = Vec::new();
        if !org.is_valid() {
            missing.push("organization ID");
        }
        if !user.is_valid() {
            missing.push("user ID");
        }
        if script.is_empty() {
            missing.push("script");
        }
        if !missing.is_empty() {
            return Err(StoreError::InvalidArgument(format!(
                "missing required fields to create task: {}",
                missing.join(", ")
            )));
        }

        parse_script(parser, script)
    }

    /// Same as `create_args`, for modifying an existing task.
    pub fn modify_args(
        parser: &dyn ScriptParser,
        task_id: TaskId,
        script: &str,
    ) -> Result<TaskOptions, StoreError> {
        let mut missing = Vec::new();
        if !task_id.is_valid() {
            missing.push("task ID");
        }
        if script.is_empty() {
            missing.push("script");
        }
        if !missing.is_empty() {
            return Err(StoreError::InvalidArgument(format!(
                "missing required fields to modify task: {}",
                missing.join(", ")
            )));
        }

        parse_script(parser, script)
    }
}

fn parse_script(parser: &dyn ScriptParser, script: &str) -> Result<TaskOptions, StoreError> {
    parser
        .parse(script)
        .map_err(|err| StoreError::InvalidArgument(format!("invalid task script: {err}")))
}
