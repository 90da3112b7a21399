//! ScriptParser port - スクリプトから task options を取り出す
//!
//! Validator だけが使います。ストアにとっては不透明なオラクルです。

use crate::options::{OptionsError, TaskOptions};

pub trait ScriptParser: Send + Sync {
    fn parse(&self, script: &str) -> Result<TaskOptions, OptionsError>;
}
