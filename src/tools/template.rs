//! Print a bundled config template

use super::ToolError;
use crate::config::template_text;

pub fn template_output(revision: u32) -> Result<&'static str, ToolError> {
    Ok(template_text(revision)?)
}
