//! User prompt utilities for interactive confirmation

use anyhow::Result;
use dialoguer::Confirm;

/// Ask user for yes/no confirmation
pub fn confirm(prompt: &str) -> Result<bool> {
    let result = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    Ok(result)
}

/// Ask for confirmation and fail with `abort_message` when declined
pub fn confirm_or_abort(prompt: &str, abort_message: &str) -> Result<()> {
    if confirm(prompt)? {
        Ok(())
    } else {
        Err(anyhow::anyhow!("{}", abort_message))
    }
}
