//! Input checks applied before any request leaves the process.

use anyhow::{bail, Result};
use user_directory::UserFields;

/// Build the request payload from raw command-line values.
///
/// Surrounding whitespace is dropped; both fields are required and the
/// email must look like `local@domain.tld`.
pub fn user_fields(user_name: &str, email: &str) -> Result<UserFields> {
    let user_name = user_name.trim();
    let email = email.trim();

    if user_name.is_empty() {
        bail!("User name is required");
    }
    if email.is_empty() {
        bail!("Email is required");
    }
    if !looks_like_email(email) {
        bail!("Invalid email address: '{email}'");
    }

    Ok(UserFields::new(user_name, email))
}

fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
