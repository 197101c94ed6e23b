//! Rendering of results and failures for the terminal.

use anyhow::Result;
use user_directory::{User, UserDirectoryError};

const HEADERS: [&str; 3] = ["ID", "USER NAME", "EMAIL"];

/// Aligned plain-text table, one row per user.
pub fn table(users: &[User]) -> String {
    let rows: Vec<[String; 3]> = users
        .iter()
        .map(|u| [u.id.to_string(), u.user_name.clone(), u.email.clone()])
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &HEADERS.map(str::to_string), &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String; 3], widths: &[usize; 3]) {
    let line = format!(
        "{:<w0$}  {:<w1$}  {}",
        cells[0],
        cells[1],
        cells[2],
        w0 = widths[0],
        w1 = widths[1],
    );
    out.push_str(line.trim_end());
    out.push('\n');
}

pub fn users(users: &[User], json: bool) -> Result<String> {
    if json {
        Ok(format!("{}\n", serde_json::to_string_pretty(users)?))
    } else {
        Ok(table(users))
    }
}

pub fn user(user: &User, json: bool) -> Result<String> {
    if json {
        Ok(format!("{}\n", serde_json::to_string_pretty(user)?))
    } else {
        Ok(table(std::slice::from_ref(user)))
    }
}

/// The message shown to the operator for a failed directory call.
pub fn alert(err: &UserDirectoryError) -> String {
    match err {
        UserDirectoryError::Conflict { .. } => {
            "User already exists. Please use a different username.".to_string()
        }
        UserDirectoryError::Server { message, .. } => message.clone(),
        UserDirectoryError::Transport { message } => {
            format!("Could not reach the user directory: {message}")
        }
    }
}
