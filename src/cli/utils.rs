use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::types::Profile;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(body)) = (data, response.as_object_mut()) {
                body.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let response = json!({
                "success": false,
                "error": message
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

pub fn output_profile(output_format: &OutputFormat, profile: &Profile) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "user": profile }))?);
        }
        OutputFormat::Text => {
            for line in profile_lines(profile) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn profile_lines(profile: &Profile) -> Vec<String> {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    vec![
        format!("ID:           {}", profile.id),
        format!("Email:        {}", text(&profile.email)),
        format!("Display name: {}", text(&profile.display_name)),
        format!("First name:   {}", text(&profile.first_name)),
        format!("Last name:    {}", text(&profile.last_name)),
        format!("Age:          {}", profile.age.map(|age| age.to_string()).unwrap_or_default()),
        format!("Occupation:   {}", text(&profile.occupation)),
    ]
}

/// Use the given password, or prompt for one on stdin
pub fn password_or_prompt(password: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    eprint!("Password: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();

    if password.is_empty() {
        anyhow::bail!("Password is required");
    }
    Ok(password)
}
