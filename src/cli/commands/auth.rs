use clap::Subcommand;
use serde_json::json;

use super::CliSession;
use crate::cli::utils::{output_error, output_profile, output_success, password_or_prompt};
use crate::cli::OutputFormat;
use crate::client::Registration;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Sign in with email and password")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, env = "PROFILE_PASSWORD", hide_env_values = true, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Create an account and its profile")]
    Register {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, env = "PROFILE_PASSWORD", hide_env_values = true, help = "Password (will prompt if not provided)")]
        password: Option<String>,
        #[arg(long, help = "First name")]
        first_name: Option<String>,
        #[arg(long, help = "Last name")]
        last_name: Option<String>,
        #[arg(long, help = "Age")]
        age: Option<i64>,
        #[arg(long, help = "Occupation")]
        occupation: Option<String>,
    },

    #[command(about = "Sign out and forget the stored session")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let cli = CliSession::open()?;

    match cmd {
        AuthCommands::Login { email, password } => {
            let password = password_or_prompt(password)?;
            let result = cli.session.login(&email, &password).await;
            cli.persist().await?;

            match result {
                Ok(user) => output_success(
                    &output_format,
                    &format!("Signed in as {}", user.email.as_deref().unwrap_or(&user.id)),
                    Some(json!({ "user": user })),
                ),
                Err(e) => {
                    output_error(&output_format, &e.to_string())?;
                    anyhow::bail!("login failed")
                }
            }
        }
        AuthCommands::Register {
            email,
            password,
            first_name,
            last_name,
            age,
            occupation,
        } => {
            let registration = Registration {
                password: password_or_prompt(password)?,
                email,
                first_name,
                last_name,
                age,
                occupation,
            };
            let result = cli.session.register(&registration).await;
            cli.persist().await?;

            match result {
                Ok(user) => output_success(
                    &output_format,
                    &format!("Registered {}", user.email.as_deref().unwrap_or(&user.id)),
                    Some(json!({ "user": user })),
                ),
                Err(e) => {
                    output_error(&output_format, &e.to_string())?;
                    anyhow::bail!("registration failed")
                }
            }
        }
        AuthCommands::Logout => {
            if let Err(e) = cli.session.logout().await {
                tracing::warn!("Sign-out reported an error: {}", e);
            }
            cli.persist().await?;
            output_success(&output_format, "Signed out", None)
        }
        AuthCommands::Status => {
            let state = cli.session.state();
            match &state.user {
                Some(user) if state.is_authenticated => {
                    output_success(&output_format, "Signed in", Some(json!({ "session": state })))?;
                    if matches!(output_format, OutputFormat::Text) {
                        output_profile(&output_format, user)?;
                    }
                    Ok(())
                }
                _ => output_success(&output_format, "Not signed in", Some(json!({ "session": state }))),
            }
        }
    }
}
