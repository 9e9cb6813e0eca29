use clap::{Args, Subcommand, ValueEnum};
use serde_json::json;

use super::CliSession;
use crate::cli::utils::{output_error, output_profile, output_success};
use crate::cli::OutputFormat;
use crate::client::UpdateOutcome;
use crate::types::ProfilePatch;

#[derive(Subcommand)]
pub enum ProfileCommands {
    #[command(about = "Fetch and show your profile")]
    Show,

    #[command(about = "Update profile fields; only changed values are sent")]
    Update(UpdateArgs),
}

#[derive(Args)]
pub struct UpdateArgs {
    #[arg(long, help = "Display name")]
    pub display_name: Option<String>,
    #[arg(long, help = "First name")]
    pub first_name: Option<String>,
    #[arg(long, help = "Last name")]
    pub last_name: Option<String>,
    #[arg(long, help = "Age")]
    pub age: Option<i64>,
    #[arg(long, help = "Occupation")]
    pub occupation: Option<String>,
    #[arg(long, value_enum, help = "Set a field to null (repeatable)")]
    pub clear: Vec<ProfileField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileField {
    DisplayName,
    FirstName,
    LastName,
    Age,
    Occupation,
}

impl UpdateArgs {
    pub fn into_patch(self) -> ProfilePatch {
        let mut patch = ProfilePatch {
            id: None,
            display_name: self.display_name.map(Some),
            first_name: self.first_name.map(Some),
            last_name: self.last_name.map(Some),
            age: self.age.map(Some),
            occupation: self.occupation.map(Some),
        };

        for field in self.clear {
            match field {
                ProfileField::DisplayName => patch.display_name = Some(None),
                ProfileField::FirstName => patch.first_name = Some(None),
                ProfileField::LastName => patch.last_name = Some(None),
                ProfileField::Age => patch.age = Some(None),
                ProfileField::Occupation => patch.occupation = Some(None),
            }
        }
        patch
    }
}

pub async fn handle(cmd: ProfileCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let cli = CliSession::open()?;

    let result = match cmd {
        ProfileCommands::Show => match cli.session.fetch_details().await {
            Ok(profile) => output_profile(&output_format, &profile).map(|_| true),
            Err(e) => output_error(&output_format, &e.to_string()).map(|_| false),
        },
        ProfileCommands::Update(args) => {
            let desired = args.into_patch();
            if desired.is_empty() {
                output_error(&output_format, "No fields given to update")?;
                cli.persist().await?;
                anyhow::bail!("nothing to update");
            }

            // Diff against the stored profile, not just the session identity
            let outcome = match cli.session.fetch_details().await {
                Ok(_) => cli.session.update_details(desired).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(outcome) => {
                    let data = match &outcome {
                        UpdateOutcome::Updated(profile) => Some(json!({ "user": profile })),
                        UpdateOutcome::NoChanges => None,
                    };
                    output_success(&output_format, outcome.notice(), data).map(|_| true)
                }
                Err(e) => output_error(&output_format, &e.to_string()).map(|_| false),
            }
        }
    };

    // A refreshed token must survive to the next invocation
    cli.persist().await?;

    if !result? {
        anyhow::bail!("profile command failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_args_to_patch() {
        let args = UpdateArgs {
            display_name: None,
            first_name: Some("Jane".into()),
            last_name: None,
            age: Some(42),
            occupation: None,
            clear: vec![ProfileField::Occupation],
        };
        let patch = args.into_patch();

        assert_eq!(patch.first_name, Some(Some("Jane".into())));
        assert_eq!(patch.age, Some(Some(42)));
        assert_eq!(patch.occupation, Some(None));
        assert_eq!(patch.last_name, None);
        assert_eq!(patch.field_names(), vec!["firstName", "age", "occupation"]);
    }
}
