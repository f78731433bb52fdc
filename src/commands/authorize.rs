//! `authorize` command

use crate::authorizer::Authorizer;
use crate::config::Config;
use crate::decision::Outcome;
use crate::error::Result;
use crate::subject::{RequestHeaders, Subject};

/// Subject attributes collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct SubjectArgs {
    /// Username presented by the subject
    pub username: Option<String>,
    /// Password presented by the subject
    pub password: Option<String>,
    /// Originating network address
    pub remote_address: Option<String>,
    /// Originating hostname
    pub remote_hostname: Option<String>,
    /// `(name, value)` pairs in command-line order
    pub headers: Vec<(String, String)>,
}

impl SubjectArgs {
    /// Builds the subject; no headers means no associated request.
    pub fn into_subject(self) -> Subject {
        let headers = if self.headers.is_empty() {
            None
        } else {
            let mut map = RequestHeaders::new();
            for (name, value) in self.headers {
                map.entry(name).or_default().push(value);
            }
            Some(map)
        };

        Subject {
            username: self.username,
            password: self.password,
            remote_address: self.remote_address,
            remote_hostname: self.remote_hostname,
            headers,
        }
    }
}

/// Runs one authorization and prints the outcome as pretty JSON.
///
/// # Errors
///
/// Returns the authorizer's unified service error on failure.
pub async fn run_authorize(config: Config, args: SubjectArgs) -> Result<Outcome> {
    let authorizer = Authorizer::from_config(&config)?;
    let outcome = authorizer.authorize(&args.into_subject()).await?;

    tracing::info!(
        authorized = outcome.is_authorized(),
        configurations = outcome.configurations().map_or(0, |c| c.len()),
        "Authorization completed"
    );
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(outcome)
}
