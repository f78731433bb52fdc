//! authz-bridge - authorization client for a remote REST decision service
//!
//! This library sends a subject (user credentials plus request context) to
//! a remote decision service and returns whether the subject is authorized
//! and, if so, which named target configurations were granted. When the
//! service challenges the bridge itself, a client credential (Basic, Digest
//! or OAuth2 bearer) is acquired and the request is retried once.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `subject`: The entity being authorized and the host capability trait
//! - `codec`: JSON encoding of subjects and decoding of responses
//! - `transport`: HTTP POST and classification of the response
//! - `credential`: Challenges, client credentials and their provider
//! - `decision`: Interpretation of the decision document
//! - `authorizer`: The challenge/retry state machine tying it together
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `logging`: Structured logging setup
//! - `cli`, `commands`: Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use authz_bridge::{Authorizer, Config, Subject};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/authz-bridge.yaml", &Default::default())?;
//!     let authorizer = Authorizer::from_config(&config)?;
//!
//!     let subject = Subject::new("alice", "secret").with_remote_address("10.0.0.7");
//!     let outcome = authorizer.authorize(&subject).await?;
//!     println!("authorized: {}", outcome.is_authorized());
//!     Ok(())
//! }
//! ```

pub mod authorizer;
pub mod cli;
pub mod codec;
pub mod commands;
pub mod config;
pub mod credential;
pub mod decision;
pub mod error;
pub mod logging;
pub mod subject;
pub mod transport;

// Re-export commonly used types
pub use authorizer::Authorizer;
pub use config::Config;
pub use credential::{ClientChallenge, ClientCredential, CredentialProvider};
pub use decision::{Outcome, TargetConfiguration};
pub use error::{BridgeError, Result};
pub use subject::{Subject, SubjectSource};
pub use transport::{AuthTransport, PostOutcome};
