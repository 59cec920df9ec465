//! `refscope sign` and `refscope verify`: issue and check raw-content tokens.
//!
//! Both use the configured key file. Without one each process generates its own key,
//! so a token signed by one invocation never verifies in another.

use anyhow::{Result, bail};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandExecutor};
use crate::signer::UrlSigner;

fn format_millis(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map_or_else(|| millis.to_string(), |time| time.to_rfc3339())
}

#[derive(Debug, Args)]
pub struct SignCommand {
    /// Canonical raw-content URL, without the authkey parameter
    #[arg(value_name = "URL")]
    url: String,
}

impl CommandExecutor for SignCommand {
    async fn execute(self, context: &CommandContext) -> Result<()> {
        if context.config.url_signer_key.is_none() {
            tracing::warn!(target: "signer", "no url_signer_key configured; token is only valid in this process");
        }
        let signer = context.config.signer()?;
        let signature = signer.sign(&self.url);
        println!("{}", URL_SAFE_NO_PAD.encode(&signature.bytes));
        tracing::info!(
            target: "signer",
            "token for {} expires at {}",
            self.url,
            format_millis(signature.expires_at_millis)
        );
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct VerifyCommand {
    /// Canonical raw-content URL, without the authkey parameter
    #[arg(value_name = "URL")]
    url: String,

    /// Token as printed by `sign`
    #[arg(value_name = "TOKEN")]
    token: String,
}

impl CommandExecutor for VerifyCommand {
    async fn execute(self, context: &CommandContext) -> Result<()> {
        let signer = context.config.signer()?;
        let validated = URL_SAFE_NO_PAD
            .decode(self.token.trim())
            .ok()
            .and_then(|token| signer.verify(&self.url, &token));
        match validated {
            Some(validated) => {
                println!(
                    "{} valid until {}",
                    "✓".green(),
                    format_millis(validated.expires_at_millis)
                );
                Ok(())
            }
            None => bail!("token rejected"),
        }
    }
}
