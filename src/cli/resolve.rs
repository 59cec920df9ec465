//! `refscope resolve`: run one URL through the full request path.
//!
//! Prints what a server would do with the URL: the view it names, a redirect, or the
//! failure and its status code. Visibility and raw-host checks apply as they would for
//! a real request, under the given user.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use serde_json::json;

use super::common::{CommandContext, CommandExecutor};
use crate::handler::{Outcome, RequestHandler};
use crate::resolver::ViewRequest;
use crate::view::View;
use crate::visibility::UserKey;

#[derive(Debug, Args)]
pub struct ResolveCommand {
    /// Escaped path and query, starting with the servlet path
    #[arg(value_name = "URL")]
    url: String,

    /// Host the request arrives on [default: configured host_name]
    #[arg(long)]
    host: Option<String>,

    /// Caller identity for visibility checks
    #[arg(long)]
    user: Option<String>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

impl ResolveCommand {
    fn print_view(&self, handler: &RequestHandler, view: &View) -> Result<()> {
        let raw_link = handler.raw_urls().create_raw_url(view);

        if self.json {
            let output = json!({
                "outcome": "view",
                "url": view.to_url(),
                "view": view,
                "raw_url": raw_link.as_ref().map(|link| link.url()),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("{} {:?}", "view:".bold(), view.view_type());
        if !view.repository_name().is_empty() {
            println!("  repository: {}", view.repository_name());
        }
        let revision = view.revision();
        if !revision.is_null() {
            let id = revision.id().map(|id| id.to_hex()).unwrap_or_default();
            println!("  revision:   {} ({})", revision.name(), id.dimmed());
        }
        let old = view.old_revision();
        if !old.is_null() {
            let id = old.id().map(|id| id.to_hex()).unwrap_or_default();
            println!("  old:        {} ({})", old.name(), id.dimmed());
        }
        if let Some(path) = view.path_part() {
            println!("  path:       {path}");
        }
        println!("  format:     {}", view.format());
        println!("  url:        {}", view.to_url().green());
        if let Some(link) = raw_link {
            println!("  raw:        {}", link.url());
        }
        Ok(())
    }
}

impl CommandExecutor for ResolveCommand {
    async fn execute(self, context: &CommandContext) -> Result<()> {
        let config = &context.config;
        let host = self.host.clone().unwrap_or_else(|| config.host_name.clone());
        let user = self.user.as_deref().map_or_else(UserKey::anonymous, UserKey::new);
        let handler = config.handler()?;

        let outcome = match ViewRequest::from_url(&host, &config.servlet_path, &self.url) {
            Ok(request) => handler.handle(&request, &user).await,
            Err(failure) => Outcome::Failure(failure),
        };

        match outcome {
            Outcome::View(view) => self.print_view(&handler, &view),
            Outcome::Redirect(url) => {
                if self.json {
                    let output = json!({ "outcome": "redirect", "location": url });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                } else {
                    println!("{} {}", "redirect:".yellow().bold(), url);
                }
                Ok(())
            }
            Outcome::Failure(failure) => {
                if self.json {
                    let output = json!({
                        "outcome": "failure",
                        "reason": failure.reason,
                        "status": failure.status().http_code(),
                        "message": failure.message,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                bail!("{} (status {})", failure, failure.status().http_code())
            }
        }
    }
}
