use agentloop::agent::{run_with_options, RunOptions};
use agentloop::errors::AgentError;
use agentloop::providers::factory::get_provider;
use anyhow::{bail, Context, Result};
use console::style;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::personas::PersonaKind;
use crate::render::FragmentPrinter;
use crate::settings::Settings;

pub struct AskArgs {
    pub persona: PersonaKind,
    pub request: String,
    pub model: Option<String>,
    pub max_steps: Option<usize>,
    pub hide_tool_calls: bool,
}

pub async fn execute(args: AskArgs, settings_path: Option<&Path>) -> Result<()> {
    if args.request.trim().is_empty() {
        bail!("Nothing to ask: pass the request as arguments");
    }

    let mut settings = Settings::load(settings_path)?;
    if let Some(max_steps) = args.max_steps {
        settings.agent.max_steps = max_steps;
    }
    let model = args
        .model
        .unwrap_or_else(|| settings.provider.model().to_string());

    let provider_type = settings.provider.provider_type();
    let client = get_provider(settings.provider.into_config()?)
        .with_context(|| format!("Failed to create {} provider", provider_type))?;

    let config = args.persona.persona().agent_config(&model, &settings.agent)?;
    info!(persona = %args.persona, %model, provider = %provider_type, "starting session");

    let options = RunOptions {
        include_tool_notices: args.hide_tool_calls.then_some(false),
    };
    let mut fragments = run_with_options(Arc::new(config), client, args.request, options);

    let cancel = fragments.cancellation_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut printer = FragmentPrinter::new();
    let mut outcome = Ok(());
    while let Some(fragment) = fragments.next().await {
        match fragment {
            Ok(fragment) => printer.print(&fragment)?,
            Err(AgentError::Cancelled) => {
                eprintln!("\n{}", style("Cancelled").yellow());
                outcome = Err(AgentError::Cancelled.into());
            }
            Err(e) => outcome = Err(e.into()),
        }
    }
    ctrl_c.abort();
    outcome
}
