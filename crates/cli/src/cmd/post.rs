use std::{fs::OpenOptions, io::Write, path::PathBuf};

use anyhow::{Context, Result};
use argp::FromArgs;
use ci_status_core::{
    config::{ConfigFile, InputArgs, Inputs},
    context::assemble,
    dispatch::{Message, apply_forced_outcome, dispatch},
    source::event_sha,
};
use ci_status_github::{GitHub, actions::load_run_context};
use ci_status_slack::SlackClient;
use ci_status_templates::{parse_blocks, render_default, render_file};

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Render the run status and post it to a Slack channel.
#[argp(subcommand, name = "post")]
pub struct Args {
    #[argp(option)]
    /// GitHub token (defaults to $GITHUB_TOKEN)
    github_token: Option<String>,
    #[argp(option)]
    /// Slack bot token (defaults to $SLACK_BOT_TOKEN)
    bot_token: Option<String>,
    #[argp(option)]
    /// Slack channel id
    channel_id: Option<String>,
    #[argp(option)]
    /// status text shown in the message
    status: Option<String>,
    #[argp(option)]
    /// message template, relative to the working directory
    template_file: Option<PathBuf>,
    #[argp(option)]
    /// id of a previously posted message to update
    message_id: Option<String>,
    #[argp(option)]
    /// commit to report instead of the event's own
    source_sha: Option<String>,
    #[argp(option)]
    /// only show steps whose name ends with this suffix
    inclusion_suffix: Option<String>,
    #[argp(switch)]
    /// report the current job as failed
    force_failure: bool,
    #[argp(switch)]
    /// report the current job as completed
    force_success: bool,
    #[argp(option)]
    /// template parameters as "- key: value" lines
    params: Option<String>,
    #[argp(option)]
    /// indicator overrides as "- status: text" lines
    indicators: Option<String>,
    #[argp(option)]
    /// YAML file with default values for the options above
    config: Option<PathBuf>,
}

impl From<Args> for InputArgs {
    fn from(args: Args) -> Self {
        Self {
            github_token: args.github_token,
            bot_token: args.bot_token,
            channel_id: args.channel_id,
            status: args.status,
            template_file: args.template_file,
            message_id: args.message_id,
            source_sha: args.source_sha,
            inclusion_suffix: args.inclusion_suffix,
            force_failure: args.force_failure,
            force_success: args.force_success,
            params: args.params,
            indicators: args.indicators,
        }
    }
}

pub async fn run(args: Args) -> Result<()> {
    let mut file = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    file.github_token = file.github_token.or_else(|| std::env::var("GITHUB_TOKEN").ok());
    file.bot_token = file.bot_token.or_else(|| std::env::var("SLACK_BOT_TOKEN").ok());
    let inputs = Inputs::resolve(file, args.into())?;

    let run = load_run_context().context("Failed to read the Actions environment")?;
    let github = GitHub::new(&inputs.github_token, run.api_url.as_ref())?;
    let sha = event_sha(run.pull_request.as_ref(), &run.sha, inputs.source_sha.as_deref());
    tracing::info!("Reporting run {} of {}/{} at {}", run.run_id, run.owner, run.repo, sha);

    let (source, mut jobs) = tokio::try_join!(
        github.resolve_source(&run, &sha),
        github.fetch_jobs(&run, &inputs.indicators, inputs.inclusion_suffix.as_deref()),
    )?;
    if let Some(outcome) = inputs.forced_outcome
        && !apply_forced_outcome(&mut jobs, &run.job, outcome, &inputs.indicators)
    {
        tracing::debug!("No job named {} to override", run.job);
    }

    let vars = assemble(inputs.params, source, run.workflow_context(), jobs, inputs.status.clone());
    let vars = vars.to_escaped_value()?;
    let rendered = match &inputs.template_file {
        Some(path) => render_file(path, &vars)?,
        None => render_default(&vars)?,
    };
    let blocks = parse_blocks(&rendered)?;

    let slack = SlackClient::new(inputs.bot_token);
    let message = Message { channel: inputs.channel_id, text: inputs.status, blocks };
    let message_id = dispatch(&slack, inputs.message_id.as_deref(), message).await?;
    write_output(&message_id)?;
    Ok(())
}

fn write_output(message_id: &str) -> Result<()> {
    println!("{message_id}");
    if let Ok(path) = std::env::var("GITHUB_OUTPUT") {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {path}"))?;
        writeln!(file, "message_id={message_id}")
            .with_context(|| format!("Failed to write {path}"))?;
    }
    Ok(())
}
