use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::load_settings, flows, AccountStore, HttpGenerationBackend, HttpUserRecordSource,
    IdentityProvider, IdentityStatus, InputKind, StaticIdentity, SubmitOutcome, WizardController,
    WizardEvent,
};
use shared::domain::StepId;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "studio", about = "Run creator dashboard generation flows")]
struct Args {
    /// Overrides `api_base_url` from studio.toml and the environment.
    #[arg(long)]
    api_base_url: Option<String>,
    /// Signed-in user; without it submissions are refused.
    #[arg(long)]
    email: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the available flows and their steps.
    Flows,
    /// Fill a flow's steps from `--answer step=value` pairs and submit it.
    Generate {
        #[arg(long)]
        flow: String,
        #[arg(long = "answer", value_name = "STEP=VALUE")]
        answers: Vec<String>,
    },
    /// Show credits, trial and referral state for the signed-in user.
    Account,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(url) = args.api_base_url {
        settings.api_base_url = url;
    }
    if let Some(email) = args.email {
        settings.email = Some(email);
    }
    let identity: Arc<dyn IdentityProvider> = match &settings.email {
        Some(email) => Arc::new(StaticIdentity::signed_in(email.clone())),
        None => Arc::new(StaticIdentity::signed_out()),
    };

    match args.command {
        Command::Flows => list_flows(),
        Command::Generate { flow, answers } => {
            let backend =
                HttpGenerationBackend::new(&settings.api_base_url, settings.request_timeout())?;
            run_flow(&flow, &answers, identity, Arc::new(backend)).await
        }
        Command::Account => {
            let http = reqwest::Client::new();
            let source = HttpUserRecordSource::new(http, &settings.api_base_url)?;
            let store = AccountStore::new(Arc::new(source), settings.refresh_policy());
            show_account(&store, &identity.current_identity().await).await
        }
    }
}

fn list_flows() -> Result<()> {
    for name in flows::FLOW_NAMES {
        let definition = flows::by_name(name)?;
        println!("{name} -> {}", definition.endpoint().path);
        for step in definition.steps() {
            let kind = match &step.input_kind {
                InputKind::Text { rule } => format!("text ({rule:?})"),
                InputKind::Choice { options } => format!(
                    "one of {}",
                    options
                        .iter()
                        .map(|option| option.id.as_str())
                        .collect::<Vec<_>>()
                        .join(" | ")
                ),
                InputKind::Range { min, max } => format!("range {min}..{max}"),
            };
            let marker = if step.is_required() { "*" } else { " " };
            println!("  {marker} {:<14} {:<24} {kind}", step.id.as_str(), step.title);
        }
    }
    Ok(())
}

async fn run_flow(
    flow: &str,
    answers: &[String],
    identity: Arc<dyn IdentityProvider>,
    backend: Arc<HttpGenerationBackend>,
) -> Result<()> {
    let definition = Arc::new(flows::by_name(flow)?);
    let controller = WizardController::new(Arc::clone(&definition), identity, backend);

    let mut events = controller.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                WizardEvent::StepChanged { index, step_id, .. } => {
                    info!("studio: step index={index} step={step_id}")
                }
                WizardEvent::AnswerChanged { step_id, value, .. } => match value {
                    Some(value) => info!("studio: answer step={step_id} value={value}"),
                    None => info!("studio: answer cleared step={step_id}"),
                },
                WizardEvent::SubmissionChanged { submission, .. } => {
                    info!("studio: submission state={}", submission.label())
                }
                WizardEvent::Rejected { error, .. } => {
                    info!("studio: rejected kind={:?} message={}", error.kind, error.message)
                }
            }
        }
    });

    for pair in answers {
        let (step, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("answers are STEP=VALUE, got '{pair}'"))?;
        let step_id = StepId::from(step.trim());
        let step = definition
            .step(&step_id)
            .ok_or_else(|| anyhow!("flow '{flow}' has no step '{step_id}'"))?;
        let value = step.parse_answer(raw)?;
        controller.set_answer(step_id, value).await?;
    }

    while controller.snapshot().await.current_step_index < definition.last_index() {
        let step_id = controller.current_step().await.id.clone();
        controller
            .go_next()
            .await
            .with_context(|| format!("step '{step_id}' is incomplete"))?;
    }

    let outcome = controller.submit().await;
    drop(controller);
    let _ = event_task.await;

    match outcome {
        Ok(SubmitOutcome::Completed(result)) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Ok(SubmitOutcome::AlreadyInFlight) => bail!("a submission is already in flight"),
        Err(err) => {
            eprintln!("{}", serde_json::to_string_pretty(&err.to_api_error())?);
            Err(err.into())
        }
    }
}

async fn show_account(store: &AccountStore, identity: &IdentityStatus) -> Result<()> {
    let Some(account) = store.mount(identity).await? else {
        bail!("sign in with --email or STUDIO_EMAIL to see account details");
    };

    let record = &account.record;
    println!("email:    {}", record.email);
    println!("plan:     {}", record.account.as_deref().unwrap_or("free"));
    println!("credits:  {}", record.credits);
    println!("referrals: {}", record.referrals);
    if let Some(code) = &record.referral_code {
        println!("referral code: {code}");
    }
    if record.shows_trial_banner() {
        println!("free trial available: claim it from the dashboard");
    } else if let Some(expires_at) = record.trial_expires_at {
        println!("trial ends: {}", expires_at.format("%Y-%m-%d"));
    }
    println!("fetched:  {}", account.fetched_at.to_rfc3339());
    Ok(())
}
