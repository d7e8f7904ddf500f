use anyhow::Context;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use veyra_engine::config::{AgentConfig, ConfigLoader};
use veyra_engine::diagnostics::Diagnostics;
use veyra_engine::formatter::{format_post_report, format_summary};
use veyra_engine::generator::SafeGenerator;
use veyra_engine::workflow::manual_login;
use veyra_engine::{
    BrowserSession, EngineError, InboxReconciler, Platform, PlatformProfile,
    PostInteractionWorkflow,
};
use veyra_h::HeadlessSession;

#[derive(Parser)]
#[command(name = "veyra", version, about = "Social feed and inbox automation")]
struct Args {
    /// `manual`, `inbox`, or the URL of a post to like and comment on
    mode: Option<String>,

    #[arg(long, default_value = "facebook")]
    platform: Platform,

    /// YAML configuration file (defaults to ./veyra.yaml, then ~/.veyra/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Launch browser in visible mode (not headless). Manual login is always visible.
    #[arg(long)]
    visible: bool,
}

enum Mode {
    Manual,
    Inbox,
    Post(String),
}

fn parse_mode(raw: Option<&str>, profile: &PlatformProfile) -> Option<Mode> {
    match raw?.trim() {
        "manual" => Some(Mode::Manual),
        "inbox" => Some(Mode::Inbox),
        url if profile.is_within_origin(url) => Some(Mode::Post(url.to_string())),
        _ => None,
    }
}

/// Manual login needs a window the operator can log in through and close.
fn headed(mode: &Mode, visible: bool) -> bool {
    visible || matches!(mode, Mode::Manual)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only the final report.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let profile = args.platform.profile();

    let Some(mode) = parse_mode(args.mode.as_deref(), &profile) else {
        if let Some(raw) = &args.mode {
            eprintln!("Invalid mode '{}': expected manual, inbox or a {} URL", raw, profile.origin);
        }
        eprintln!("{}", Args::command().render_usage());
        return ExitCode::from(2);
    };

    match run(args, profile, mode).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AgentConfig> {
    let config = match path {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConfigLoader::load_default().await?,
    };
    Ok(config)
}

async fn run(args: Args, profile: PlatformProfile, mode: Mode) -> anyhow::Result<ExitCode> {
    let config = load_config(args.config.as_ref()).await?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, winding down...");
            trigger.cancel();
        }
    });

    let mut session = HeadlessSession::launch(&config.profile_dir(), headed(&mode, args.visible))
        .await
        .context("launching browser")?;

    let result = dispatch(&mut session, profile, config, mode, &cancel).await;

    if let Err(e) = session.close().await {
        warn!("Browser did not close cleanly: {}", e);
    }
    result
}

async fn dispatch(
    session: &mut HeadlessSession,
    profile: PlatformProfile,
    config: AgentConfig,
    mode: Mode,
    cancel: &CancellationToken,
) -> anyhow::Result<ExitCode> {
    let diagnostics = Diagnostics::new(config.diagnostics_dir.clone(), profile.platform.name());

    match mode {
        Mode::Manual => {
            let path = manual_login(session, &profile, &config, cancel).await?;
            info!("Session saved to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Mode::Inbox => {
            let generator = SafeGenerator::from_config(&config);
            let reconciler = InboxReconciler::new(profile, config, generator, diagnostics);
            let mut page = session.new_page().await?;
            match reconciler.run(page.as_mut(), cancel).await {
                Ok(records) => {
                    print!("{}", format_summary(&records));
                    Ok(ExitCode::SUCCESS)
                }
                Err(EngineError::CleanupFailed {
                    url,
                    reason,
                    completed,
                }) => {
                    print!("{}", format_summary(&completed));
                    error!("Aborted: could not return to {}: {}", url, reason);
                    Ok(ExitCode::FAILURE)
                }
                Err(e) => Err(e.into()),
            }
        }
        Mode::Post(url) => {
            let generator = SafeGenerator::from_config(&config);
            let workflow = PostInteractionWorkflow::new(profile, config, generator, diagnostics);
            let mut page = session.new_page().await?;
            let report = workflow.run(page.as_mut(), &url, cancel).await?;
            print!("{}", format_post_report(&report));
            Ok(ExitCode::SUCCESS)
        }
    }
}
