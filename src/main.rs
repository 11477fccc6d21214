use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};

use autopurge::{
    config::{self, Command, PurgeAction, Settings},
    infra::{
        http::{AppState, router},
        site::ConfiguredSiteMetadata,
        telemetry,
    },
    purge::{
        AutoPurger, Batcher, ChangeHub, NoticeStatus, PurgeClient, SiteMetadata,
        purge_everything, purge_tag_list, purge_url_list,
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    let (args, settings) = match config::load_with_cli() {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = telemetry::init(&settings.logging) {
        eprintln!("telemetry error: {err}");
        return ExitCode::FAILURE;
    }

    let outcome = match args.command {
        Some(Command::Purge(purge_args)) => manual_purge(&settings, purge_args.action).await,
        Some(Command::Serve(_)) | None => serve(settings).await.map(|()| ExitCode::SUCCESS),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "autopurge failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    if !settings.purge.is_configured() {
        warn!(
            "purge credentials missing (purge.api_token / purge.zone_id); \
             outbound purge calls are disabled"
        );
    }

    let client = Arc::new(PurgeClient::from_config(&settings.purge)?);
    let batcher = Arc::new(Batcher::new(client, settings.purge.batch_cap));
    let site: Arc<dyn SiteMetadata> =
        Arc::new(ConfiguredSiteMetadata::new(settings.site.clone()));
    let hub = Arc::new(ChangeHub::new());

    if settings.purge.enabled {
        let purger = Arc::new(AutoPurger::new(
            Arc::clone(&site),
            batcher,
            &settings.purge,
        ));
        purger.register(&hub);
    } else {
        warn!("automatic purging disabled by configuration");
    }

    let state = AppState {
        hub,
        site,
        notify_token: settings.notify.token.clone(),
    };

    let addr = settings.server.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "autopurge listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown_secs))
        .await?;

    info!("autopurge stopped");
    Ok(())
}

async fn shutdown_signal(grace_secs: u64) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!(grace_secs, "shutdown signal received, draining connections");
}

async fn manual_purge(
    settings: &Settings,
    action: PurgeAction,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let client = Arc::new(PurgeClient::from_config(&settings.purge)?);
    let batcher = Batcher::new(client, settings.purge.batch_cap);

    let notice = match action {
        PurgeAction::Everything => purge_everything(&batcher).await,
        PurgeAction::Urls { file, urls } => {
            let raw = gather_input(file, urls)?;
            purge_url_list(&batcher, &raw).await
        }
        PurgeAction::Tags { file, tags } => {
            let raw = gather_input(file, tags)?;
            purge_tag_list(&batcher, &raw).await
        }
    };

    println!("{}", notice.message);
    Ok(match notice.status {
        NoticeStatus::Success => ExitCode::SUCCESS,
        NoticeStatus::Warning => ExitCode::FAILURE,
    })
}

/// Newline-delimited list input: a file, inline arguments, or stdin.
fn gather_input(file: Option<PathBuf>, inline: Vec<String>) -> Result<String, std::io::Error> {
    if let Some(path) = file {
        return std::fs::read_to_string(path);
    }
    if !inline.is_empty() {
        return Ok(inline.join("\n"));
    }
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}
