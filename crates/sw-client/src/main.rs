use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use sw_client::backend::GenBackend;
use sw_client::batch::{BatchSession, PreviewRegistry};
use sw_client::progress::ProgressStream;
use sw_client::queue::StatusFilter;
use sw_client::readiness::ReadinessPoller;
use sw_client::tracker::{TrackMode, run_status_tracker};
use sw_client::{AppEvent, ClientConfig, EventSender, HttpBackend, QueueController, SubmitRequest};
use sw_core::{GenerationParameters, JobPriority, NotificationKind};
use tokio_util::sync::CancellationToken;

const USAGE: &str = "usage: sweedle [--text PROMPT]... [IMAGE]...";

struct Args {
    prompts: Vec<String>,
    images: Vec<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        prompts: Vec::new(),
        images: Vec::new(),
    };
    let mut raw = std::env::args().skip(1);

    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--text" | "-t" => args
                .prompts
                .push(raw.next().context("--text needs a prompt")?),
            "--help" | "-h" => bail!(USAGE),
            _ => args.images.push(PathBuf::from(arg)),
        }
    }

    if args.prompts.is_empty() && args.images.is_empty() {
        bail!(USAGE);
    }
    Ok(args)
}

fn print_event(event: AppEvent) {
    match event {
        AppEvent::Notify(n) => {
            let tag = match n.kind {
                NotificationKind::Success => "ok",
                NotificationKind::Error => "error",
                NotificationKind::Info => "info",
            };
            println!("[{tag}] {}: {}", n.title, n.message);
        }
        AppEvent::JobUpdated(job) if job.status.is_active() => {
            println!(
                "  {} {} {:>5.1}% {}",
                job.display_name(),
                job.status,
                job.progress,
                job.stage.as_deref().unwrap_or_default()
            );
        }
        AppEvent::BatchProgress(p) => println!("  batch {}/{} ({:.0}%)", p.completed, p.total, p.percent),
        AppEvent::Readiness(status) => println!("  {}", status.message),
        AppEvent::QueueStatus(status) => println!(
            "  backend queue: {} waiting, {} processing",
            status.queue_size, status.processing_count
        ),
        _ => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = parse_args()?;
    let config = ClientConfig::load()?;

    let (events, mut rx) = EventSender::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(event);
        }
    });

    let backend: Arc<dyn GenBackend> = Arc::new(HttpBackend::new(&config)?);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        }
    });

    let poller = ReadinessPoller::new(backend.clone(), config.readiness.clone(), events.clone());
    let Some(snapshot) = poller.run(&shutdown, |_| {}).await else {
        bail!("Interrupted before the backend became ready");
    };
    drop(poller);
    if let Some(gpu) = &snapshot.gpu_info {
        println!("Backend ready on {} ({:.1} GB)", gpu.name, gpu.vram_gb);
    }

    let controller = Arc::new(QueueController::new(backend, events));

    let stream = config
        .progress
        .clone()
        .map(|progress| ProgressStream::new(controller.clone(), progress).spawn(shutdown.clone()));

    if !args.images.is_empty() {
        let mut session = BatchSession::new(PreviewRegistry::new());
        let added = session.add_files(args.images);
        for path in &added.rejected {
            println!("[info] skipping {}: not a supported image", path.display());
        }
        controller
            .submit_batch(session, GenerationParameters::default(), JobPriority::Normal)
            .await;
    }
    for prompt in args.prompts {
        // Failures are already reported on the event channel.
        let _ = controller.submit(SubmitRequest::text(prompt)).await;
    }

    let idle = run_status_tracker(
        controller.clone(),
        config.status_poll_interval,
        TrackMode::UntilIdle,
        shutdown.clone(),
    )
    .await;
    shutdown.cancel();
    if let Some(stream) = stream {
        if let Err(e) = stream.await {
            tracing::error!(error = %e, "Progress stream task failed");
        }
    }

    println!();
    for job in controller.view(StatusFilter::All).await {
        println!(
            "{:<12} {:<36} {}",
            job.status.as_str(),
            job.display_name(),
            job.asset_id.as_deref().or(job.error.as_deref()).unwrap_or_default()
        );
    }

    match controller.refresh_queue_status().await {
        Ok(status) => println!(
            "\nbackend: {} waiting, {} completed, {} failed",
            status.queue_size, status.completed_count, status.failed_count
        ),
        Err(e) => tracing::debug!(error = %e, "Queue status unavailable"),
    }

    drop(controller);
    match tokio::time::timeout(Duration::from_secs(1), printer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Event printer failed"),
        Err(_) => tracing::warn!("Event printer still busy at exit"),
    }

    if !idle {
        bail!("Interrupted with jobs still running");
    }
    Ok(())
}
