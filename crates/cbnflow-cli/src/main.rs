mod error;
mod logging;
mod settings;

use std::process;

use cbnflow::{Completion, PasswordGrant, RunSummary};
use tracing::{error, info, warn};

use crate::error::ConfigError;
use crate::settings::{Settings, USAGE};

fn main() {
    logging::init_tracing();

    let args: Vec<String> = std::env::args().collect();

    let mode = match settings::parse_args(&args) {
        Ok(mode) => mode,
        Err(e) => usage_exit(&e),
    };

    let settings = match settings::load(mode, |key| std::env::var(key).ok()) {
        Ok(s) => s,
        Err(e) => config_exit(&e),
    };

    if let Err(e) = settings::prepare_dirs(&settings.run.input_dir, &settings.run.output_dir) {
        config_exit(&e);
    }

    if let Err(e) = run(settings) {
        error!(error = %e, "Run failed");
        process::exit(1);
    }
}

fn usage_exit(e: &ConfigError) -> ! {
    let msg = e.to_string();
    if !msg.is_empty() {
        eprintln!("error: {msg}");
        eprintln!();
    }
    eprintln!("{USAGE}");
    process::exit(e.exit_code());
}

fn config_exit(e: &ConfigError) -> ! {
    error!("{e}");
    process::exit(e.exit_code());
}

#[tokio::main]
async fn run(settings: Settings) -> anyhow::Result<()> {
    info!(
        version = cbnflow::CBNFLOW_VERSION,
        mode = %settings.run.mode,
        input = %settings.run.input_dir.display(),
        output = %settings.run.output_dir.display(),
        "Starting conversion run"
    );

    let credentials = PasswordGrant::new(
        settings.service.auth_url.clone(),
        settings.service.username.clone(),
        settings.password.clone(),
        settings.service.client_id.clone(),
    )
    .with_timeout(settings.run.timings.request_timeout);

    let summary = cbnflow::run(&settings.service, &settings.run, &credentials).await?;
    report(&summary);
    Ok(())
}

fn report(summary: &RunSummary) {
    for skipped in &summary.skipped {
        warn!(filename = %skipped.filename, reason = %skipped.reason, "File not submitted");
    }

    match &summary.completion {
        Completion::Complete { jobs } => {
            info!(jobs, "All results received from stream");
        }
        Completion::TimedOut { missing } => {
            warn!(
                missing = missing.len(),
                submitted = summary.submitted,
                "Timeout reached. Some results may be missing"
            );
            for job in &summary.missing {
                warn!(job_id = %job.job_id, filename = %job.filename, "No result received");
            }
        }
    }
}
