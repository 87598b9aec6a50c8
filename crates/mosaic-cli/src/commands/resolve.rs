//! Resolve command - load the catalog and resolve remotes for one user.

use anyhow::bail;
use colored::Colorize;
use serde_json::json;

use mosaic_config::Config;
use mosaic_core::{LoadState, RemoteStatus};
use mosaic_runtime::Shell;
use mosaic_telemetry::ClientContext;

use crate::formatter::OutputFormat;
use crate::theme::Theme;

const ERROR_WIDTH: usize = 48;

/// Resolve `route` (or every route) as `user` and print the outcome.
pub(crate) async fn run_resolve(
    cfg: &Config,
    user: &str,
    route: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let shell = Shell::from_config(cfg, ClientContext::new(user))?;
    let loaded = shell.load_catalog().await?;
    if let Some(notice) = &loaded.notice {
        eprintln!("{}", Theme::warning(notice));
    }
    let origin = json!(loaded.origin);

    let failed = match route {
        Some(id) => {
            let Some(scope) = shell
                .routes()
                .into_iter()
                .find(|r| r.id == id)
                .map(|r| r.remote.scope)
            else {
                bail!("unknown route: {id}");
            };
            let failed = usize::from(shell.resolve(id).await.is_err());
            report(&shell, user, &origin, Some(&scope), format)?;
            failed
        },
        None => {
            let failed = shell
                .resolve_all()
                .await
                .iter()
                .filter(|(_, result)| result.is_err())
                .count();
            report(&shell, user, &origin, None, format)?;
            failed
        },
    };
    shell.shutdown();

    if failed > 0 {
        bail!("{failed} remote(s) failed to load");
    }
    Ok(())
}

fn report(
    shell: &Shell,
    user: &str,
    origin: &serde_json::Value,
    scope: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let statuses: Vec<RemoteStatus> = shell
        .statuses()
        .into_iter()
        .filter(|status| scope.is_none_or(|scope| status.scope == scope))
        .collect();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "user": user,
                    "sessionId": shell.context().session_id,
                    "catalogOrigin": origin,
                    "notice": shell.notice(),
                    "remotes": statuses,
                }))?
            );
        },
        OutputFormat::Table => print_table(user, &statuses),
    }
    Ok(())
}

fn print_table(user: &str, statuses: &[RemoteStatus]) {
    println!("\n{}", Theme::header(&format!("Remotes for {user}")));
    println!(
        "{:<14} {:<8} {:<14} {:<10} {:>7}  {}",
        "ROUTE".dimmed(),
        "VARIANT".dimmed(),
        "VERSION".dimmed(),
        "STATE".dimmed(),
        "RETRIES".dimmed(),
        "ERROR".dimmed()
    );
    println!("{}", Theme::separator());

    for status in statuses {
        let error = status
            .error
            .as_deref()
            .map(|e| truncate(e, ERROR_WIDTH))
            .unwrap_or_default();
        println!(
            "{:<14} {:<8} {:<14} {} {:>7}  {}",
            status.id,
            status.variant.as_str(),
            status.version,
            Theme::state(status.state, status.degraded, 10),
            status.retry_count,
            Theme::dimmed(&error)
        );
    }

    let failed = statuses
        .iter()
        .filter(|s| s.state == LoadState::Error)
        .count();
    let degraded = statuses
        .iter()
        .filter(|s| s.degraded && s.state == LoadState::Loaded)
        .count();
    let loaded = statuses
        .iter()
        .filter(|s| s.state == LoadState::Loaded)
        .count();

    println!();
    let summary = format!("{loaded} loaded, {degraded} degraded, {failed} failed");
    if failed > 0 {
        println!("{}", Theme::error(&summary));
    } else if degraded > 0 {
        println!("{}", Theme::warning(&summary));
    } else {
        println!("{}", Theme::success(&summary));
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
