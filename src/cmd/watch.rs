//! Live surfaces: `sitewatch watch` and `sitewatch logs`.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use console::{Term, style};
use sitewatch::config::Config;
use sitewatch::feed::{ConnectionState, Dispatcher, Subscriber, WebSocketTransport};
use sitewatch::ui::dashboard::status_line;
use sitewatch::ui::deployment_log::format_line;
use sitewatch::ui::{Dashboard, DeploymentLog, UiMode};
use sitewatch_common::Topic;
use tracing::{debug, info};

fn subscriber(config: &Config) -> Subscriber {
    Subscriber::new(
        Arc::new(WebSocketTransport::default()),
        config.reconnect_policy(),
    )
}

pub async fn cmd_watch(config: &Config) -> Result<()> {
    let mode = config.ui_mode();
    let endpoint = config.feed_url.to_string();
    let dashboard = Dashboard::new(config.history());

    let mut dispatcher = Dispatcher::new();
    dashboard.attach(&mut dispatcher);
    if mode == UiMode::Json {
        for topic in Topic::KNOWN {
            dispatcher.subscribe(topic, "json-stdout", |envelope| {
                println!("{}", envelope.to_frame());
                Ok(())
            });
        }
    }

    let last_error: Arc<Mutex<Option<String>>> = Arc::default();
    let error_slot = last_error.clone();
    let feed = subscriber(config);
    let mut states = feed.state_changes();
    let handle = feed.start(
        config.feed_url.clone(),
        dispatcher.into_handler(),
        move |err| {
            if let Ok(mut slot) = error_slot.lock() {
                *slot = Some(err.to_string());
            }
        },
    )?;
    info!(mode = %mode, history = config.history(), "Dashboard started");

    let term = Term::stdout();
    let mut refresh = tokio::time::interval(config.refresh_interval());
    let mut last_summary = String::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                debug!(state = %state, "Feed state changed");
                if state == ConnectionState::Open
                    && let Ok(mut slot) = last_error.lock()
                {
                    *slot = None;
                }
            }
            _ = refresh.tick() => {
                let state = feed.state();
                match mode {
                    UiMode::Full => {
                        let mut screen = dashboard.render(state, &endpoint);
                        if let Some(err) = last_error.lock().ok().and_then(|e| e.clone()) {
                            screen.push_str(&format!("{}\n", style(err).dim()));
                        }
                        term.clear_screen()?;
                        term.write_str(&screen)?;
                    }
                    UiMode::Minimal => {
                        let summary = dashboard.summary(state);
                        if summary != last_summary {
                            term.write_line(&summary)?;
                            last_summary = summary;
                        }
                    }
                    UiMode::Json => {}
                }
            }
        }
    }

    feed.stop(handle);
    if mode != UiMode::Json {
        term.write_line("")?;
        term.write_line(&status_line(feed.state(), &endpoint))?;
    }
    Ok(())
}

pub async fn cmd_logs(config: &Config, domain: &str) -> Result<()> {
    let endpoint = config.feed_url.to_string();
    let mut log = DeploymentLog::new(domain.trim());
    if log.domain().is_empty() {
        anyhow::bail!("Domain must not be empty");
    }

    let mut dispatcher = Dispatcher::new();
    log.attach(&mut dispatcher);

    let feed = subscriber(config);
    let mut states = feed.state_changes();
    let handle = feed.start(config.feed_url.clone(), dispatcher.into_handler(), |_| {})?;

    let term = Term::stdout();
    let errors = Term::stderr();
    term.write_line(&format!(
        "{} {} {}",
        style("Live deployment logs for").bold(),
        style(log.domain()).cyan(),
        style("(Ctrl+C to stop)").dim()
    ))?;

    let mut refresh = tokio::time::interval(config.refresh_interval());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                errors.write_line(&status_line(state, &endpoint))?;
            }
            _ = refresh.tick() => {
                for entry in log.take_new() {
                    term.write_line(&format_line(&entry))?;
                }
            }
        }
    }

    feed.stop(handle);
    for entry in log.take_new() {
        term.write_line(&format_line(&entry))?;
    }
    info!(domain = log.domain(), entries = log.len(), "Deployment log closed");
    Ok(())
}
