//! Notification command handlers.

use std::collections::HashSet;

use tabled::Tabled;
use tracing::debug;

use freightline_core::{
    ConnectionState, Notification, NotificationId, NotificationSync, ReconnectConfig, Session,
    SyncConfig, WsTransport,
};

use crate::cli::{GlobalOpts, NotificationsArgs, NotificationsCommand, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct NotificationRow {
    #[tabled(rename = "")]
    unread: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl NotificationRow {
    fn new(n: &Notification, color: bool) -> Self {
        Self {
            unread: output::unread_marker(n.is_read, color),
            id: n.id.to_string(),
            kind: output::kind_label(n.kind, color),
            title: n.title.clone(),
            message: n.message.clone(),
            created: n.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

fn detail(n: &Notification, color: bool) -> String {
    format!(
        "{} [{}] {}: {}  ({})",
        output::unread_marker(n.is_read, color),
        output::kind_label(n.kind, color),
        n.title,
        n.message,
        n.created_at.format("%Y-%m-%d %H:%M"),
    )
    .trim_start()
    .to_string()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: NotificationsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (mut sync_config, session) = config::resolve(global)?;

    match args.command {
        NotificationsCommand::List { unread } => {
            sync_config.push_enabled = false;
            let sync = fetched(sync_config, session).await?;

            let view = sync.view();
            let items: Vec<Notification> = view
                .items
                .into_iter()
                .filter(|n| !unread || !n.is_read)
                .collect();

            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &items,
                |n| NotificationRow::new(n, color),
                |n| n.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            if !global.quiet && matches!(global.output, OutputFormat::Table) {
                eprintln!("{} unread", view.unread_count);
            }
            Ok(())
        }

        NotificationsCommand::Read { id } => {
            sync_config.push_enabled = false;
            let sync = fetched(sync_config, session).await?;

            // Backends send either numeric or string ids; match what was fetched.
            let Some(target) = sync.store().find_by_key(&id) else {
                return Err(CliError::NotFound { identifier: id });
            };
            let id = target.id;
            sync.mark_read(&id).await?;

            let notification = sync.store().get(&id).ok_or_else(|| CliError::NotFound {
                identifier: id.to_string(),
            })?;
            let color = output::should_color(&global.color);
            let out = output::render_single(
                &global.output,
                &notification,
                |n| detail(n, color),
                |n| n.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        NotificationsCommand::Watch { refresh, reconnect } => {
            if let Some(secs) = refresh {
                sync_config.refresh_interval_secs = secs;
            }
            if reconnect && sync_config.reconnect.is_none() {
                sync_config.reconnect = Some(ReconnectConfig::default());
            }
            watch(sync_config, session, global).await
        }
    }
}

/// Sign in and load the current snapshot.
async fn fetched(
    sync_config: SyncConfig,
    session: Session,
) -> Result<NotificationSync<WsTransport>, CliError> {
    let sync = NotificationSync::websocket(sync_config)?;
    sync.set_session(Some(session));
    sync.refresh().await?;
    Ok(sync)
}

// ── Watch ───────────────────────────────────────────────────────────

async fn watch(
    sync_config: SyncConfig,
    session: Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let sync = NotificationSync::websocket(sync_config)?;
    let push_url = sync
        .config()
        .push_url()
        .map(|u| u.to_string())
        .unwrap_or_default();

    sync.set_session(Some(session));
    sync.start().await;
    if let Err(e) = sync.refresh().await {
        sync.shutdown().await;
        return Err(e.into());
    }

    // JSON is streamed as one document per line.
    let format = match global.output {
        OutputFormat::Json => OutputFormat::JsonCompact,
        ref other => other.clone(),
    };
    let color = output::should_color(&global.color);
    let print = |n: &Notification| {
        let out = output::render_single(&format, n, |n| detail(n, color), |n| n.id.to_string());
        output::print_output(&out, global.quiet);
    };

    let mut stream = sync.subscribe();
    let mut connection = sync.subscribe_connection();
    let mut seen: HashSet<NotificationId> = HashSet::new();

    for n in stream.current().items.iter().rev() {
        seen.insert(n.id.clone());
        print(n);
    }

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break Ok(());
            }
            changed = connection.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = *connection.borrow_and_update();
                if !global.quiet {
                    eprintln!("push {}", state.to_string().to_lowercase());
                }
                if state == ConnectionState::Disconnected {
                    break Err(CliError::ConnectionFailed {
                        url: push_url,
                        source: "push connection closed".into(),
                    });
                }
            }
            view = stream.changed() => {
                let Some(view) = view else {
                    break Ok(());
                };
                for n in view.items.iter().rev() {
                    if seen.insert(n.id.clone()) {
                        print(n);
                    }
                }
            }
        }
    };

    sync.shutdown().await;
    result
}
