//! Routes inbound events to the report service.

use crate::message::InboundEvent;
use crate::service::ReportService;
use intake_common::logging::generate_event_id;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Hand one event to the service.
pub async fn dispatch(service: &ReportService, event: InboundEvent) {
    match event {
        InboundEvent::DirectMessage(dm) => service.handle_direct_message(&dm).await,
        InboundEvent::ButtonClick(interaction) => {
            if let Some(outcome) = service.handle_button_click(&interaction).await {
                tracing::debug!(outcome = ?outcome, "Button click handled");
            }
        }
        InboundEvent::SlashCommand(interaction) => {
            service.handle_slash_command(&interaction).await;
        }
    }
}

/// Finished per-user tails are dropped once this many accumulate.
const TAIL_PRUNE_THRESHOLD: usize = 256;

/// Drain the event queue, handling each event in its own task.
///
/// Tasks for different users run concurrently. A user's events run one at a
/// time in arrival order: each task waits for that user's previous one.
pub fn spawn_dispatcher(
    service: Arc<ReportService>,
    mut rx: mpsc::Receiver<InboundEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Event dispatcher started");
        let mut tails: HashMap<String, JoinHandle<()>> = HashMap::new();

        while let Some(event) = rx.recv().await {
            if tails.len() >= TAIL_PRUNE_THRESHOLD {
                tails.retain(|_, task| !task.is_finished());
            }

            let service = service.clone();
            let user_id = event.user_id().to_string();
            let span = tracing::info_span!(
                "event",
                event_id = %generate_event_id(),
                kind = event.kind(),
                user_id = %user_id,
            );

            let previous = tails.remove(&user_id);
            let task = tokio::spawn(
                async move {
                    if let Some(previous) = previous {
                        if let Err(e) = previous.await {
                            tracing::warn!(error = %e, "Previous event task failed");
                        }
                    }
                    dispatch(&service, event).await;
                }
                .instrument(span),
            );
            tails.insert(user_id, task);
        }

        tracing::info!("Event dispatcher stopped");
    })
}
