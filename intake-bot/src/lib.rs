//! Intake Bot - guided report intake over Discord DMs.
//!
//! Users click a button (or just DM the bot) and are walked through a fixed
//! list of questions in their private channel. When every question is
//! answered they can review, edit, cancel, or submit; a submitted report is
//! posted to a fixed channel.
//!
//! ## Architecture
//!
//! ```text
//! Discord gateway → DiscordChannel::listen → mpsc → dispatcher
//!                                                      ↓
//!                          Outbound ← ReportService (sessions + cooldowns)
//!                             ↓                ↑
//! Discord REST  ←──── DiscordChannel        sweeper (interval)
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod catalog;
pub mod commands;
pub mod cooldown;
pub mod discord;
pub mod dispatcher;
pub mod message;
pub mod outbound;
pub mod service;
pub mod session;
pub mod sweeper;
pub mod traits;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogError, Question};
pub use commands::{Command, CommandKeywords};
pub use cooldown::CooldownRegistry;
pub use discord::DiscordChannel;
pub use dispatcher::{dispatch, spawn_dispatcher};
pub use message::{
    Attachment, DirectMessage, InboundEvent, Interaction, InteractionReply, OutgoingContent,
    OutgoingMessage, REPORT_BUTTON_ID,
};
pub use outbound::{Outbound, SendResult};
pub use service::{ReportService, StartOutcome};
pub use session::{Phase, Session, SessionRegistry, Step};
pub use sweeper::{spawn_sweeper, sweep_once, SweepStats};
pub use traits::{Channel, ChannelError, ChannelResult};

use intake_common::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Inbound events buffered between the gateway and the dispatcher.
const EVENT_QUEUE_SIZE: usize = 256;

/// Wait before reconnecting to the gateway.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Run the bot until Ctrl-C.
pub async fn start_bot(config: &Config) -> anyhow::Result<()> {
    let discord = Arc::new(DiscordChannel::from_config(config));

    if let Err(e) = discord.register_commands().await {
        tracing::warn!(error = %e, "Failed to register slash command");
    }

    let outbound = Arc::new(Outbound::new(discord.clone(), &config.report_channel_id));
    let service = Arc::new(ReportService::new(config, outbound)?);

    let (tx, rx) = mpsc::channel(EVENT_QUEUE_SIZE);
    let dispatcher_handle = spawn_dispatcher(service.clone(), rx);
    let sweeper_handle = spawn_sweeper(service, config.limits.sweep_interval());

    let gateway = async {
        loop {
            match discord.listen(tx.clone()).await {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        retry_secs = RECONNECT_DELAY.as_secs(),
                        "Gateway connection lost, reconnecting"
                    );
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    };

    tracing::info!(
        questions = config.questions.len(),
        report_channel = %config.report_channel_id,
        "Intake bot running"
    );

    tokio::select! {
        _ = gateway => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutting down");
        }
    }

    // Clean up on shutdown
    sweeper_handle.abort();
    dispatcher_handle.abort();

    Ok(())
}
