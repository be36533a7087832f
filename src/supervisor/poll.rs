//! Interval polling for supervisors

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval};

use super::background::{PollExit, SupervisorContext, poll_ticker};
use super::backoff::Backoff;
use super::commands::SupervisorCommand;
use super::state::SupervisorState;
use crate::types::snapshot::ConnectionType;

impl SupervisorContext {
    /// Poll until a stream retry succeeds or the handle goes away
    ///
    /// The first tick of a fresh ticker fires immediately, so entering this
    /// phase fetches at once. Stream retries run on their own backoff timer
    /// and never delay a tick.
    pub(super) async fn poll_phase(
        &self,
        mut ticker: Interval,
        commands: &mut mpsc::UnboundedReceiver<SupervisorCommand>,
        poll_interval: &mut Duration,
        backoff: &mut Backoff,
    ) -> PollExit {
        let can_upgrade = self.config.prefers_stream() && self.stream_url.is_some();
        let retry = tokio::time::sleep(backoff.next_delay());
        tokio::pin!(retry);

        loop {
            tokio::select! {
                // Ticks first, so an interval change never swallows the
                // immediate fetch on entry
                biased;

                _ = ticker.tick() => {
                    self.poll_once(ConnectionType::Poll).await;
                }
                command = commands.recv() => match command {
                    Some(SupervisorCommand::Refresh) => {
                        self.poll_once(ConnectionType::Poll).await;
                    }
                    Some(SupervisorCommand::SetPollInterval(period)) => {
                        if period != *poll_interval {
                            log::debug!(
                                "[{}] poll interval {:?} -> {:?}",
                                self.domain,
                                *poll_interval,
                                period
                            );
                            *poll_interval = period;
                            backoff.set_cap(period);
                            ticker = poll_ticker(period, true);
                        }
                    }
                    None => return PollExit::Closed,
                },
                () = &mut retry, if can_upgrade => {
                    self.set_state(SupervisorState::Reconnecting);
                    if let Some(stream) = self.open_stream().await {
                        return PollExit::Upgrade(stream);
                    }
                    self.set_state(SupervisorState::Polling);
                    let delay = backoff.next_delay();
                    log::debug!("[{}] next stream retry in {:?}", self.domain, delay);
                    retry.as_mut().reset(Instant::now() + delay);
                }
            }
        }
    }
}
