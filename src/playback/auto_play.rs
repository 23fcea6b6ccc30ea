//! Auto-play timer
//!
//! A single owner issues tickets tagged with a generation number. Anything
//! that makes a pending ticket obsolete (node change, auto mode toggled,
//! a newer ticket) bumps the generation, so a late firing can be recognised
//! and dropped.

use std::time::Duration;

/// A scheduled auto-advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoTicket {
    pub generation: u64,
    pub delay: Duration,
}

impl AutoTicket {
    /// Sleep for the ticket's delay
    pub async fn wait(self) -> Self {
        tokio::time::sleep(self.delay).await;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct AutoPlayTimer {
    enabled: bool,
    generation: u64,
}

impl AutoPlayTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turn auto mode on or off; any outstanding ticket dies either way
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.cancel();
        }
    }

    /// Invalidate the outstanding ticket, if any
    pub fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Issue a ticket for `delay`, superseding the previous one
    pub fn schedule(&mut self, delay: Duration) -> Option<AutoTicket> {
        if !self.enabled {
            return None;
        }
        self.cancel();
        Some(AutoTicket {
            generation: self.generation,
            delay,
        })
    }

    /// Whether firing `ticket` now should advance
    pub fn is_live(&self, ticket: &AutoTicket) -> bool {
        self.enabled && ticket.generation == self.generation
    }
}

/// Auto-advance delay for a node showing `text`
pub fn auto_delay(text: &str, text_speed: Duration, base: Duration) -> Duration {
    let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
    text_speed.saturating_mul(chars).saturating_add(base)
}
