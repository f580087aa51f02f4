//! Hub configuration

/// What the hub does when a subscriber's mailbox is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlowSubscriberPolicy {
    /// Wait for the mailbox to drain. A stalled subscriber stalls the hub,
    /// and with it every producer and every other subscriber.
    #[default]
    Block,
    /// Drop the subscriber from the set and move on
    Disconnect,
}

/// Hub configuration options
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Per-subscriber mailbox capacity (envelopes)
    pub mailbox_capacity: usize,

    /// Capacity of the hub's inbound join/leave/broadcast queue
    pub event_capacity: usize,

    /// Behavior on a full mailbox
    pub slow_subscriber_policy: SlowSubscriberPolicy,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 256,
            event_capacity: 64,
            slow_subscriber_policy: SlowSubscriberPolicy::Block,
        }
    }
}

impl HubConfig {
    /// Set the mailbox capacity (minimum 1)
    pub fn mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity.max(1);
        self
    }

    /// Set the event queue capacity (minimum 1)
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Set the slow-subscriber policy
    pub fn slow_subscriber_policy(mut self, policy: SlowSubscriberPolicy) -> Self {
        self.slow_subscriber_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();

        assert_eq!(config.mailbox_capacity, 256);
        assert_eq!(config.event_capacity, 64);
        assert_eq!(config.slow_subscriber_policy, SlowSubscriberPolicy::Block);
    }

    #[test]
    fn test_builder_capacity_floor() {
        let config = HubConfig::default().mailbox_capacity(0).event_capacity(0);

        assert_eq!(config.mailbox_capacity, 1);
        assert_eq!(config.event_capacity, 1);
    }

    #[test]
    fn test_builder_policy() {
        let config = HubConfig::default().slow_subscriber_policy(SlowSubscriberPolicy::Disconnect);

        assert_eq!(config.slow_subscriber_policy, SlowSubscriberPolicy::Disconnect);
    }
}
