//! Delivery tracking: the per-channel status embedded in every notification.
//!
//! Only intent and outcome are recorded here. Actual transports (email, push,
//! SMS) live outside this crate and report back through
//! [`crate::lifecycle::LifecycleManager::record_delivery`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{Error, Result};

// ─── Channels ────────────────────────────────────────────────────────────────

/// A logical notification transport.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeliveryChannel {
  InApp,
  Email,
  Push,
  Sms,
}

/// The channels a notification asks to be delivered through.
pub type DeliveryMethods = BTreeSet<DeliveryChannel>;

/// The default channel set: in-app only.
pub fn default_methods() -> DeliveryMethods {
  BTreeSet::from([DeliveryChannel::InApp])
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Delivery state of a single channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStatus {
  pub delivered:      bool,
  pub delivered_at:   Option<DateTime<Utc>>,
  pub failure_reason: Option<String>,
}

impl ChannelStatus {
  pub fn delivered_at(at: DateTime<Utc>) -> Self {
    Self { delivered: true, delivered_at: Some(at), failure_reason: None }
  }

  pub fn is_failed(&self) -> bool {
    !self.delivered && self.failure_reason.is_some()
  }
}

/// What a transport reported for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum DeliveryOutcome {
  Delivered,
  Failed(String),
}

/// Per-channel delivery status for all four channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStatus {
  pub in_app: ChannelStatus,
  pub email:  ChannelStatus,
  pub push:   ChannelStatus,
  pub sms:    ChannelStatus,
}

impl DeliveryStatus {
  /// Initial status for a record persisted at `created_at`. Persistence
  /// itself is in-app delivery, so that channel starts delivered.
  pub fn initial(created_at: DateTime<Utc>) -> Self {
    Self {
      in_app: ChannelStatus::delivered_at(created_at),
      ..Self::default()
    }
  }

  pub fn get(&self, channel: DeliveryChannel) -> &ChannelStatus {
    match channel {
      DeliveryChannel::InApp => &self.in_app,
      DeliveryChannel::Email => &self.email,
      DeliveryChannel::Push => &self.push,
      DeliveryChannel::Sms => &self.sms,
    }
  }

  fn get_mut(&mut self, channel: DeliveryChannel) -> &mut ChannelStatus {
    match channel {
      DeliveryChannel::InApp => &mut self.in_app,
      DeliveryChannel::Email => &mut self.email,
      DeliveryChannel::Push => &mut self.push,
      DeliveryChannel::Sms => &mut self.sms,
    }
  }

  /// Requested channels that have neither been delivered nor failed.
  pub fn pending(&self, methods: &DeliveryMethods) -> Vec<DeliveryChannel> {
    methods
      .iter()
      .copied()
      .filter(|c| {
        let status = self.get(*c);
        !status.delivered && status.failure_reason.is_none()
      })
      .collect()
  }

  /// Apply a transport outcome to `channel` and return the channel's new
  /// status.
  ///
  /// A delivered channel stays delivered: repeated `Delivered` reports keep
  /// the first `delivered_at`, and a late `Failed` report is ignored. A failed
  /// channel may still be delivered by a later retry.
  pub fn apply(
    &mut self,
    methods: &DeliveryMethods,
    channel: DeliveryChannel,
    outcome: DeliveryOutcome,
    at: DateTime<Utc>,
  ) -> Result<ChannelStatus> {
    if !methods.contains(&channel) {
      return Err(Error::validation(
        "delivery_method",
        format!("channel {channel} was not requested for this notification"),
      ));
    }

    let status = self.get_mut(channel);
    if !status.delivered {
      match outcome {
        DeliveryOutcome::Delivered => *status = ChannelStatus::delivered_at(at),
        DeliveryOutcome::Failed(reason) => {
          let reason = reason.trim();
          if reason.is_empty() {
            return Err(Error::validation(
              "failure_reason",
              "a failure needs a reason",
            ));
          }
          *status = ChannelStatus {
            delivered:      false,
            delivered_at:   None,
            failure_reason: Some(reason.to_owned()),
          };
        }
      }
    }
    Ok(status.clone())
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn all_channels() -> DeliveryMethods {
    BTreeSet::from([
      DeliveryChannel::InApp,
      DeliveryChannel::Email,
      DeliveryChannel::Push,
      DeliveryChannel::Sms,
    ])
  }

  #[test]
  fn initial_marks_only_in_app_delivered() {
    let now = Utc::now();
    let status = DeliveryStatus::initial(now);
    assert_eq!(status.in_app, ChannelStatus::delivered_at(now));
    assert!(!status.email.delivered);
    assert!(!status.push.delivered);
    assert!(!status.sms.delivered);
    assert_eq!(status.pending(&all_channels()), vec![
      DeliveryChannel::Email,
      DeliveryChannel::Push,
      DeliveryChannel::Sms,
    ]);
  }

  #[test]
  fn delivered_keeps_first_timestamp() {
    let now = Utc::now();
    let mut status = DeliveryStatus::initial(now);
    let first = status
      .apply(&all_channels(), DeliveryChannel::Email, DeliveryOutcome::Delivered, now)
      .unwrap();
    let again = status
      .apply(
        &all_channels(),
        DeliveryChannel::Email,
        DeliveryOutcome::Delivered,
        now + Duration::minutes(5),
      )
      .unwrap();
    assert_eq!(first, again);
    assert_eq!(again.delivered_at, Some(now));
  }

  #[test]
  fn failure_then_retry() {
    let now = Utc::now();
    let mut status = DeliveryStatus::initial(now);
    let failed = status
      .apply(
        &all_channels(),
        DeliveryChannel::Sms,
        DeliveryOutcome::Failed("carrier rejected".into()),
        now,
      )
      .unwrap();
    assert!(failed.is_failed());
    assert!(status.pending(&all_channels()).iter().all(|c| *c != DeliveryChannel::Sms));

    let retried = status
      .apply(&all_channels(), DeliveryChannel::Sms, DeliveryOutcome::Delivered, now)
      .unwrap();
    assert!(retried.delivered);
    assert_eq!(retried.failure_reason, None);
  }

  #[test]
  fn late_failure_does_not_undo_delivery() {
    let now = Utc::now();
    let mut status = DeliveryStatus::initial(now);
    let s = status
      .apply(
        &all_channels(),
        DeliveryChannel::InApp,
        DeliveryOutcome::Failed("socket closed".into()),
        now,
      )
      .unwrap();
    assert!(s.delivered);
  }

  #[test]
  fn unrequested_channel_is_rejected() {
    let mut status = DeliveryStatus::initial(Utc::now());
    let err = status
      .apply(&default_methods(), DeliveryChannel::Push, DeliveryOutcome::Delivered, Utc::now())
      .unwrap_err();
    assert_eq!(err.field(), Some("delivery_method"));
  }

  #[test]
  fn channel_names_use_kebab_case() {
    assert_eq!(DeliveryChannel::InApp.as_ref(), "in-app");
    assert_eq!("sms".parse::<DeliveryChannel>().unwrap(), DeliveryChannel::Sms);
    assert_eq!(
      serde_json::to_string(&DeliveryChannel::InApp).unwrap(),
      "\"in-app\""
    );
  }
}
