//! Event dispatcher.
//!
//! The [`Dispatcher`] decides, for one inbound message, whether and how to
//! reply:
//!
//! 1. Messages authored by the bot itself are ignored
//! 2. Rules are checked in declaration order
//! 3. The first matching rule's response is sent to the message's channel,
//!    and scanning stops
//!
//! ```rust,ignore
//! use retort_core::{Dispatcher, RuleSet};
//! use std::sync::Arc;
//!
//! let rules = Arc::new(RuleSet::load("config.json")?);
//! let dispatcher = Dispatcher::new(rules);
//!
//! let outcome = dispatcher.handle(&event, bot.as_ref()).await;
//! ```
//!
//! A failed send is logged and reported in the returned [`Outcome`]; it is
//! never retried.

use std::sync::Arc;

use tracing::{Instrument, Level, debug, span, trace, warn};

use crate::bot::Bot;
use crate::event::MessageEvent;
use crate::rule::RuleSet;

/// What the dispatcher did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The bot authored the message; nothing was evaluated.
    Ignored,
    /// No rule matched; nothing was sent.
    NoMatch,
    /// Rule `rule` matched and its response was delivered.
    Replied {
        /// Index of the matching rule.
        rule: usize,
        /// Identifier of the sent reply.
        message_id: String,
    },
    /// Rule `rule` matched but delivering its response failed.
    SendFailed {
        /// Index of the matching rule.
        rule: usize,
    },
}

impl Outcome {
    /// Returns the index of the rule that fired, if any.
    pub fn rule(&self) -> Option<usize> {
        match self {
            Self::Replied { rule, .. } | Self::SendFailed { rule } => Some(*rule),
            Self::Ignored | Self::NoMatch => None,
        }
    }
}

/// The per-event match-and-reply handler.
///
/// `Dispatcher` is `Send + Sync` and cheap to clone; the rule set is shared
/// read-only between clones and concurrent `handle` calls.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    rules: Arc<RuleSet>,
}

impl Dispatcher {
    /// Creates a dispatcher over `rules`.
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    /// Returns the rule set.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Handles one inbound message.
    pub async fn handle(&self, event: &MessageEvent, bot: &dyn Bot) -> Outcome {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            message_id = %event.message_id,
            channel_id = %event.channel_id
        );

        self.handle_inner(event, bot).instrument(span).await
    }

    async fn handle_inner(&self, event: &MessageEvent, bot: &dyn Bot) -> Outcome {
        if bot.self_id().is_some_and(|id| event.is_from(&id)) {
            trace!("Ignoring own message");
            return Outcome::Ignored;
        }

        debug!(
            author_id = %event.author_id,
            content = %event.content,
            "Received message"
        );

        let Some((index, rule)) = self.rules.first_match(&event.content) else {
            trace!("No rule matched");
            return Outcome::NoMatch;
        };

        debug!(rule = index, response = %rule.response(), "Dispatching response");

        match bot.send_message(&event.channel_id, rule.response()).await {
            Ok(message_id) => {
                debug!(rule = index, reply_id = %message_id, "Completed with event");
                Outcome::Replied {
                    rule: index,
                    message_id,
                }
            }
            Err(e) => {
                warn!(rule = index, error = %e, "Failed to send response");
                Outcome::SendFailed { rule: index }
            }
        }
    }
}
