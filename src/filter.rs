//! Subscription filter predicate over transaction events

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{EventError, Result};
use crate::event::{DecimalU256, Event};

/// A predicate a subscriber installs to narrow which `Transaction` events
/// it receives. Non-`Transaction` events always pass a filter — the filter
/// only ever narrows the transaction stream.
///
/// All populated fields are combined with AND: an event must satisfy every
/// field a caller set to be considered a match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Filter {
    /// Match if sender or recipient is any of these addresses
    pub addresses: HashSet<Address>,
    /// Match if sender is any of these addresses
    pub from_addresses: HashSet<Address>,
    /// Match if recipient is any of these addresses
    pub to_addresses: HashSet<Address>,
    /// Minimum value, inclusive
    pub min_value: Option<DecimalU256>,
    /// Maximum value, inclusive
    pub max_value: Option<DecimalU256>,
    /// Minimum block number, inclusive. 0 means unbounded.
    pub from_block: u64,
    /// Maximum block number, inclusive. 0 means unbounded.
    pub to_block: u64,
}

impl Filter {
    /// An empty filter that matches every transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the filter's own internal consistency.
    ///
    /// Does not inspect any event; a filter can be well-formed yet match
    /// nothing.
    pub fn validate(&self) -> Result<()> {
        if self.from_block != 0 && self.to_block != 0 && self.from_block > self.to_block {
            return Err(EventError::InvalidFilter(format!(
                "from_block ({}) is greater than to_block ({})",
                self.from_block, self.to_block
            )));
        }
        if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
            if min > max {
                return Err(EventError::InvalidFilter(format!(
                    "min_value ({min}) is greater than max_value ({max})"
                )));
            }
        }
        Ok(())
    }

    /// Whether `event` satisfies this filter.
    ///
    /// Non-`Transaction` events always match. For `Transaction` events,
    /// every populated field must be satisfied, in this order:
    /// 1. `addresses` — sender or recipient must be a member, if non-empty
    /// 2. `from_addresses` — sender must be a member, if non-empty
    /// 3. `to_addresses` — recipient must be a member, if non-empty
    /// 4. `min_value` — value must be >= min_value, if set
    /// 5. `max_value` — value must be <= max_value, if set
    /// 6. `from_block` — block_number must be >= from_block, if non-zero
    /// 7. `to_block` — block_number must be <= to_block, if non-zero
    pub fn matches(&self, event: &Event) -> bool {
        let Event::Transaction {
            sender,
            recipient,
            value,
            block_number,
            ..
        } = event
        else {
            return true;
        };

        if !self.addresses.is_empty() {
            let sender_in = self.addresses.contains(sender);
            let recipient_in = recipient
                .as_ref()
                .map(|r| self.addresses.contains(r))
                .unwrap_or(false);
            if !sender_in && !recipient_in {
                return false;
            }
        }

        if !self.from_addresses.is_empty() && !self.from_addresses.contains(sender) {
            return false;
        }

        if !self.to_addresses.is_empty() {
            match recipient {
                Some(r) if self.to_addresses.contains(r) => {}
                _ => return false,
            }
        }

        if let Some(min) = self.min_value {
            if *value < min {
                return false;
            }
        }

        if let Some(max) = self.max_value {
            if *value > max {
                return false;
            }
        }

        if self.from_block != 0 && *block_number < self.from_block {
            return false;
        }

        if self.to_block != 0 && *block_number > self.to_block {
            return false;
        }

        true
    }
}
