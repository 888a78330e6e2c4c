//! Envelope discriminants and their queueing policy.
//!
//! The numeric values are the wire contract. Both ends compile this same
//! module; there is no version tag to detect a mismatch at runtime.

use serde::Serialize;

/// Size of the discriminant on the wire (an `i32` in native byte order).
pub const DISCRIMINANT_SIZE: usize = std::mem::size_of::<i32>();

/// Queue capacity for latest-state messages.
pub const LATEST_STATE_CAPACITY: usize = 1;

/// Queue capacity for repeatable (event) messages.
pub const REPEATABLE_CAPACITY: usize = 512;

/// Closed set of envelope discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum MessageType {
    /// Host asks the window which symbols it is currently showing.
    RequestObservedSymbols = 0,
    /// Window answers with the symbols it wants plotted, selected one first.
    ObservedSymbolsResponse = 1,
    /// Host publishes the symbols that can be plotted at this stop.
    SetAvailableSymbols = 2,
    /// Host sends one buffer's metadata and pixels.
    PlotBufferContents = 3,
    /// Window asks the host to send one buffer.
    PlotBufferRequest = 4,
}

/// How many instances of a discriminant are worth keeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    /// Only the newest instance matters.
    LatestState,
    /// Every instance matters; bounded to avoid unbounded growth.
    Repeatable,
}

impl QueuePolicy {
    /// Maximum queued messages under this policy.
    pub fn capacity(self) -> usize {
        match self {
            QueuePolicy::LatestState => LATEST_STATE_CAPACITY,
            QueuePolicy::Repeatable => REPEATABLE_CAPACITY,
        }
    }
}

impl MessageType {
    /// Every discriminant, in wire-value order.
    pub const ALL: [MessageType; 5] = [
        MessageType::RequestObservedSymbols,
        MessageType::ObservedSymbolsResponse,
        MessageType::SetAvailableSymbols,
        MessageType::PlotBufferContents,
        MessageType::PlotBufferRequest,
    ];

    /// The raw wire value.
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Look up a raw wire value.
    pub fn from_raw(raw: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.as_raw() == raw)
    }

    /// Queueing policy applied on the receiving side.
    pub fn queue_policy(self) -> QueuePolicy {
        match self {
            MessageType::ObservedSymbolsResponse => QueuePolicy::LatestState,
            MessageType::RequestObservedSymbols
            | MessageType::SetAvailableSymbols
            | MessageType::PlotBufferContents
            | MessageType::PlotBufferRequest => QueuePolicy::Repeatable,
        }
    }

    /// Maximum queued messages of this type.
    pub fn queue_capacity(self) -> usize {
        self.queue_policy().capacity()
    }

    /// Stable name for logs and CLI output.
    pub fn name(self) -> &'static str {
        match self {
            MessageType::RequestObservedSymbols => "request_observed_symbols",
            MessageType::ObservedSymbolsResponse => "observed_symbols_response",
            MessageType::SetAvailableSymbols => "set_available_symbols",
            MessageType::PlotBufferContents => "plot_buffer_contents",
            MessageType::PlotBufferRequest => "plot_buffer_request",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_are_stable() {
        assert_eq!(MessageType::RequestObservedSymbols.as_raw(), 0);
        assert_eq!(MessageType::ObservedSymbolsResponse.as_raw(), 1);
        assert_eq!(MessageType::SetAvailableSymbols.as_raw(), 2);
        assert_eq!(MessageType::PlotBufferContents.as_raw(), 3);
        assert_eq!(MessageType::PlotBufferRequest.as_raw(), 4);
    }

    #[test]
    fn from_raw_round_trips_and_rejects_unknown() {
        for ty in MessageType::ALL {
            assert_eq!(MessageType::from_raw(ty.as_raw()), Some(ty));
        }
        assert_eq!(MessageType::from_raw(5), None);
        assert_eq!(MessageType::from_raw(-1), None);
    }

    #[test]
    fn only_observed_symbols_response_is_latest_state() {
        for ty in MessageType::ALL {
            let expected = if ty == MessageType::ObservedSymbolsResponse {
                1
            } else {
                512
            };
            assert_eq!(ty.queue_capacity(), expected, "{ty}");
        }
    }
}
