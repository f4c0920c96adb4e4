//! Property-based test generators using proptest.
//!
//! Provides strategies for generating command payloads, transactions and
//! whole segmented logs, plus retention policy strings.

use crate::fixtures::{chunked_transaction, transaction};
use proptest::prelude::*;
use txlog_core::log::LogEntry;

/// Strategy for generating command payloads (arbitrary bytes).
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..96)
}

/// Strategy for generating the commands of one transaction or chunk.
pub fn commands_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(payload_strategy(), 0..4)
}

/// Shape of a generated transaction.
#[derive(Debug, Clone)]
pub enum TransactionShape {
    /// Plain transaction with its commands.
    Plain(Vec<Vec<u8>>),
    /// Chunked transaction with the commands of each chunk.
    Chunked(Vec<Vec<Vec<u8>>>),
}

impl TransactionShape {
    /// Number of batches a cursor yields for this transaction.
    pub fn batch_count(&self) -> usize {
        match self {
            Self::Plain(_) => 1,
            Self::Chunked(chunks) => chunks.len(),
        }
    }

    /// All commands in log order.
    pub fn commands(&self) -> Vec<Vec<u8>> {
        match self {
            Self::Plain(commands) => commands.clone(),
            Self::Chunked(chunks) => chunks.iter().flatten().cloned().collect(),
        }
    }

    /// Encodes the transaction as log entries.
    pub fn entries(&self, tx_id: u64, time_written: u64) -> Vec<LogEntry> {
        match self {
            Self::Plain(commands) => transaction(tx_id, time_written, commands.clone()),
            Self::Chunked(chunks) => chunked_transaction(tx_id, time_written, chunks.clone()),
        }
    }
}

/// Strategy for generating plain and chunked transactions.
pub fn transaction_shape_strategy() -> impl Strategy<Value = TransactionShape> {
    prop_oneof![
        3 => commands_strategy().prop_map(TransactionShape::Plain),
        1 => prop::collection::vec(commands_strategy(), 2..4).prop_map(TransactionShape::Chunked),
    ]
}

/// Strategy for generating a segmented log: segments of transactions.
///
/// Segments may be empty.
pub fn segmented_log_strategy() -> impl Strategy<Value = Vec<Vec<TransactionShape>>> {
    prop::collection::vec(
        prop::collection::vec(transaction_shape_strategy(), 0..4),
        1..5,
    )
}

/// Strategy for generating a byte stream and the sizes it is split into.
///
/// The sizes sum to the stream length; zero-sized parts are allowed.
pub fn split_bytes_strategy() -> impl Strategy<Value = (Vec<u8>, Vec<usize>)> {
    prop::collection::vec(any::<u8>(), 0..512).prop_flat_map(|bytes| {
        let len = bytes.len();
        prop::collection::vec(0..=len, 0..5).prop_map(move |mut cuts| {
            cuts.sort_unstable();
            let mut sizes = Vec::with_capacity(cuts.len() + 1);
            let mut previous = 0;
            for cut in cuts {
                sizes.push(cut - previous);
                previous = cut;
            }
            sizes.push(len - previous);
            (bytes.clone(), sizes)
        })
    })
}

/// Strategy for generating well-formed retention policy strings.
pub fn retention_policy_strategy() -> impl Strategy<Value = String> {
    let suffix = prop_oneof![Just(""), Just("k"), Just("m")];
    let plain = prop_oneof![
        Just("files"),
        Just("size"),
        Just("txs"),
        Just("entries"),
    ];
    let time = prop_oneof![
        Just("hours"),
        Just("h"),
        Just("days"),
        Just("d"),
        Just("minutes"),
        Just("seconds"),
        Just("s"),
    ];
    prop_oneof![
        Just("keep_all".to_string()),
        Just("keep_none".to_string()),
        (1u64..1000, suffix.clone(), plain)
            .prop_map(|(n, suffix, unit)| format!("{n}{suffix} {unit}")),
        (1u64..1000, time, proptest::option::of((1u64..1000, suffix))).prop_map(
            |(n, unit, cap)| match cap {
                Some((cap, suffix)) => format!("{n} {unit} {cap}{suffix}"),
                None => format!("{n} {unit}"),
            }
        ),
    ]
}
