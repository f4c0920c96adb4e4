//! Reading committed batches across segment boundaries.

use proptest::prelude::*;
use txlog_core::log::{LogHeader, ReaderLogVersionBridge, StoreId, KERNEL_VERSION};
use txlog_core::{
    CommittedCommandBatch, CommittedCommandBatchCursor, CoreError, LogConfig, LogPosition,
    TransactionMetadataCache,
};
use txlog_testkit::prelude::*;

fn read_all(fixture: &LogFixture, from: LogPosition) -> Vec<CommittedCommandBatch> {
    let channel = fixture.log_files().reader(from).unwrap();
    CommittedCommandBatchCursor::new(channel)
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn cursor_reads_every_segment_in_order() {
    let fixture = LogFixture::memory();
    fixture.write_log(&[
        vec![transaction(1, 10, vec![b"a".to_vec()]), transaction(2, 20, vec![])],
        vec![],
        vec![transaction(3, 30, vec![b"b".to_vec(), b"c".to_vec()])],
    ]);

    let batches = read_all(&fixture, LogPosition::new(0, 64));
    let ids: Vec<u64> = batches.iter().map(CommittedCommandBatch::tx_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(batches[2].start_position(), LogPosition::new(2, 64));
    assert_eq!(batches[2].commands().len(), 2);
}

#[test]
fn reading_stops_at_a_half_written_rotation() {
    let fixture = LogFixture::memory();
    fixture.write_segment(0, 0, &transaction(1, 10, vec![]));
    let header = LogHeader::new(1, 1, StoreId::default(), 0, 0, KERNEL_VERSION).encode();
    fixture.append_raw(1, &header[..32]);

    let mut cursor =
        CommittedCommandBatchCursor::new(fixture.log_files().reader(LogPosition::new(0, 64)).unwrap());
    assert!(cursor.advance().unwrap());
    assert!(!cursor.advance().unwrap());

    // the appender finishes the header and writes the next transaction
    fixture.append_raw(1, &header[32..]);
    fixture.append_entries(1, &transaction(2, 20, vec![]));
    assert!(cursor.advance().unwrap());
    assert_eq!(cursor.get().unwrap().tx_id(), 2);
}

#[test]
fn cursor_resumes_after_the_tip_grows() {
    let fixture = LogFixture::memory();
    fixture.write_segment(0, 0, &transaction(1, 10, vec![]));

    let mut cursor =
        CommittedCommandBatchCursor::new(fixture.log_files().reader(LogPosition::new(0, 64)).unwrap());
    assert!(cursor.advance().unwrap());
    assert!(!cursor.advance().unwrap());

    fixture.append_entries(0, &transaction(2, 20, vec![b"x".to_vec()]));
    assert!(cursor.advance().unwrap());
    assert_eq!(cursor.get().unwrap().tx_id(), 2);
}

#[test]
fn on_disk_log_reads_like_in_memory() {
    let fixture = LogFixture::on_disk();
    fixture.write_log(&[
        vec![transaction(1, 10, vec![vec![1; 100]])],
        vec![chunked_transaction(2, 20, vec![vec![vec![2]], vec![vec![3]]])],
    ]);

    let batches = read_all(&fixture, LogPosition::new(0, 64));
    assert_eq!(batches.len(), 3);
    assert!(!batches[0].is_chunk());
    assert!(batches[1].is_chunk() && !batches[1].is_last());
    assert!(batches[2].is_last());
}

#[test]
fn locate_then_read_finds_the_transaction() {
    let fixture = LogFixture::memory();
    let last = fixture.write_log(&[
        vec![transaction(1, 10, vec![]), transaction(2, 20, vec![])],
        vec![transaction(3, 30, vec![]), transaction(4, 40, vec![])],
        vec![transaction(5, 50, vec![])],
    ]);
    let files = fixture.log_files();
    let cache = TransactionMetadataCache::new(16);

    let start = files.locate_transaction(4, last, &cache).unwrap();
    assert_eq!(start, LogPosition::new(1, 64));

    let mut cursor = CommittedCommandBatchCursor::new(files.reader(start).unwrap());
    while cursor.advance().unwrap() {
        let batch = cursor.get().unwrap();
        cache
            .cache_transaction_metadata(batch.tx_id(), batch.start_position())
            .unwrap();
        if batch.tx_id() == 4 {
            break;
        }
    }
    let cached = cache.get_transaction_metadata(4).unwrap();
    assert_eq!(files.locate_transaction(4, last, &cache).unwrap(), cached.start_position);
    assert!(matches!(
        files.locate_transaction(6, last, &cache),
        Err(CoreError::NoSuchTransaction { tx_id: 6 })
    ));
}

#[test]
fn raw_reader_never_leaves_its_segment() {
    let fixture = LogFixture::memory();
    fixture.write_log(&[
        vec![transaction(1, 10, vec![])],
        vec![transaction(2, 20, vec![])],
    ]);

    let channel = fixture.log_files().raw_reader(LogPosition::new(0, 64)).unwrap();
    let batches: Vec<_> = CommittedCommandBatchCursor::new(channel)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].tx_id(), 1);
}

proptest! {
    #[test]
    fn read_ahead_reassembles_split_streams((bytes, sizes) in split_bytes_strategy()) {
        let fixture = LogFixture::memory()
            .with_config(LogConfig::default().read_ahead_size(16));
        let mut offset = 0;
        for (version, size) in sizes.iter().enumerate() {
            fixture.write_segment(version as u64, 0, &[]);
            fixture.append_raw(version as u64, &bytes[offset..offset + size]);
            offset += size;
        }

        let files = fixture.log_files();
        let mut channel = files
            .reader_with_bridge(
                LogPosition::new(0, 64),
                Box::new(ReaderLogVersionBridge::new(files.clone())),
                false,
            )
            .unwrap();
        let mut out = vec![0u8; bytes.len()];
        channel.get_bytes(&mut out).unwrap();
        prop_assert_eq!(&out, &bytes);
        prop_assert!(channel.get_u8().unwrap_err().is_read_past_end());
    }

    #[test]
    fn cursor_yields_every_generated_batch(segments in segmented_log_strategy()) {
        let fixture = LogFixture::memory();
        let mut tx_id = 0;
        let mut expected_commands = Vec::new();
        let mut expected_batches = 0;
        let layout: Vec<Vec<_>> = segments
            .iter()
            .map(|transactions| {
                transactions
                    .iter()
                    .map(|shape| {
                        tx_id += 1;
                        expected_commands.extend(shape.commands());
                        expected_batches += shape.batch_count();
                        shape.entries(tx_id, tx_id * 10)
                    })
                    .collect()
            })
            .collect();
        fixture.write_log(&layout);

        let batches = read_all(&fixture, LogPosition::new(0, 64));
        prop_assert_eq!(batches.len(), expected_batches);
        let commands: Vec<Vec<u8>> = batches
            .iter()
            .flat_map(|b| b.commands().iter().map(|c| c.payload.clone()))
            .collect();
        prop_assert_eq!(commands, expected_commands);
        prop_assert_eq!(batches.iter().filter(|b| b.is_last()).count() as u64, tx_id);
    }
}
