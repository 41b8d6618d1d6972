//! Unit tests for framing and the accumulation buffer.

use proptest::prelude::*;
use rstest::{fixture, rstest};

use super::buffer::{BASELINE_CAPACITY, SHRINK_FLOOR};
use super::*;

#[fixture]
fn reader() -> FrameReader {
    FrameReader::new()
}

#[rstest]
fn frame_appends_single_delimiter() {
    assert_eq!(frame("{}"), b"{}\x1e".to_vec());
}

#[rstest]
fn splits_two_messages_in_one_read(mut reader: FrameReader) {
    let frames = reader.push(b"{\"a\":\"1\"}\x1e{\"b\":\"2\"}\x1e");
    assert_eq!(
        frames,
        vec![b"{\"a\":\"1\"}".to_vec(), b"{\"b\":\"2\"}".to_vec()]
    );
    assert_eq!(reader.pending(), 0);
}

#[rstest]
fn reassembles_message_across_partial_reads(mut reader: FrameReader) {
    assert!(reader.push(b"{\"id\":").is_empty());
    assert!(reader.push(b"\"1\"}").is_empty());
    assert_eq!(reader.pending(), 10);
    assert_eq!(reader.push(b"\x1e"), vec![b"{\"id\":\"1\"}".to_vec()]);
    assert_eq!(reader.pending(), 0);
}

#[rstest]
fn keeps_trailing_partial_message(mut reader: FrameReader) {
    let frames = reader.push(b"one\x1etw");
    assert_eq!(frames, vec![b"one".to_vec()]);
    assert_eq!(reader.pending(), 2);
    assert_eq!(reader.push(b"o\x1e"), vec![b"two".to_vec()]);
}

#[rstest]
fn skips_empty_frames(mut reader: FrameReader) {
    let frames = reader.push(b"\x1e\x1ea\x1e\x1e");
    assert_eq!(frames, vec![b"a".to_vec()]);
}

#[rstest]
fn buffer_doubles_until_data_fits() {
    let mut buffer = MessageBuffer::new();
    buffer.append(&[b'x'; BASELINE_CAPACITY + 1]);
    assert_eq!(buffer.capacity(), BASELINE_CAPACITY * 2);
    buffer.append(&[b'x'; BASELINE_CAPACITY * 3]);
    assert_eq!(buffer.capacity(), BASELINE_CAPACITY * 8);
}

#[rstest]
fn buffer_shrinks_when_sparse_and_large() {
    let mut buffer = MessageBuffer::new();
    buffer.append(&[b'x'; SHRINK_FLOOR * 2]);
    assert!(buffer.capacity() > SHRINK_FLOOR);
    buffer.consume(SHRINK_FLOOR * 2 - 10);
    assert!(buffer.shrink_if_sparse());
    assert_eq!(buffer.capacity(), BASELINE_CAPACITY);
    assert_eq!(buffer.len(), 10);
}

#[rstest]
fn buffer_keeps_capacity_at_or_below_floor() {
    let mut buffer = MessageBuffer::new();
    buffer.append(&[b'x'; SHRINK_FLOOR]);
    buffer.consume(SHRINK_FLOOR);
    assert!(!buffer.shrink_if_sparse());
    assert_eq!(buffer.capacity(), SHRINK_FLOOR);
}

#[rstest]
fn reader_releases_memory_after_large_message(mut reader: FrameReader) {
    let mut payload = vec![b'y'; SHRINK_FLOOR * 4];
    payload.push(DELIMITER);
    let frames = reader.push(&payload);
    assert_eq!(frames.len(), 1);
    assert_eq!(reader.capacity(), BASELINE_CAPACITY);
}

proptest! {
    #[test]
    fn arbitrary_split_points_reconstruct_messages(
        messages in proptest::collection::vec("[a-z{}\":,]{1,24}", 1..6),
        splits in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let stream: Vec<u8> = messages.iter().flat_map(|message| frame(message)).collect();
        let mut cuts: Vec<usize> = splits.iter().map(|index| index.index(stream.len() + 1)).collect();
        cuts.push(0);
        cuts.push(stream.len());
        cuts.sort_unstable();
        cuts.dedup();

        let mut reader = FrameReader::new();
        let mut received = Vec::new();
        for window in cuts.windows(2) {
            if let [start, end] = *window {
                received.extend(reader.push(&stream[start..end]));
            }
        }

        let expected: Vec<Vec<u8>> = messages.iter().map(|message| message.as_bytes().to_vec()).collect();
        prop_assert_eq!(received, expected);
        prop_assert_eq!(reader.pending(), 0);
    }
}
