use crate::audio::{AudioSink, NullSink, null_sink_factory};

#[test]
fn test_null_sink_accepts_requested_range() {
    let mut sink = NullSink::new(16);
    let stats = sink.stats();
    let data = [0u8; 100];

    assert_eq!(sink.write(&data, 10, 50).unwrap(), 50);
    assert_eq!(sink.write(&data, 90, 50).unwrap(), 10);
    assert_eq!(stats.bytes_written(), 60);
}

#[test]
fn test_null_sink_records_first_play() {
    let mut sink = NullSink::default();
    let stats = sink.stats();
    assert!(stats.played_at().is_none());

    sink.play().unwrap();
    let first = stats.played_at().unwrap();
    sink.play().unwrap();

    assert_eq!(stats.plays(), 2);
    assert_eq!(stats.played_at(), Some(first));
}

#[test]
fn test_null_sink_stop_flush() {
    let mut sink = NullSink::default();
    let stats = sink.stats();

    sink.stop().unwrap();
    sink.flush().unwrap();

    assert_eq!(stats.stops(), 1);
    assert_eq!(stats.flushes(), 1);
}

#[test]
fn test_factory_builds_fresh_sinks() {
    let factory = null_sink_factory();
    let sink = factory();
    assert_eq!(sink.buffer_capacity_frames(), NullSink::DEFAULT_CAPACITY_FRAMES);
}
