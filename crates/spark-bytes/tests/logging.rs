//! `logging` 集成测试：失败与运行边界会产生结构化日志事件。

use spark_bytes::{BackwardWriter, BytesReader, NullBackwardWriter, Position, Reader};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn failure_emits_event_with_code() {
    let mut writer = NullBackwardWriter::default();
    assert!(writer.write_zeros(Position::MAX));
    assert!(!writer.write_byte(1));
    assert!(logs_contain("stream failed"));
    assert!(logs_contain("stream.overflow"));
}

#[traced_test]
#[test]
fn truncation_before_window_starts_new_run() {
    let mut writer = NullBackwardWriter::default();
    assert!(writer.write_zeros(10_000));
    assert!(writer.write(&[0u8; 4]));
    assert!(writer.truncate(10));
    assert!(logs_contain("write buffer run ended"));
    assert!(logs_contain("new run"));
}

#[traced_test]
#[test]
fn healthy_reads_stay_quiet() {
    let mut reader = BytesReader::new(&b"quiet"[..]);
    let mut dest = [0u8; 5];
    assert!(reader.read(&mut dest));
    assert!(!logs_contain("stream failed"));
}
