//! `config_loading` 集成测试：配置类型可从 TOML/JSON 装载，缺省字段取默认值，非法上下限被拒绝。

use spark_bytes::{
    BackwardWriter, BufferOptions, NullBackwardWriter, NullBackwardWriterOptions,
    PositionShiftingReaderOptions,
};

#[derive(Debug, serde::Deserialize)]
struct StreamConfig {
    #[serde(default)]
    shifting: PositionShiftingReaderOptions,
    #[serde(default)]
    null_writer: NullBackwardWriterOptions,
}

#[test]
fn toml_overrides_selected_fields() {
    let config: StreamConfig = toml::from_str(
        r#"
        [shifting]
        base_pos = 4096

        [null_writer]
        write_size_hint = 1000

        [null_writer.buffer_options]
        max_buffer_size = 8192
        "#,
    )
    .expect("合法配置");

    assert_eq!(config.shifting.base_pos(), 4096);
    assert_eq!(config.null_writer.write_size_hint(), Some(1000));
    assert_eq!(config.null_writer.buffer_options().max_buffer_size(), 8192);
    assert_eq!(
        config.null_writer.buffer_options().min_buffer_size(),
        BufferOptions::DEFAULT_MIN_BUFFER_SIZE
    );

    let writer = NullBackwardWriter::new(config.null_writer);
    assert_eq!(writer.buffer_capacity(), 0, "缓冲按需分配");
}

#[test]
fn empty_document_yields_defaults() {
    let config: StreamConfig = toml::from_str("").expect("空配置合法");
    assert_eq!(config.shifting, PositionShiftingReaderOptions::default());
    assert_eq!(config.null_writer, NullBackwardWriterOptions::default());
}

#[test]
fn json_round_trip_preserves_options() {
    let options = NullBackwardWriterOptions::new()
        .with_buffer_options(BufferOptions::new().with_min_buffer_size(64))
        .with_write_size_hint(Some(12));
    let json = serde_json::to_string(&options).expect("可序列化");
    let decoded: NullBackwardWriterOptions = serde_json::from_str(&json).expect("可反序列化");
    assert_eq!(decoded, options);
}

#[test]
fn inverted_buffer_bounds_are_rejected() {
    let err = serde_json::from_str::<NullBackwardWriterOptions>(
        r#"{"buffer_options":{"min_buffer_size":1000000}}"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("min_buffer_size"), "{err}");

    let err = toml::from_str::<StreamConfig>(
        r#"
        [null_writer.buffer_options]
        max_buffer_size = 0
        "#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("zero max_buffer_size"), "{err}");
}

#[test]
fn loaded_bounds_drive_the_writer() {
    let options: NullBackwardWriterOptions = serde_json::from_str(
        r#"{"buffer_options":{"min_buffer_size":16,"max_buffer_size":16}}"#,
    )
    .expect("合法配置");
    let mut writer = NullBackwardWriter::new(options);
    assert!(writer.write_byte(1));
    assert_eq!(writer.buffer_capacity(), 16);
}
