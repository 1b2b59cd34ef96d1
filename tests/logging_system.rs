use std::fs;
use yuan::logging::{LoggingConfig, init};

// 注意: 由于 tracing 的全局订阅器只能初始化一次,
// 涉及 init() 的测试必须单独运行或使用 #[ignore] 标记

fn make_config(directory: &std::path::Path, prefix: &str) -> LoggingConfig {
    LoggingConfig {
        level: "debug".to_string(),
        directory: directory.to_string_lossy().to_string(),
        file_prefix: prefix.to_string(),
        console: false,
    }
}

#[test]
#[ignore] // 需要单独运行: cargo test --test logging_system test_logging_库日志写入文件 -- --ignored
fn test_logging_库日志写入文件() {
    let temp_dir = match tempfile::TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("创建临时目录失败: {}", err),
    };
    let config = make_config(temp_dir.path(), "yuan-test");
    let log_file = config.current_log_path();

    init(config).expect("日志初始化失败");

    // 库 crate 经由 log 门面输出的记录也应写入文件
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let source = yuan::source::MediaSource::new(
        vec![yuan::source::StreamDescriptor::audio(0, "aac", 44100, 2)],
        std::sync::Arc::new(tx),
        yuan::source::SourceConfig::default(),
    )
    .expect("创建媒体源失败");
    source.shutdown().expect("关闭媒体源失败");
    tracing::info!("日志测试消息_12345");

    // 给足够时间让后台线程写入
    std::thread::sleep(std::time::Duration::from_millis(200));

    let content = fs::read_to_string(&log_file)
        .unwrap_or_else(|e| panic!("读取日志文件失败: {:?}, 错误: {}", log_file, e));
    assert!(content.contains("日志测试消息_12345"));
    assert!(content.contains("媒体源已关闭"));
}

#[test]
#[ignore] // 需要单独运行: cargo test --test logging_system test_logging_重复初始化失败 -- --ignored
fn test_logging_重复初始化失败() {
    let temp_dir = match tempfile::TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("创建临时目录失败: {}", err),
    };
    let first = init(make_config(temp_dir.path(), "first"));
    assert!(first.is_ok(), "首次初始化应该成功");
    let second = init(make_config(temp_dir.path(), "second"));
    assert!(second.is_err(), "重复初始化应该失败");
}
