//! yuan-sim - 媒体源模拟工具
//!
//! 用合成的生产者与消费者驱动若干条流通道, 输出每条流的投递统计.

mod simulation;

use clap::Parser;
use std::path::PathBuf;
use std::process;

use yuan::logging::{self, LoggingConfig};
use yuan_source::SourceConfig;

use simulation::{SimOptions, SimSummary};

/// Yuan 媒体源模拟工具
#[derive(Parser, Debug)]
#[command(name = "yuan-sim", version, about = "纯 Rust 媒体源流通道模拟工具")]
struct Cli {
    /// 视频流数量
    #[arg(long, default_value_t = 1)]
    video: u32,

    /// 音频流数量
    #[arg(long, default_value_t = 1)]
    audio: u32,

    /// 每条流生成的样本数
    #[arg(short = 'n', long, default_value_t = 100)]
    samples: u32,

    /// 媒体源配置文件 (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 超时 (秒)
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 日志详细程度 (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SourceConfig> {
    let Some(path) = path else {
        return Ok(SourceConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("读取配置文件失败, path={}: {}", path.display(), e))?;
    let config: SourceConfig = serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("解析配置文件失败, path={}: {}", path.display(), e))?;
    config.validate()?;
    Ok(config)
}

fn print_summary(summary: &SimSummary) {
    println!("流数: {}", summary.streams.len());
    for stream in &summary.streams {
        println!(
            "  #{} {} ({}): 投递 {} 个样本, {} 字节, 结束={}",
            stream.id,
            stream.media_type,
            stream.codec_name,
            stream.samples,
            stream.bytes,
            stream.ended
        );
    }
    println!("错误事件: {}", summary.errors);
    println!("耗时: {} ms", summary.elapsed_ms);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(LoggingConfig::with_verbosity("yuan-sim", cli.verbose)) {
        eprintln!("初始化日志失败: {e:#}");
    }

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("错误: {e:#}");
            process::exit(1);
        }
    };

    let options = SimOptions {
        video_streams: cli.video,
        audio_streams: cli.audio,
        samples_per_stream: cli.samples,
        timeout_secs: cli.timeout,
        config,
    };

    match simulation::run(options).await {
        Ok(summary) => {
            if cli.json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("序列化结果失败: {e}");
                        process::exit(1);
                    }
                }
            } else {
                print_summary(&summary);
            }
        }
        Err(e) => {
            eprintln!("错误: {e:#}");
            process::exit(1);
        }
    }
}
