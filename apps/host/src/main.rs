//! # vacuum_gripper_node
//!
//! 真空夹爪节点宿主程序。
//!
//! ```bash
//! # 最少只需设备地址
//! vacuum_gripper_node --robot-ip 172.16.0.2
//!
//! # 配置文件 + 命令行覆盖
//! vacuum_gripper_node --config gripper.toml --publish-rate 20 --stop-at-shutdown
//! ```
//!
//! stdin 每行一个目标（`v` / `d` / `s` / `q` 或 JSON），
//! stdout 输出 JSON-lines（状态与结果），日志写 stderr。
//! 缺少 `robot_ip` 时以退出码 1 结束，不启动任何线程。

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{Receiver, Sender};
use std::io::BufRead;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};
use vacuum_gripper_driver::{SharedGripper, SimulatedGripper};
use vacuum_gripper_node::{
    ActionDispatcher, ConfigError, GoalOutcome, GripperNode, NodeConfig, NodeSettings,
    ShutdownSignal,
};

mod goal_source;
mod output;

use goal_source::{Command, parse_line};
use output::{Envelope, StdoutSink};

/// 真空夹爪控制节点
#[derive(Parser, Debug)]
#[command(name = "vacuum_gripper_node")]
#[command(about = "Vacuum gripper control node", long_about = None)]
#[command(version)]
struct Args {
    /// 配置文件（TOML）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 设备地址（必填，可在配置文件中给出）
    #[arg(long)]
    robot_ip: Option<String>,

    /// 状态发布频率（Hz，默认 10）
    #[arg(long)]
    publish_rate: Option<f64>,

    /// 设备状态轮询频率（Hz，默认 5）
    #[arg(long)]
    poll_rate: Option<f64>,

    /// 停机时向设备发送最后一次 stop
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    stop_at_shutdown: Option<bool>,

    /// 动作工作线程数（默认 2，最少 2）
    #[arg(long)]
    action_threads: Option<usize>,

    /// 目标队列容量（默认 16）
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// 状态过期时间（毫秒，默认 1000）
    #[arg(long)]
    stale_after_ms: Option<u64>,

    /// 不从 stdin 读取目标，只输出状态流
    #[arg(long)]
    no_stdin: bool,
}

impl Args {
    fn overrides(&self) -> NodeConfig {
        NodeConfig {
            robot_ip: self.robot_ip.clone(),
            publish_rate: self.publish_rate,
            poll_rate: self.poll_rate,
            stop_at_shutdown: self.stop_at_shutdown,
            action_threads: self.action_threads,
            queue_capacity: self.queue_capacity,
            stale_after_ms: self.stale_after_ms,
        }
    }
}

fn load_settings(args: &Args) -> Result<NodeSettings, ConfigError> {
    let from_file = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "loading config file");
            NodeConfig::load_from_file(path)?
        },
        None => NodeConfig::default(),
    };
    from_file.merge(args.overrides()).validate()
}

fn main() {
    // 初始化日志（stderr，stdout 留给 JSON-lines）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("vacuum_gripper=info")
            }),
        )
        .init();

    let args = Args::parse();

    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        },
    };

    match run(settings, !args.no_stdin) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        },
    }
}

fn run(settings: NodeSettings, read_stdin: bool) -> Result<i32> {
    let device = SimulatedGripper::connect(&settings.robot_ip)
        .with_context(|| format!("Failed to connect to gripper at {}", settings.robot_ip))?;
    let gripper = SharedGripper::new(device);

    let node = GripperNode::start(settings, gripper, StdoutSink).context("Failed to start node")?;
    let shutdown = node.shutdown_signal();

    // Ctrl+C 触发停机
    let signal = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("received interrupt signal, shutting down");
        signal.trigger();
    })
    .context("Failed to set signal handler")?;

    let (result_tx, result_rx) = crossbeam_channel::unbounded::<GoalOutcome>();
    let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);
    let printer = thread::Builder::new()
        .name("result-printer".into())
        .spawn(move || print_results(result_rx, done_rx))
        .context("Failed to spawn result printer")?;

    if read_stdin {
        let dispatcher = node.dispatcher();
        let signal = shutdown.clone();
        // 读线程阻塞在 stdin 上，不 join
        thread::Builder::new()
            .name("goal-reader".into())
            .spawn(move || read_goals(dispatcher, result_tx, signal))
            .context("Failed to spawn goal reader")?;
    } else {
        drop(result_tx);
    }

    let report = node.wait_for_shutdown();
    info!(
        polls = report.poller.successes,
        poll_failures = report.poller.failures,
        published = report.publisher.published,
        "node finished"
    );

    // 读线程可能仍阻塞在 stdin 上并持有 result_tx，打印线程由 done 通道结束
    drop(done_tx);
    if printer.join().is_err() {
        warn!("result printer panicked");
    }
    Ok(report.exit_code())
}

fn read_goals(dispatcher: Arc<ActionDispatcher>, results: Sender<GoalOutcome>, shutdown: ShutdownSignal) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        if shutdown.is_triggered() {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to read stdin");
                break;
            },
        };

        match parse_line(&line) {
            Ok(None) => {},
            Ok(Some(Command::Quit)) => {
                info!("quit requested");
                shutdown.trigger();
                break;
            },
            Ok(Some(Command::Goal(goal))) => {
                if let Err(e) = dispatcher.submit_to(goal, &results) {
                    warn!(action = %goal.kind(), error = %e, "goal rejected");
                    emit(Envelope::Rejected {
                        action: Some(goal.kind()),
                        error: e.to_string(),
                    });
                }
            },
            Err(e) => {
                warn!(error = %e, "ignoring input line");
                emit(Envelope::Rejected {
                    action: None,
                    error: format!("{:#}", e),
                });
            },
        }
    }
    debug!("goal reader exiting");
}

fn print_results(results: Receiver<GoalOutcome>, done: Receiver<()>) {
    loop {
        crossbeam_channel::select! {
            recv(results) -> outcome => match outcome {
                Ok(outcome) => emit(Envelope::Result(&outcome)),
                Err(_) => return,
            },
            recv(done) -> _ => break,
        }
    }
    // 停机前已完成的目标
    for outcome in results.try_iter() {
        emit(Envelope::Result(&outcome));
    }
}

fn emit(envelope: Envelope<'_>) {
    if let Err(e) = envelope.emit() {
        warn!(error = %e, "failed to write to stdout");
    }
}
