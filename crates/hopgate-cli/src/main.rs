//! HOPGATE CLI
//!
//! Offline front end for the digipeater and IGate decision layer: feed it
//! monitor-format packets or APRS-IS lines and see what would be sent.

mod config;

use clap::{Parser, Subcommand};
use hopgate_core::{
    AddressMode, ChannelQueue, ChannelServerLink, Digipeater, Igate, Packet, QueuedFrame,
    RxVerdict, read_server_lines,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use config::{Config, Runtime};

/// HOPGATE - APRS digipeater and IGate decisions
#[derive(Parser)]
#[command(name = "hopgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate the configuration and print the channel matrix
    Check,

    /// Evaluate one received packet against the digipeater rules
    Digipeat {
        /// Channel the packet was heard on
        #[arg(long, default_value_t = 0)]
        channel: usize,

        /// Packet in monitor format, e.g. "W1ABC>APRS,WIDE2-2:hello"
        #[arg(required = true)]
        line: String,
    },

    /// Read received packets from stdin and print what goes to APRS-IS
    RxGate {
        /// Channel the packets were heard on
        #[arg(long, default_value_t = 0)]
        channel: usize,
    },

    /// Read APRS-IS lines from stdin and print what would be transmitted
    TxGate,
}

/// One queued frame, as printed
#[derive(Serialize)]
struct FrameOutput {
    channel: usize,
    priority: hopgate_core::Priority,
    frame: String,
}

impl From<QueuedFrame> for FrameOutput {
    fn from(queued: QueuedFrame) -> Self {
        Self {
            channel: queued.channel,
            priority: queued.priority,
            frame: queued.packet.to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    if let Commands::Init { force } = cli.command {
        return init(&config_path, force);
    }

    let config = Config::load(&config_path)?;

    // Logs go to stderr; stdout carries results.
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.to_lowercase()
    };
    tracing_subscriber::fmt()
        .with_env_filter(level.as_str())
        .with_writer(std::io::stderr)
        .init();

    config.validate()?;
    let runtime = config.to_runtime()?;

    match cli.command {
        Commands::Init { .. } => {}
        Commands::Check => check(&runtime, cli.json)?,
        Commands::Digipeat { channel, line } => digipeat(runtime, channel, &line, cli.json)?,
        Commands::RxGate { channel } => rx_gate(runtime, channel, cli.json).await?,
        Commands::TxGate => tx_gate(runtime, cli.json).await?,
    }

    Ok(())
}

/// Write the starter configuration to `path`
fn init(path: &std::path::Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Config::starter().save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Print a summary of the validated configuration
fn check(runtime: &Runtime, json: bool) -> anyhow::Result<()> {
    #[derive(Serialize)]
    struct Rule {
        from: usize,
        to: usize,
        preempt: String,
        enabled: bool,
    }

    let digi = &runtime.digipeater;
    let n = digi.channel_count();
    let rules: Vec<Rule> = (0..n)
        .flat_map(|from| (0..n).map(move |to| (from, to)))
        .filter_map(|(from, to)| {
            digi.pair(from, to).map(|pair| Rule {
                from,
                to,
                preempt: pair.preempt.to_string(),
                enabled: pair.enabled,
            })
        })
        .collect();

    if json {
        let summary = serde_json::json!({
            "channels": runtime.mycalls.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "dedupe_secs": digi.dedupe_time().as_secs(),
            "rules": rules,
            "igate": {
                "tx_channel": runtime.igate.tx_channel,
                "tx_via": runtime.igate.tx_via.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "tx_limit_1": runtime.igate.tx_limit_1,
                "tx_limit_5": runtime.igate.tx_limit_5,
            },
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Configuration OK");
    for (channel, mycall) in runtime.mycalls.iter().enumerate() {
        println!("Channel {}: {}", channel, mycall);
    }
    println!("Dedupe window: {}s", digi.dedupe_time().as_secs());
    for rule in &rules {
        println!(
            "Digipeat {} -> {}: preempt={}{}",
            rule.from,
            rule.to,
            rule.preempt,
            if rule.enabled { "" } else { " (disabled)" }
        );
    }
    match runtime.igate.tx_channel {
        Some(channel) => println!(
            "IGate: transmit on channel {}, {}/min, {}/5min",
            channel, runtime.igate.tx_limit_1, runtime.igate.tx_limit_5
        ),
        None => println!("IGate: receive only"),
    }

    Ok(())
}

/// Evaluate one packet and print every repeat it produces
fn digipeat(runtime: Runtime, channel: usize, line: &str, json: bool) -> anyhow::Result<()> {
    let mut packet = Packet::from_text(line, AddressMode::Strict)?;

    let (queue, mut frames) = ChannelQueue::new();
    let digi = Digipeater::new(Arc::new(runtime.digipeater), Arc::new(queue));

    let repeats = digi.digipeat(channel, &mut packet);
    tracing::debug!("{} repeat(s)", repeats.len());

    if repeats.is_empty() && !json {
        println!("(not repeated)");
    }
    while let Ok(frame) = frames.try_recv() {
        print_frame(FrameOutput::from(frame), json)?;
    }

    Ok(())
}

/// Gate packets read from stdin toward the server
async fn rx_gate(runtime: Runtime, channel: usize, json: bool) -> anyhow::Result<()> {
    let (link, _server_lines) = ChannelServerLink::new();
    let (queue, _frames) = ChannelQueue::new();
    let igate = Igate::new(runtime.igate, runtime.mycalls, Arc::new(link), Arc::new(queue))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let packet = match Packet::from_text(line, AddressMode::Strict) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!("Skipping unparseable packet: {}: {}", e, line);
                continue;
            }
        };

        let verdict = igate.send_rec_packet(channel, &packet);
        if json {
            println!("{}", serde_json::to_string(&verdict)?);
        } else {
            match verdict {
                RxVerdict::Forwarded(text) => println!("{}", text.trim_end()),
                RxVerdict::Dropped(reason) => tracing::info!("Not gated: {:?}: {}", reason, line),
            }
        }
    }

    tracing::info!("{:?}", igate.stats());
    Ok(())
}

/// Read server lines from stdin and print the frames queued for RF
async fn tx_gate(runtime: Runtime, json: bool) -> anyhow::Result<()> {
    if runtime.igate.tx_channel.is_none() {
        anyhow::bail!("IGate has no tx_channel configured; nothing would be transmitted");
    }

    let (link, _server_lines) = ChannelServerLink::new();
    let (queue, mut frames) = ChannelQueue::new();
    let igate = Igate::new(runtime.igate, runtime.mycalls, Arc::new(link), Arc::new(queue))?;

    let printer = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            print_frame(FrameOutput::from(frame), json)?;
        }
        anyhow::Ok(())
    });

    read_server_lines(BufReader::new(tokio::io::stdin()), &igate).await?;
    tracing::info!("{:?}", igate.stats());

    // Dropping the IGate closes the queue and ends the printer.
    drop(igate);
    printer.await??;

    Ok(())
}

fn print_frame(frame: FrameOutput, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(&frame)?);
    } else {
        let priority = match frame.priority {
            hopgate_core::Priority::High => "high",
            hopgate_core::Priority::Low => "low",
        };
        println!("[{} {}] {}", frame.channel, priority, frame.frame);
    }
    Ok(())
}
