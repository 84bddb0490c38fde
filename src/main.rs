use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use disto_rs::constants::DEFAULT_PROBE_WINDOW;
use disto_rs::disto::probe::send_and_collect;
use disto_rs::disto::serial::open_serial;
use disto_rs::util::hex::{decode_hex, encode_hex, escape_ascii};
use disto_rs::{
    init_logger, log_info, AckStrategy, Command, CsvLogger, DistoDeviceHandle, DistoEvent,
    LineEnding, SerialConfig, SessionConfig, WordKind,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "disto-cli")]
#[command(about = "CLI tool for the Leica DISTO D8 ONLINE protocol")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session, print events and read commands from stdin
    Monitor {
        port: String,
        #[arg(short, long, default_value = "9600")]
        baudrate: u32,
        #[arg(long, default_value = "crlf")]
        ending: LineEnding,
        #[arg(long, default_value = "cfm")]
        ack: AckStrategy,
        /// Do not acknowledge push-mode readings
        #[arg(long)]
        no_confirm: bool,
        /// Append distance readings to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Send one command and show the raw response
    Send {
        port: String,
        command: String,
        #[arg(short, long, default_value = "9600")]
        baudrate: u32,
        #[arg(long, default_value = "crlf")]
        ending: LineEnding,
        /// Read window in seconds
        #[arg(long, default_value_t = DEFAULT_PROBE_WINDOW.as_secs_f64())]
        window: f64,
    },
}

/// A line typed on stdin while monitoring.
#[derive(Debug, PartialEq)]
enum ConsoleInput {
    Send(Command),
    Raw(Vec<u8>),
    Average(usize),
    StopAverage,
    DeviceInfo,
    Confirm(bool),
    Quit,
}

fn parse_console(line: &str) -> anyhow::Result<Option<ConsoleInput>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let first = words.next().unwrap_or_default();
    let input = match (first, words.next()) {
        ("quit", None) | ("exit", None) => ConsoleInput::Quit,
        ("info", None) => ConsoleInput::DeviceInfo,
        ("avg", None) => bail!("avg needs a sample count"),
        ("avg", Some("stop")) => ConsoleInput::StopAverage,
        ("avg", Some(n)) => ConsoleInput::Average(n.parse().context("avg needs a sample count")?),
        ("confirm", Some("on")) => ConsoleInput::Confirm(true),
        ("confirm", Some("off")) => ConsoleInput::Confirm(false),
        _ if line.starts_with("hex:") => ConsoleInput::Raw(decode_hex(&line[4..])?),
        (text, None) => ConsoleInput::Send(text.parse()?),
        _ => bail!("unrecognized input: {line}"),
    };
    Ok(Some(input))
}

fn apply_console(device: &DistoDeviceHandle, input: ConsoleInput) -> anyhow::Result<()> {
    match input {
        ConsoleInput::Send(command) => device.send(command)?,
        ConsoleInput::Raw(bytes) => device.send_raw(bytes)?,
        ConsoleInput::Average(n) => device.start_averaging(n)?,
        ConsoleInput::StopAverage => device.stop_averaging()?,
        ConsoleInput::DeviceInfo => device.request_device_info()?,
        ConsoleInput::Confirm(enabled) => device.set_confirm_push(enabled)?,
        ConsoleInput::Quit => {}
    }
    Ok(())
}

async fn monitor(
    port: &str,
    serial: SerialConfig,
    session: SessionConfig,
    csv: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let mut logger = csv
        .map(CsvLogger::open)
        .transpose()
        .context("cannot open CSV log")?;
    let (mut device, mut events) = DistoDeviceHandle::connect(port, &serial, session).await?;
    log_info(&format!("Monitoring {port}; type a command, 'avg N', 'info' or 'quit'"));

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    println!("{event}");
                }
                if let (Some(logger), DistoEvent::Word { word, .. }) = (logger.as_mut(), &event) {
                    if word.kind == WordKind::Distance {
                        if let Err(e) = logger.log_event(&event) {
                            eprintln!("CSV write failed: {e}");
                        }
                    }
                }
                if event.is_terminal() {
                    break;
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line? {
                    None => stdin_open = false,
                    Some(line) => match parse_console(&line) {
                        Ok(Some(ConsoleInput::Quit)) => device.disconnect().await?,
                        Ok(Some(input)) => {
                            if let Err(e) = apply_console(&device, input) {
                                eprintln!("{e}");
                            }
                        }
                        Ok(None) => {}
                        Err(e) => eprintln!("{e}"),
                    },
                }
            }
            _ = tokio::signal::ctrl_c() => device.disconnect().await?,
        }
    }

    device.disconnect().await?;
    Ok(())
}

async fn send(
    port: &str,
    serial: SerialConfig,
    command: &str,
    ending: LineEnding,
    window: Duration,
) -> anyhow::Result<()> {
    let command: Command = command.parse()?;
    let mut stream = open_serial(port, &serial)?;
    let report = send_and_collect(&mut stream, &command, ending, window).await?;

    println!("TX     : {} ({})", escape_ascii(&report.tx), encode_hex(&report.tx));
    if report.rx.is_empty() {
        println!("No reply.");
    } else {
        println!("RX TEXT: {}", escape_ascii(&report.rx));
        println!("RX HEX : {}", encode_hex(&report.rx));
    }
    match report.meters {
        Some(m) => println!("CLASS  : {:?} ({m:.3} m)", report.class),
        None => println!("CLASS  : {:?}", report.class),
    }
    if let Some(stop) = &report.stream_stop_rx {
        println!("Streaming detected; sent P. Stop reply: {}", escape_ascii(stop));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();

    match cli.command {
        Commands::Monitor {
            port,
            baudrate,
            ending,
            ack,
            no_confirm,
            csv,
            json,
        } => {
            let serial = SerialConfig {
                baudrate,
                ..SerialConfig::default()
            };
            let session = SessionConfig {
                line_ending: ending,
                ack_strategy: ack,
                confirm_push: !no_confirm,
                ..SessionConfig::default()
            };
            monitor(&port, serial, session, csv, json).await?;
        }
        Commands::Send {
            port,
            command,
            baudrate,
            ending,
            window,
        } => {
            if !(window.is_finite() && window > 0.0) {
                bail!("--window must be a positive number of seconds");
            }
            let serial = SerialConfig {
                baudrate,
                ..SerialConfig::default()
            };
            send(&port, serial, &command, ending, Duration::from_secs_f64(window)).await?;
        }
    }

    Ok(())
}
