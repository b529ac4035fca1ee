pub(crate) mod animationstate;
pub(crate) mod bouncepoint;
pub(crate) mod buildregistry;
pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod eventprocessor;
pub(crate) mod framerenderer;
pub(crate) mod intervaltimer;
pub(crate) mod logoutput;
pub(crate) mod mqtt;
pub(crate) mod olaoutput;
pub(crate) mod tickloop;

use std::path::PathBuf;
use std::process;
use std::sync::mpsc;

use clap::Parser;
use logoutput::LogOutput;
use olaoutput::OlaOutput;
use tickloop::{FrameSink, LoopMessage, TickLoop};

use crate::buildregistry::BuildRegistry;
use crate::config::Config;
use crate::error::Result;
use crate::eventprocessor::EventProcessor;
use crate::framerenderer::{Colors, FrameRenderer};
use crate::intervaltimer::IntervalTimer;
use crate::mqtt::MqttSource;

#[derive(Parser)]
#[command(about = "Shows the state of a CI build fleet on an LED strip")]
struct Cli {
    /// TOML configuration file
    #[arg(short = 'f', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log frames instead of sending them to OLA, and do not connect to MQTT
    #[arg(long)]
    dry_run: bool,

    /// The MQTT client id of this node
    #[arg(short = 'i', long)]
    client_id: Option<String>,

    /// The MQTT endpoint host, connected to over TLS on port 8883
    #[arg(short, long)]
    endpoint: Option<String>,

    /// The path to the CA certificate
    #[arg(short = 'a', long, value_name = "FILE")]
    ca_cert: Option<PathBuf>,

    /// The path to the private key of this node
    #[arg(short, long, value_name = "FILE")]
    private_key: Option<PathBuf>,

    /// The path to the certificate of this node
    #[arg(short, long, value_name = "FILE")]
    cert: Option<PathBuf>,

    /// The MQTT topic to listen for build events on
    #[arg(short, long)]
    topic: Option<String>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        let mqtt = &mut config.mqtt;
        if let Some(client_id) = &self.client_id {
            mqtt.client_id = client_id.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            mqtt.endpoint = Some(endpoint.clone());
            mqtt.url = None;
        }
        if let Some(ca_cert) = &self.ca_cert {
            mqtt.ca_cert = Some(ca_cert.clone());
        }
        if let Some(private_key) = &self.private_key {
            mqtt.private_key = Some(private_key.clone());
        }
        if let Some(cert) = &self.cert {
            mqtt.cert = Some(cert.clone());
        }
        if let Some(topic) = &self.topic {
            mqtt.topic = Some(topic.clone());
        }
    }
}

fn load_config(args: &Cli) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    args.apply_overrides(&mut config);
    config.validate(!args.dry_run)?;
    Ok(config)
}

fn run_loop<S: FrameSink>(config: &Config, sink: S, receiver: mpsc::Receiver<LoopMessage>) {
    let colors = Colors::from(&config.colors);
    let processor = EventProcessor::new(colors.success, colors.failure, config.hold_ticks());
    let renderer = FrameRenderer::new(colors, config.strip.length, config.strip.block_width);

    log::info!(
        "Holding notifications for {} ticks ({:?})",
        config.hold_ticks(),
        config.notify_hold()
    );

    let mut tick_loop = TickLoop::new(
        BuildRegistry::new(config.strip.length),
        processor,
        renderer,
        IntervalTimer::new(config.tick_interval(), true),
        sink,
        receiver,
    );
    tick_loop.run();
}

fn run(args: &Cli) -> Result<()> {
    let config = load_config(args)?;

    let (tx, rx) = mpsc::channel();
    let shutdown_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(LoopMessage::Shutdown);
    })?;

    if args.dry_run {
        log::info!("Dry run, frames are logged at trace level");
        run_loop(&config, LogOutput::new(), rx);
        return Ok(());
    }

    let ola = OlaOutput::new(
        config.ola.address,
        config.ola.first_universe,
        config.strip.length,
    )?;
    let source = MqttSource::start(&config.mqtt, tx)?;

    run_loop(&config, ola, rx);

    // Stops consuming and disconnects.
    drop(source);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();
    if let Err(err) = run(&args) {
        log::error!("{err}");
        process::exit(1);
    }
}
