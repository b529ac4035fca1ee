use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log;
use mqtt::{Message, Receiver};
use paho_mqtt as mqtt;

use crate::config::MqttConfig;
use crate::error::{Error, Result};
use crate::tickloop::LoopMessage;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Subscribes to the build topic and forwards every payload to the tick loop.
pub struct MqttSource {
    client: mqtt::Client,
    running: Arc<AtomicBool>,
    consumer: Option<JoinHandle<()>>,
}

impl MqttSource {
    fn make_ssl_options(config: &MqttConfig) -> Result<mqtt::SslOptions> {
        let mut builder = mqtt::SslOptionsBuilder::new();
        if let Some(ca_cert) = &config.ca_cert {
            builder.trust_store(ca_cert)?;
        }
        if let Some(cert) = &config.cert {
            builder.key_store(cert)?;
        }
        if let Some(private_key) = &config.private_key {
            builder.private_key(private_key)?;
        }

        Ok(builder.finalize())
    }

    pub fn start(config: &MqttConfig, events: Sender<LoopMessage>) -> Result<MqttSource> {
        let (url, topic) = match (config.server_uri(), &config.topic) {
            (Some(url), Some(topic)) => (url, topic.clone()),
            _ => {
                return Err(Error::Configuration(
                    "MQTT needs a broker and a topic".to_string(),
                ))
            }
        };

        let create_opts = mqtt::CreateOptionsBuilder::new()
            .server_uri(&url)
            .client_id(&config.client_id)
            .finalize();
        let client = mqtt::Client::new(create_opts)?;

        let mut conn_opts = mqtt::ConnectOptionsBuilder::new();
        conn_opts
            .keep_alive_interval(Duration::from_secs(20))
            .connect_timeout(Duration::from_secs(10))
            .clean_session(true);
        if config.uses_tls() {
            conn_opts.ssl_options(MqttSource::make_ssl_options(config)?);
        }

        client.connect(conn_opts.finalize())?;
        log::info!("Connected to broker at {url}");

        let receiver = client.start_consuming();
        client.subscribe(&topic, config.qos)?;
        log::info!("Subscribed to {topic}");

        let running = Arc::new(AtomicBool::new(true));
        let consumer = {
            let client = client.clone();
            let running = Arc::clone(&running);
            let qos = config.qos;
            thread::Builder::new()
                .name("MQTT".to_string())
                .spawn(move || {
                    MqttSource::consume(client, receiver, &topic, qos, running, events);
                })?
        };

        Ok(MqttSource {
            client,
            running,
            consumer: Some(consumer),
        })
    }

    fn consume(
        client: mqtt::Client,
        receiver: Receiver<Option<Message>>,
        topic: &str,
        qos: i32,
        running: Arc<AtomicBool>,
        events: Sender<LoopMessage>,
    ) {
        loop {
            match receiver.recv() {
                Ok(Some(msg)) => {
                    log::info!("Received {}: {}", msg.topic(), msg.payload_str());
                    let payload = msg.payload_str().into_owned();
                    if events.send(LoopMessage::Payload(payload)).is_err() {
                        log::info!("Tick loop is gone, stopping MQTT consumer");
                        break;
                    }
                }
                Ok(None) => {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    log::warn!("Lost connection to broker");
                    MqttSource::reconnect(&client, topic, qos, &running);
                }
                // The channel closes when consuming is stopped.
                Err(_) => break,
            }
        }
    }

    fn reconnect(client: &mqtt::Client, topic: &str, qos: i32, running: &AtomicBool) {
        while running.load(Ordering::SeqCst) {
            match client.reconnect() {
                Ok(_) => match client.subscribe(topic, qos) {
                    Ok(_) => {
                        log::info!("Reconnected and resubscribed to {topic}");
                        return;
                    }
                    Err(err) => log::warn!("Failed to subscribe to topic {topic}: {err}"),
                },
                Err(err) => log::warn!("Reconnection failed: {err}"),
            }

            thread::sleep(RECONNECT_DELAY);
        }
    }
}

impl Drop for MqttSource {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.client.stop_consuming();

        if self.client.is_connected() {
            if let Err(err) = self.client.disconnect(None) {
                log::warn!("Cannot disconnect from MQTT broker: {err}");
            }
        }

        if let Some(consumer) = self.consumer.take() {
            if consumer.join().is_err() {
                log::error!("MQTT consumer thread panicked");
            }
        }

        log::info!("Disconnected from broker");
    }
}
