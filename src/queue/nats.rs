use super::{ChunkJob, DeadLetter, Delivery, JobQueue};
use crate::config::QueueConfig;
use anyhow::{Context, Result};
use async_nats::jetstream::{self, consumer::pull, stream};
use async_trait::async_trait;
use futures::stream::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub struct NatsJobQueue {
    jetstream: jetstream::Context,
    stream: stream::Stream,
    config: QueueConfig,
}

impl NatsJobQueue {
    /// Connect to NATS and make sure the job stream exists
    pub async fn connect(config: &QueueConfig) -> Result<Self> {
        info!("Connecting to NATS at {}", config.nats_url);

        let client = async_nats::connect(&config.nats_url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        let jetstream = jetstream::new(client);
        let stream = jetstream
            .get_or_create_stream(stream::Config {
                name: config.stream.clone(),
                subjects: vec![config.subject.clone(), dead_letter_subject(config)],
                ..Default::default()
            })
            .await
            .context("Failed to create job stream")?;

        info!(
            "Job stream {} ready (subject={})",
            config.stream, config.subject
        );

        Ok(Self {
            jetstream,
            stream,
            config: config.clone(),
        })
    }

    async fn publish(&self, subject: String, payload: Vec<u8>) -> Result<()> {
        self.jetstream
            .publish(subject.clone(), payload.into())
            .await
            .with_context(|| format!("Failed to publish to {}", subject))?
            .await
            .with_context(|| format!("JetStream did not acknowledge publish to {}", subject))?;
        Ok(())
    }
}

fn dead_letter_subject(config: &QueueConfig) -> String {
    format!("{}.dead", config.subject)
}

#[async_trait]
impl JobQueue for NatsJobQueue {
    async fn enqueue(&self, job: &ChunkJob) -> Result<()> {
        let payload = serde_json::to_vec(job)?;
        self.publish(self.config.subject.clone(), payload).await?;

        info!(
            "Published chunk job to {} (visit={}, chunk={}, final={})",
            self.config.subject, job.visit_id, job.chunk_number, job.is_final
        );

        Ok(())
    }

    async fn dead_letter(&self, letter: &DeadLetter) -> Result<()> {
        let subject = dead_letter_subject(&self.config);
        let payload = serde_json::to_vec(letter)?;
        self.publish(subject.clone(), payload).await?;

        warn!(
            "Dead-lettered chunk {} for visit {} to {} after {} attempts: {}",
            letter.job.chunk_number, letter.job.visit_id, subject, letter.attempts, letter.reason
        );

        Ok(())
    }

    async fn consume(&self) -> Result<mpsc::Receiver<Delivery>> {
        let consumer = self
            .stream
            .get_or_create_consumer(
                &self.config.consumer,
                pull::Config {
                    durable_name: Some(self.config.consumer.clone()),
                    filter_subject: self.config.subject.clone(),
                    ack_wait: Duration::from_secs(self.config.ack_wait_secs),
                    // Bounds jobs handed out but not yet finished
                    max_ack_pending: self.config.capacity.max(1) as i64,
                    ..Default::default()
                },
            )
            .await
            .context("Failed to create job consumer")?;

        let mut messages = consumer
            .messages()
            .await
            .context("Failed to subscribe to chunk jobs")?;

        info!(
            "Consuming chunk jobs from {} as {}",
            self.config.subject, self.config.consumer
        );

        let (tx, rx) = mpsc::channel(self.config.capacity.max(1));

        tokio::spawn(async move {
            while let Some(next) = messages.next().await {
                let message = match next {
                    Ok(message) => message,
                    Err(e) => {
                        error!("Failed to receive chunk job: {}", e);
                        continue;
                    }
                };

                match serde_json::from_slice::<ChunkJob>(&message.payload) {
                    Ok(job) => {
                        if tx.send(Delivery::jetstream(job, message)).await.is_err() {
                            // Worker pool is gone; unacked jobs get redelivered
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Dropping unparseable chunk job: {}", e);
                        if let Err(e) = message.ack().await {
                            error!("Failed to ack unparseable chunk job: {}", e);
                        }
                    }
                }
            }

            info!("Chunk job consumer stopped");
        });

        Ok(rx)
    }

    fn name(&self) -> &str {
        "nats"
    }
}
