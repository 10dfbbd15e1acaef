//! Fixed-rate driver around a [BeliefEngine].
//!
//! [TickService] builds its own tokio runtime and spawns a single task that owns the engine,
//! the feeds and the sinks. That task is the only execution context that ever touches the
//! stores: it alternates between the tick interval and the command channel, so a request is
//! always served entirely before or entirely after a tick. Both sources are polled fairly, so a
//! steady stream of requests cannot hold off scheduled ticks.
//!
//! ```rust,no_run
//! use perspective_core::{
//!     commands::Op,
//!     config::EngineConfig,
//!     event::{Event, SinkMap},
//!     feed::{FactProducer, LatestFeed},
//!     properties::{AgentId, Fact, PropertyType},
//!     service::TickService,
//! };
//! use std::sync::mpsc::channel;
//!
//! let config = EngineConfig::default();
//! let (tx, rx) = channel::<Event>();
//! let mut sinks = SinkMap::new();
//! for agent in [1, 101, 102] {
//!     sinks.insert(AgentId(agent), Box::new(tx.clone()));
//! }
//! let (spark, writer) = LatestFeed::new("SPARK");
//! let feeds: Vec<Box<dyn FactProducer>> = vec![Box::new(spark)];
//! let service = TickService::start(&config, feeds, sinks, None)?;
//!
//! writer.write(vec![Fact::new("cup1", "IsPresent", PropertyType::Position)]);
//! service.request(Op::AddFact(Fact::new("table1", "state", PropertyType::State)))?;
//! let report = service.tick_now()?;
//! assert_eq!(report.ingested, 1);
//! for event in rx.try_iter() {
//!     println!("{event:?}");
//! }
//! # Ok::<(), perspective_core::PerspectiveError>(())
//! ```

use parking_lot::Mutex;
use std::sync::mpsc::Sender;
use tokio::{
    runtime::Runtime,
    sync::{
        mpsc::{unbounded_channel, UnboundedSender},
        oneshot,
    },
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

use crate::{
    commands::{Op, OpResult},
    config::EngineConfig,
    engine::{BeliefEngine, TickReport},
    error::PerspectiveError,
    event::{Event, SinkMap},
    feed::FactProducer,
};

enum Command {
    Request(Op, oneshot::Sender<OpResult>),
    Tick(oneshot::Sender<TickReport>),
}

pub struct TickService {
    commands: UnboundedSender<Command>,
    handle: Mutex<Option<JoinHandle<()>>>,
    // Owns the worker thread the tick loop runs on.
    _runtime: Runtime,
}

impl TickService {
    /// Validate the configuration against the feeds and sinks, then start ticking.
    ///
    /// The first tick fires one period after start. Every tick report is also sent to `events`
    /// when given.
    pub fn start(
        config: &EngineConfig,
        feeds: Vec<Box<dyn FactProducer>>,
        sinks: SinkMap,
        events: Option<Sender<Event>>,
    ) -> Result<TickService, PerspectiveError> {
        let period = config.tick_period()?;
        let mut engine = BeliefEngine::new(config)?;
        engine.check_sinks(&sinks)?;
        let feeds = engine.order_feeds(feeds);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;
        let (commands, mut command_rx) = unbounded_channel::<Command>();

        let handle = runtime.spawn(async move {
            tracing::info!("[TickService] Starting tick loop at {:?} per tick", period);
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    command = command_rx.recv() => match command {
                        Some(Command::Request(op, reply)) => {
                            if reply.send(engine.handle(op)).is_err() {
                                tracing::debug!("[TickService] requester went away before the reply");
                            }
                        }
                        Some(Command::Tick(reply)) => {
                            let report = run_tick(&mut engine, &feeds, &sinks, events.as_ref());
                            if reply.send(report).is_err() {
                                tracing::debug!("[TickService] requester went away before the tick report");
                            }
                        }
                        None => {
                            tracing::info!("[TickService] Command channel closed, stopping");
                            break;
                        }
                    },
                    _ = ticker.tick() => {
                        run_tick(&mut engine, &feeds, &sinks, events.as_ref());
                    }
                }
            }
        });

        Ok(TickService {
            commands,
            handle: Mutex::new(Some(handle)),
            _runtime: runtime,
        })
    }

    /// Serve `op` between two ticks and wait for the answer.
    ///
    /// Blocks the calling thread, so it must not be called from inside an async context.
    pub fn request(&self, op: Op) -> Result<OpResult, PerspectiveError> {
        let (reply, answer) = oneshot::channel();
        self.commands
            .send(Command::Request(op, reply))
            .map_err(|_| PerspectiveError::ServiceStopped)?;
        answer
            .blocking_recv()
            .map_err(|_| PerspectiveError::ServiceStopped)
    }

    /// Run one tick (including publication) right away, outside the regular schedule.
    pub fn tick_now(&self) -> Result<TickReport, PerspectiveError> {
        let (reply, answer) = oneshot::channel();
        self.commands
            .send(Command::Tick(reply))
            .map_err(|_| PerspectiveError::ServiceStopped)?;
        answer
            .blocking_recv()
            .map_err(|_| PerspectiveError::ServiceStopped)
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the tick loop. In-memory beliefs are discarded with it.
    pub fn shutdown(&self) {
        if let Some(handle) = self.handle.lock().take() {
            tracing::info!("[TickService] Shutting down");
            handle.abort();
        }
    }
}

impl Drop for TickService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_tick(
    engine: &mut BeliefEngine,
    feeds: &[Box<dyn FactProducer>],
    sinks: &SinkMap,
    events: Option<&Sender<Event>>,
) -> TickReport {
    let report = engine.tick(feeds);
    engine.publish(sinks);
    if let Some(tx) = events {
        if tx.send(Event::Tick(report.clone())).is_err() {
            tracing::debug!("[TickService] event receiver is gone");
        }
    }
    report
}
