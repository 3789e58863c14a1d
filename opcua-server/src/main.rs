//! Thin process wiring: parse arguments, load configuration, start
//! structured logging, and hand a `SecureChannel` + `Session` pair to the
//! protocol core's `EventLoop`. Registering a real transport (TCP listener,
//! TLS terminator, ...) is left to the deployment; this binary only proves
//! the pieces fit together.

mod config;
mod logging;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{App, Arg};
use slog::info;

use opcua_core::capability::{Clock, Logger, SecurityPolicy, SystemClock};
use opcua_core::channel::crypto::Aead256Policy;
use opcua_core::channel::SecureChannel;
use opcua_core::codec::NodeId;
use opcua_core::eventloop::{EventLoop, Signal};
use opcua_core::session::Session;

use crate::config::ServerConfig;
use crate::logging::SlogLogger;

fn main() {
    let matches = App::new("opcua-server")
        .version("0.1.0")
        .author("SleepingPills <tom.farnbauer@gmail.com>")
        .about("Runs the OPC UA protocol core's event loop.")
        .arg(Arg::with_name("CONFIG_FILE").help("Path to the server config file").required(false))
        .get_matches();

    let config = match matches.value_of("CONFIG_FILE") {
        Some(path) => ServerConfig::from_file(path).expect("error parsing config file"),
        None => ServerConfig::default(),
    };

    let logger = logging::init(&config.log_level);
    info!(logger, "starting opc ua server"; "channel_id" => config.channel_id);
    let core_logger: Arc<dyn Logger> = Arc::new(SlogLogger::new(logger.clone()));

    let policy: Arc<dyn SecurityPolicy> = Arc::new(Aead256Policy::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let channel = SecureChannel::new(config.channel_id, policy, clock, core_logger.clone());

    let session_id = NodeId::numeric(1, 1);
    let auth_token = NodeId::numeric(1, 2);
    let _session = Session::new(
        session_id,
        auth_token,
        Duration::from_millis(config.session_timeout_ms),
        Instant::now(),
        core_logger.clone(),
    );

    info!(logger, "channel and session ready"; "channel_id" => channel.channel_id, "session_timeout_ms" => config.session_timeout_ms);

    let mut event_loop = EventLoop::new(Box::new(SystemClock), core_logger).expect("failed to start event loop");

    // A real deployment sets this flag from a libc signal handler (or the
    // self-pipe trick); nothing in this binary's own dependency stack does
    // that, so the demo leaves the flag unset and relies on the process
    // manager to terminate the loop.
    let shutdown = event_loop.interrupts_mut().watch(Signal::Interrupt);

    {
        let logger = logger.clone();
        event_loop.schedule(
            Instant::now() + Duration::from_secs(1),
            Box::new(move || info!(logger, "event loop heartbeat")),
        );
    }

    while !shutdown.load(Ordering::SeqCst) {
        event_loop.run_once().expect("event loop tick failed");
    }

    info!(logger, "shutting down");
}
