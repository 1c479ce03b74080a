use std::any::Any;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use beerpong_http::{router, AppState, HttpConfig};
use beerpong_protocol::{CommandReader, Dispatcher, ReaderConfig, SensorState};
use beerpong_store::JsonFileStore;
use beerpong_transport::MockSerial;
use tracing::{error, info, warn};

use crate::cmd::{open_serial, ServeArgs, SourceBox};
use crate::exit::{io_error, store_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let store = JsonFileStore::open(&args.db_path)
        .map_err(|err| store_error("failed to open score database", err))?;
    let sensor = SensorState::new();

    let source: SourceBox = if args.mock {
        warn!("app is in mock mode");
        Box::new(MockSerial::default_script())
    } else {
        open_serial(&args.usb_port, args.baud_rate)?
    };

    let running = Arc::new(AtomicBool::new(true));
    let reader_config = ReaderConfig {
        decoder: args.decoder.decoder_config(),
        // The mock script is finite; a serial line is retried after a hangup.
        stop_on_eof: args.mock,
        ..ReaderConfig::default()
    };
    let decode_loop = spawn_decode_loop(source, sensor.clone(), reader_config, running.clone())?;

    let config = HttpConfig {
        listen: SocketAddr::from(([0, 0, 0, 0], args.listen_port)),
        public_html: Some(args.public_html.clone()),
    };
    let app = router(AppState::new(sensor, Arc::new(store)), &config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start async runtime", err))?;

    let served = runtime.block_on(beerpong_http::serve(config.listen, app, shutdown_signal()));

    running.store(false, Ordering::SeqCst);
    // A serial read blocks until the device sends something; only join a
    // loop that has already stopped.
    if decode_loop.is_finished() {
        if let Err(panic) = decode_loop.join() {
            error!(panic = %panic_message(panic.as_ref()), "decode loop panicked");
        }
    }

    served.map_err(|err| io_error("HTTP server failed", err))?;
    info!("server stopped");
    Ok(SUCCESS)
}

fn spawn_decode_loop(
    source: SourceBox,
    sensor: SensorState,
    config: ReaderConfig,
    running: Arc<AtomicBool>,
) -> CliResult<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("decode-loop".to_string())
        .spawn(move || {
            let mut reader =
                CommandReader::with_config(source, Dispatcher::with_sensor(sensor), config);
            let dispatched = reader.run(&running);
            info!(dispatched, "decode loop finished");
        })
        .map_err(|err| CliError::new(INTERNAL, format!("failed to spawn decode loop: {err}")))
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
