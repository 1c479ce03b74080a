use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use beerpong_protocol::{
    CommandReader, DecodeEvent, Dispatcher, ProtocolError, ReaderConfig, SensorState,
};
use tracing::debug;

use crate::cmd::{open_serial, DecodeArgs, SourceBox};
use crate::exit::{io_error, protocol_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_event, print_reading, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let source = open_input(args.input.as_deref(), args.baud_rate)?;
    let sensor = SensorState::new();
    let mut config = ReaderConfig {
        decoder: args.decoder.decoder_config(),
        stop_on_eof: true,
        ..ReaderConfig::default()
    };
    if args.count.is_some() {
        // One byte per read completes at most one command, so nothing past
        // the last counted command is ever dispatched.
        config.read_size = 1;
    }
    let mut reader =
        CommandReader::with_config(source, Dispatcher::with_sensor(sensor.clone()), config);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut dispatched = 0usize;
    'read: while running.load(Ordering::SeqCst) {
        let events = match reader.read_chunk() {
            Ok(events) => events,
            Err(ProtocolError::ConnectionClosed) => break,
            Err(err) => return Err(protocol_error("read failed", err)),
        };

        for event in &events {
            print_event(event, format);
            if matches!(event, DecodeEvent::Dispatched(_)) {
                dispatched += 1;
                if args.count.is_some_and(|count| dispatched >= count) {
                    break 'read;
                }
            }
        }
    }

    debug!(
        dispatched,
        pending = reader.decoder().queue().buffered_bytes(),
        "decode finished"
    );

    if !args.no_reading {
        let reading = sensor.get();
        print_reading(reading.as_deref(), format);
    }

    Ok(SUCCESS)
}

fn open_input(input: Option<&Path>, baud_rate: Option<u32>) -> CliResult<SourceBox> {
    let path = match input {
        Some(path) if path != Path::new("-") => path,
        _ => return Ok(Box::new(std::io::stdin())),
    };

    match baud_rate {
        Some(baud_rate) => open_serial(path, baud_rate),
        None => {
            let file = File::open(path).map_err(|err| {
                io_error(&format!("failed to open input {}", path.display()), err)
            })?;
            Ok(Box::new(file))
        }
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
