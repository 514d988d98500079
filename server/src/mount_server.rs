// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use canonical_error::{invalid_argument_error, CanonicalError};
use futures::join;
use log::{error, info};
use pico_args::Arguments;
use tracing_appender::non_blocking::NonBlockingBuilder;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, registry, EnvFilter};

use crate::lx200_server::{create_lx200_server, run_tick_loop, Lx200Telescope};
use crate::mount::{Mount, MountConfig};
use crate::status_server::serve_status;

#[derive(Debug)]
struct AppArgs {
    lx200_addr: SocketAddr,
    status_addr: SocketAddr,
    tick_ms: u64,
    log_dir: String,
    log_file: String,
    mount_config: MountConfig,
}

const HELP: &str = "\
    FLAGS:
      -h, --help                     Prints help information

    OPTIONS:
      --lx200_addr <addr>            0.0.0.0:4030
      --status_addr <addr>           0.0.0.0:8080
      --latitude NUMBER              45.0 (degrees, north positive)
      --longitude NUMBER             0.0 (degrees, east positive)
      --horizon NUMBER               0.0 (lowest slew altitude, degrees)
      --high_limit NUMBER            90.0 (highest slew altitude, degrees)
      --slew_rate NUMBER             4.0 (degrees per second, at least 0.01)
      --sidereal_rate NUMBER         1.00273790935 (RA hours per hour)
      --park_ra NUMBER               0.0 (hours)
      --park_dec NUMBER              90.0 (degrees)
      --tick_ms NUMBER               1000
      --log_dir <path>               .
      --log_file <file>              lx200_log.txt
    ";

fn parse_args(mut pargs: Arguments) -> Result<AppArgs, CanonicalError> {
    let defaults = MountConfig::default();
    let mount_config = MountConfig {
        latitude: opt_value(&mut pargs, "--latitude")?.unwrap_or(defaults.latitude),
        longitude: opt_value(&mut pargs, "--longitude")?.unwrap_or(defaults.longitude),
        lower_limit: opt_value(&mut pargs, "--horizon")?.unwrap_or(defaults.lower_limit),
        high_limit: opt_value(&mut pargs, "--high_limit")?.unwrap_or(defaults.high_limit),
        slew_rate: opt_value(&mut pargs, "--slew_rate")?.unwrap_or(defaults.slew_rate),
        sidereal_rate: opt_value(&mut pargs, "--sidereal_rate")?
            .unwrap_or(defaults.sidereal_rate),
        park_ra: opt_value::<f64>(&mut pargs, "--park_ra")?
            .map_or(defaults.park_ra, |hours| hours * 15.0),
        park_dec: opt_value(&mut pargs, "--park_dec")?.unwrap_or(defaults.park_dec),
        ..defaults
    };
    mount_config.validate()?;

    let args = AppArgs {
        lx200_addr: opt_value(&mut pargs, "--lx200_addr")?
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 4030))),
        status_addr: opt_value(&mut pargs, "--status_addr")?
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080))),
        tick_ms: opt_value(&mut pargs, "--tick_ms")?.unwrap_or(1000),
        log_dir: opt_value(&mut pargs, "--log_dir")?.unwrap_or(".".to_string()),
        log_file: opt_value(&mut pargs, "--log_file")?
            .unwrap_or("lx200_log.txt".to_string()),
        mount_config,
    };
    if args.tick_ms == 0 {
        return Err(invalid_argument_error("--tick_ms must be positive"));
    }
    let remaining = pargs.finish();
    if !remaining.is_empty() {
        return Err(invalid_argument_error(
            &format!("Unrecognized arguments: {:?}", remaining)));
    }
    Ok(args)
}

fn opt_value<T>(pargs: &mut Arguments, key: &'static str) -> Result<Option<T>, CanonicalError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    pargs.opt_value_from_str(key)
        .map_err(|e| invalid_argument_error(&format!("{}: {}", key, e)))
}

pub fn server_main(product_name: &str, copyright: &str) {
    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        println!("{}", HELP);
        std::process::exit(0);
    }
    let mut args = match parse_args(pargs) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n{}", e.message, HELP);
            std::process::exit(1);
        }
    };
    args.mount_config.product_name = product_name.to_string();

    // Set up logging.
    let file_appender = match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&args.log_file)
        .max_log_files(10)
        .build(&args.log_dir)
    {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Could not create log file in {}: {}", args.log_dir, e);
            std::process::exit(1);
        }
    };

    // Create non-blocking writers for both the file and stdout
    let (non_blocking_file, _guard1) = NonBlockingBuilder::default()
        .lossy(false)
        .finish(file_appender);
    let (non_blocking_stdout, _guard2) = NonBlockingBuilder::default()
        .lossy(false)
        .finish(std::io::stdout());
    registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(non_blocking_stdout))
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking_file))
        .init();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Got control-c");
        info!("Exiting");
        std::process::exit(-1);
    }) {
        error!("Could not install control-c handler: {}", e);
    }

    info!("{}", product_name);
    info!("{}", copyright);
    async_main(args);
}

#[tokio::main]
async fn async_main(args: AppArgs) {
    // If any thread panics, bail out.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Thread panicked: {}", panic_info);
        std::process::exit(1);
    }));

    info!("Mount config: {:?}", args.mount_config);
    let mount = Arc::new(tokio::sync::Mutex::new(
        Mount::new(args.mount_config, SystemTime::now())));

    let mut lx200_server = match create_lx200_server(args.lx200_addr, mount.clone()).await {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e.message);
            std::process::exit(1);
        }
    };
    let lx200_future = async {
        if let Err(e) = lx200_server.serve_requests().await {
            error!("LX200 server stopped: {}", e.message);
        }
    };
    let status_future = async {
        if let Err(e) = serve_status(args.status_addr, mount.clone()).await {
            error!("{}", e.message);
        }
    };
    let tick_future = run_tick_loop(mount.clone(), Duration::from_millis(args.tick_ms));

    join!(lx200_future, status_future, tick_future);
}
