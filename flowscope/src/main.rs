use flowscope_client::{ChannelProxy, DriveMode, IdlePump, NullDisplay, Session, SessionConfig};
use flowscope_messages::FrameRate;
use flowscope_server::{FluidSim, Server};

use anyhow::Context;
use log::LevelFilter;
use std::io::Write;

const GRID_NX: usize = 128;
const GRID_NY: usize = 64;

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .format(|buf, record| {
            writeln!(
                buf,
                "{:<5} | {} | {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .filter_module("flowscope_client", LevelFilter::Debug)
        .init();

    // Parse CLI arguments
    let mut headless = false;
    let mut config = SessionConfig::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--headless" => headless = true,
            "--frames" => {
                let n = args.next().context("--frames needs a count")?;
                config.max_frames = n
                    .parse()
                    .with_context(|| format!("bad frame count: {n}"))?;
            }
            "--fps" => {
                let fps = args.next().context("--fps needs a rate")?;
                let fps: f64 = fps
                    .parse()
                    .with_context(|| format!("bad frame rate: {fps}"))?;
                config.target_fps = FrameRate(fps);
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    // Create flume channels for the request/reply connection
    let (request_tx, request_rx) = flume::unbounded();
    let (reply_tx, reply_rx) = flume::bounded(1);

    let mut session = Session::new(ChannelProxy::new(request_tx, reply_rx), config);
    let interrupted = session.interrupted();

    // Spawn the simulation server thread
    let server_handle = std::thread::spawn(move || {
        let server = Server::new(request_rx, reply_tx, FluidSim::new(GRID_NX, GRID_NY))
            .with_interrupted(interrupted);
        server.run().expect("Simulation server failed");
    });

    // Handshake, then hand the session to the UI (blocking on the main
    // thread) or drive it ourselves for an unattended run.
    session.connect()?;
    let result = if headless {
        let mut display = NullDisplay::new();
        let mut pump = IdlePump::new(session.config().poll_interval);
        session.run(DriveMode::Polled, &mut display, &mut pump)
    } else {
        flowscope_ui::run(session)
    };

    // The session's quit has already reached the server by now
    server_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Server thread panicked"))?;

    result
}
