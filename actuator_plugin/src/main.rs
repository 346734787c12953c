//! Actuator bench executable.
//!
//! Hosts the actuator plugin around a simulated joint. Commands are received over the network,
//! odometry is published back, and the controller state is archived into the session.
//!
//! # Usage
//!
//! ```text
//! actuator_exec [--params <path>] [--duration-s <s>] [--step-s <s>] [--realtime]
//! ```
//!
//! Without `--params` the parameters are loaded from `$ACTUATOR_SW_ROOT/params/actuator_plugin.toml`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use std::{path::PathBuf, thread, time::Instant};
use structopt::StructOpt;

// Internal
use actuator_lib::{
    params::Params,
    plugin::{ActuatorPlugin, PluginLoad, PluginState},
    sim_joint::{SimJoint, SimJointConfig},
    transport::{CmdSubscriber, OdomPublisher},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::Plugin,
    session::Session,
    time,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of simulation steps between progress messages.
const PROGRESS_INTERVAL_STEPS: u64 = 1000;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Command line arguments.
#[derive(Debug, StructOpt)]
#[structopt(name = "actuator_exec", about = "Run the actuator plugin against a simulated joint")]
struct Args {
    /// Path to the parameter file, relative to the working directory
    #[structopt(long, parse(from_os_str))]
    params: Option<PathBuf>,

    /// Simulated duration to run for, runs forever if not given
    #[structopt(long = "duration-s")]
    duration_s: Option<f64>,

    /// Length of one simulation step
    #[structopt(long = "step-s", default_value = "0.001")]
    step_s: f64,

    /// Pace the simulation against the wall clock
    #[structopt(long)]
    realtime: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let args = Args::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new(
        "actuator_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Actuator Bench Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    debug!("CLI arguments: {:?}", args);

    if !(args.step_s > 0.0) {
        return Err(color_eyre::eyre::eyre!(
            "The simulation step must be positive, found {}", args.step_s
        ))
    }

    // ---- LOAD PARAMETERS ----

    let params: Params = match args.params {
        Some(ref p) => util::params::load_from_path(p),
        None => util::params::load("actuator_plugin.toml")
    }.wrap_err("Could not load actuator parameters")?;

    info!("Parameters loaded");

    // ---- INITIALISE NETWORK ----

    let ctx = comms_if::net::ensure_transport_initialised();

    let cmd_sub = CmdSubscriber::new(ctx, &params)
        .wrap_err("Failed to initialise the command subscriber")?;
    let odom_pub = OdomPublisher::new(ctx, &params)
        .wrap_err("Failed to initialise the odometry publisher")?;

    info!("Network initialised");

    // ---- INITIALISE PLUGIN ----

    let joint_name = params.joint_name.clone().unwrap_or_default();
    let joint = SimJoint::new(&joint_name, SimJointConfig::default());

    let mut plugin = ActuatorPlugin::new(odom_pub);

    let mut sim_time_s = 0.0;

    plugin.configure(
        PluginLoad {
            params,
            joint: Some(joint.clone()),
            cmd_source: Some(Box::new(cmd_sub)),
        },
        sim_time_s
    ).wrap_err("Failed to configure the actuator plugin")?;

    plugin.init_archive(&session)
        .wrap_err("Failed to initialise the archive")?;

    if !plugin.is_functional() {
        warn!("The plugin is not bound to a joint, only the simulation will run");
    }

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let wall_start = Instant::now();
    let mut num_steps: u64 = 0;

    loop {
        if let Some(d) = args.duration_s {
            if sim_time_s >= d {
                break
            }
        }

        joint.step(args.step_s);
        sim_time_s += args.step_s;
        num_steps += 1;

        plugin.tick(sim_time_s);

        if num_steps % PROGRESS_INTERVAL_STEPS == 0 {
            if let Some(c) = plugin.ctrl() {
                let report = c.report();
                info!(
                    "t = {:.3} s: instructed {:.4} m/s, heading {:.4} rad",
                    sim_time_s,
                    report.instructed_speed_ms,
                    report.heading_rad
                );
            }
        }

        if args.realtime {
            let wall_elapsed = wall_start.elapsed();
            let sim_elapsed = time::seconds_to_std(sim_time_s);

            if sim_elapsed > wall_elapsed {
                thread::sleep(sim_elapsed - wall_elapsed);
            }
        }
    }

    // ---- SHUTDOWN ----

    info!("End of execution, {} steps simulated ({:.3} s)", num_steps, sim_time_s);

    plugin.shutdown().wrap_err("Failed to shut down the actuator plugin")?;
    debug_assert_eq!(plugin.state(), PluginState::Unloaded);

    session.exit();

    Ok(())
}
