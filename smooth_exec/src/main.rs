//! Main smooth motion executable entry point.
//!
//! # Architecture
//!
//! The executable drives the simulated robot through the goals of a TC script:
//!
//!     - Initialise session, logging and parameters
//!     - Initialise the simulation, goal queue and motion controller
//!     - On every simulation step:
//!         - Execute the script TCs which are due
//!         - Publish the obstacle distance report when due
//!     - Main loop:
//!         - Execute the next queued goal, or let time pass while idle
//!         - Stop once the script has ended and no goal is left
//!     - Save a summary of every goal's outcome

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use structopt::StructOpt;

// Internal
use smooth_lib::{
    goal::{GoalQueue, GoalRecord},
    motion_ctrl::{ConfigSlot, MotionCtrl, Params},
    report::{ArchiveDistanceSink, DistanceReporter},
    sim::{Sim, SimWorld},
    tc_processor::{self, TcTargets},
};
use util::{
    archive::Archiver,
    logger::{logger_init, parse_level},
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
    time::Timer,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Simulation step while no goal is being executed.
const IDLE_PERIOD_S: f64 = 0.05;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "smooth_exec", about = "Drive a simulated robot through a goal script")]
struct Opt {
    /// TC script to execute
    #[structopt(parse(from_os_str))]
    script: PathBuf,

    /// Motion control parameter file, relative to the params directory
    #[structopt(short, long, default_value = "smooth_exec.toml")]
    params: String,

    /// Simulated world file, relative to the params directory
    #[structopt(short, long)]
    world: Option<String>,

    /// Minimum log level, one of info, debug or trace
    #[structopt(short, long, default_value = "debug")]
    log_level: String,

    /// Run the simulation in step with the wall clock
    #[structopt(short, long)]
    real_time: bool,

    /// Simulation time after which the run is cancelled, in seconds
    #[structopt(short, long, default_value = "300")]
    time_limit: f64,
}

/// Summary saved at the end of the run.
#[derive(Debug, Serialize)]
struct RunSummary {
    finished_at: String,
    sim_time_s: f64,
    goals: Vec<GoalRecord>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("smooth_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    let level = parse_level(&opt.log_level).wrap_err("Invalid log level")?;
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Smooth Motion Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: Params = util::params::load(&opt.params)
        .wrap_err("Could not load motion control params")?;

    let world: SimWorld = match opt.world {
        Some(ref w) => util::params::load(w).wrap_err("Could not load the simulated world")?,
        None => SimWorld::default(),
    };

    info!("Exec parameters loaded");

    // ---- LOAD SCRIPT ----

    info!("Loading script from {:?}", opt.script);

    let mut si = ScriptInterpreter::new(&opt.script).wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} TCs\n",
        si.get_duration(),
        si.get_num_tcs()
    );

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let config = Arc::new(
        ConfigSlot::new(params).wrap_err("Invalid motion control params")?
    );
    let queue = Arc::new(GoalQueue::new());
    let sim = Sim::new(world);
    let make_timer = || {
        if opt.real_time {
            sim.real_time_timer()
        } else {
            sim.timer()
        }
    };

    let mut motion_ctrl = MotionCtrl::new(
        config.clone(),
        sim.pose_source(),
        sim.obstacles(),
        queue.clone(),
        Box::new(sim.velocity_sink()),
        Box::new(make_timer()),
    );
    motion_ctrl.set_archiver(
        Archiver::from_path(&session, "motion_ctrl.csv")
            .wrap_err("Failed to create the motion control archive")?
    );
    info!("MotionCtrl init complete");

    let mut reporter = DistanceReporter::new(
        config.clone(),
        sim.obstacles(),
        Box::new(ArchiveDistanceSink::new(
            Archiver::from_path(&session, "obstacle_distance.csv")
                .wrap_err("Failed to create the obstacle distance archive")?
        )),
    );
    info!("DistanceReporter init complete");

    let targets = TcTargets {
        goals: queue.clone(),
        config: config.clone(),
        force_stop: motion_ctrl.force_stop_flag(),
    };

    info!("Module initialisation complete\n");

    // ---- SIMULATION STEP ----

    let script_done = Arc::new(AtomicBool::new(false));
    {
        let script_done = script_done.clone();
        let time_limit_s = opt.time_limit;
        let mut next_report_s = 0.0;

        sim.set_hook(move |time_s| {
            // Past the limit ignore the rest of the script and cancel whatever
            // is running
            if time_s > time_limit_s {
                if !script_done.swap(true, Ordering::SeqCst) {
                    warn!("Time limit of {} s reached, cancelling", time_limit_s);
                }
                targets.goals.request_preempt();
            } else {
                match si.get_pending_tcs(time_s) {
                    PendingTcs::None => (),
                    PendingTcs::Some(tcs) => {
                        for tc in tcs.iter() {
                            if let Err(e) = tc_processor::exec(&targets, tc) {
                                warn!("Could not execute TC: {}", e);
                            }
                        }
                    }
                    PendingTcs::EndOfScript => script_done.store(true, Ordering::SeqCst),
                }
            }

            if time_s >= next_report_s {
                reporter.step();
                next_report_s = time_s + 1.0 / targets.config.snapshot().params.report_rate_hz;
            }
        });
    }

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut idle_timer = make_timer();

    loop {
        if let Some(goal) = queue.accept_next() {
            motion_ctrl.execute_goal(&goal);
            idle_timer.reset();
            continue;
        }

        if script_done.load(Ordering::SeqCst) && queue.is_idle() {
            info!("End of script reached");
            break;
        }

        idle_timer.sleep(IDLE_PERIOD_S);
    }

    // ---- SHUTDOWN ----

    let summary = RunSummary {
        finished_at: chrono::Utc::now().to_rfc3339(),
        sim_time_s: idle_timer.now_s(),
        goals: queue.history(),
    };
    for record in summary.goals.iter() {
        info!("Goal {}: {:?}", record.id, record.status);
    }

    session
        .save("summary.json", &summary)
        .wrap_err("Failed to save the run summary")?;

    info!("End of execution");

    Ok(())
}
