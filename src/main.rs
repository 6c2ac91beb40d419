use std::f64::consts::PI;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use nalgebra::{Translation3, UnitQuaternion, Vector3};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use rs_teleop_control::buttons::ButtonMask;
use rs_teleop_control::config::{ControlModeConfig, GraspingConfig, SessionConfig};
use rs_teleop_control::grasping::GripperCommand;
use rs_teleop_control::integrator::ControlModeKind;
use rs_teleop_control::pose::{Pose, PoseSample};
use rs_teleop_control::solver::{solve_goal, GoalSolver};
use rs_teleop_control::teleop::{SimulationContext, Teleoperation, Tick};
use rs_teleop_control::utils::{dump_goal, dump_pose};

/// Drives a scripted controller through a teleoperation session.
#[derive(Parser, Debug)]
#[command(name = "teleop-demo")]
#[command(version)]
#[command(about = "Scripted teleoperation of a Cartesian gantry")]
struct Args {
    /// Session YAML file. Clutch control with grip hold if not given.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of frames to simulate
    #[arg(short, long, default_value_t = 300)]
    ticks: u64,

    /// Frame period, seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    period: f64,

    /// Reset the session and the robot at this frame
    #[arg(long, value_name = "FRAME")]
    reset_at: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Stand-in for a real inverse kinematics solver: three prismatic axes, rate limited, inside
/// a box shaped workspace. The joints are the tool position.
struct Gantry {
    home: Vector3<f64>,
    joints: Vector3<f64>,
    max_step: f64,
    reach: f64,
}

impl Gantry {
    fn new(home: Vector3<f64>) -> Self {
        Gantry {
            home,
            joints: home,
            max_step: 0.01,
            reach: 1.5,
        }
    }
}

impl GoalSolver for Gantry {
    fn solve(&mut self, goal: &Pose) -> Result<Vec<f64>> {
        let target = goal.translation.vector;
        if target.iter().any(|c| c.abs() > self.reach) {
            bail!("goal {:?} outside of the workspace", target);
        }
        let mut step = target - self.joints;
        if step.norm() > self.max_step {
            step = step.normalize() * self.max_step;
        }
        self.joints += step;
        Ok(self.joints.iter().copied().collect())
    }

    fn recover(&mut self) -> Result<()> {
        self.joints = self.home;
        Ok(())
    }
}

fn default_session() -> SessionConfig {
    SessionConfig {
        control: ControlModeConfig::new(ControlModeKind::Clutch).with_activation("grip-hold"),
        grasping: Some(GraspingConfig {
            activation: "trigger-toggle".to_string(),
        }),
    }
}

/// Controller pose and buttons of the scripted operator at the given frame.
fn script(frame: u64, ticks: u64) -> (Vector3<f64>, UnitQuaternion<f64>, ButtonMask) {
    let phase = frame as f64 / ticks as f64 * 2.0 * PI;
    let position = Vector3::new(0.5 + 0.2 * phase.cos(), 0.2 * phase.sin(), 0.4);
    let orientation = UnitQuaternion::from_euler_angles(0.0, 0.0, 0.3 * phase.sin());

    let mut buttons = ButtonMask::NONE;
    if frame > ticks / 10 && frame < ticks * 8 / 10 {
        buttons |= ButtonMask::GRIP;
    }
    if frame == ticks / 3 || frame == ticks * 2 / 3 {
        buttons |= ButtonMask::TRIGGER;
    }
    (position, orientation, buttons)
}

fn run(args: &Args) -> Result<()> {
    let session = match &args.config {
        Some(path) => SessionConfig::from_yaml_file(path)?,
        None => default_session(),
    };

    let mut teleop = Teleoperation::new();
    teleop.load_session(&session)?;
    println!("{}", teleop.mode_instructions());
    println!("{}", teleop.grasp_instructions());

    let start = Pose::from_parts(Translation3::new(0.7, 0.0, 0.4), UnitQuaternion::identity());
    let mut ctx = SimulationContext::new(start);
    let mut gantry = Gantry::new(start.translation.vector);
    let base = UnitQuaternion::identity();

    let (position, orientation, _) = script(0, args.ticks);
    let mut previous = PoseSample::at(position, orientation, 0, 0.0);

    for frame in 1..=args.ticks {
        let (position, orientation, buttons) = script(frame, args.ticks);
        let controller = PoseSample::at(position, orientation, frame, frame as f64 * args.period);
        let tick = Tick {
            controller,
            previous_controller: previous,
            elapsed: args.period,
            base_orientation: base,
            buttons,
        };
        previous = controller;

        if args.reset_at == Some(frame) {
            teleop.reset(&mut ctx);
            gantry.recover()?;
            ctx.end_effector.pose = start;
            info!("frame {}: session and robot reset", frame);
        }

        let report = teleop.update(&mut ctx, &tick);

        let goal = ctx.goal_world(&base);
        match solve_goal(&mut gantry, &ctx.end_effector, &goal) {
            Ok(Some(joints)) => {
                ctx.end_effector.pose.translation.vector = Vector3::new(joints[0], joints[1], joints[2]);
                ctx.end_effector.pose.rotation = goal.orientation();
            }
            Ok(None) => {}
            Err(e) => warn!("solver failed at frame {}: {}", frame, e),
        }

        match report.gripper {
            GripperCommand::Close => ctx.gripper.aperture -= 0.002,
            GripperCommand::Open => ctx.gripper.aperture += 0.002,
            GripperCommand::Hold => {}
        }

        if let Some(level) = report.hazard {
            if frame % 30 == 0 {
                info!("frame {}: gap {:?}, indicator #{:06x}", frame, level, report.indicator_rgb);
            }
        }
    }

    println!("Final goal (robot base frame, relative to the start of the end-effector):");
    dump_goal(&ctx.goal);
    dump_pose(&ctx.goal.framed().pose);
    println!("Final end-effector:");
    dump_pose(&ctx.end_effector.pose);
    println!("Gripper aperture: {:.3}", ctx.gripper.aperture);
    Ok(())
}

/// Usage example.
fn main() {
    let args = Args::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    tracing_subscriber::fmt().compact().with_env_filter(filter).init();

    if let Err(e) = run(&args) {
        eprintln!("teleop-demo: {:#}", e);
        std::process::exit(1);
    }
}
