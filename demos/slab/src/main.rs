//! slab — smallest end-to-end run of the rust_mc stepping core.
//!
//! Fires a pencil beam of photons from the center of a water-like box.
//! Photons Compton-scatter and are photo-absorbed; the resulting electrons
//! lose energy in discrete steps and curl in a uniform magnetic field until
//! the tracking cut or the looping limit removes them.
//!
//! Usage: `slab [config.json]`.  Every field of the JSON file is optional;
//! set `RUST_LOG=debug` to see per-step counters.

mod physics;

use std::time::Instant;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use mc_action::StepCounters;
use mc_core::{CoreConfig, EventId, PrimaryId, Real, TrackOrder};
use mc_init::Primary;
use mc_step::{RunSummary, StepObserver, StepperBuilder, UniformFieldPropagator};
use mc_track::{BoxWorld, GeoKind, LoopingThreshold};

use physics::{Compton, ELECTRON, GAMMA, Ionization, Photoelectric};

// ── Constants ─────────────────────────────────────────────────────────────────

const CONFIG_ENV:        &str = "SLAB_CONFIG";
const PROGRESS_INTERVAL: u64  = 25; // print counters every N steps

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
struct SlabConfig {
    core:           CoreConfig,
    /// Half thickness along the beam axis (cm).
    half_thickness: Real,
    /// Transverse half width (cm).
    half_width:     Real,
    num_primaries:  usize,
    /// Beam kinetic energy (MeV).
    energy:         Real,
    /// Field along the beam axis (T); zero disables curvature.
    field_tesla:    Real,
    max_substeps:   u32,
    /// Primaries are dealt round-robin over this many events.
    events:         u32,
}

impl Default for SlabConfig {
    fn default() -> Self {
        Self {
            core: CoreConfig {
                num_track_slots:      256,
                initializer_capacity: 8_192,
                max_events:           4,
                seed:                 42,
                num_threads:          None,
                max_steps:            50_000,
                track_order:          TrackOrder::PartitionStatus,
                energy_cutoff:        1e-2,
                action_times:         true,
                action_diagnostic:    true,
            },
            half_thickness: 10.0,
            half_width:     50.0,
            num_primaries:  1_000,
            energy:         2.0,
            field_tesla:    1.0,
            max_substeps:   50,
            events:         4,
        }
    }
}

impl SlabConfig {
    fn load(path: Option<String>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {path}"))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {path}"))
    }

    /// Number of events the primaries are dealt over, after validating the
    /// core settings it depends on.
    fn num_events(&self) -> Result<u32> {
        self.core.validate().context("invalid core config")?;
        let max = u32::try_from(self.core.max_events).unwrap_or(u32::MAX);
        Ok(self.events.clamp(1, max))
    }
}

// ── Progress observer ─────────────────────────────────────────────────────────

struct Progress {
    interval:  u64,
    max_alive: usize,
    started:   Option<Instant>,
}

impl Progress {
    fn new(interval: u64) -> Self {
        Self { interval, max_alive: 0, started: None }
    }
}

impl StepObserver for Progress {
    fn on_run_start(&mut self, num_primaries: usize) {
        println!("Transporting {num_primaries} primaries");
        self.started = Some(Instant::now());
    }

    fn on_step_end(&mut self, step: u64, counters: &StepCounters) {
        self.max_alive = self.max_alive.max(counters.num_alive);
        if step % self.interval == 0 {
            println!(
                "  step {step:>6}  alive {:>5}  queued {:>6}  secondaries {:>4}",
                counters.num_alive, counters.num_initializers, counters.num_secondaries
            );
        }
    }

    fn on_run_end(&mut self, summary: &RunSummary) {
        let secs = self.started.map(|t| t.elapsed().as_secs_f64()).unwrap_or_default();
        println!(
            "Finished {} steps in {secs:.3} s (peak {} alive)",
            summary.num_steps, self.max_alive
        );
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Configuration: CLI argument, then environment, then defaults.
    let path = std::env::args().nth(1).or_else(|| std::env::var(CONFIG_ENV).ok());
    let config = SlabConfig::load(path)?;
    let events = config.num_events()?;

    println!("=== slab — rust_mc stepping core ===");
    println!(
        "Primaries: {}  |  Energy: {} MeV  |  Field: {} T  |  Seed: {}",
        config.num_primaries, config.energy, config.field_tesla, config.core.seed
    );
    println!(
        "Slots: {}  |  Order: {}  |  Events: {events}",
        config.core.num_track_slots, config.core.track_order
    );
    println!();

    // 2. Geometry, physics, and field.
    let world = BoxWorld {
        half_width: [config.half_width, config.half_width, config.half_thickness],
    };
    let propagator = UniformFieldPropagator::new([0.0, 0.0, config.field_tesla])
        .max_substeps(config.max_substeps);

    // 3. Build the stepper.
    let mut stepper = StepperBuilder::new(config.core.clone())
        .world(GeoKind::Box, world)
        .process(Compton::new()?)
        .process(Photoelectric::new()?)
        .process(Ionization::default())
        .charged_propagator(propagator)
        .looping(ELECTRON, LoopingThreshold::default())
        .build()?;

    println!("Registered actions:");
    for action in stepper.actions() {
        println!("  {:>3}  {:<10} {}", action.action_id().index(), action.order().as_str(), action.label());
    }
    println!();

    // 4. Source: a pencil beam along +z from the origin.
    let primaries: Vec<Primary> = (0..config.num_primaries)
        .map(|i| Primary {
            particle_id: GAMMA,
            energy:      config.energy,
            position:    [0.0; 3],
            direction:   [0.0, 0.0, 1.0],
            time:        0.0,
            event_id:    EventId(i as u32 % events),
            primary_id:  PrimaryId(i as u32),
            weight:      1.0,
        })
        .collect();

    // 5. Run.
    let mut progress = Progress::new(PROGRESS_INTERVAL);
    let summary = stepper.run(&primaries, &mut progress)?;

    // 6. Summary.
    println!();
    println!("{:<16} {:>10}", "steps", summary.num_steps);
    println!("{:<16} {:>10}", "tracks", summary.num_generated);
    println!("{:<16} {:>10}", "errored", summary.num_errored);
    println!();

    // 7. Per-action diagnostics as JSON.
    let diagnostics = stepper.diagnostics();
    println!("{}", serde_json::to_string_pretty(&diagnostics)?);

    Ok(())
}
