//! Queue kernels: primaries → initializers, secondaries → initializers, and
//! initializers → slots.
//!
//! ```text
//! insert_primaries       stage a batch (validated, all-or-nothing)
//! extend_from_primaries  staged primaries → initializers, fresh track ids
//! initialize_tracks      pop initializers into vacant slots
//!   … stepping …
//! extend_from_secondaries  buffered secondaries → initializers,
//!                          dead slots → vacancies
//! ```

use std::sync::atomic::AtomicU32;

use mc_core::{TrackOrder, TrackRng};
use mc_track::{ParticleParams, TrackSlots, TrackStatus, TrackView};
use tracing::trace;

use crate::state::{InitParams, PrimaryStateData, TrackInitStateData, allocate_track_id};
use crate::{
    GeoTrackInitializer, InitError, InitResult, ParticleTrackInitializer, Primary,
    SimTrackInitializer, TrackInitializer,
};

// ── Primaries ─────────────────────────────────────────────────────────────────

/// Stage a batch of primaries for conversion on the next step.
///
/// # Errors
///
/// - [`InitError::NotImplemented`] if a previous batch is still pending.
/// - [`InitError::Capacity`] if the batch plus the queued initializers would
///   overflow the initializer buffer.
/// - [`InitError::InvalidPrimary`] for an unknown particle, an event id
///   outside `max_events`, or a non-finite/negative energy.
///
/// On error nothing is staged.
pub fn insert_primaries(
    params:    &InitParams,
    particles: &ParticleParams,
    init:      &TrackInitStateData,
    staged:    &mut PrimaryStateData,
    primaries: &[Primary],
) -> InitResult<()> {
    if staged.is_pending() {
        return Err(InitError::NotImplemented(
            "inserting primaries while another batch is pending",
        ));
    }
    init.initializers.check_room(primaries.len())?;

    for (index, p) in primaries.iter().enumerate() {
        let reason = if !particles.contains(p.particle_id) {
            Some(format!("unknown particle {}", p.particle_id))
        } else if !p.event_id.is_valid() || p.event_id.index() >= params.max_events {
            Some(format!("{} outside max_events {}", p.event_id, params.max_events))
        } else if !(p.energy.is_finite() && p.energy >= 0.0) {
            Some(format!("energy {} is not a finite non-negative value", p.energy))
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(InitError::InvalidPrimary { index, reason });
        }
    }

    staged.primaries.clear();
    staged.primaries.extend_from_slice(primaries);
    staged.count = primaries.len();
    Ok(())
}

/// Convert every staged primary into an initializer with a fresh track id.
///
/// Returns the number converted.  The staged count is zeroed afterwards.
pub fn extend_from_primaries(
    init:   &mut TrackInitStateData,
    staged: &mut PrimaryStateData,
) -> InitResult<usize> {
    let n = staged.count;
    if n == 0 {
        return Ok(0);
    }

    // Split borrow: counters are shared while the buffer grows.
    let TrackInitStateData { initializers, track_counters, .. } = init;
    let dest = initializers.grow(n)?;
    let counters = track_counters.as_slice();
    let primaries = staged.pending();

    #[cfg(not(feature = "parallel"))]
    {
        for (ti, p) in dest.iter_mut().zip(primaries) {
            *ti = from_primary(counters, p);
        }
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        dest.par_iter_mut()
            .zip(primaries.par_iter())
            .for_each(|(ti, p)| *ti = from_primary(counters, p));
    }

    init.num_generated += n as u64;
    staged.count = 0;
    trace!(count = n, queued = init.num_initializers(), "extended from primaries");
    Ok(n)
}

fn from_primary(counters: &[AtomicU32], p: &Primary) -> TrackInitializer {
    TrackInitializer {
        sim: SimTrackInitializer {
            track_id:   allocate_track_id(counters, p.event_id),
            parent_id:  Default::default(),
            primary_id: p.primary_id,
            event_id:   p.event_id,
            time:       p.time,
            weight:     p.weight,
        },
        geo: GeoTrackInitializer { pos: p.position, dir: p.direction },
        particle: ParticleTrackInitializer { particle_id: p.particle_id, energy: p.energy },
    }
}

// ── Secondaries ───────────────────────────────────────────────────────────────

/// Queue this step's secondaries and recycle dead slots.
///
/// 1. Count each active slot's buffered secondaries.
/// 2. Exclusive-scan the counts so slot `i` writes at `offset[i]`.
/// 3. Fail with [`InitError::Capacity`] if the buffer would overflow.
/// 4. Write one initializer per secondary, inheriting the parent's event,
///    primary, time, weight, and position.
/// 5. Clear the secondary buffers; `Killed`/`Errored` slots become
///    `Inactive` and are pushed onto the vacancy stack.
///
/// Returns the number of secondaries queued.
pub fn extend_from_secondaries(
    init:  &mut TrackInitStateData,
    slots: &mut TrackSlots,
) -> InitResult<usize> {
    let n = slots.count;
    let counts = &mut init.secondary_counts;
    if counts.len() != n + 1 {
        return Err(InitError::Core(mc_core::CoreError::Validation(format!(
            "secondary count buffer has {} entries for {} slots",
            counts.len(),
            n
        ))));
    }

    // ── ① count ────────────────────────────────────────────────────────────
    for (count, (status, secondaries)) in counts
        .iter_mut()
        .zip(slots.sim.status.iter().zip(&slots.secondaries))
    {
        *count = if status.is_active() { secondaries.len() as u32 } else { 0 };
    }

    // ── ② exclusive scan ──────────────────────────────────────────────────
    let mut total = 0u32;
    for count in counts.iter_mut().take(n) {
        let c = *count;
        *count = total;
        total += c;
    }
    counts[n] = total;
    let total = total as usize;

    // ── ③ capacity ────────────────────────────────────────────────────────
    init.initializers.check_room(total)?;

    // ── ④ write ───────────────────────────────────────────────────────────
    if total > 0 {
        let TrackInitStateData { initializers, secondary_counts, track_counters, .. } = init;
        let dest = initializers.grow(total)?;
        let offsets = secondary_counts.as_slice();
        let counters = track_counters.as_slice();
        for slot in 0..n {
            let start = offsets[slot] as usize;
            let end = offsets[slot + 1] as usize;
            if start == end {
                continue;
            }
            let sim = &slots.sim;
            for (ti, sec) in dest[start..end].iter_mut().zip(&slots.secondaries[slot]) {
                let event_id = sim.event_ids[slot];
                *ti = TrackInitializer {
                    sim: SimTrackInitializer {
                        track_id:   allocate_track_id(counters, event_id),
                        parent_id:  sim.track_ids[slot],
                        primary_id: sim.primary_ids[slot],
                        event_id,
                        time:       sim.time[slot],
                        weight:     sim.weight[slot],
                    },
                    geo: GeoTrackInitializer { pos: slots.geo.pos[slot], dir: sec.dir },
                    particle: ParticleTrackInitializer {
                        particle_id: sec.particle_id,
                        energy:      sec.energy,
                    },
                };
            }
        }
        init.num_generated += total as u64;
    }

    // ── ⑤ recycle ─────────────────────────────────────────────────────────
    for mut view in slots.views_mut() {
        view.secondaries.clear();
        if view.status().is_dead() {
            view.sim.clear();
            init.vacancies.push(view.slot);
        }
    }

    trace!(
        secondaries = total,
        queued = init.num_initializers(),
        vacancies = init.num_vacancies(),
        "extended from secondaries"
    );
    Ok(total)
}

// ── Initialization ────────────────────────────────────────────────────────────

/// Move queued initializers into vacant slots.
///
/// Pairs the last `min(vacancies, initializers)` entries of each stack, then
/// shrinks both.  Leftover initializers stay queued for the next step; an
/// empty queue or full slot array makes this a no-op.
///
/// With [`TrackOrder::PartitionCharge`] the neutral initializers are written
/// into the lowest consumed vacancies and the charged ones into the highest.
///
/// Returns the number of tracks initialized.
pub fn initialize_tracks(
    params:    &InitParams,
    particles: &ParticleParams,
    init:      &mut TrackInitStateData,
    slots:     &mut TrackSlots,
) -> InitResult<usize> {
    let n = init.num_vacancies().min(init.num_initializers());
    if n == 0 {
        return Ok(0);
    }
    let vac_start = init.num_vacancies() - n;
    let init_start = init.num_initializers() - n;
    let queued = init.initializers.as_slice();

    if let Some(bad) = (init_start..init_start + n).find(|&i| !queued[i].sim.is_valid()) {
        return Err(InitError::InvalidInitializer(bad));
    }

    // ── Pair vacancies with initializers ──────────────────────────────────
    let mut vacant = init.vacancies[vac_start..].to_vec();
    init.indices.clear();
    init.indices.extend(init_start..init_start + n);
    if params.track_order == TrackOrder::PartitionCharge {
        vacant.sort_unstable();
        init.indices
            .sort_by_key(|&i| particles.is_charged(queued[i].particle.particle_id));
    }

    // target[slot] = initializer index
    let mut target: Vec<Option<usize>> = vec![None; slots.count];
    for (slot, &i) in vacant.iter().zip(&init.indices) {
        target[slot.index()] = Some(i);
    }

    // ── Write slots ───────────────────────────────────────────────────────
    let seed = params.seed;
    let write = |view: &mut TrackView<'_>| {
        if let Some(i) = target[view.slot.index()] {
            write_track(view, &queued[i], seed);
        }
    };

    #[cfg(not(feature = "parallel"))]
    {
        slots.views_mut().for_each(|mut v| write(&mut v));
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        let mut views: Vec<TrackView<'_>> = slots.views_mut().collect();
        views.par_iter_mut().for_each(write);
    }

    init.vacancies.truncate(vac_start);
    init.initializers.truncate(init_start);
    trace!(count = n, queued = init.num_initializers(), "initialized tracks");
    Ok(n)
}

fn write_track(view: &mut TrackView<'_>, ti: &TrackInitializer, seed: u64) {
    let sim = &mut view.sim;
    *sim.track_id          = ti.sim.track_id;
    *sim.parent_id         = ti.sim.parent_id;
    *sim.primary_id        = ti.sim.primary_id;
    *sim.event_id          = ti.sim.event_id;
    *sim.num_steps         = 0;
    *sim.time              = ti.sim.time;
    *sim.status            = TrackStatus::Initializing;
    *sim.step_length       = 0.0;
    *sim.post_step_action  = Default::default();
    *sim.along_step_action = Default::default();
    *sim.weight            = ti.sim.weight;
    if let Some(n) = sim.num_looping_steps.as_deref_mut() {
        *n = 0;
    }

    *view.particle.particle_id = ti.particle.particle_id;
    *view.particle.energy      = ti.particle.energy;
    *view.geo.pos              = ti.geo.pos;
    *view.geo.dir              = ti.geo.dir;
    *view.rng                  = TrackRng::new(seed, ti.sim.event_id, ti.sim.track_id);
    view.secondaries.clear();
}
