//! Unit tests for mc-init.

use mc_core::{CoreConfig, EventId, ParticleId, PrimaryId, TrackId, TrackOrder, TrackSlotId};
use mc_track::{ParticleParams, Secondary, SimParamsData, TrackSlots, TrackStatus};

use crate::{
    InitError, InitParams, InitResult, InitializerBuffer, Primary, PrimaryStateData,
    TrackInitStateData, TrackInitializer, extend_from_primaries, extend_from_secondaries,
    initialize_tracks, insert_primaries,
};

const GAMMA: ParticleId = ParticleId(0);
const ELECTRON: ParticleId = ParticleId(1);

fn primary(particle: ParticleId, event: u32, index: u32) -> Primary {
    Primary {
        particle_id: particle,
        energy:      10.0,
        position:    [0.0; 3],
        direction:   [0.0, 0.0, 1.0],
        time:        0.0,
        event_id:    EventId(event),
        primary_id:  PrimaryId(index),
        weight:      1.0,
    }
}

/// Everything the queue kernels touch, wired up the way the stepper does.
struct Queue {
    params:    InitParams,
    particles: ParticleParams,
    init:      TrackInitStateData,
    staged:    PrimaryStateData,
    slots:     TrackSlots,
}

impl Queue {
    fn new(num_slots: usize, capacity: usize, order: TrackOrder) -> Self {
        let config = CoreConfig {
            num_track_slots:      num_slots,
            initializer_capacity: capacity,
            track_order:          order,
            ..CoreConfig::default()
        };
        let params = InitParams::from_config(&config);
        Self {
            params,
            particles: ParticleParams::standard_em(),
            init:      TrackInitStateData::new(&params, num_slots),
            staged:    PrimaryStateData::default(),
            slots:     TrackSlots::new(&SimParamsData::default(), num_slots).unwrap(),
        }
    }

    fn insert(&mut self, primaries: &[Primary]) -> InitResult<()> {
        insert_primaries(&self.params, &self.particles, &self.init, &mut self.staged, primaries)
    }

    fn extend(&mut self) -> usize {
        extend_from_primaries(&mut self.init, &mut self.staged).unwrap()
    }

    fn initialize(&mut self) -> usize {
        initialize_tracks(&self.params, &self.particles, &mut self.init, &mut self.slots).unwrap()
    }

    fn pattern(&self) -> String {
        self.slots.occupancy_pattern(&self.particles)
    }
}

#[cfg(test)]
mod buffer {
    use super::*;

    #[test]
    fn grow_within_capacity() {
        let mut buf = InitializerBuffer::new(4);
        assert!(buf.is_empty());
        assert_eq!(buf.grow(3).unwrap().len(), 3);
        assert_eq!(buf.len(), 3);
        assert!(buf.check_room(1).is_ok());
        assert!(buf.check_room(2).is_err());
    }

    #[test]
    fn grow_past_capacity_leaves_size() {
        let mut buf = InitializerBuffer::new(4);
        buf.grow(3).unwrap();
        match buf.grow(2) {
            Err(InitError::Capacity { capacity, existing, requested }) => {
                assert_eq!((capacity, existing, requested), (4, 3, 2));
            }
            other => panic!("expected capacity error, got {other:?}"),
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn truncate_never_grows() {
        let mut buf = InitializerBuffer::new(4);
        buf.grow(2).unwrap();
        buf.truncate(3);
        assert_eq!(buf.len(), 2);
        buf.truncate(0);
        assert!(buf.is_empty());
    }

    #[test]
    fn capacity_message() {
        let err = InitError::Capacity { capacity: 8, existing: 6, requested: 3 };
        assert_eq!(
            err.to_string(),
            "insufficient initializer capacity (8) with 6 queued initializers for 3 new tracks"
        );
    }
}

#[cfg(test)]
mod primaries {
    use super::*;

    #[test]
    fn two_charged_primaries_fill_highest_slots() {
        let mut q = Queue::new(32, 64, TrackOrder::Unsorted);
        q.insert(&[primary(ELECTRON, 0, 0), primary(ELECTRON, 0, 1)]).unwrap();
        assert_eq!(q.extend(), 2);
        assert_eq!(q.initialize(), 2);

        assert_eq!(q.pattern(), "______________________________CC");
        assert_eq!(q.slots.count_status(|s| s == TrackStatus::Initializing), 2);
        assert_eq!(q.slots.count_status(|s| s == TrackStatus::Inactive), 30);
        assert_eq!(q.init.num_vacancies(), 30);
        assert_eq!(q.init.num_initializers(), 0);
    }

    #[test]
    fn more_primaries_than_slots_stay_queued() {
        let mut q = Queue::new(16, 64, TrackOrder::Unsorted);
        let batch: Vec<_> = (0..17)
            .map(|i| primary(if i % 2 == 0 { GAMMA } else { ELECTRON }, 0, i))
            .collect();
        q.insert(&batch).unwrap();
        q.extend();
        assert_eq!(q.initialize(), 16);

        let pattern = q.pattern();
        assert!(!pattern.contains('_'));
        assert!(pattern.contains('N') && pattern.contains('C'));
        assert_eq!(q.init.num_initializers(), 1);
        assert_eq!(q.init.num_vacancies(), 0);

        // Once a slot frees up the leftover moves in.
        q.slots.sim.status[5] = TrackStatus::Killed;
        extend_from_secondaries(&mut q.init, &mut q.slots).unwrap();
        assert_eq!(q.initialize(), 1);
        assert_eq!(q.init.num_initializers(), 0);
        assert_eq!(q.slots.status(TrackSlotId(5)), TrackStatus::Initializing);
    }

    #[test]
    fn over_capacity_batch_is_rejected_whole() {
        let mut q = Queue::new(8, 4, TrackOrder::Unsorted);
        let batch: Vec<_> = (0..5).map(|i| primary(GAMMA, 0, i)).collect();
        let err = q.insert(&batch).unwrap_err();
        assert!(matches!(err, InitError::Capacity { capacity: 4, existing: 0, requested: 5 }));
        assert!(!q.staged.is_pending());
        assert_eq!(q.staged.count, 0);
        assert_eq!(q.init.num_initializers(), 0);
    }

    #[test]
    fn capacity_counts_queued_initializers() {
        let mut q = Queue::new(8, 4, TrackOrder::Unsorted);
        q.insert(&[primary(GAMMA, 0, 0), primary(GAMMA, 0, 1), primary(GAMMA, 0, 2)])
            .unwrap();
        q.extend();
        assert_eq!(q.init.num_initializers(), 3);

        assert!(q.insert(&[primary(GAMMA, 0, 3), primary(GAMMA, 0, 4)]).is_err());
        assert_eq!(q.staged.count, 0);
        assert!(q.insert(&[primary(GAMMA, 0, 3)]).is_ok());
        assert_eq!(q.staged.count, 1);
    }

    #[test]
    fn second_pending_batch_is_not_implemented() {
        let mut q = Queue::new(8, 16, TrackOrder::Unsorted);
        q.insert(&[primary(GAMMA, 0, 0)]).unwrap();
        let err = q.insert(&[primary(GAMMA, 0, 1)]).unwrap_err();
        assert!(err.is_not_implemented());
        assert_eq!(q.staged.pending(), &[primary(GAMMA, 0, 0)]);
    }

    #[test]
    fn invalid_primaries_rejected() {
        let mut q = Queue::new(8, 16, TrackOrder::Unsorted);

        let unknown = primary(ParticleId(9), 0, 0);
        assert!(matches!(
            q.insert(&[primary(GAMMA, 0, 0), unknown]),
            Err(InitError::InvalidPrimary { index: 1, .. })
        ));

        let bad_event = primary(GAMMA, 16, 0);
        assert!(matches!(q.insert(&[bad_event]), Err(InitError::InvalidPrimary { index: 0, .. })));

        let mut negative = primary(GAMMA, 0, 0);
        negative.energy = -1.0;
        assert!(q.insert(&[negative]).is_err());

        assert!(!q.staged.is_pending());
    }

    #[test]
    fn extend_without_pending_is_noop() {
        let mut q = Queue::new(4, 8, TrackOrder::Unsorted);
        assert_eq!(q.extend(), 0);
        assert_eq!(q.init.num_initializers(), 0);
        assert_eq!(q.init.num_generated, 0);
    }

    #[test]
    fn primary_initializer_fields() {
        let mut q = Queue::new(4, 8, TrackOrder::Unsorted);
        let mut p = primary(ELECTRON, 2, 7);
        p.time = 1.5;
        p.weight = 0.25;
        q.insert(&[p]).unwrap();
        q.extend();

        let ti = q.init.initializers.as_slice()[0];
        assert_eq!(ti.sim.track_id, TrackId(0));
        assert!(!ti.sim.parent_id.is_valid());
        assert_eq!(ti.sim.primary_id, PrimaryId(7));
        assert_eq!(ti.sim.event_id, EventId(2));
        assert_eq!(ti.sim.time, 1.5);
        assert_eq!(ti.sim.weight, 0.25);
        assert_eq!(ti.particle.particle_id, ELECTRON);
        assert_eq!(q.init.num_generated, 1);
        assert_eq!(q.init.tracks_created(EventId(2)), 1);
    }
}

#[cfg(test)]
mod track_ids {
    use super::*;

    #[test]
    fn unique_and_increasing_per_event() {
        let mut q = Queue::new(8, 64, TrackOrder::Unsorted);
        let batch: Vec<_> = (0..6).map(|i| primary(ELECTRON, i % 2, i)).collect();
        q.insert(&batch).unwrap();
        q.extend();

        for event in 0..2 {
            let mut ids: Vec<u32> = q
                .init
                .initializers
                .as_slice()
                .iter()
                .filter(|ti| ti.sim.event_id == EventId(event))
                .map(|ti| ti.sim.track_id.0)
                .collect();
            ids.sort_unstable();
            assert_eq!(ids, vec![0, 1, 2]);
        }

        // Secondaries continue each event's sequence.
        q.initialize();
        for slot in 0..8 {
            if q.slots.sim.status[slot].is_active() {
                q.slots.secondaries[slot].push(Secondary {
                    particle_id: GAMMA,
                    energy:      1.0,
                    dir:         [1.0, 0.0, 0.0],
                });
            }
        }
        assert_eq!(extend_from_secondaries(&mut q.init, &mut q.slots).unwrap(), 6);

        for event in 0..2 {
            let mut ids: Vec<u32> = q
                .init
                .initializers
                .as_slice()
                .iter()
                .filter(|ti| ti.sim.event_id == EventId(event))
                .map(|ti| ti.sim.track_id.0)
                .collect();
            ids.sort_unstable();
            assert_eq!(ids, vec![3, 4, 5]);
            assert_eq!(q.init.tracks_created(EventId(event)), 6);
        }
        assert_eq!(q.init.num_generated, 12);
    }

    #[test]
    fn unknown_event_gets_invalid_id() {
        let q = Queue::new(4, 8, TrackOrder::Unsorted);
        assert!(!q.init.next_track_id(EventId(99)).is_valid());
        assert_eq!(q.init.next_track_id(EventId(0)), TrackId(0));
        assert_eq!(q.init.next_track_id(EventId(0)), TrackId(1));
    }

    #[test]
    fn reset_counters_restarts_sequence() {
        let mut q = Queue::new(4, 8, TrackOrder::Unsorted);
        q.init.next_track_id(EventId(0));
        q.init.reset_counters();
        assert_eq!(q.init.tracks_created(EventId(0)), 0);
    }
}

#[cfg(test)]
mod secondaries {
    use super::*;

    fn full_queue() -> Queue {
        let mut q = Queue::new(4, 16, TrackOrder::Unsorted);
        let batch: Vec<_> = (0..4).map(|i| primary(ELECTRON, 0, i)).collect();
        q.insert(&batch).unwrap();
        q.extend();
        q.initialize();
        q
    }

    fn photon() -> Secondary {
        Secondary { particle_id: GAMMA, energy: 0.5, dir: [0.0, 1.0, 0.0] }
    }

    #[test]
    fn scan_places_secondaries_by_slot() {
        let mut q = full_queue();
        for slot in 0..4 {
            q.slots.sim.status[slot] = TrackStatus::Alive;
        }
        q.slots.geo.pos[1] = [1.0, 2.0, 3.0];
        q.slots.secondaries[1].extend([photon(), photon()]);
        q.slots.secondaries[3].push(photon());
        q.slots.sim.status[2] = TrackStatus::Killed;

        assert_eq!(extend_from_secondaries(&mut q.init, &mut q.slots).unwrap(), 3);
        assert_eq!(q.init.secondary_counts, vec![0, 0, 2, 2, 3]);
        assert_eq!(q.init.num_initializers(), 3);

        let queued = q.init.initializers.as_slice();
        let parent1 = q.slots.sim.track_ids[1];
        let parent3 = q.slots.sim.track_ids[3];
        assert_eq!(queued[0].sim.parent_id, parent1);
        assert_eq!(queued[1].sim.parent_id, parent1);
        assert_eq!(queued[2].sim.parent_id, parent3);
        assert_eq!(queued[0].geo.pos, [1.0, 2.0, 3.0]);
        assert_eq!(queued[0].geo.dir, [0.0, 1.0, 0.0]);
        assert_eq!(queued[0].particle.particle_id, GAMMA);
        assert_eq!(queued[0].sim.primary_id, q.slots.sim.primary_ids[1]);

        assert!(q.slots.secondaries.iter().all(Vec::is_empty));
        assert_eq!(q.init.vacancies, vec![TrackSlotId(2)]);
        assert_eq!(q.slots.status(TrackSlotId(2)), TrackStatus::Inactive);
        assert!(!q.slots.sim.track_ids[2].is_valid());
    }

    #[test]
    fn dying_parent_still_emits() {
        let mut q = full_queue();
        q.slots.sim.status[0] = TrackStatus::Killed;
        q.slots.secondaries[0].push(photon());

        assert_eq!(extend_from_secondaries(&mut q.init, &mut q.slots).unwrap(), 1);
        assert_eq!(q.init.vacancies, vec![TrackSlotId(0)]);

        // The new photon takes its parent's old slot.
        assert_eq!(q.initialize(), 1);
        assert_eq!(q.pattern(), "NCCC");
    }

    #[test]
    fn errored_slots_are_recycled() {
        let mut q = full_queue();
        q.slots.sim.status[1] = TrackStatus::Errored;
        q.slots.sim.status[3] = TrackStatus::Killed;
        extend_from_secondaries(&mut q.init, &mut q.slots).unwrap();
        assert_eq!(q.init.vacancies, vec![TrackSlotId(1), TrackSlotId(3)]);
        assert_eq!(q.slots.status_pattern(), "i_i_");
    }

    #[test]
    fn overflow_leaves_queue_and_vacancies() {
        let mut q = Queue::new(2, 3, TrackOrder::Unsorted);
        q.insert(&[primary(ELECTRON, 0, 0), primary(ELECTRON, 0, 1)]).unwrap();
        q.extend();
        q.initialize();
        q.slots.sim.status[0] = TrackStatus::Killed;
        q.slots.secondaries[1].extend([photon(), photon(), photon(), photon()]);

        let err = extend_from_secondaries(&mut q.init, &mut q.slots).unwrap_err();
        assert!(matches!(err, InitError::Capacity { capacity: 3, existing: 0, requested: 4 }));
        assert_eq!(q.init.num_initializers(), 0);
        assert!(q.init.vacancies.is_empty());
        assert_eq!(q.slots.status(TrackSlotId(0)), TrackStatus::Killed);
        assert_eq!(q.init.tracks_created(EventId(0)), 2);
    }
}

#[cfg(test)]
mod initialize {
    use super::*;

    #[test]
    fn empty_queue_is_noop() {
        let mut q = Queue::new(4, 8, TrackOrder::Unsorted);
        assert_eq!(q.initialize(), 0);
        assert_eq!(q.initialize(), 0);
        assert_eq!(q.pattern(), "____");
        assert_eq!(q.init.num_vacancies(), 4);
    }

    #[test]
    fn written_slot_is_fresh() {
        let mut q = Queue::new(4, 8, TrackOrder::Unsorted);
        q.insert(&[primary(ELECTRON, 1, 3)]).unwrap();
        q.extend();
        q.initialize();

        let sim = &q.slots.sim;
        assert_eq!(sim.status[3], TrackStatus::Initializing);
        assert_eq!(sim.track_ids[3], TrackId(0));
        assert_eq!(sim.event_ids[3], EventId(1));
        assert_eq!(sim.primary_ids[3], PrimaryId(3));
        assert_eq!(sim.num_steps[3], 0);
        assert!(!sim.post_step_action[3].is_valid());
        assert!(!sim.along_step_action[3].is_valid());
        assert_eq!(q.slots.particle.energy[3], 10.0);
    }

    #[test]
    fn rng_depends_on_track_not_slot() {
        let mut small = Queue::new(4, 8, TrackOrder::Unsorted);
        let mut large = Queue::new(8, 8, TrackOrder::Unsorted);
        for q in [&mut small, &mut large] {
            q.insert(&[primary(GAMMA, 0, 0)]).unwrap();
            q.extend();
            q.initialize();
        }
        assert_eq!(small.slots.rngs[3].uniform(), large.slots.rngs[7].uniform());
    }

    #[test]
    fn partition_charge_groups_species() {
        let batch = [
            primary(ELECTRON, 0, 0),
            primary(GAMMA, 0, 1),
            primary(ELECTRON, 0, 2),
            primary(GAMMA, 0, 3),
        ];

        let mut unsorted = Queue::new(8, 8, TrackOrder::Unsorted);
        unsorted.insert(&batch).unwrap();
        unsorted.extend();
        unsorted.initialize();
        assert_eq!(unsorted.pattern(), "____CNCN");

        let mut partitioned = Queue::new(8, 8, TrackOrder::PartitionCharge);
        partitioned.insert(&batch).unwrap();
        partitioned.extend();
        partitioned.initialize();
        assert_eq!(partitioned.pattern(), "____NNCC");
    }

    #[test]
    fn invalid_initializer_is_not_consumed() {
        let mut q = Queue::new(4, 8, TrackOrder::Unsorted);
        q.init.initializers.grow(1).unwrap()[0] = TrackInitializer::default();
        let err = initialize_tracks(&q.params, &q.particles, &mut q.init, &mut q.slots).unwrap_err();
        assert!(matches!(err, InitError::InvalidInitializer(0)));
        assert_eq!(q.init.num_initializers(), 1);
        assert_eq!(q.pattern(), "____");
    }
}
