//! Host executors: run one closure per lane, serially or on Rayon.

use mc_core::{CoreConfig, ThreadId};
use mc_track::TrackView;

use crate::ActionResult;

/// How host launches are scheduled.
///
/// Chosen from [`CoreConfig::num_threads`]: `Some(1)` is serial; with the
/// `parallel` feature, `None` uses Rayon's global pool and `Some(n)` a
/// dedicated pool of `n` workers.  Without the feature every setting runs
/// serially.
#[derive(Debug)]
pub enum Executor {
    Serial,
    #[cfg(feature = "parallel")]
    Global,
    #[cfg(feature = "parallel")]
    Pool(rayon::ThreadPool),
}

impl Executor {
    pub fn from_config(config: &CoreConfig) -> ActionResult<Self> {
        match config.num_threads {
            Some(1) => Ok(Executor::Serial),

            #[cfg(feature = "parallel")]
            None => Ok(Executor::Global),

            #[cfg(feature = "parallel")]
            Some(n) => rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map(Executor::Pool)
                .map_err(|e| {
                    crate::ActionError::from(mc_core::CoreError::Config(format!(
                        "cannot build a {n}-thread pool: {e}"
                    )))
                }),

            #[cfg(not(feature = "parallel"))]
            _ => {
                tracing::debug!(
                    requested = ?config.num_threads,
                    "built without the `parallel` feature; stepping serially"
                );
                Ok(Executor::Serial)
            }
        }
    }

    pub fn name(&self) -> String {
        match self {
            Executor::Serial => "serial".into(),
            #[cfg(feature = "parallel")]
            Executor::Global => "rayon-global".into(),
            #[cfg(feature = "parallel")]
            Executor::Pool(pool) => format!("rayon-{}", pool.current_num_threads()),
        }
    }

    /// Apply `f` to every lane.  Lanes are independent; their relative
    /// order is unspecified on the parallel executors.
    pub fn run<F>(&self, lanes: &mut [(ThreadId, TrackView<'_>)], f: &F)
    where
        F: Fn(ThreadId, &mut TrackView<'_>) + Sync,
    {
        match self {
            Executor::Serial => {
                for (thread, view) in lanes.iter_mut() {
                    f(*thread, view);
                }
            }

            #[cfg(feature = "parallel")]
            Executor::Global => {
                use rayon::prelude::*;
                lanes.par_iter_mut().for_each(|(thread, view)| f(*thread, view));
            }

            #[cfg(feature = "parallel")]
            Executor::Pool(pool) => {
                use rayon::prelude::*;
                pool.install(|| {
                    lanes.par_iter_mut().for_each(|(thread, view)| f(*thread, view));
                });
            }
        }
    }
}
