//! Rayon-based parallel resource processing.

use std::sync::Mutex;

use anyhow::Result;

use super::apply::process_single;
use super::{ProcessOpts, TaskResult, finish};
use crate::logging::ChangeCounts;
use crate::resources::{Applicable, Resource, ResourceState};
use crate::tasks::Context;

/// Check and process resources in parallel.
pub(super) fn process_resources_parallel<R: Resource + Send>(
    ctx: &Context,
    resources: Vec<R>,
    opts: &ProcessOpts,
) -> Result<TaskResult> {
    run_parallel(ctx, resources, opts, |resource| {
        let state = resource.current_state()?;
        Ok((resource, state))
    })
}

/// Process resources with pre-computed states in parallel.
pub(super) fn process_resource_states_parallel<R: Applicable + Send>(
    ctx: &Context,
    resource_states: Vec<(R, ResourceState)>,
    opts: &ProcessOpts,
) -> Result<TaskResult> {
    run_parallel(ctx, resource_states, opts, Ok)
}

/// Run `get_resource_state` and [`process_single`] for every item on the
/// rayon pool, summing the per-item deltas.
///
/// The counts lock is only held for the update, never during the
/// resource work itself.
fn run_parallel<T: Send, R: Applicable + Send>(
    ctx: &Context,
    items: Vec<T>,
    opts: &ProcessOpts,
    get_resource_state: impl Fn(T) -> Result<(R, ResourceState)> + Sync,
) -> Result<TaskResult> {
    use rayon::prelude::*;
    let counts = Mutex::new(ChangeCounts::default());
    items.into_par_iter().try_for_each(|item| -> Result<()> {
        let (resource, current) = get_resource_state(item)?;
        let delta = process_single(ctx, &resource, current, opts)?;
        *counts
            .lock()
            .map_err(|e| anyhow::anyhow!("counts mutex poisoned: {e}"))? += delta;
        Ok(())
    })?;
    let counts = counts
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    Ok(finish(ctx, counts))
}
