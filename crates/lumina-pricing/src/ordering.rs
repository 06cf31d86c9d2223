//! The single source of determinism in the pipeline (§4.7).
//!
//! Every matching scan in the RI and SP allocators walks instances in this
//! order: `launch_time` ascending, ties broken by `id` lexicographic
//! ascending. Callers pass in whatever order their map/Vec happened to
//! produce; we never trust it.

use lumina_proto::Instance;

/// Indices into `instances`, sorted by the stable total order.
pub fn stable_indices(instances: &[Instance]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..instances.len()).collect();
    idx.sort_by(|&a, &b| {
        instances[a]
            .launch_time
            .cmp(&instances[b].launch_time)
            .then_with(|| instances[a].id.cmp(&instances[b].id))
    });
    idx
}
