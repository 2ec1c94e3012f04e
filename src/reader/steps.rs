// src/reader/steps.rs

//! Step resolution: which containers of a pod are read, and in what order.

use std::collections::{HashMap, HashSet};

use crate::model::{Container, ContainerState, ContainerStatus, Pod, Step};

/// Resolve the ordered list of steps to read from `pod`.
///
/// - Regular steps keep the pod's declaration order.
/// - With `all_steps`, init-container steps are prepended. They are never
///   subject to `wanted`.
/// - An empty `wanted` selects every regular step; otherwise only regular
///   steps named in `wanted` are kept. Unknown names are ignored.
pub fn filter_steps(pod: &Pod, all_steps: bool, wanted: &[String], prefix: &str) -> Vec<Step> {
    let mut steps = Vec::new();

    if all_steps {
        steps.extend(build_steps(
            &pod.spec.init_containers,
            &pod.status.init_container_statuses,
            prefix,
        ));
    }

    let regular = build_steps(&pod.spec.containers, &pod.status.container_statuses, prefix);

    if wanted.is_empty() {
        steps.extend(regular);
        return steps;
    }

    let wanted: HashSet<&str> = wanted.iter().map(String::as_str).collect();
    steps.extend(regular.into_iter().filter(|s| wanted.contains(s.name.as_str())));
    steps
}

fn build_steps(containers: &[Container], statuses: &[ContainerStatus], prefix: &str) -> Vec<Step> {
    let states: HashMap<&str, &ContainerState> = statuses
        .iter()
        .map(|cs| (cs.name.as_str(), &cs.state))
        .collect();

    containers
        .iter()
        .map(|c| Step {
            name: c.name.strip_prefix(prefix).unwrap_or(&c.name).to_string(),
            container: c.name.clone(),
            state: states.get(c.name.as_str()).map(|s| (*s).clone()),
        })
        .collect()
}
