#![allow(dead_code)]

use steplog::model::{
    Condition, ConditionStatus, Container, ContainerState, ContainerStatus, Pod, Run, TaskRef,
};

/// Builder for `Run` to simplify test setup.
pub struct RunBuilder {
    run: Run,
}

impl RunBuilder {
    pub fn new(namespace: &str, name: &str) -> Self {
        let mut run = Run::default();
        run.namespace = namespace.to_string();
        run.name = name.to_string();
        Self { run }
    }

    pub fn pod_name(mut self, pod: &str) -> Self {
        self.run.status.pod_name = pod.to_string();
        self
    }

    pub fn started(mut self) -> Self {
        self.run.status.start_time = Some("2026-10-19T10:00:00Z".to_string());
        self
    }

    pub fn condition(mut self, status: ConditionStatus, message: &str) -> Self {
        self.run.status.conditions.push(Condition {
            kind: "Succeeded".to_string(),
            status,
            reason: String::new(),
            message: message.to_string(),
        });
        self
    }

    pub fn failed(self, message: &str) -> Self {
        self.condition(ConditionStatus::False, message)
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.run.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn task_ref(mut self, name: &str) -> Self {
        self.run.spec.task_ref = Some(TaskRef {
            name: name.to_string(),
        });
        self
    }

    pub fn build(self) -> Run {
        self.run
    }
}

/// Builder for `Pod`.
pub struct PodBuilder {
    pod: Pod,
}

impl PodBuilder {
    pub fn new(namespace: &str, name: &str) -> Self {
        let mut pod = Pod::default();
        pod.namespace = namespace.to_string();
        pod.name = name.to_string();
        Self { pod }
    }

    /// Regular container with an observed state.
    pub fn container(mut self, name: &str, state: ContainerState) -> Self {
        self.pod.spec.containers.push(Container {
            name: name.to_string(),
        });
        self.pod.status.container_statuses.push(ContainerStatus {
            name: name.to_string(),
            state,
        });
        self
    }

    pub fn init_container(mut self, name: &str, state: ContainerState) -> Self {
        self.pod.spec.init_containers.push(Container {
            name: name.to_string(),
        });
        self.pod.status.init_container_statuses.push(ContainerStatus {
            name: name.to_string(),
            state,
        });
        self
    }

    pub fn build(self) -> Pod {
        self.pod
    }
}

pub fn waiting() -> ContainerState {
    ContainerState::Waiting {
        reason: "PodInitializing".to_string(),
    }
}

pub fn running() -> ContainerState {
    ContainerState::Running
}

pub fn succeeded() -> ContainerState {
    ContainerState::Terminated {
        exit_code: 0,
        reason: "Completed".to_string(),
        message: String::new(),
    }
}

pub fn failed(exit_code: i32) -> ContainerState {
    ContainerState::Terminated {
        exit_code,
        reason: "Error".to_string(),
        message: String::new(),
    }
}
