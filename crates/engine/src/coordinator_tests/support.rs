// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for coordinator tests.

use crate::coordinator::Coordinator;
use fm_adapters::FakeAgentAdapter;
use fm_bus::Phase;
use fm_core::{AgentId, Clock, Config, FakeClock, Role, RoleBuilder, RoleType, Strategy};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

pub(crate) fn worker_role(role_id: &str, count: u32) -> Role {
    RoleBuilder::default().role_id(role_id).count(count).build()
}

pub(crate) fn review_role(role_id: &str, role_type: RoleType) -> Role {
    RoleBuilder::default().role_id(role_id).role_type(role_type).build()
}

pub(crate) fn config_with(base_dir: &Path, strategy: Strategy, roles: Vec<Role>) -> Config {
    let working_dir = base_dir.join("repo");
    std::fs::create_dir_all(&working_dir).unwrap();

    let mut config = Config::default();
    config.run.run_dir = base_dir.join("run");
    config.run.working_dir = working_dir;
    config.run.state_writes_per_second = 1000.0;
    config.orchestration.decomposition = strategy;
    config.merge.authority_role = roles
        .iter()
        .find(|r| r.role_type == RoleType::Worker)
        .or(roles.first())
        .map(|r| r.role_id.clone())
        .unwrap_or_else(|| "worker".to_string());
    config.roles = roles;
    config
}

pub(crate) struct Fixture {
    pub coordinator: Coordinator<FakeAgentAdapter, FakeClock>,
    pub adapter: FakeAgentAdapter,
    pub clock: FakeClock,
    #[allow(dead_code)]
    pub dir: TempDir,
}

impl Fixture {
    /// Fresh run in a new temp dir with the given strategy and roster.
    pub async fn start(strategy: Strategy, roles: Vec<Role>, goal: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let config = config_with(dir.path(), strategy, roles);
        Self::start_in(dir, config, goal, false).await
    }

    pub async fn start_in(dir: TempDir, config: Config, goal: &str, resume: bool) -> Self {
        let clock = FakeClock::new();
        let adapter = FakeAgentAdapter::new();
        adapter.set_now_ms(clock.epoch_ms());

        let mut coordinator =
            Coordinator::new(config, goal, resume, adapter.clone(), clock.clone()).unwrap();
        coordinator.spawn_agents().await.unwrap();
        Self { coordinator, adapter, clock, dir }
    }

    /// Advance both the coordinator clock and the fake adapter's wall clock.
    pub fn advance(&self, duration: Duration) {
        self.clock.advance(duration);
        self.adapter.set_now_ms(self.clock.epoch_ms());
    }

    /// One tick with a small clock step so the state writer's cooldown
    /// lapses between rounds.
    pub async fn tick(&mut self) -> Phase {
        self.advance(Duration::from_millis(100));
        self.coordinator.tick().await.unwrap()
    }

    /// Tick until the phase is terminal, bounded to keep failures finite.
    pub async fn run_to_completion(&mut self, max_ticks: usize) -> Phase {
        for _ in 0..max_ticks {
            let phase = self.tick().await;
            if phase.is_terminal() {
                return phase;
            }
        }
        panic!("run did not reach a terminal phase within {max_ticks} ticks");
    }

    pub fn agent(&self, id: &str) -> AgentId {
        AgentId::new(id)
    }
}
