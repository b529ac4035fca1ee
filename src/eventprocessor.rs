use crate::animationstate::AnimationState;
use crate::buildregistry::BuildRegistry;
use crate::error::{Error, Result};
use crate::framerenderer::Rgb;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildEvent {
    Reset,
    Create(String),
    Succeed(String),
    Fail(String),
}

impl BuildEvent {
    /// Parses `{"buildId": "...", "status": 0..=3}`.
    ///
    /// Status codes are 0 = reset, 1 = create, 2 = succeed and 3 = fail. The build id may be
    /// omitted for a reset; numeric ids are accepted and used as their textual form.
    pub fn from_json(payload: &str) -> Result<BuildEvent> {
        let json = json::parse(payload)
            .map_err(|err| Error::MalformedEvent(format!("invalid JSON: {err}")))?;

        if !json.is_object() {
            return Err(Error::MalformedEvent(format!(
                "expected an object, got {}",
                json.dump()
            )));
        }

        let status = match json["status"].as_i64() {
            Some(status) => status,
            None => {
                return Err(Error::MalformedEvent(format!(
                    "missing or non-integer status: {}",
                    json["status"]
                )))
            }
        };

        let build_id = match &json["buildId"] {
            id if id.is_number() => Some(id.dump()),
            id => id.as_str().filter(|id| !id.is_empty()).map(str::to_string),
        };

        let require_id = |id: Option<String>| {
            id.ok_or_else(|| Error::MalformedEvent(format!("status {status} requires a buildId")))
        };

        match status {
            0 => Ok(BuildEvent::Reset),
            1 => Ok(BuildEvent::Create(require_id(build_id)?)),
            2 => Ok(BuildEvent::Succeed(require_id(build_id)?)),
            3 => Ok(BuildEvent::Fail(require_id(build_id)?)),
            _ => Err(Error::MalformedEvent(format!("unknown status {status}"))),
        }
    }
}

/// Applies build events to the registry and the animation state together.
pub struct EventProcessor {
    success_color: Rgb,
    failure_color: Rgb,
    hold_ticks: u32,
    unknown_references: u64,
}

impl EventProcessor {
    /// A notification always holds for at least one tick.
    pub fn new(success_color: Rgb, failure_color: Rgb, hold_ticks: u32) -> EventProcessor {
        EventProcessor {
            success_color,
            failure_color,
            hold_ticks: hold_ticks.max(1),
            unknown_references: 0,
        }
    }

    /// Number of succeed/fail events that named a build nobody was tracking.
    pub fn unknown_references(&self) -> u64 {
        self.unknown_references
    }

    pub fn process_payload(
        &mut self,
        payload: &str,
        registry: &mut BuildRegistry,
        state: &mut AnimationState,
    ) -> Result<()> {
        let event = BuildEvent::from_json(payload)?;
        self.apply(event, registry, state);
        Ok(())
    }

    pub fn apply(
        &mut self,
        event: BuildEvent,
        registry: &mut BuildRegistry,
        state: &mut AnimationState,
    ) {
        match event {
            BuildEvent::Reset => {
                log::info!("Processing reset");
                registry.clear();
                state.reset();
            }
            BuildEvent::Create(id) => {
                log::info!("Processing create ({id})");
                registry.create(&id);
                state.start_running();
            }
            BuildEvent::Succeed(id) => {
                log::info!("Processing succeed ({id})");
                self.finish(&id, registry);
                state.notify(self.success_color, self.hold_ticks);
            }
            BuildEvent::Fail(id) => {
                log::info!("Processing fail ({id})");
                self.finish(&id, registry);
                state.notify(self.failure_color, self.hold_ticks);
            }
        }
    }

    fn finish(&mut self, id: &str, registry: &mut BuildRegistry) {
        if !registry.remove(id) {
            self.unknown_references += 1;
            log::info!(
                "Build {id} finished but was never created ({} so far)",
                self.unknown_references
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animationstate::Mode;

    const HOLD: u32 = 3;

    fn processor() -> EventProcessor {
        EventProcessor::new(Rgb::new(0, 255, 0), Rgb::new(255, 0, 0), HOLD)
    }

    fn create(id: &str) -> BuildEvent {
        BuildEvent::Create(id.to_string())
    }

    #[test]
    fn parses_all_statuses() {
        assert_eq!(
            BuildEvent::from_json(r#"{"buildId": "", "status": 0}"#).unwrap(),
            BuildEvent::Reset
        );
        assert_eq!(
            BuildEvent::from_json(r#"{"status": 0}"#).unwrap(),
            BuildEvent::Reset
        );
        assert_eq!(
            BuildEvent::from_json(r#"{"buildId": "b1", "status": 1}"#).unwrap(),
            create("b1")
        );
        assert_eq!(
            BuildEvent::from_json(r#"{"buildId": "b1", "status": 2}"#).unwrap(),
            BuildEvent::Succeed("b1".to_string())
        );
        assert_eq!(
            BuildEvent::from_json(r#"{"buildId": "b1", "status": 3}"#).unwrap(),
            BuildEvent::Fail("b1".to_string())
        );
    }

    #[test]
    fn numeric_build_ids_are_text() {
        assert_eq!(
            BuildEvent::from_json(r#"{"buildId": 42, "status": 1}"#).unwrap(),
            create("42")
        );
    }

    #[test]
    fn rejects_malformed_payloads() {
        let payloads = [
            "not json",
            "[1, 2]",
            r#"{"buildId": "b1"}"#,
            r#"{"buildId": "b1", "status": "1"}"#,
            r#"{"buildId": "b1", "status": 4}"#,
            r#"{"buildId": "b1", "status": -1}"#,
            r#"{"status": 1}"#,
            r#"{"buildId": "", "status": 2}"#,
            r#"{"buildId": null, "status": 3}"#,
        ];

        for payload in payloads {
            match BuildEvent::from_json(payload) {
                Err(Error::MalformedEvent(_)) => {}
                other => panic!("{payload} parsed as {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_payload_leaves_state_alone() {
        let mut processor = processor();
        let mut registry = BuildRegistry::with_seed(10, 1);
        let mut state = AnimationState::new();
        registry.create("a");
        state.start_running();

        assert!(processor
            .process_payload(r#"{"buildId": "a", "status": 9}"#, &mut registry, &mut state)
            .is_err());
        assert_eq!(registry.count(), 1);
        assert_eq!(state.mode(), Mode::Running);
    }

    #[test]
    fn create_then_fail_then_hold_expires() {
        let mut processor = processor();
        let mut registry = BuildRegistry::with_seed(10, 1);
        let mut state = AnimationState::new();

        processor.apply(create("b1"), &mut registry, &mut state);
        assert_eq!(state.mode(), Mode::Running);

        let positions = registry.advance_all();
        assert_eq!(positions.len(), 1);
        state.tick(registry.is_empty());

        processor.apply(BuildEvent::Fail("b1".to_string()), &mut registry, &mut state);
        assert_eq!(state.mode(), Mode::Notifying);
        assert_eq!(state.notify_color(), Rgb::new(255, 0, 0));
        assert!(registry.is_empty());

        for _ in 0..HOLD - 1 {
            state.tick(registry.is_empty());
            assert_eq!(state.mode(), Mode::Notifying);
            assert_eq!(state.notify_color(), Rgb::new(255, 0, 0));
        }
        state.tick(registry.is_empty());
        assert_eq!(state.mode(), Mode::Waiting);
    }

    #[test]
    fn succeed_one_of_two_then_reset() {
        let mut processor = processor();
        let mut registry = BuildRegistry::with_seed(10, 1);
        let mut state = AnimationState::new();

        processor.apply(create("a"), &mut registry, &mut state);
        processor.apply(create("b"), &mut registry, &mut state);
        processor.apply(BuildEvent::Succeed("a".to_string()), &mut registry, &mut state);
        assert_eq!(registry.count(), 1);
        assert!(registry.contains("b"));
        assert_eq!(state.mode(), Mode::Notifying);
        assert_eq!(state.notify_color(), Rgb::new(0, 255, 0));

        processor.apply(BuildEvent::Reset, &mut registry, &mut state);
        assert!(registry.is_empty());
        assert_eq!(state.mode(), Mode::Waiting);
        assert_eq!(state.notify_ticks_remaining(), 0);
    }

    #[test]
    fn hold_returns_to_running_with_builds_left() {
        let mut processor = processor();
        let mut registry = BuildRegistry::with_seed(10, 1);
        let mut state = AnimationState::new();

        processor.apply(create("a"), &mut registry, &mut state);
        processor.apply(create("b"), &mut registry, &mut state);
        processor.apply(BuildEvent::Fail("a".to_string()), &mut registry, &mut state);
        for _ in 0..HOLD {
            state.tick(registry.is_empty());
        }
        assert_eq!(state.mode(), Mode::Running);
    }

    #[test]
    fn finishing_unknown_build_still_notifies() {
        let mut processor = processor();
        let mut registry = BuildRegistry::with_seed(10, 1);
        let mut state = AnimationState::new();

        processor.apply(BuildEvent::Succeed("ghost".to_string()), &mut registry, &mut state);
        assert_eq!(state.mode(), Mode::Notifying);
        assert!(registry.is_empty());
        assert_eq!(processor.unknown_references(), 1);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut processor = processor();
        let mut registry = BuildRegistry::with_seed(10, 1);
        let mut state = AnimationState::new();

        processor.apply(BuildEvent::Reset, &mut registry, &mut state);
        processor.apply(BuildEvent::Reset, &mut registry, &mut state);
        assert!(registry.is_empty());
        assert_eq!(state.mode(), Mode::Waiting);
    }

    #[test]
    fn mode_agrees_with_registry_after_every_event() {
        let events = vec![
            create("a"),
            create("b"),
            BuildEvent::Fail("a".to_string()),
            create("a"),
            BuildEvent::Succeed("ghost".to_string()),
            BuildEvent::Succeed("a".to_string()),
            BuildEvent::Fail("b".to_string()),
            BuildEvent::Reset,
            create("c"),
        ];

        let mut processor = processor();
        let mut registry = BuildRegistry::with_seed(10, 1);
        let mut state = AnimationState::new();
        for event in events {
            processor.apply(event, &mut registry, &mut state);
            match state.mode() {
                Mode::Waiting => assert!(registry.is_empty()),
                Mode::Running => {
                    assert!(!registry.is_empty());
                    assert_eq!(state.notify_ticks_remaining(), 0);
                }
                Mode::Notifying => assert!(state.notify_ticks_remaining() > 0),
            }
            state.tick(registry.is_empty());
        }
    }

    #[test]
    fn zero_hold_still_notifies_for_one_tick() {
        let mut processor = EventProcessor::new(Rgb::new(0, 255, 0), Rgb::new(255, 0, 0), 0);
        let mut registry = BuildRegistry::with_seed(10, 1);
        let mut state = AnimationState::new();

        processor.apply(create("b1"), &mut registry, &mut state);
        processor.apply(BuildEvent::Succeed("b1".to_string()), &mut registry, &mut state);
        assert!(registry.is_empty());
        assert_eq!(state.mode(), Mode::Notifying);
        assert_eq!(state.notify_ticks_remaining(), 1);

        state.tick(registry.is_empty());
        assert_eq!(state.mode(), Mode::Waiting);
    }
}
