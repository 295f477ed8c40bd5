// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

const ALICE: RequesterId = RequesterId(42);
const BOB: RequesterId = RequesterId(7);

fn washer() -> Machine {
    Machine::new(ResourceRef::washer(1))
}

fn start_input(requester: RequesterId) -> MachineInput {
    MachineInput::Start {
        requester,
        cycle: CycleKind::Normal,
        seconds: 1800,
    }
}

fn in_use_by(requester: RequesterId) -> Machine {
    let (machine, _) = washer().transition(start_input(requester)).unwrap();
    machine
}

#[test]
fn new_machine_is_available() {
    let machine = washer();
    assert!(machine.is_available());
    assert_eq!(machine.state, MachineState::Available);
    assert!(machine.owner_id.is_none());
    assert_eq!(machine.remaining_seconds, 0);
}

#[test]
fn start_claims_machine() {
    let (machine, effects) = washer().transition(start_input(ALICE)).unwrap();

    assert_eq!(machine.state, MachineState::InUse);
    assert_eq!(machine.owner_id, Some(ALICE));
    assert_eq!(machine.cycle_kind, Some(CycleKind::Normal));
    assert_eq!(machine.remaining_seconds, 1800);
    assert_eq!(machine.total_cycles_completed, 1);
    assert_eq!(effects, vec![Effect::Emit(machine.update_event())]);
}

#[test]
fn start_on_in_use_machine_is_invalid() {
    let machine = in_use_by(ALICE);
    let err = machine.transition(start_input(BOB)).unwrap_err();
    assert_eq!(
        err,
        MachineError::InvalidState {
            resource: ResourceRef::washer(1),
            state: MachineState::InUse,
            action: "start",
        }
    );
}

#[test]
fn start_on_disabled_machine_reports_invalid_state() {
    let (machine, _) = washer().transition(MachineInput::Disable).unwrap();
    let err = machine.transition(start_input(ALICE)).unwrap_err();
    assert_eq!(
        err,
        MachineError::InvalidState {
            resource: ResourceRef::washer(1),
            state: MachineState::Disabled,
            action: "start",
        }
    );
}

#[test]
fn start_on_available_but_not_enabled_reports_disabled() {
    let mut machine = washer();
    machine.enabled = false;
    let err = machine.transition(start_input(ALICE)).unwrap_err();
    assert!(matches!(err, MachineError::Disabled { .. }));
}

#[test]
fn cancel_by_owner_releases() {
    let machine = in_use_by(ALICE);
    let (machine, effects) = machine
        .transition(MachineInput::Cancel { requester: ALICE })
        .unwrap();

    assert_eq!(machine.state, MachineState::Available);
    assert!(machine.owner_id.is_none());
    assert!(machine.cycle_kind.is_none());
    assert_eq!(machine.remaining_seconds, 0);
    // the run still counts
    assert_eq!(machine.total_cycles_completed, 1);
    assert_eq!(effects.len(), 1);
}

#[test]
fn cancel_by_other_requester_is_forbidden() {
    let machine = in_use_by(ALICE);
    let err = machine
        .transition(MachineInput::Cancel { requester: BOB })
        .unwrap_err();
    assert_eq!(
        err,
        MachineError::Forbidden {
            resource: ResourceRef::washer(1),
            requester: BOB,
        }
    );
}

#[test]
fn cancel_of_available_machine_is_invalid() {
    let machine = washer();
    let err = machine
        .transition(MachineInput::Cancel { requester: ALICE })
        .unwrap_err();
    assert!(matches!(
        err,
        MachineError::InvalidState {
            state: MachineState::Available,
            action: "cancel",
            ..
        }
    ));
}

#[test]
fn end_completes_and_keeps_owner() {
    let machine = in_use_by(ALICE);
    let (machine, effects) = machine
        .transition(MachineInput::End { requester: BOB })
        .unwrap();

    assert_eq!(machine.state, MachineState::Completed);
    assert_eq!(machine.owner_id, Some(ALICE));
    assert_eq!(machine.remaining_seconds, 0);
    assert_eq!(effects.len(), 2);
    assert_eq!(effects[0], Effect::Emit(machine.update_event()));
    assert!(matches!(
        &effects[1],
        Effect::Notify {
            requester,
            event: Event::Notification(Notification { kind: NotificationKind::CycleComplete, .. }),
        } if *requester == ALICE
    ));
}

#[test]
fn completed_update_hides_the_owner() {
    let (machine, effects) = in_use_by(ALICE)
        .transition(MachineInput::End { requester: ALICE })
        .unwrap();

    assert_eq!(machine.owner_id, Some(ALICE));
    match &effects[0] {
        Effect::Emit(Event::MachineUpdate(update)) => {
            assert_eq!(update.state, MachineState::Completed);
            assert_eq!(update.owner_id, None);
            assert_eq!(update.remaining_seconds, 0);
        }
        other => panic!("unexpected effect {other:?}"),
    }
}

#[test]
fn collect_returns_completed_machine_to_available() {
    let (machine, _) = in_use_by(ALICE)
        .transition(MachineInput::End { requester: ALICE })
        .unwrap();
    let (machine, effects) = machine
        .transition(MachineInput::Collect { requester: BOB })
        .unwrap();

    assert!(machine.is_available());
    assert!(machine.owner_id.is_none());
    assert_eq!(effects.len(), 1);
}

#[test]
fn start_after_collect_overwrites_owner() {
    let (machine, _) = in_use_by(ALICE)
        .transition(MachineInput::End { requester: ALICE })
        .unwrap();
    let (machine, _) = machine
        .transition(MachineInput::Collect { requester: ALICE })
        .unwrap();
    let (machine, _) = machine.transition(start_input(BOB)).unwrap();

    assert_eq!(machine.owner_id, Some(BOB));
    assert_eq!(machine.total_cycles_completed, 2);
}

#[test]
fn start_on_completed_machine_is_invalid() {
    let (machine, _) = in_use_by(ALICE)
        .transition(MachineInput::End { requester: ALICE })
        .unwrap();
    let err = machine.transition(start_input(BOB)).unwrap_err();
    assert!(matches!(
        err,
        MachineError::InvalidState {
            state: MachineState::Completed,
            ..
        }
    ));
}

#[parameterized(
    from_available = { MachineState::Available },
    from_in_use = { MachineState::InUse },
    from_completed = { MachineState::Completed },
    from_disabled = { MachineState::Disabled },
)]
fn disable_from_any_state(state: MachineState) {
    let mut machine = in_use_by(ALICE);
    machine.state = state;

    let (machine, effects) = machine.transition(MachineInput::Disable).unwrap();

    assert_eq!(machine.state, MachineState::Disabled);
    assert!(!machine.enabled);
    assert!(machine.owner_id.is_none());
    assert_eq!(machine.remaining_seconds, 0);
    assert!(effects.is_empty());
}

#[test]
fn reenable_restores_availability() {
    let (machine, _) = washer().transition(MachineInput::Disable).unwrap();
    let (machine, _) = machine.transition(MachineInput::Reenable).unwrap();
    assert!(machine.is_available());
}

#[test]
fn reenable_requires_disabled() {
    let err = washer().transition(MachineInput::Reenable).unwrap_err();
    assert!(matches!(err, MachineError::InvalidState { action: "reenable", .. }));
}

#[parameterized(
    end_when_available = { MachineInput::End { requester: ALICE } },
    collect_when_available = { MachineInput::Collect { requester: ALICE } },
    cancel_when_available = { MachineInput::Cancel { requester: ALICE } },
)]
fn rejected_transition_leaves_machine_untouched(input: MachineInput) {
    let machine = washer();
    let before = machine.clone();
    assert!(machine.transition(input).is_err());
    assert_eq!(machine, before);
}

#[test]
fn error_messages_name_the_machine() {
    let err = in_use_by(ALICE).transition(start_input(BOB)).unwrap_err();
    assert_eq!(err.to_string(), "cannot start washer#1 while it is in_use");
}

#[test]
fn cycle_kind_wire_names() {
    let json = serde_json::to_string(&CycleKind::Extra10).unwrap();
    assert_eq!(json, "\"extra_10\"");
    let kind: CycleKind = serde_json::from_str("\"extra_5\"").unwrap();
    assert_eq!(kind, CycleKind::Extra5);
}
