//! End-to-end swipe cycles over the mock magstripe reader.

use waypoint_core::{EndpointId, PlayerId, Stage};
use waypoint_hardware::mock::{MockMagstripe, MockMagstripeHandle};
use waypoint_hardware::{CardReaderSession, DriverConfig};
use waypoint_protocol::{DecodeError, MessageError, PlayerRecord, StationMessage};
use waypoint_routing::{
    MemoryCounter, RecordingNotifier, RoutingCoordinator, RoutingError, RoutingOutcome,
    RoutingPhase, RoutingTable, ScriptedOperator, SharedTable,
};

type Coordinator = RoutingCoordinator<
    CardReaderSession<MockMagstripe>,
    ScriptedOperator,
    MemoryCounter,
    RecordingNotifier,
>;

struct Rig {
    coordinator: Coordinator,
    reader: MockMagstripeHandle,
    operator: ScriptedOperator,
    notifier: RecordingNotifier,
    table: SharedTable,
}

async fn rig(next_id: u32) -> Rig {
    let (reader, handle) = MockMagstripe::new();
    let session = CardReaderSession::open(reader, DriverConfig::default())
        .await
        .unwrap();
    let operator = ScriptedOperator::new();
    let notifier = RecordingNotifier::new();
    let table = RoutingTable::shared();
    let coordinator = RoutingCoordinator::new(
        session,
        operator.clone(),
        MemoryCounter::starting_at(next_id),
        notifier.clone(),
        table.clone(),
    );
    Rig {
        coordinator,
        reader: handle,
        operator,
        notifier,
        table,
    }
}

async fn station(table: &SharedTable, stage: &str) -> EndpointId {
    let endpoint = EndpointId::new();
    let message = StationMessage::parse(&format!("S{stage}")).unwrap();
    table.lock().await.apply(endpoint, message);
    endpoint
}

async fn depart(table: &SharedTable, endpoint: EndpointId, card: &str) {
    let message = StationMessage::parse(card).unwrap();
    table.lock().await.apply(endpoint, message);
}

fn id(text: &str) -> PlayerId {
    PlayerId::new(text).unwrap()
}

#[tokio::test]
async fn pending_player_is_routed_to_free_station() {
    let mut rig = rig(0).await;
    let origin = station(&rig.table, "0").await;
    let target = station(&rig.table, "1").await;
    depart(&rig.table, origin, "1022222222007alice").await;

    rig.reader.swipe("0000000000007alice").unwrap();
    let outcome = rig.coordinator.process_card().await.unwrap();

    assert_eq!(
        outcome,
        RoutingOutcome::Routed {
            player_id: id("007"),
            stage: Stage::new(1).unwrap(),
            endpoint: target,
        }
    );
    assert_eq!(rig.reader.written_cards(), vec!["1022222222007alice"]);
    assert_eq!(
        rig.notifier.sent(),
        vec![(target, "1022222222007alice".to_string())]
    );

    let table = rig.table.lock().await;
    assert!(table.stations.get(&target).unwrap().occupied);
    assert!(!table.pending.contains(&id("007")));
    assert!(table.is_in_system(&id("007")));
    assert!(rig.operator.saw("Sending to base 2"));
}

#[tokio::test]
async fn no_free_station_leaves_state_untouched() {
    let mut rig = rig(0).await;
    let origin = station(&rig.table, "0").await;
    let busy = station(&rig.table, "1").await;
    depart(&rig.table, origin, "1022222222007alice").await;
    rig.table.lock().await.stations.set_occupied(&busy, true);

    rig.reader.swipe("0000000000007alice").unwrap();
    let err = rig.coordinator.process_card().await.unwrap_err();

    assert!(matches!(err, RoutingError::NoStationAvailable(stage) if stage.as_u8() == 1));
    assert!(err.is_recoverable());
    assert!(rig.reader.written_cards().is_empty());
    assert!(rig.notifier.sent().is_empty());

    let table = rig.table.lock().await;
    assert!(table.pending.contains(&id("007")));
    assert!(table.stations.get(&busy).unwrap().occupied);
    assert!(!table.stations.get(&origin).unwrap().occupied);
    assert_eq!(rig.coordinator.phases().current(), RoutingPhase::Idle);
}

#[tokio::test]
async fn formatting_allocates_next_id_once() {
    let mut rig = rig(41).await;
    rig.operator.answer_confirm(true).answer_choice(0);

    rig.reader.swipe_bytes(&[0xFF, 0xFE, 0x00]).unwrap();
    let outcome = rig.coordinator.process_card().await.unwrap();

    assert_eq!(outcome, RoutingOutcome::Ignored { player_id: id("041") });
    assert_eq!(rig.coordinator.counter().persisted(), &[42]);

    let written = rig.reader.written_cards();
    assert_eq!(written, vec!["0000000000041"]);
    let record = PlayerRecord::decode(&written[0]).unwrap();
    assert_eq!(record.stage, Stage::FIRST);
    assert_eq!(record.payload, "000000000");
}

#[tokio::test]
async fn out_of_range_stage_is_reformatted() {
    let mut rig = rig(5).await;
    rig.operator.answer_confirm(true).answer_choice(0);

    rig.reader.swipe("3000000000007alice").unwrap();
    let outcome = rig.coordinator.process_card().await.unwrap();

    assert_eq!(outcome, RoutingOutcome::Ignored { player_id: id("005") });
    let questions = rig.operator.questions();
    assert!(questions[0].starts_with("Card not setup correctly: Base: 4"));
    assert!(questions[0].ends_with("Format?"));
    assert_eq!(rig.coordinator.counter().persisted(), &[6]);

    let written = rig.reader.written_cards();
    assert_eq!(written, vec!["0000000000005"]);
    assert_eq!(PlayerRecord::decode(&written[0]).unwrap().stage, Stage::FIRST);
}

#[tokio::test]
async fn longest_username_fits_one_card_write() {
    let mut rig = rig(0).await;
    let origin = station(&rig.table, "0").await;
    let target = station(&rig.table, "1").await;

    let too_long = format!("1022222222007{}", "x".repeat(45));
    assert_eq!(
        StationMessage::parse(&too_long),
        Err(MessageError::Record(DecodeError::TooLong { len: 58, max: 53 }))
    );

    let longest = format!("1022222222007{}", "x".repeat(40));
    depart(&rig.table, origin, &longest).await;
    rig.reader.swipe("0000000000007").unwrap();
    let outcome = rig.coordinator.handle_swipe().await.unwrap();

    assert!(matches!(outcome, RoutingOutcome::Routed { endpoint, .. } if endpoint == target));
    assert_eq!(rig.reader.written_cards(), vec![longest.clone()]);
    assert_eq!(rig.notifier.sent(), vec![(target, longest)]);
}

#[tokio::test]
async fn reset_then_departure_frees_station_and_queues_player() {
    let rig = rig(0).await;
    let endpoint = station(&rig.table, "2").await;
    rig.table.lock().await.stations.set_occupied(&endpoint, true);

    depart(&rig.table, endpoint, "9").await;
    depart(&rig.table, endpoint, "3123123123010zed").await;

    let table = rig.table.lock().await;
    assert!(!table.stations.get(&endpoint).unwrap().occupied);
    assert!(table.pending.contains(&id("010")));
}

#[tokio::test]
async fn closed_station_is_not_chosen() {
    let mut rig = rig(0).await;
    let gone = station(&rig.table, "0").await;
    let live = station(&rig.table, "0").await;
    rig.table.lock().await.handle_close(gone);
    rig.operator.answer_choice(1);

    rig.reader.swipe("0000000000003").unwrap();
    let outcome = rig.coordinator.process_card().await.unwrap();

    assert!(matches!(outcome, RoutingOutcome::Routed { endpoint, .. } if endpoint == live));
}

#[tokio::test]
async fn formatting_mode_counts_cards_until_reader_is_lost() {
    let mut rig = rig(0).await;

    // Writes are acknowledged without a swipe; unplugging ends the loop.
    let reader = rig.reader.clone();
    let operator = rig.operator.clone();
    tokio::spawn(async move {
        while !operator.saw("Formatted 2 cards") {
            tokio::task::yield_now().await;
        }
        reader.unplug();
    });

    let err = rig.coordinator.run_formatting_mode().await.unwrap_err();
    assert!(!err.is_recoverable());
    assert!(rig.operator.saw("Formatted 1 cards"));
    assert_eq!(&rig.reader.written_cards()[..2], ["0000000000000", "0000000000001"]);
}
