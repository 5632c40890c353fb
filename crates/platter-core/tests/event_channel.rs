use std::thread;

use platter_core::{MidiEvent, MidiEventKind, TimedMessage, event_channel};

fn bend_event(offset: usize) -> MidiEvent {
    MidiEvent::from_timed(&TimedMessage::pitch_bend(offset, 0, 8_192))
}

#[test]
fn full_ring_drops_instead_of_blocking() {
    let (mut producer, mut consumer) = event_channel(16);
    assert_eq!(producer.capacity(), 16);

    let pushes = 40;
    let accepted = (0..pushes)
        .filter(|offset| producer.push(bend_event(*offset)))
        .count();

    assert_eq!(accepted, 15, "one slot of the ring stays free");
    assert_eq!(consumer.drop_count(), pushes - 16 + 1);

    let mut drained = Vec::new();
    assert_eq!(consumer.drain(&mut drained), 15);
    let offsets: Vec<usize> = drained.iter().map(|event| event.sample_offset).collect();
    assert_eq!(offsets, (0..15).collect::<Vec<_>>(), "oldest events survive");
}

#[test]
fn filling_to_usable_capacity_drops_nothing() {
    let (mut producer, consumer) = event_channel(64);
    for offset in 0..63 {
        assert!(producer.push(bend_event(offset)));
    }
    assert_eq!(consumer.len(), 63);
    assert_eq!(consumer.drop_count(), 0);
}

#[test]
fn take_drop_count_resets_counter() {
    let (mut producer, consumer) = event_channel(4);
    for offset in 0..10 {
        let _ = producer.push(bend_event(offset));
    }
    assert_eq!(consumer.take_drop_count(), 7);
    assert_eq!(consumer.drop_count(), 0);
}

#[test]
fn capacity_rounds_up_to_power_of_two() {
    let (producer, consumer) = event_channel(100);
    assert_eq!(producer.capacity(), 128);
    assert_eq!(consumer.capacity(), 128);

    let (producer, _consumer) = event_channel(0);
    assert_eq!(producer.capacity(), 2);
}

#[test]
fn events_cross_threads_in_order() {
    let (mut producer, mut consumer) = event_channel(256);
    let total = 10_000_usize;

    let writer = thread::spawn(move || {
        let mut dropped = 0;
        for offset in 0..total {
            while !producer.push(bend_event(offset)) {
                dropped += 1;
                thread::yield_now();
            }
        }
        dropped
    });

    let mut received = Vec::with_capacity(total);
    while received.len() < total {
        if consumer.drain(&mut received) == 0 {
            thread::yield_now();
        }
    }
    let retries = writer.join().expect("producer thread should finish");

    assert_eq!(consumer.drop_count(), retries);
    assert!(
        received
            .iter()
            .enumerate()
            .all(|(index, event)| event.sample_offset == index),
        "events must arrive in push order"
    );
    assert!(received.iter().all(|event| event.kind == MidiEventKind::PitchBend));
}

#[test]
fn producer_notices_dropped_consumer() {
    let (producer, consumer) = event_channel(8);
    assert!(producer.is_consumer_alive());
    drop(consumer);
    assert!(!producer.is_consumer_alive());
}
