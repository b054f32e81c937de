use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use hikari::renderer::LockFreeQueue;

#[test]
fn fifo_order() {
    let queue = LockFreeQueue::new();
    assert_eq!(queue.pop(), None::<u32>);

    for i in 0..100u32 {
        queue.push(i);
    }
    for i in 0..50 {
        assert_eq!(queue.pop(), Some(i));
    }
    // Interleave more pushes, the remainder stays in order
    for i in 100..120u32 {
        queue.push(i);
    }
    for i in 50..120 {
        assert_eq!(queue.pop(), Some(i));
    }
    assert_eq!(queue.pop(), None);
}

#[test]
fn empty_after_drain() {
    let queue = LockFreeQueue::new();
    queue.push(1u32);
    queue.push(2);
    assert_eq!(queue.pop(), Some(1));
    assert_eq!(queue.pop(), Some(2));
    assert_eq!(queue.pop(), None);
    queue.push(3);
    assert_eq!(queue.pop(), Some(3));
}

#[test]
fn concurrent_producers_and_consumers() {
    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 4;
    const PER_PRODUCER: usize = 10_000;

    let queue = Arc::new(LockFreeQueue::new());
    let producing = Arc::new(AtomicBool::new(true));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    queue.push((p * PER_PRODUCER + i) as u64);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let producing = Arc::clone(&producing);
            std::thread::spawn(move || {
                let mut consumed = Vec::new();
                loop {
                    match queue.pop() {
                        Some(value) => consumed.push(value),
                        None => {
                            if !producing.load(Ordering::SeqCst) {
                                break;
                            }
                            std::thread::yield_now();
                        }
                    }
                }
                consumed
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    producing.store(false, Ordering::SeqCst);

    let mut all = Vec::new();
    for consumer in consumers {
        all.extend(consumer.join().unwrap());
    }

    // Every pushed value came out exactly once
    assert_eq!(all.len(), PRODUCERS * PER_PRODUCER);
    let unique: HashSet<u64> = all.iter().copied().collect();
    assert_eq!(unique.len(), PRODUCERS * PER_PRODUCER);
    let expected: HashSet<u64> = (0..(PRODUCERS * PER_PRODUCER) as u64).collect();
    assert_eq!(unique, expected);
}

#[test]
fn values_drop_with_the_queue() {
    // Undrained values should not leak or double free on drop
    let queue = LockFreeQueue::new();
    for i in 0..10 {
        queue.push(Arc::new(i));
    }
    let popped = queue.pop().unwrap();
    assert_eq!(*popped, 0);
    drop(queue);
    assert_eq!(*popped, 0);
}
