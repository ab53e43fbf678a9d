use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use coil_collections::{DynArray, SinglyLinkedList};
use coil_test_log::test;

const APPENDS: usize = 1000;
const READERS: usize = 4;

/// A value that is only valid if both halves agree.
#[derive(Clone, Copy, Debug)]
struct Tile {
    index: usize,
    check: usize,
}

impl Tile {
    fn new(index: usize) -> Self {
        Tile {
            index,
            check: !index,
        }
    }

    fn is_intact(&self) -> bool {
        self.check == !self.index
    }
}

#[test]
fn readers_never_observe_a_shrinking_array() {
    let array = Arc::new(DynArray::new(1).unwrap());
    let done = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(READERS + 1));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let array = Arc::clone(&array);
            let done = Arc::clone(&done);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut last_size = 0;
                loop {
                    let finished = done.load(Ordering::Acquire);

                    let size = array.size().unwrap();
                    assert!(size >= last_size, "size went from {last_size} to {size}");
                    last_size = size;

                    if size > 0 {
                        let tile: Tile = array.get(size - 1).expect("live slot");
                        assert!(tile.is_intact());
                        assert_eq!(tile.index, size - 1);
                    }

                    let raw = array.read().unwrap();
                    for (position, tile) in raw.iter().enumerate() {
                        assert!(tile.is_intact());
                        assert_eq!(tile.index, position);
                    }
                    assert!(raw.len() <= raw.capacity());
                    drop(raw);

                    if finished {
                        break last_size;
                    }
                }
            })
        })
        .collect();

    barrier.wait();
    for index in 0..APPENDS {
        array.append(Tile::new(index)).unwrap();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        assert_eq!(reader.join().unwrap(), APPENDS);
    }
    assert_eq!(array.size().unwrap(), APPENDS);
    assert_eq!(array.capacity().unwrap(), 1024);
}

#[test]
fn readers_never_observe_a_shrinking_list() {
    let list = Arc::new(SinglyLinkedList::with_comparator(|a: &Tile, b: &Tile| {
        a.index == b.index
    }));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let list = Arc::clone(&list);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut last_size = 0;
                loop {
                    let finished = done.load(Ordering::Acquire);

                    let size = list.size().unwrap();
                    assert!(size >= last_size, "size went from {last_size} to {size}");
                    last_size = size;

                    if let Some(head) = list.back() {
                        assert!(head.is_intact());
                        assert!(list.is_in(&head).unwrap());
                    }
                    if size > 0 {
                        let first = list.get(0).expect("live node");
                        assert_eq!(first.index, 0);
                    }

                    if finished {
                        break last_size;
                    }
                }
            })
        })
        .collect();

    for index in 0..APPENDS {
        list.append(Tile::new(index)).unwrap();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        assert_eq!(reader.join().unwrap(), APPENDS);
    }
    assert_eq!(list.size().unwrap(), APPENDS);
}

#[test]
fn writers_are_serialized() {
    let list = Arc::new(SinglyLinkedList::new());
    let writers: Vec<_> = (0..4)
        .map(|writer| {
            let list = Arc::clone(&list);
            thread::spawn(move || {
                for i in 0..250 {
                    if i % 2 == 0 {
                        list.prepend((writer, i)).unwrap();
                    } else {
                        list.insert((writer, i), list.size().unwrap().min(1)).unwrap();
                    }
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(list.size().unwrap(), 1000);
    let raw = list.read().unwrap();
    assert_eq!(raw.iter().count(), 1000);
    for writer in 0..4 {
        assert_eq!(raw.iter().filter(|(w, _)| *w == writer).count(), 250);
    }
}
