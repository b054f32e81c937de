use std::{
    ptr,
    sync::atomic::{AtomicPtr, Ordering},
};

// Michael & Scott, "Simple, Fast, and Practical Non-Blocking and Blocking
// Concurrent Queue Algorithms", PODC '96.

struct Node<T> {
    value: Option<T>,
    next: AtomicPtr<Node<T>>,
    // Link for the retirement stack, written only by the popper that
    // unlinked the node
    retired_next: AtomicPtr<Node<T>>,
}

impl<T> Node<T> {
    fn alloc(value: Option<T>) -> *mut Self {
        Box::into_raw(Box::new(Self {
            value,
            next: AtomicPtr::new(ptr::null_mut()),
            retired_next: AtomicPtr::new(ptr::null_mut()),
        }))
    }
}

/// A multi-producer multi-consumer FIFO queue built on single-word CAS.
///
/// One sentinel node leads the list: `push` appends behind the tail by a CAS
/// on the last node's next pointer, `pop` swings the head over the sentinel's
/// successor. No node is ever freed while the queue is live, which is what
/// keeps the plain-pointer CAS safe from ABA and the unlinked sentinels safe
/// to read for a racing `push`; popped nodes park on a retirement stack and
/// are reclaimed together with the rest in `Drop`.
pub struct LockFreeQueue<T> {
    head: AtomicPtr<Node<T>>,
    tail: AtomicPtr<Node<T>>,
    retired: AtomicPtr<Node<T>>,
}

unsafe impl<T: Send> Send for LockFreeQueue<T> {}
unsafe impl<T: Send> Sync for LockFreeQueue<T> {}

impl<T> LockFreeQueue<T> {
    pub fn new() -> Self {
        let sentinel = Node::alloc(None);
        Self {
            head: AtomicPtr::new(sentinel),
            tail: AtomicPtr::new(sentinel),
            retired: AtomicPtr::new(ptr::null_mut()),
        }
    }

    pub fn push(&self, value: T) {
        let node = Node::alloc(Some(value));

        loop {
            let tail = self.tail.load(Ordering::Acquire);
            let next = unsafe { &(*tail).next };
            if next
                .compare_exchange(
                    ptr::null_mut(),
                    node,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                // Failure just means another thread already advanced the tail
                let _ = self.tail.compare_exchange(
                    tail,
                    node,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                return;
            }

            // The tail was lagging, help it along before retrying
            let next = next.load(Ordering::Acquire);
            let _ =
                self.tail
                    .compare_exchange(tail, next, Ordering::AcqRel, Ordering::Acquire);
        }
    }

    pub fn pop(&self) -> Option<T> {
        loop {
            let head = self.head.load(Ordering::Acquire);
            let next = unsafe { (*head).next.load(Ordering::Acquire) };
            if next.is_null() {
                return None;
            }

            if self
                .head
                .compare_exchange(head, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                // `next` is the new sentinel; the old one is unlinked but may
                // still be read by a racing push, so it only gets retired
                let value = unsafe { (*next).value.take() };
                self.retire(head);
                return value;
            }
        }
    }

    /// Parks an unlinked node for reclamation at drop time.
    fn retire(&self, node: *mut Node<T>) {
        loop {
            let top = self.retired.load(Ordering::Acquire);
            unsafe { (*node).retired_next.store(top, Ordering::Relaxed) };
            if self
                .retired
                .compare_exchange(top, node, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
        }
    }
}

impl<T> Default for LockFreeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LockFreeQueue<T> {
    fn drop(&mut self) {
        // Remaining list, sentinel included
        let mut node = self.head.load(Ordering::Acquire);
        while !node.is_null() {
            let boxed = unsafe { Box::from_raw(node) };
            node = boxed.next.load(Ordering::Acquire);
        }

        // Popped nodes from the retirement stack
        let mut node = self.retired.load(Ordering::Acquire);
        while !node.is_null() {
            let boxed = unsafe { Box::from_raw(node) };
            node = boxed.retired_next.load(Ordering::Acquire);
        }
    }
}
