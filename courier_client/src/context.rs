use std::cell::RefCell;

use courier_protocol::CallFuture;

thread_local! {
    static PENDING: RefCell<Option<CallFuture>> = RefCell::new(None);
}

/// Park the future of the most recent future-mode call issued by this
/// thread. A second call before the slot is consumed overwrites it silently,
/// so callers must take the future before dispatching again.
pub fn set_pending(future: CallFuture) {
    PENDING.with(|slot| *slot.borrow_mut() = Some(future));
}

/// Take (and clear) this thread's pending call, if any. The slot is written
/// and read by the same thread only; nothing ever crosses threads here.
pub fn take_pending() -> Option<CallFuture> {
    PENDING.with(|slot| slot.borrow_mut().take())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use courier_protocol::Call;

    use super::*;

    fn pending_future(payload: &[u8]) -> CallFuture {
        let call = Arc::new(Call::new(Duration::from_millis(100)));
        call.complete(payload.to_vec());
        CallFuture::new(call)
    }

    #[test]
    fn slot_is_cleared_on_take() {
        set_pending(pending_future(b"one"));
        assert!(take_pending().is_some());
        assert!(take_pending().is_none());
    }

    #[test]
    fn second_call_overwrites_slot() {
        set_pending(pending_future(b"one"));
        set_pending(pending_future(b"two"));
        let future = take_pending().unwrap();
        assert_eq!(Ok(b"two".to_vec()), future.wait());
        assert!(take_pending().is_none());
    }

    #[test]
    fn slot_is_thread_scoped() {
        set_pending(pending_future(b"mine"));
        let handle = thread::spawn(|| take_pending().is_none());
        assert!(handle.join().unwrap());
        assert!(take_pending().is_some());
    }
}
