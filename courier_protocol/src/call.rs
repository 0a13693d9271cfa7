use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use bytes::BytesMut;

use crate::{CallError, CallResult, SerializeType};

/// Anything that can travel as call arguments or reply payload.
pub trait CallParam: Debug {
    fn into_bytes(&self, st: SerializeType) -> CallResult<Vec<u8>>;
    fn from_slice(&mut self, st: SerializeType, data: &[u8]) -> CallResult<()>;
}

impl CallParam for BytesMut {
    fn into_bytes(&self, _: SerializeType) -> CallResult<Vec<u8>> {
        Ok(self.to_vec())
    }
    fn from_slice(&mut self, _: SerializeType, data: &[u8]) -> CallResult<()> {
        self.extend_from_slice(data);
        Ok(())
    }
}

/// Terminal result of one (sub-)invocation: reply payload or error.
pub type CallOutcome = CallResult<Vec<u8>>;

/// Runs once when a call settles, on the settling thread.
pub type SettleFn = Box<dyn FnOnce(&CallOutcome) + Send>;

struct CallInner {
    outcome: Option<CallOutcome>,
    waker: Option<Waker>,
    observers: Vec<SettleFn>,
}

/// One in-flight invocation. Exactly one writer performs the pending to
/// terminal transition; whoever loses that race (late completion, late
/// timeout) is discarded.
pub struct Call {
    timeout: Duration,
    inner: Mutex<CallInner>,
    done: Condvar,
}

pub type ArcCall = Arc<Call>;

impl Call {
    pub fn new(timeout: Duration) -> Call {
        Call {
            timeout,
            inner: Mutex::new(CallInner {
                outcome: None,
                waker: None,
                observers: Vec::new(),
            }),
            done: Condvar::new(),
        }
    }

    /// The timeout resolved for this call at dispatch time.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_settled(&self) -> bool {
        self.inner.lock().unwrap().outcome.is_some()
    }

    /// First transition wins; returns false when the call was already settled.
    pub fn settle(&self, outcome: CallOutcome) -> bool {
        let (waker, observers) = {
            let mut inner = self.inner.lock().unwrap();
            if inner.outcome.is_some() {
                return false;
            }
            inner.outcome = Some(outcome.clone());
            (inner.waker.take(), std::mem::take(&mut inner.observers))
        };
        // observers first, so a blocked waiter returns with hooks already run
        for observer in observers {
            observer(&outcome);
        }
        self.done.notify_all();
        if let Some(waker) = waker {
            waker.wake();
        }
        true
    }

    pub fn complete(&self, payload: Vec<u8>) -> bool {
        self.settle(Ok(payload))
    }

    pub fn fail(&self, err: CallError) -> bool {
        self.settle(Err(err))
    }

    /// Subscribe to the settle event. Fires immediately, on the caller's
    /// thread, if the call has already settled.
    pub fn on_settled(&self, observer: SettleFn) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(outcome) = inner.outcome.clone() {
            drop(inner);
            observer(&outcome);
        } else {
            inner.observers.push(observer);
        }
    }

    /// Block until the call settles or `timeout` elapses. Expiry settles the
    /// call as timed out; a completion that slips in first wins instead.
    pub fn wait(&self, timeout: Duration) -> CallOutcome {
        let deadline = Instant::now() + timeout;
        {
            let mut inner = self.inner.lock().unwrap();
            loop {
                if let Some(outcome) = &inner.outcome {
                    return outcome.clone();
                }
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let (guard, _) = self.done.wait_timeout(inner, deadline - now).unwrap();
                inner = guard;
            }
        }
        let expired = CallError::Timeout(timeout.as_millis() as u64);
        self.fail(expired.clone());
        let inner = self.inner.lock().unwrap();
        inner.outcome.clone().unwrap_or(Err(expired))
    }
}

/// Future half of a pending call. Clones share the same underlying call, so
/// the slot-and-consume pattern of the invocation context stays cheap.
#[derive(Clone)]
pub struct CallFuture {
    arc_call: ArcCall,
}

impl CallFuture {
    pub fn new(arc_call: ArcCall) -> Self {
        CallFuture { arc_call }
    }

    pub fn call(&self) -> &ArcCall {
        &self.arc_call
    }

    /// Block with the timeout resolved for this call at dispatch time.
    pub fn wait(&self) -> CallOutcome {
        self.arc_call.wait(self.arc_call.timeout())
    }

    pub fn wait_for(&self, timeout: Duration) -> CallOutcome {
        self.arc_call.wait(timeout)
    }
}

impl Future for CallFuture {
    type Output = CallOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<CallOutcome> {
        let mut inner = self.arc_call.inner.lock().unwrap();
        if let Some(outcome) = &inner.outcome {
            Poll::Ready(outcome.clone())
        } else {
            inner.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

/// Decode a settled outcome into a typed reply.
pub fn decode_reply<T>(outcome: CallOutcome, st: SerializeType) -> CallResult<T>
where
    T: CallParam + Default,
{
    let payload = outcome?;
    let mut reply = T::default();
    reply.from_slice(st, &payload)?;
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn first_transition_wins() {
        let call = Call::new(Duration::from_millis(100));
        assert!(call.complete(vec![1, 2, 3]));
        assert!(!call.fail(CallError::Remote("late".to_owned())));
        assert_eq!(Ok(vec![1, 2, 3]), call.wait(Duration::from_millis(10)));
    }

    #[test]
    fn wait_sees_completion_from_another_thread() {
        let call = Arc::new(Call::new(Duration::from_millis(500)));
        let remote = call.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.complete(b"pong".to_vec());
        });
        assert_eq!(Ok(b"pong".to_vec()), call.wait(Duration::from_millis(500)));
        handle.join().unwrap();
    }

    #[test]
    fn wait_expiry_settles_as_timeout() {
        let call = Call::new(Duration::from_millis(20));
        assert_eq!(
            Err(CallError::Timeout(20)),
            call.wait(Duration::from_millis(20))
        );
        // the abandoned call discards a late completion
        assert!(!call.complete(b"late".to_vec()));
        assert_eq!(
            Err(CallError::Timeout(20)),
            call.wait(Duration::from_millis(20))
        );
    }

    #[test]
    fn observers_fire_once_on_settle() {
        let call = Call::new(Duration::from_millis(100));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        call.on_settled(Box::new(move |outcome| {
            assert!(outcome.is_ok());
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        call.complete(vec![9]);
        call.complete(vec![10]);
        assert_eq!(1, fired.load(Ordering::SeqCst));

        // subscribing after the fact fires immediately
        let counter = fired.clone();
        call.on_settled(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(2, fired.load(Ordering::SeqCst));
    }

    #[test]
    fn future_resolves_when_settled() {
        let call = Arc::new(Call::new(Duration::from_millis(500)));
        let remote = call.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.complete(b"async".to_vec());
        });
        let future = CallFuture::new(call);
        let outcome = futures::executor::block_on(future);
        assert_eq!(Ok(b"async".to_vec()), outcome);
        handle.join().unwrap();
    }
}
