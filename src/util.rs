use std::{
    future::Future,
    sync::Arc,
    task::{Context, Poll, Wake},
    thread::{self, Thread},
};

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }
}

/// Drives a future to completion on the calling thread. Only used during GPU setup, where
/// the adapter and device requests resolve almost immediately on native backends.
pub trait BlockOn {
    type Output;
    fn block_on(self) -> Self::Output;
}

impl<F: Future> BlockOn for F {
    type Output = F::Output;

    fn block_on(self) -> Self::Output {
        let mut fut = Box::pin(self);
        let waker = Arc::new(ThreadWaker(thread::current())).into();
        let mut ctx = Context::from_waker(&waker);

        loop {
            if let Poll::Ready(out) = fut.as_mut().poll(&mut ctx) {
                return out;
            }
            thread::park();
        }
    }
}

/// Row pitch for texture to buffer copies, which wgpu requires to be 256 byte aligned.
pub fn padded_bytes_per_row(unpadded: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (unpadded + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_future_resolves() {
        assert_eq!(async { 41 + 1 }.block_on(), 42);
    }

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(4), 256);
        assert_eq!(padded_bytes_per_row(256), 256);
        assert_eq!(padded_bytes_per_row(1028), 1280);
    }
}
