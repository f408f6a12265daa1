use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use crossbeam_queue::ArrayQueue;
use rtrb::{Consumer, Producer, PushError, RingBuffer};
use thiserror::Error;

mod generation;

pub use generation::{Generation, GenerationKind, GenerationSequencer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoreChannelError {
    #[error("command queue is full")]
    CommandQueueFull,
    #[error("content thread is gone")]
    Disconnected,
}

/// Endpoints owned by the UI thread.
pub struct UiThreadChannels<Command, Notification, Sample> {
    pub commands: CommandSender<Command>,
    pub pointer_ring: PointerRingProducer<Sample>,
    pub notifications: NotificationConsumer<Notification>,
}

/// Endpoints owned by the content thread.
pub struct ContentThreadChannels<Command, Notification, Sample> {
    pub commands: Receiver<Command>,
    pub pointer_ring: PointerRingConsumer<Sample>,
    pub notifications: NotificationProducer<Notification>,
}

pub struct CommandSender<Command> {
    sender: Sender<Command>,
}

impl<Command> Clone for CommandSender<Command> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<Command> CommandSender<Command> {
    pub fn try_send(&self, command: Command) -> Result<(), CoreChannelError> {
        self.sender.try_send(command).map_err(|error| match error {
            TrySendError::Full(_) => CoreChannelError::CommandQueueFull,
            TrySendError::Disconnected(_) => CoreChannelError::Disconnected,
        })
    }

    /// Blocks while the queue is full.
    pub fn send(&self, command: Command) -> Result<(), CoreChannelError> {
        self.sender
            .send(command)
            .map_err(|_| CoreChannelError::Disconnected)
    }
}

// Single producer, single consumer. Neither endpoint is `Clone` and the Arc is never handed
// out, so neither side can be duplicated.
struct SharedPointerRing<Sample> {
    // When full the oldest sample is evicted; only the newest positions matter.
    queue: ArrayQueue<Sample>,
    wakeup_sender: Sender<()>,
    wakeup_receiver: Receiver<()>,
    dropped: AtomicU64,
    pushed: AtomicU64,
}

pub struct PointerRingProducer<Sample> {
    shared: Arc<SharedPointerRing<Sample>>,
}

impl<Sample> PointerRingProducer<Sample> {
    pub fn push(&self, sample: Sample) {
        let mut pending_sample = sample;
        loop {
            match self.shared.queue.push(pending_sample) {
                Ok(()) => {
                    self.shared.pushed.fetch_add(1, Ordering::Relaxed);
                    match self.shared.wakeup_sender.try_send(()) {
                        Ok(()) | Err(TrySendError::Full(())) => {}
                        Err(TrySendError::Disconnected(())) => {
                            panic!("pointer ring wakeup channel disconnected")
                        }
                    }
                    return;
                }
                Err(returned_sample) => {
                    pending_sample = returned_sample;
                    if self.shared.queue.pop().is_some() {
                        self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                    } else {
                        std::thread::yield_now();
                    }
                }
            }
        }
    }

    pub fn dropped_samples(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    pub fn pushed_samples(&self) -> u64 {
        self.shared.pushed.load(Ordering::Relaxed)
    }
}

pub struct PointerRingConsumer<Sample> {
    shared: Arc<SharedPointerRing<Sample>>,
}

impl<Sample> PointerRingConsumer<Sample> {
    /// Fires after pushes; meant for `crossbeam_channel::select!`. A wakeup may cover several
    /// samples, so always drain after receiving one.
    pub fn wakeup(&self) -> &Receiver<()> {
        &self.shared.wakeup_receiver
    }

    /// Appends up to `max_items` samples to `output`, oldest first.
    pub fn drain_into(&self, output: &mut Vec<Sample>, max_items: usize) -> usize {
        let mut drained_count = 0;
        while drained_count < max_items {
            match self.shared.queue.pop() {
                Some(sample) => {
                    output.push(sample);
                    drained_count += 1;
                }
                None => break,
            }
        }
        drained_count
    }

    /// Newest pending sample, discarding everything older.
    pub fn take_latest(&self) -> Option<Sample> {
        // Clear the wakeup before popping: a push racing with the pops leaves a fresh one.
        match self.shared.wakeup_receiver.try_recv() {
            Ok(()) | Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => panic!("pointer ring wakeup channel disconnected"),
        }
        let mut latest = None;
        while let Some(sample) = self.shared.queue.pop() {
            if latest.is_some() {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            }
            latest = Some(sample);
        }
        latest
    }

    pub fn dropped_samples(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

pub struct NotificationProducer<Notification> {
    producer: Producer<Notification>,
    dropped: u64,
}

impl<Notification: std::fmt::Debug> NotificationProducer<Notification> {
    /// Returns false, and counts a drop, when the UI side is not keeping up.
    pub fn push(&mut self, notification: Notification) -> bool {
        match self.producer.push(notification) {
            Ok(()) => true,
            Err(PushError::Full(rejected)) => {
                self.dropped += 1;
                tracing::warn!(
                    ?rejected,
                    dropped = self.dropped,
                    "notification ring full, dropping"
                );
                false
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

pub struct NotificationConsumer<Notification> {
    consumer: Consumer<Notification>,
}

impl<Notification> NotificationConsumer<Notification> {
    pub fn pop(&mut self) -> Option<Notification> {
        self.consumer.pop().ok()
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        let mut drained = Vec::with_capacity(self.consumer.slots());
        while let Ok(notification) = self.consumer.pop() {
            drained.push(notification);
        }
        drained
    }

    pub fn is_abandoned(&self) -> bool {
        self.consumer.is_abandoned()
    }
}

/// Standalone notification ring, for cores driven without a UI thread.
pub fn notification_ring<Notification>(
    capacity: usize,
) -> (NotificationProducer<Notification>, NotificationConsumer<Notification>) {
    assert!(capacity > 0, "notification capacity must be greater than zero");
    let (producer, consumer) = RingBuffer::new(capacity);
    (
        NotificationProducer {
            producer,
            dropped: 0,
        },
        NotificationConsumer { consumer },
    )
}

pub fn create_core_channels<Command, Notification, Sample>(
    command_capacity: usize,
    pointer_ring_capacity: usize,
    notification_capacity: usize,
) -> (
    UiThreadChannels<Command, Notification, Sample>,
    ContentThreadChannels<Command, Notification, Sample>,
) {
    assert!(
        command_capacity > 0,
        "command capacity must be greater than zero"
    );
    assert!(
        pointer_ring_capacity > 0,
        "pointer ring capacity must be greater than zero"
    );

    let (command_sender, command_receiver) = bounded(command_capacity);
    let (wakeup_sender, wakeup_receiver) = bounded(1);
    let shared_pointer_ring = Arc::new(SharedPointerRing {
        queue: ArrayQueue::new(pointer_ring_capacity),
        wakeup_sender,
        wakeup_receiver,
        dropped: AtomicU64::new(0),
        pushed: AtomicU64::new(0),
    });
    let (notification_producer, notification_consumer) = notification_ring(notification_capacity);

    let ui_channels = UiThreadChannels {
        commands: CommandSender {
            sender: command_sender,
        },
        pointer_ring: PointerRingProducer {
            shared: shared_pointer_ring.clone(),
        },
        notifications: notification_consumer,
    };

    let content_channels = ContentThreadChannels {
        commands: command_receiver,
        pointer_ring: PointerRingConsumer {
            shared: shared_pointer_ring,
        },
        notifications: notification_producer,
    };

    (ui_channels, content_channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_ring_evicts_oldest_when_full() {
        let (ui, content) = create_core_channels::<(), u32, u32>(4, 3, 4);
        for sample in 0..5 {
            ui.pointer_ring.push(sample);
        }
        assert_eq!(ui.pointer_ring.pushed_samples(), 5);
        assert_eq!(ui.pointer_ring.dropped_samples(), 2);

        let mut drained = Vec::new();
        assert_eq!(content.pointer_ring.drain_into(&mut drained, 16), 3);
        assert_eq!(drained, vec![2, 3, 4]);
    }

    #[test]
    fn take_latest_skips_stale_samples() {
        let (ui, content) = create_core_channels::<(), u32, u32>(4, 8, 4);
        ui.pointer_ring.push(1);
        ui.pointer_ring.push(2);
        ui.pointer_ring.push(3);
        assert!(content.pointer_ring.wakeup().try_recv().is_ok());
        assert_eq!(content.pointer_ring.take_latest(), Some(3));
        assert_eq!(content.pointer_ring.take_latest(), None);
        assert_eq!(content.pointer_ring.dropped_samples(), 2);
    }

    #[test]
    fn full_command_queue_is_reported() {
        let (ui, content) = create_core_channels::<u8, u32, u32>(1, 1, 1);
        ui.commands.try_send(1).expect("first command");
        assert_eq!(
            ui.commands.try_send(2),
            Err(CoreChannelError::CommandQueueFull)
        );
        drop(content);
        assert_eq!(ui.commands.send(3), Err(CoreChannelError::Disconnected));
    }

    #[test]
    fn notification_overflow_counts_drops() {
        let (mut producer, mut consumer) = notification_ring::<u32>(2);
        assert!(producer.push(1));
        assert!(producer.push(2));
        assert!(!producer.push(3));
        assert_eq!(producer.dropped(), 1);
        assert_eq!(consumer.drain(), vec![1, 2]);
        assert_eq!(consumer.pop(), None);
    }
}
